//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the storage collaborator contract for card stacks.
//! - Isolate SQLite query details from service/engine orchestration.
//!
//! # Invariants
//! - Multi-row mutations (pin exclusivity, group deletion, pop) are
//!   applied inside a single transaction.
//! - Repository APIs return semantic errors (`GroupNotFound`) in addition
//!   to DB transport errors.

pub mod stack_repo;
