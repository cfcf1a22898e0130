//! Domain model for card stacks.
//!
//! # Responsibility
//! - Define canonical data structures used by the engine and persistence.
//! - Keep display ordering and capacity rules in one place.
//!
//! # Invariants
//! - Every domain object is identified by a stable `Uuid`.
//! - Deleting a group deletes all of its cards (exclusive ownership).

pub mod card;
