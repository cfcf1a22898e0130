//! Core use-case services.
//!
//! # Responsibility
//! - Hold the authoritative in-memory stack state.
//! - Orchestrate repository commits behind use-case level APIs.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod stack_service;
