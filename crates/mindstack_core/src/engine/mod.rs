//! Gesture-to-navigation engine.
//!
//! # Responsibility
//! - Convert pressure and drag input into stack navigation: a continuous
//!   travel position, per-card render parameters, discrete feedback
//!   events and terminal gesture outcomes.
//!
//! # Data flow
//! Raw samples -> [`curve`]/[`swipe`] -> travel position / pending offset
//! -> [`projection`] -> render parameters; transitions -> [`feedback`] ->
//! haptic events; terminal outcomes -> [`controller`] -> stack mutation
//! and storage commit.

pub mod controller;
pub mod curve;
pub mod feedback;
pub mod projection;
pub mod swipe;
