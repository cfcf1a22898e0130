//! Core engine for MindStack.
//! This crate is the single source of truth for stack invariants and the
//! gesture-to-navigation algorithm; the UI shell renders what it is told.

pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use engine::controller::{EngineUpdate, NavigationController, PressureSample};
pub use engine::curve::{stage_count, travel, PressTick, Travel};
pub use engine::feedback::{FeedbackEvent, FeedbackKind, FeedbackTiming};
pub use engine::projection::CardRender;
pub use engine::swipe::{DragSample, SwipeConfig, SwipeOutcome, SwipeTracker};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::card::{Card, CardId, CardValidationError, Group, GroupId, CARD_CAP};
pub use repo::stack_repo::{RepoError, RepoResult, SqliteStackRepository, StackRepository};
pub use service::stack_service::{StackError, StackService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
