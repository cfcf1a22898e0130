//! FFI use-case API for the panel-facing UI shell.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions for the floating panel.
//! - Keep error semantics simple: envelopes with `ok` + message, never
//!   exceptions across the boundary.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - The engine is process-wide state created once by `panel_open`.
//! - Gesture entry points stay non-blocking apart from the synchronous
//!   SQLite commit the stack model performs.

use log::info;
use mindstack_core::db::open_db;
use mindstack_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    DragSample, NavigationController, PressTick, PressureSample, SqliteStackRepository,
    StackError, StackService,
};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::Instant;
use uuid::Uuid;

static PANEL_DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static PANEL_ENGINE: OnceLock<Mutex<NavigationController<SqliteStackRepository>>> =
    OnceLock::new();

/// Minimal health-check API for bridge smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Never panics; returns empty string on success and an error message
///   on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Generic action response envelope for panel commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelActionResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Optional subject id (created group, removed card, ...).
    pub subject_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

/// One card for panel display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelCard {
    pub card_id: String,
    pub created_at: i64,
    pub text: String,
}

/// One group for panel display, cards newest-first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelGroup {
    pub group_id: String,
    pub name: String,
    pub pinned: bool,
    /// Oldest card's text for multi-card stacks, empty otherwise.
    pub summary: String,
    pub cards: Vec<PanelCard>,
}

/// Current panel state, display-ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelGroupsResponse {
    pub groups: Vec<PanelGroup>,
    pub message: String,
}

/// One feedback event for the haptic driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelFeedbackEvent {
    /// `stage_crossed | deep_press_accepted | deep_press_rejected`.
    pub kind: String,
    /// `immediate | default`.
    pub timing: String,
    pub pulses: u32,
    pub pulse_spacing_ms: u64,
}

/// Result of feeding one gesture sample or idle tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelGestureResponse {
    pub group_id: String,
    pub feedback: Vec<PanelFeedbackEvent>,
    /// UI should open the insert affordance.
    pub insert_requested: bool,
    /// Card removed by a resolved swipe, for the exit animation.
    pub popped_card_id: Option<String>,
    /// Recoverable storage failure surfaced from an optimistic mutation.
    pub storage_failure: Option<String>,
    pub message: String,
}

/// Per-card render parameters for one group.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelCardRender {
    pub card_id: String,
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
    pub opacity: f64,
    pub pinned_highlight: bool,
}

/// Opens (or reuses) the panel store and builds the engine.
///
/// # FFI contract
/// - First call wins; later calls with the same path are no-ops, a
///   different path is rejected.
/// - Never panics; returns empty string on success.
#[flutter_rust_bridge::frb(sync)]
pub fn panel_open(db_path: String) -> String {
    let requested = PathBuf::from(db_path);

    if let Some(active) = PANEL_DB_PATH.get() {
        if *active == requested {
            return String::new();
        }
        return format!(
            "panel store already open at `{}`; refusing to switch to `{}`",
            active.display(),
            requested.display()
        );
    }

    let conn = match open_db(&requested) {
        Ok(conn) => conn,
        Err(err) => return format!("failed to open panel store: {err}"),
    };
    let repo = match SqliteStackRepository::try_new(conn) {
        Ok(repo) => repo,
        Err(err) => return format!("failed to validate panel store: {err}"),
    };
    let stacks = match StackService::load(repo) {
        Ok(stacks) => stacks,
        Err(err) => return format!("failed to load panel state: {err}"),
    };

    info!(
        "event=panel_open module=ffi status=ok groups={}",
        stacks.groups().len()
    );
    let _ = PANEL_DB_PATH.set(requested);
    let _ = PANEL_ENGINE.set(Mutex::new(NavigationController::new(stacks)));
    String::new()
}

/// Lists groups and cards in display order.
#[flutter_rust_bridge::frb(sync)]
pub fn panel_groups() -> PanelGroupsResponse {
    let Some(engine) = lock_engine() else {
        return PanelGroupsResponse {
            groups: Vec::new(),
            message: "panel store is not open".to_string(),
        };
    };

    let groups = engine
        .groups()
        .iter()
        .map(|group| PanelGroup {
            group_id: group.uuid.to_string(),
            name: group.name.clone(),
            pinned: group.pinned,
            summary: group.summary_text().unwrap_or_default().to_string(),
            cards: group
                .cards()
                .iter()
                .map(|card| PanelCard {
                    card_id: card.uuid.to_string(),
                    created_at: card.created_at,
                    text: card.text.clone(),
                })
                .collect(),
        })
        .collect();

    PanelGroupsResponse {
        groups,
        message: String::new(),
    }
}

/// Creates a group with its first card.
#[flutter_rust_bridge::frb(sync)]
pub fn panel_add_group(text: String) -> PanelActionResponse {
    let Some(mut engine) = lock_engine() else {
        return not_open();
    };
    action(engine.add_group(text).map(Some))
}

/// Appends a card, as submitted through the insert affordance.
#[flutter_rust_bridge::frb(sync)]
pub fn panel_insert(group_id: String, text: String) -> PanelActionResponse {
    let Some(group_uuid) = parse_group_id(&group_id) else {
        return bad_group_id(&group_id);
    };
    let Some(mut engine) = lock_engine() else {
        return not_open();
    };
    action(engine.request_insert(group_uuid, text).map(Some))
}

/// Pops the newest card via the explicit command.
#[flutter_rust_bridge::frb(sync)]
pub fn panel_pop(group_id: String) -> PanelActionResponse {
    let Some(group_uuid) = parse_group_id(&group_id) else {
        return bad_group_id(&group_id);
    };
    let Some(mut engine) = lock_engine() else {
        return not_open();
    };
    action(
        engine
            .request_pop(group_uuid)
            .map(|removed| removed.map(|card| card.uuid)),
    )
}

/// Deletes a group and all of its cards.
#[flutter_rust_bridge::frb(sync)]
pub fn panel_delete_group(group_id: String) -> PanelActionResponse {
    let Some(group_uuid) = parse_group_id(&group_id) else {
        return bad_group_id(&group_id);
    };
    let Some(mut engine) = lock_engine() else {
        return not_open();
    };
    action(engine.request_delete_all(group_uuid).map(|()| None))
}

/// Toggles a group's pin.
#[flutter_rust_bridge::frb(sync)]
pub fn panel_toggle_pin(group_id: String) -> PanelActionResponse {
    let Some(group_uuid) = parse_group_id(&group_id) else {
        return bad_group_id(&group_id);
    };
    let Some(mut engine) = lock_engine() else {
        return not_open();
    };
    action(engine.request_pin_toggle(group_uuid).map(|_| None))
}

/// Feeds one pressure sample.
///
/// Applies the hardware clamp: once the device stage passes 1, the
/// continuous value is reported as full pressure.
#[flutter_rust_bridge::frb(sync)]
pub fn panel_pressure(group_id: String, pressure: f64, raw_stage: u8) -> PanelGestureResponse {
    let Some(group_uuid) = parse_group_id(&group_id) else {
        return gesture_error(&group_id, format!("invalid group id `{group_id}`"));
    };
    let Some(mut engine) = lock_engine() else {
        return gesture_error(&group_id, "panel store is not open".to_string());
    };

    let pressure = if raw_stage > 1 { 1.0 } else { pressure };
    let update = engine.pressure_sample(
        group_uuid,
        PressureSample {
            pressure,
            stage_tick: PressTick::from_raw(raw_stage),
        },
    );
    gesture_response(group_id, update)
}

/// Feeds one horizontal drag sample.
#[flutter_rust_bridge::frb(sync)]
pub fn panel_drag(
    group_id: String,
    delta_x: f64,
    delta_y: f64,
    touches_active: bool,
) -> PanelGestureResponse {
    let Some(group_uuid) = parse_group_id(&group_id) else {
        return gesture_error(&group_id, format!("invalid group id `{group_id}`"));
    };
    let Some(mut engine) = lock_engine() else {
        return gesture_error(&group_id, "panel store is not open".to_string());
    };

    let update = engine.drag_sample(
        group_uuid,
        DragSample {
            delta_x,
            delta_y,
            touches_active,
        },
        Instant::now(),
    );
    gesture_response(group_id, update)
}

/// Polls idle-settle deadlines; call from the UI frame timer.
#[flutter_rust_bridge::frb(sync)]
pub fn panel_idle_tick() -> Vec<PanelGestureResponse> {
    let Some(mut engine) = lock_engine() else {
        return Vec::new();
    };

    engine
        .tick(Instant::now())
        .into_iter()
        .map(|(group_uuid, update)| gesture_response(group_uuid.to_string(), update))
        .collect()
}

/// Render parameters for one group's cards, display-ordered.
#[flutter_rust_bridge::frb(sync)]
pub fn panel_render(group_id: String) -> Vec<PanelCardRender> {
    let Some(group_uuid) = parse_group_id(&group_id) else {
        return Vec::new();
    };
    let Some(engine) = lock_engine() else {
        return Vec::new();
    };

    let card_ids: Vec<String> = engine
        .stacks()
        .group(group_uuid)
        .map(|group| {
            group
                .cards()
                .iter()
                .map(|card| card.uuid.to_string())
                .collect()
        })
        .unwrap_or_default();

    engine
        .render_cards(group_uuid)
        .into_iter()
        .zip(card_ids)
        .map(|(render, card_id)| PanelCardRender {
            card_id,
            offset_x: render.offset_x,
            offset_y: render.offset_y,
            scale: render.scale,
            opacity: render.opacity,
            pinned_highlight: render.pinned_highlight,
        })
        .collect()
}

fn lock_engine() -> Option<MutexGuard<'static, NavigationController<SqliteStackRepository>>> {
    let engine = PANEL_ENGINE.get()?;
    // A poisoned lock still holds consistent engine state; recover it
    // instead of propagating a panic across the boundary.
    Some(engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
}

fn parse_group_id(group_id: &str) -> Option<Uuid> {
    Uuid::parse_str(group_id).ok()
}

fn action(result: Result<Option<Uuid>, StackError>) -> PanelActionResponse {
    match result {
        Ok(subject) => PanelActionResponse {
            ok: true,
            subject_id: subject.map(|id| id.to_string()),
            message: String::new(),
        },
        Err(err) => PanelActionResponse {
            ok: false,
            subject_id: None,
            message: err.to_string(),
        },
    }
}

fn not_open() -> PanelActionResponse {
    PanelActionResponse {
        ok: false,
        subject_id: None,
        message: "panel store is not open".to_string(),
    }
}

fn bad_group_id(group_id: &str) -> PanelActionResponse {
    PanelActionResponse {
        ok: false,
        subject_id: None,
        message: format!("invalid group id `{group_id}`"),
    }
}

fn gesture_response(
    group_id: String,
    update: mindstack_core::EngineUpdate,
) -> PanelGestureResponse {
    let feedback = update
        .feedback
        .iter()
        .map(|event| {
            let (pulses, spacing) = event.kind.pulse_pattern();
            PanelFeedbackEvent {
                kind: feedback_kind_name(event.kind).to_string(),
                timing: feedback_timing_name(event.timing).to_string(),
                pulses,
                pulse_spacing_ms: spacing.as_millis() as u64,
            }
        })
        .collect();

    PanelGestureResponse {
        group_id,
        feedback,
        insert_requested: update.insert_requested,
        popped_card_id: update.popped_card.map(|id| id.to_string()),
        storage_failure: update.storage_failure,
        message: String::new(),
    }
}

fn gesture_error(group_id: &str, message: String) -> PanelGestureResponse {
    PanelGestureResponse {
        group_id: group_id.to_string(),
        feedback: Vec::new(),
        insert_requested: false,
        popped_card_id: None,
        storage_failure: None,
        message,
    }
}

fn feedback_kind_name(kind: mindstack_core::FeedbackKind) -> &'static str {
    match kind {
        mindstack_core::FeedbackKind::StageCrossed => "stage_crossed",
        mindstack_core::FeedbackKind::DeepPressAccepted => "deep_press_accepted",
        mindstack_core::FeedbackKind::DeepPressRejected => "deep_press_rejected",
    }
}

fn feedback_timing_name(timing: mindstack_core::FeedbackTiming) -> &'static str {
    match timing {
        mindstack_core::FeedbackTiming::Immediate => "immediate",
        mindstack_core::FeedbackTiming::Default => "default",
    }
}
