//! Edge-triggered feedback event dispatch.
//!
//! # Responsibility
//! - Turn stage-index crossings and deep-press transitions into discrete
//!   feedback events for the haptic collaborator.
//!
//! # Invariants
//! - Edge-triggered, never level-triggered: state is remembered and
//!   compared, so an unchanged stage or tick never re-emits.
//! - Stage crossings only fire on even stages strictly inside
//!   `1 < stage < 2n-3`; the travel extremes stay silent.
//! - Exactly one accepted/rejected event per transition into deep press.

use crate::engine::curve::PressTick;
use std::time::Duration;

/// What the haptic driver should play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    /// The travel position settled onto another card.
    StageCrossed,
    /// Deep press accepted; the insert affordance is opening.
    DeepPressAccepted,
    /// Deep press rejected; the stack is at its card cap.
    DeepPressRejected,
}

impl FeedbackKind {
    /// Pulse pattern for this event: `(pulse count, spacing)`.
    ///
    /// Single-pulse kinds use a zero spacing.
    pub fn pulse_pattern(self) -> (u32, Duration) {
        match self {
            Self::StageCrossed | Self::DeepPressAccepted => (1, Duration::ZERO),
            Self::DeepPressRejected => (4, Duration::from_millis(50)),
        }
    }
}

/// When the driver should schedule the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackTiming {
    /// Play now, without waiting for the next drawing cycle.
    Immediate,
    /// Let the driver coalesce with its default scheduling.
    Default,
}

/// One discrete feedback event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackEvent {
    pub kind: FeedbackKind,
    pub timing: FeedbackTiming,
}

/// Remembers the last observed stage and press tick per group view and
/// emits events only on qualifying changes.
#[derive(Debug, Default)]
pub struct FeedbackDispatcher {
    last_stage: Option<u32>,
    last_tick: Option<PressTick>,
}

impl FeedbackDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes a travel stage for a stack of `card_count` cards.
    pub fn on_stage(&mut self, stage: u32, card_count: usize) -> Option<FeedbackEvent> {
        let changed = self.last_stage != Some(stage);
        self.last_stage = Some(stage);
        if !changed {
            return None;
        }

        if stage % 2 != 0 {
            return None;
        }
        // Suppress the travel extremes; enter/exit is signaled elsewhere.
        let upper = (2 * card_count).saturating_sub(3) as u32;
        if stage <= 1 || stage >= upper {
            return None;
        }

        Some(FeedbackEvent {
            kind: FeedbackKind::StageCrossed,
            timing: FeedbackTiming::Immediate,
        })
    }

    /// Observes a hardware press tick; `insert_allowed` reflects the card
    /// cap at this instant.
    pub fn on_press_tick(
        &mut self,
        tick: PressTick,
        insert_allowed: bool,
    ) -> Option<FeedbackEvent> {
        let changed = self.last_tick != Some(tick);
        self.last_tick = Some(tick);
        if !changed || tick != PressTick::DeepPress {
            return None;
        }

        Some(if insert_allowed {
            FeedbackEvent {
                kind: FeedbackKind::DeepPressAccepted,
                timing: FeedbackTiming::Default,
            }
        } else {
            FeedbackEvent {
                kind: FeedbackKind::DeepPressRejected,
                timing: FeedbackTiming::Immediate,
            }
        })
    }

    /// Forgets remembered state, e.g. when the pressure gesture ends.
    pub fn reset(&mut self) {
        self.last_stage = None;
        self.last_tick = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{FeedbackDispatcher, FeedbackKind, FeedbackTiming};
    use crate::engine::curve::{travel, PressTick};

    #[test]
    fn monotonic_ramp_emits_each_qualifying_stage_once() {
        // 4 cards -> stage_count 6, window (1, 5): qualifying stages 2 and 4.
        let mut dispatcher = FeedbackDispatcher::new();
        let mut crossings = Vec::new();
        for step in 0..=1000 {
            let sample = travel(f64::from(step) / 1000.0, 4);
            if let Some(event) = dispatcher.on_stage(sample.stage, 4) {
                assert_eq!(event.kind, FeedbackKind::StageCrossed);
                crossings.push(sample.stage);
            }
        }
        assert_eq!(crossings, [2, 4]);
    }

    #[test]
    fn unchanged_stage_never_re_emits() {
        let mut dispatcher = FeedbackDispatcher::new();
        assert!(dispatcher.on_stage(2, 4).is_some());
        assert!(dispatcher.on_stage(2, 4).is_none());
        assert!(dispatcher.on_stage(3, 4).is_none());
        // Re-entering 2 after leaving it is a new crossing.
        assert!(dispatcher.on_stage(2, 4).is_some());
    }

    #[test]
    fn extreme_stages_stay_silent() {
        let mut dispatcher = FeedbackDispatcher::new();
        // 3 cards -> stage_count 4, window (1, 3): only stage 2 qualifies.
        assert!(dispatcher.on_stage(0, 3).is_none());
        assert!(dispatcher.on_stage(2, 3).is_some());
        assert!(dispatcher.on_stage(4, 3).is_none());
    }

    #[test]
    fn deep_press_fires_once_per_transition() {
        let mut dispatcher = FeedbackDispatcher::new();
        assert!(dispatcher
            .on_press_tick(PressTick::Engaged, true)
            .is_none());

        let accepted = dispatcher
            .on_press_tick(PressTick::DeepPress, true)
            .unwrap();
        assert_eq!(accepted.kind, FeedbackKind::DeepPressAccepted);
        assert_eq!(accepted.timing, FeedbackTiming::Default);

        // Held deep press does not repeat.
        assert!(dispatcher.on_press_tick(PressTick::DeepPress, true).is_none());
    }

    #[test]
    fn deep_press_at_capacity_plays_the_rejection_burst() {
        let mut dispatcher = FeedbackDispatcher::new();
        let rejected = dispatcher
            .on_press_tick(PressTick::DeepPress, false)
            .unwrap();
        assert_eq!(rejected.kind, FeedbackKind::DeepPressRejected);
        assert_eq!(rejected.timing, FeedbackTiming::Immediate);

        let (pulses, spacing) = rejected.kind.pulse_pattern();
        assert_eq!(pulses, 4);
        assert_eq!(spacing.as_millis(), 50);
    }
}
