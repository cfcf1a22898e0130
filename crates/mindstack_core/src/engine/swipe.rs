//! Horizontal swipe-to-pop gesture tracking.
//!
//! # Responsibility
//! - Accumulate horizontal drag deltas into a pending offset per group.
//! - Decide pop vs. snap-back when the gesture lifts or goes idle.
//! - Keep popped cards off-stage for their exit animation.
//!
//! # State Machine
//!
//! - Each accepted sample adds its horizontal delta to `scroll_x` and
//!   replaces the idle-settle deadline.
//! - A sample with an empty touch set past the pop threshold resolves
//!   immediately; otherwise the deadline resolves the same threshold test
//!   after 100 ms of silence (covers a lift without a final zero-delta
//!   event).
//! - Resolution resets `scroll_x` to 0; a pop additionally records the
//!   removed card so it renders off-stage regardless of later samples.
//!
//! # Invariants
//!
//! 1. A sample whose vertical component dominates (`|dy| > |dx|`) is
//!    ignored entirely: no accumulation, no deadline restart.
//! 2. The deadline is a plain field replaced on every accepted sample, so
//!    a stale settle can never fire after a newer sample resolved the
//!    swipe.
//! 3. At most one outcome is produced per gesture; `scroll_x` is back to 0
//!    once an outcome is returned.

use crate::model::card::CardId;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Thresholds and timeouts for swipe resolution.
#[derive(Debug, Clone)]
pub struct SwipeConfig {
    /// Accumulated offset at or past which a lifted gesture pops
    /// (default: -220, leftward).
    pub pop_threshold: f64,
    /// Idle duration after which a gesture settles (default: 100ms).
    pub idle_settle: Duration,
    /// Fixed X offset for cards playing their exit animation.
    pub offstage_offset: f64,
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self {
            pop_threshold: -220.0,
            idle_settle: Duration::from_millis(100),
            offstage_offset: -1000.0,
        }
    }
}

/// One drag sample from the input source.
#[derive(Debug, Clone, Copy)]
pub struct DragSample {
    pub delta_x: f64,
    pub delta_y: f64,
    /// Whether any touches remain on the device for this sample.
    pub touches_active: bool,
}

/// Terminal decision for one swipe gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeOutcome {
    /// Threshold crossed: remove the newest card.
    Pop,
    /// Threshold not reached: animate back to rest, no model mutation.
    SnapBack,
}

/// Per-group swipe accumulator.
#[derive(Debug)]
pub struct SwipeTracker {
    config: SwipeConfig,
    scroll_x: f64,
    settle_deadline: Option<Instant>,
    popped: HashSet<CardId>,
}

impl SwipeTracker {
    pub fn new(config: SwipeConfig) -> Self {
        Self {
            config,
            scroll_x: 0.0,
            settle_deadline: None,
            popped: HashSet::new(),
        }
    }

    /// Feeds one drag sample; returns the outcome if this sample resolved
    /// the gesture.
    pub fn process(&mut self, sample: &DragSample, now: Instant) -> Option<SwipeOutcome> {
        if sample.delta_y.abs() > sample.delta_x.abs() {
            // Vertical scroll, not a swipe.
            return None;
        }

        self.scroll_x += sample.delta_x;

        if !sample.touches_active && self.scroll_x <= self.config.pop_threshold {
            return Some(self.resolve());
        }

        self.settle_deadline = Some(now + self.config.idle_settle);
        None
    }

    /// Checks the idle-settle deadline; call periodically (e.g. on tick).
    pub fn poll(&mut self, now: Instant) -> Option<SwipeOutcome> {
        let deadline = self.settle_deadline?;
        if now < deadline {
            return None;
        }
        Some(self.resolve())
    }

    fn resolve(&mut self) -> SwipeOutcome {
        let outcome = if self.scroll_x <= self.config.pop_threshold {
            SwipeOutcome::Pop
        } else {
            SwipeOutcome::SnapBack
        };
        self.scroll_x = 0.0;
        self.settle_deadline = None;
        outcome
    }

    /// Pending horizontal offset accumulated so far.
    pub fn scroll_x(&self) -> f64 {
        self.scroll_x
    }

    /// Records a card as popped so it renders off-stage from now on.
    pub fn mark_popped(&mut self, card_uuid: CardId) {
        self.popped.insert(card_uuid);
    }

    pub fn is_popped(&self, card_uuid: CardId) -> bool {
        self.popped.contains(&card_uuid)
    }

    /// Render offset for one card.
    ///
    /// Popped cards sit at the fixed off-stage offset. The topmost card
    /// follows the gesture: rightward drag is damped logarithmically to
    /// bound the rubber-band, leftward drag tracks the raw offset. Cards
    /// beneath the topmost do not move horizontally.
    pub fn card_offset_x(&self, card_uuid: CardId, topmost: bool) -> f64 {
        if self.popped.contains(&card_uuid) {
            return self.config.offstage_offset;
        }
        if !topmost {
            return 0.0;
        }
        if self.scroll_x > 0.0 {
            10.0 * (self.scroll_x + 1.0).log10()
        } else {
            self.scroll_x
        }
    }

    /// Clears gesture state; popped markers survive so exit animations
    /// keep their target.
    pub fn reset(&mut self) {
        self.scroll_x = 0.0;
        self.settle_deadline = None;
    }

    pub fn config(&self) -> &SwipeConfig {
        &self.config
    }
}

impl Default for SwipeTracker {
    fn default() -> Self {
        Self::new(SwipeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::{DragSample, SwipeConfig, SwipeOutcome, SwipeTracker};
    use std::time::{Duration, Instant};
    use uuid::Uuid;

    fn drag(delta_x: f64, touches_active: bool) -> DragSample {
        DragSample {
            delta_x,
            delta_y: 0.0,
            touches_active,
        }
    }

    #[test]
    fn lift_past_threshold_pops_immediately() {
        let mut tracker = SwipeTracker::default();
        let now = Instant::now();

        assert_eq!(tracker.process(&drag(-150.0, true), now), None);
        assert_eq!(
            tracker.process(&drag(-100.0, false), now),
            Some(SwipeOutcome::Pop)
        );
        assert_eq!(tracker.scroll_x(), 0.0);
    }

    #[test]
    fn idle_settle_resolves_short_drag_to_snap_back() {
        let mut tracker = SwipeTracker::default();
        let start = Instant::now();

        assert_eq!(tracker.process(&drag(-100.0, false), start), None);
        assert_eq!(tracker.poll(start + Duration::from_millis(50)), None);
        assert_eq!(
            tracker.poll(start + Duration::from_millis(120)),
            Some(SwipeOutcome::SnapBack)
        );
        assert_eq!(tracker.scroll_x(), 0.0);
    }

    #[test]
    fn newer_sample_replaces_the_settle_deadline() {
        let mut tracker = SwipeTracker::default();
        let start = Instant::now();

        tracker.process(&drag(-100.0, true), start);
        tracker.process(&drag(-130.0, true), start + Duration::from_millis(90));
        // The first deadline would have fired here; it must not.
        assert_eq!(tracker.poll(start + Duration::from_millis(110)), None);
        assert_eq!(
            tracker.poll(start + Duration::from_millis(200)),
            Some(SwipeOutcome::Pop)
        );
    }

    #[test]
    fn vertical_samples_are_ignored() {
        let mut tracker = SwipeTracker::default();
        let now = Instant::now();

        let vertical = DragSample {
            delta_x: -30.0,
            delta_y: 80.0,
            touches_active: true,
        };
        assert_eq!(tracker.process(&vertical, now), None);
        assert_eq!(tracker.scroll_x(), 0.0);
        assert_eq!(tracker.poll(now + Duration::from_millis(500)), None);
    }

    #[test]
    fn rightward_offset_is_log_damped_and_popped_cards_sit_offstage() {
        let mut tracker = SwipeTracker::default();
        let now = Instant::now();
        let card = Uuid::new_v4();

        tracker.process(&drag(99.0, true), now);
        let damped = tracker.card_offset_x(card, true);
        assert!((damped - 20.0).abs() < 1e-9, "10*log10(100) = 20");
        assert_eq!(tracker.card_offset_x(card, false), 0.0);

        tracker.mark_popped(card);
        tracker.process(&drag(-40.0, true), now);
        assert_eq!(
            tracker.card_offset_x(card, true),
            tracker.config().offstage_offset
        );
    }
}
