//! Gesture-to-navigation orchestration.
//!
//! # Responsibility
//! - Route raw pressure/drag samples into the curve, swipe and feedback
//!   components, one gesture state per visible group.
//! - Apply terminal gesture outcomes to the stack model and surface the
//!   resulting feedback, render and storage information to the UI layer.
//!
//! # Invariants
//! - All gesture state is keyed by group id in a map owned here; there is
//!   no global mutable state.
//! - Model mutations go through [`StackService`] and its commit
//!   discipline; a storage failure is reported in the returned update,
//!   never raised mid-gesture.
//! - Gesture state for groups that left the model is discarded.

use crate::engine::curve::{travel, PressTick, Travel};
use crate::engine::feedback::{FeedbackDispatcher, FeedbackEvent};
use crate::engine::projection::CardRender;
use crate::engine::swipe::{DragSample, SwipeConfig, SwipeOutcome, SwipeTracker};
use crate::model::card::{Card, CardId, Group, GroupId};
use crate::repo::stack_repo::StackRepository;
use crate::service::stack_service::{StackError, StackService};
use log::{info, warn};
use std::collections::HashMap;
use std::time::Instant;

/// One pressure sample from the input source.
#[derive(Debug, Clone, Copy)]
pub struct PressureSample {
    /// Continuous pressure in `[0, 1]`.
    pub pressure: f64,
    /// Discrete hardware press depth.
    pub stage_tick: PressTick,
}

/// What one engine step produced, pulled by the hosting UI.
#[derive(Debug, Default)]
pub struct EngineUpdate {
    /// Feedback events for the haptic collaborator, in emission order.
    pub feedback: Vec<FeedbackEvent>,
    /// Swipe resolution, when this step resolved one.
    pub outcome: Option<SwipeOutcome>,
    /// Card removed by a resolved pop, for the exit animation.
    pub popped_card: Option<CardId>,
    /// Deep press accepted: the UI should open the insert affordance.
    pub insert_requested: bool,
    /// A durable commit failed after the in-memory mutation (recoverable;
    /// `reload` reconciles).
    pub storage_failure: Option<String>,
}

#[derive(Debug, Default)]
struct GroupGesture {
    travel: Travel,
    swipe: SwipeTracker,
    feedback: FeedbackDispatcher,
}

/// Engine facade owned by the hosting panel.
pub struct NavigationController<R: StackRepository> {
    stacks: StackService<R>,
    gestures: HashMap<GroupId, GroupGesture>,
    swipe_config: SwipeConfig,
}

impl<R: StackRepository> NavigationController<R> {
    pub fn new(stacks: StackService<R>) -> Self {
        Self::with_swipe_config(stacks, SwipeConfig::default())
    }

    pub fn with_swipe_config(stacks: StackService<R>, swipe_config: SwipeConfig) -> Self {
        Self {
            stacks,
            gestures: HashMap::new(),
            swipe_config,
        }
    }

    /// Read access to the authoritative stack state.
    pub fn stacks(&self) -> &StackService<R> {
        &self.stacks
    }

    /// Groups in display order, for the panel list.
    pub fn groups(&self) -> &[Group] {
        self.stacks.groups()
    }

    /// Feeds one pressure sample for a visible group.
    pub fn pressure_sample(&mut self, group_uuid: GroupId, sample: PressureSample) -> EngineUpdate {
        let mut update = EngineUpdate::default();
        let Some(group) = self.stacks.group(group_uuid) else {
            return update;
        };
        let card_count = group.card_count();
        let insert_allowed = !group.is_at_capacity();

        let gesture = self
            .gestures
            .entry(group_uuid)
            .or_insert_with(|| gesture_state(&self.swipe_config));

        gesture.travel = travel(sample.pressure, card_count);
        if let Some(event) = gesture.feedback.on_stage(gesture.travel.stage, card_count) {
            update.feedback.push(event);
        }

        if let Some(event) = gesture
            .feedback
            .on_press_tick(sample.stage_tick, insert_allowed)
        {
            if insert_allowed {
                update.insert_requested = true;
            } else {
                info!(
                    "event=engine_insert_rejected module=engine status=rejected group={group_uuid} count={card_count}"
                );
            }
            update.feedback.push(event);
        }

        update
    }

    /// Feeds one horizontal drag sample for a visible group.
    pub fn drag_sample(
        &mut self,
        group_uuid: GroupId,
        sample: DragSample,
        now: Instant,
    ) -> EngineUpdate {
        let mut update = EngineUpdate::default();
        if self.stacks.group(group_uuid).is_none() {
            return update;
        }

        let gesture = self
            .gestures
            .entry(group_uuid)
            .or_insert_with(|| gesture_state(&self.swipe_config));
        let outcome = gesture.swipe.process(&sample, now);
        self.apply_outcome(group_uuid, outcome, &mut update);
        update
    }

    /// Polls idle-settle deadlines for every tracked group.
    ///
    /// Call periodically from the panel's frame or timer tick.
    pub fn tick(&mut self, now: Instant) -> Vec<(GroupId, EngineUpdate)> {
        let due: Vec<(GroupId, Option<SwipeOutcome>)> = self
            .gestures
            .iter_mut()
            .map(|(group_uuid, gesture)| (*group_uuid, gesture.swipe.poll(now)))
            .filter(|(_, outcome)| outcome.is_some())
            .collect();

        due.into_iter()
            .map(|(group_uuid, outcome)| {
                let mut update = EngineUpdate::default();
                self.apply_outcome(group_uuid, outcome, &mut update);
                (group_uuid, update)
            })
            .collect()
    }

    /// Render parameters for a group's cards, display-ordered.
    pub fn render_cards(&self, group_uuid: GroupId) -> Vec<CardRender> {
        let Some(group) = self.stacks.group(group_uuid) else {
            return Vec::new();
        };
        let gesture = self.gestures.get(&group_uuid);
        let position = gesture.map_or(0.0, |gesture| gesture.travel.position);

        group
            .cards()
            .iter()
            .enumerate()
            .map(|(index, card)| {
                let mut render = CardRender::at(position, index);
                if let Some(gesture) = gesture {
                    render.offset_x = gesture.swipe.card_offset_x(card.uuid, index == 0);
                }
                render.pinned_highlight = group.pinned && index == 0;
                render
            })
            .collect()
    }

    /// Off-stage offset for a card that was popped and is animating out.
    pub fn popped_card_offset_x(&self, group_uuid: GroupId, card_uuid: CardId) -> Option<f64> {
        let gesture = self.gestures.get(&group_uuid)?;
        gesture
            .swipe
            .is_popped(card_uuid)
            .then(|| gesture.swipe.config().offstage_offset)
    }

    /// Creates a group with its first card.
    pub fn add_group(&mut self, text: impl Into<String>) -> Result<GroupId, StackError> {
        self.stacks.add_group(text)
    }

    /// Inserts a card, as submitted through the deep-press affordance or
    /// the explicit command. Capacity rejection surfaces as an error here;
    /// the haptic pattern already played on the deep-press transition.
    pub fn request_insert(
        &mut self,
        group_uuid: GroupId,
        text: impl Into<String>,
    ) -> Result<CardId, StackError> {
        self.stacks.append(group_uuid, text)
    }

    /// Pops the newest card via the explicit command.
    pub fn request_pop(&mut self, group_uuid: GroupId) -> Result<Option<Card>, StackError> {
        let removed = self.stacks.pop_newest(group_uuid);
        self.discard_stale_gestures();
        removed
    }

    /// Deletes a group and all of its cards.
    pub fn request_delete_all(&mut self, group_uuid: GroupId) -> Result<(), StackError> {
        let result = self.stacks.delete_group(group_uuid);
        self.discard_stale_gestures();
        result
    }

    /// Toggles a group's pin; returns the new pin state.
    pub fn request_pin_toggle(&mut self, group_uuid: GroupId) -> Result<bool, StackError> {
        let pinned = self
            .stacks
            .group(group_uuid)
            .ok_or(StackError::GroupNotFound(group_uuid))?
            .pinned;
        self.stacks.set_pinned(group_uuid, !pinned)?;
        Ok(!pinned)
    }

    /// Renames a group.
    pub fn request_rename(
        &mut self,
        group_uuid: GroupId,
        name: impl Into<String>,
    ) -> Result<(), StackError> {
        self.stacks.rename_group(group_uuid, name)
    }

    /// Re-reads storage, e.g. after a surfaced commit failure.
    pub fn reload(&mut self) -> Result<(), StackError> {
        self.stacks.reload()?;
        self.discard_stale_gestures();
        Ok(())
    }

    fn apply_outcome(
        &mut self,
        group_uuid: GroupId,
        outcome: Option<SwipeOutcome>,
        update: &mut EngineUpdate,
    ) {
        update.outcome = outcome;
        if outcome != Some(SwipeOutcome::Pop) {
            return;
        }

        let newest = self
            .stacks
            .group(group_uuid)
            .and_then(|group| group.newest_card())
            .map(|card| card.uuid);
        if let (Some(card_uuid), Some(gesture)) = (newest, self.gestures.get_mut(&group_uuid)) {
            gesture.swipe.mark_popped(card_uuid);
        }

        match self.stacks.pop_newest(group_uuid) {
            Ok(removed) => {
                update.popped_card = removed.map(|card| card.uuid);
                info!(
                    "event=engine_pop module=engine status=ok group={group_uuid} card={:?}",
                    update.popped_card
                );
            }
            Err(StackError::Storage(err)) => {
                // Memory already popped; the exit animation proceeds and
                // the failure surfaces for the UI to report.
                update.popped_card = newest;
                update.storage_failure = Some(err.to_string());
            }
            Err(err) => {
                warn!("event=engine_pop module=engine status=error group={group_uuid} error={err}");
            }
        }

        self.discard_stale_gestures();
    }

    /// Drops gesture state for groups no longer in the model.
    fn discard_stale_gestures(&mut self) {
        let stacks = &self.stacks;
        self.gestures
            .retain(|group_uuid, _| stacks.group(*group_uuid).is_some());
    }
}

fn gesture_state(swipe_config: &SwipeConfig) -> GroupGesture {
    GroupGesture {
        travel: Travel::ZERO,
        swipe: SwipeTracker::new(swipe_config.clone()),
        feedback: FeedbackDispatcher::new(),
    }
}
