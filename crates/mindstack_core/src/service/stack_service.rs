//! Stack model use-case service.
//!
//! # Responsibility
//! - Own the authoritative in-memory group/card collection.
//! - Apply mutations optimistically, then commit through the repository.
//! - Enforce capacity, pin exclusivity and empty-group deletion rules
//!   above the storage layer.
//!
//! # Invariants
//! - `groups()` is always display-ordered (pinned first, then recency).
//! - At most one group is pinned at any observable point.
//! - No group with zero cards survives a completed operation.
//! - A failed commit keeps the in-memory mutation (at-least-once);
//!   [`StackService::reload`] reconciles from storage on demand.

use crate::model::card::{
    sort_groups_for_display, Card, CardId, CardValidationError, Group, GroupId, CARD_CAP,
};
use crate::repo::stack_repo::{RepoError, StackRepository};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from stack model operations.
#[derive(Debug)]
pub enum StackError {
    /// Append attempted on a group already holding [`CARD_CAP`] cards.
    CapacityExceeded { group_uuid: GroupId, cap: usize },
    /// Target group is not part of the in-memory model.
    GroupNotFound(GroupId),
    /// Card/group creation input was invalid.
    Validation(CardValidationError),
    /// Durable commit failed after the in-memory mutation was applied.
    Storage(RepoError),
}

impl Display for StackError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CapacityExceeded { group_uuid, cap } => {
                write!(f, "group {group_uuid} already holds {cap} cards")
            }
            Self::GroupNotFound(id) => write!(f, "group not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "storage commit failed: {err}"),
        }
    }
}

impl Error for StackError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CardValidationError> for StackError {
    fn from(value: CardValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Use-case facade over the in-memory stack model and its repository.
pub struct StackService<R: StackRepository> {
    repo: R,
    groups: Vec<Group>,
}

impl<R: StackRepository> StackService<R> {
    /// Loads the persisted state and becomes the authoritative model.
    pub fn load(repo: R) -> Result<Self, StackError> {
        let groups = repo.load_groups().map_err(StackError::Storage)?;
        info!(
            "event=stack_load module=service status=ok groups={}",
            groups.len()
        );
        Ok(Self { repo, groups })
    }

    /// Groups in display order (pinned first, then recency).
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, group_uuid: GroupId) -> Option<&Group> {
        self.groups.iter().find(|group| group.uuid == group_uuid)
    }

    /// Whether an insert would be accepted for this group right now.
    pub fn can_append(&self, group_uuid: GroupId) -> bool {
        self.group(group_uuid)
            .is_some_and(|group| !group.is_at_capacity())
    }

    /// Creates a group together with its first card.
    pub fn add_group(&mut self, text: impl Into<String>) -> Result<GroupId, StackError> {
        let group = Group::new(text)?;
        let group_uuid = group.uuid;

        let commit = self.repo.create_group(&group);
        self.groups.push(group);
        sort_groups_for_display(&mut self.groups);

        self.finish_commit("stack_add_group", group_uuid, commit)?;
        Ok(group_uuid)
    }

    /// Appends one card; rejected without mutation at the capacity cap.
    pub fn append(&mut self, group_uuid: GroupId, text: impl Into<String>) -> Result<CardId, StackError> {
        let group = self
            .groups
            .iter_mut()
            .find(|group| group.uuid == group_uuid)
            .ok_or(StackError::GroupNotFound(group_uuid))?;

        if group.is_at_capacity() {
            warn!(
                "event=stack_append module=service status=rejected error_code=capacity_exceeded group={group_uuid} count={}",
                group.card_count()
            );
            return Err(StackError::CapacityExceeded {
                group_uuid,
                cap: CARD_CAP,
            });
        }

        let card = Card::new(text, group.next_seq())?;
        let card_uuid = card.uuid;
        group.push_card(card.clone());
        sort_groups_for_display(&mut self.groups);

        let commit = self.repo.append_card(group_uuid, &card);
        self.finish_commit("stack_append", group_uuid, commit)?;
        Ok(card_uuid)
    }

    /// Removes the newest card; deletes the group in the same operation
    /// when it became empty. Returns the removed card.
    pub fn pop_newest(&mut self, group_uuid: GroupId) -> Result<Option<Card>, StackError> {
        let index = self
            .groups
            .iter()
            .position(|group| group.uuid == group_uuid)
            .ok_or(StackError::GroupNotFound(group_uuid))?;

        let removed = self.groups[index].remove_newest();
        if self.groups[index].is_empty() {
            self.groups.remove(index);
        }
        sort_groups_for_display(&mut self.groups);

        let commit = self.repo.pop_newest(group_uuid).map(|_| ());
        self.finish_commit("stack_pop", group_uuid, commit)?;
        Ok(removed)
    }

    /// Deletes a group and all cards it owns.
    pub fn delete_group(&mut self, group_uuid: GroupId) -> Result<(), StackError> {
        let index = self
            .groups
            .iter()
            .position(|group| group.uuid == group_uuid)
            .ok_or(StackError::GroupNotFound(group_uuid))?;
        self.groups.remove(index);

        let commit = self.repo.delete_group(group_uuid);
        self.finish_commit("stack_delete_group", group_uuid, commit)
    }

    /// Sets or clears a group's pin. Setting clears every other pin before
    /// any caller can observe the collection again.
    pub fn set_pinned(&mut self, group_uuid: GroupId, pinned: bool) -> Result<(), StackError> {
        if self.group(group_uuid).is_none() {
            return Err(StackError::GroupNotFound(group_uuid));
        }

        for group in &mut self.groups {
            if group.uuid == group_uuid {
                group.pinned = pinned;
            } else if pinned {
                group.pinned = false;
            }
        }
        sort_groups_for_display(&mut self.groups);

        let commit = self.repo.set_pinned(group_uuid, pinned);
        self.finish_commit("stack_set_pinned", group_uuid, commit)
    }

    /// Renames a group; empty input clears the name.
    pub fn rename_group(
        &mut self,
        group_uuid: GroupId,
        name: impl Into<String>,
    ) -> Result<(), StackError> {
        let name = name.into();
        let group = self
            .groups
            .iter_mut()
            .find(|group| group.uuid == group_uuid)
            .ok_or(StackError::GroupNotFound(group_uuid))?;
        group.name = name.trim().to_string();

        let name = group.name.clone();
        let commit = self.repo.rename_group(group_uuid, &name);
        self.finish_commit("stack_rename_group", group_uuid, commit)
    }

    /// Re-reads storage, replacing the in-memory model.
    ///
    /// Reconciliation path after a surfaced commit failure.
    pub fn reload(&mut self) -> Result<(), StackError> {
        self.groups = self.repo.load_groups().map_err(StackError::Storage)?;
        info!(
            "event=stack_reload module=service status=ok groups={}",
            self.groups.len()
        );
        Ok(())
    }

    fn finish_commit(
        &self,
        event: &str,
        group_uuid: GroupId,
        commit: Result<(), RepoError>,
    ) -> Result<(), StackError> {
        match commit {
            Ok(()) => {
                info!("event={event} module=service status=ok group={group_uuid}");
                Ok(())
            }
            Err(err) => {
                // In-memory state intentionally keeps the mutation; callers
                // may reload() to reconcile with storage.
                warn!(
                    "event={event} module=service status=error error_code=storage_commit_failed group={group_uuid} error={err}"
                );
                Err(StackError::Storage(err))
            }
        }
    }
}
