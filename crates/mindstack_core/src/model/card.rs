//! Card and Group domain model.
//!
//! # Responsibility
//! - Define the canonical records for card stacks ("mind stacks").
//! - Own display ordering and the per-group card capacity rule.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another card or group.
//! - Cards are kept in display order: `created_at` descending, ties broken
//!   by `seq` ascending (insertion order).
//! - A group holds at most [`CARD_CAP`] cards; `Group` itself never blocks
//!   an append, the service layer rejects it before mutation.
//! - A group with zero cards is a transient state only visible inside a
//!   pop operation; it must be deleted in the same operation.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for a card.
pub type CardId = Uuid;

/// Stable identifier for a group.
pub type GroupId = Uuid;

/// Maximum number of cards one group may hold.
pub const CARD_CAP: usize = 5;

/// Validation failure for card/group creation input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardValidationError {
    /// Card text is blank after trimming.
    BlankText,
}

impl Display for CardValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankText => write!(f, "card text must not be blank"),
        }
    }
}

impl Error for CardValidationError {}

/// One short text note. Content is immutable once created; a card only
/// ever leaves its group by deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Stable global ID.
    pub uuid: CardId,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
    /// Insertion order within the owning group; breaks timestamp ties.
    pub seq: u32,
    /// Note text.
    pub text: String,
}

impl Card {
    /// Creates a card stamped with the current wall-clock time.
    pub fn new(text: impl Into<String>, seq: u32) -> Result<Self, CardValidationError> {
        Self::with_id(Uuid::new_v4(), now_epoch_ms(), seq, text)
    }

    /// Creates a card with caller-provided identity and timestamp.
    ///
    /// Used by storage load paths and tests where identity already exists.
    pub fn with_id(
        uuid: CardId,
        created_at: i64,
        seq: u32,
        text: impl Into<String>,
    ) -> Result<Self, CardValidationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(CardValidationError::BlankText);
        }
        Ok(Self {
            uuid,
            created_at,
            seq,
            text,
        })
    }
}

/// An ordered stack of cards sharing pin and lifecycle state.
///
/// Owns its cards exclusively; deleting a group deletes every card in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Stable global ID.
    pub uuid: GroupId,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
    /// Optional display name; empty means unnamed.
    pub name: String,
    /// At most one group across the system may be pinned.
    pub pinned: bool,
    cards: Vec<Card>,
}

impl Group {
    /// Creates a group together with its first card.
    pub fn new(first_card_text: impl Into<String>) -> Result<Self, CardValidationError> {
        let card = Card::new(first_card_text, 0)?;
        Ok(Self {
            uuid: Uuid::new_v4(),
            created_at: card.created_at,
            name: String::new(),
            pinned: false,
            cards: vec![card],
        })
    }

    /// Rebuilds a group from already-persisted parts.
    ///
    /// Cards may arrive in any order; display order is restored here.
    pub fn with_parts(
        uuid: GroupId,
        created_at: i64,
        name: impl Into<String>,
        pinned: bool,
        mut cards: Vec<Card>,
    ) -> Self {
        sort_cards_for_display(&mut cards);
        Self {
            uuid,
            created_at,
            name: name.into(),
            pinned,
            cards,
        }
    }

    /// Cards in display order (newest first).
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    /// Whether an append would exceed [`CARD_CAP`].
    pub fn is_at_capacity(&self) -> bool {
        self.cards.len() >= CARD_CAP
    }

    /// Next insertion sequence number for a new card.
    pub fn next_seq(&self) -> u32 {
        self.cards
            .iter()
            .map(|card| card.seq + 1)
            .max()
            .unwrap_or(0)
    }

    /// The card a pop would remove (display-first).
    pub fn newest_card(&self) -> Option<&Card> {
        self.cards.first()
    }

    /// Stack title shown above multi-card groups: the oldest card's text.
    pub fn summary_text(&self) -> Option<&str> {
        if self.cards.len() > 1 {
            self.cards.last().map(|card| card.text.as_str())
        } else {
            None
        }
    }

    /// Timestamp of the most recent card, used for group display order.
    pub fn latest_activity(&self) -> i64 {
        self.cards
            .iter()
            .map(|card| card.created_at)
            .max()
            .unwrap_or(self.created_at)
    }

    /// Inserts a card preserving display order.
    pub fn push_card(&mut self, card: Card) {
        self.cards.push(card);
        sort_cards_for_display(&mut self.cards);
    }

    /// Removes and returns the newest card, if any.
    pub fn remove_newest(&mut self) -> Option<Card> {
        if self.cards.is_empty() {
            None
        } else {
            Some(self.cards.remove(0))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Sorts cards newest-first; equal timestamps fall back to insertion
/// order, the later insertion counting as newer (LIFO).
pub fn sort_cards_for_display(cards: &mut [Card]) {
    cards.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then(b.seq.cmp(&a.seq))
    });
}

/// Sorts groups for panel display: the pinned group first, then by most
/// recent card activity descending, group id as the final tie-break.
pub fn sort_groups_for_display(groups: &mut [Group]) {
    groups.sort_by(|a, b| {
        b.pinned
            .cmp(&a.pinned)
            .then(b.latest_activity().cmp(&a.latest_activity()))
            .then(a.uuid.cmp(&b.uuid))
    });
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
