//! Conversation transcript for the tutor chat core.
//!
//! The transcript is an ordered, append-only-by-default sequence of entries.
//! Entries are addressed by their turn identity and mutated only in place:
//! patching a slot never moves an entry, and no entry is ever removed. The
//! correlation engine holds turn identities, never entries — all mutation
//! funnels through [`Transcript::append`] and [`Transcript::patch_slot`].
//!
//! Because enrichment tasks complete on arbitrary runtime threads, the
//! backing state lives behind a single `RwLock`: an insertion-ordered list
//! for rendering plus a turn-to-position index for O(1) patch lookup.

#![deny(unsafe_code)]

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel occupying the feedback slot until the feedback merge lands.
pub const FEEDBACK_PLACEHOLDER: &str = "...";

/// Slot index of the feedback annotation on an incoming entry.
pub const FEEDBACK_SLOT: usize = 1;

/// Correlation key tying an incoming entry to its eventual feedback patch.
///
/// Identities are minted by the engine from a monotonic counter, so they are
/// unique for the life of the session and ordered by turn creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TurnId(pub u64);

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

/// Which side of the conversation an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    /// A message the user sent, carrying a feedback slot.
    Incoming,
    /// A generated reply, created fully formed and never patched.
    Outgoing,
}

/// One unit of conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Turn identity shared by an incoming entry and its reply.
    pub turn: TurnId,
    /// Sender side of the entry.
    pub origin: Origin,
    /// Ordered text slots. Incoming entries hold the literal user text at
    /// slot 0 and the feedback annotation at slot 1; outgoing entries hold
    /// only the reply text.
    pub slots: Vec<String>,
    /// When the entry was appended.
    pub created_at: DateTime<Utc>,
}

impl Entry {
    /// Create an incoming entry with the feedback slot still pending.
    ///
    /// The user text is stored verbatim — no trimming, internal whitespace
    /// preserved.
    pub fn incoming(turn: TurnId, text: impl Into<String>) -> Self {
        Self {
            turn,
            origin: Origin::Incoming,
            slots: vec![text.into(), FEEDBACK_PLACEHOLDER.to_string()],
            created_at: Utc::now(),
        }
    }

    /// Create a terminal outgoing entry holding a generated reply.
    pub fn outgoing(turn: TurnId, reply: impl Into<String>) -> Self {
        Self {
            turn,
            origin: Origin::Outgoing,
            slots: vec![reply.into()],
            created_at: Utc::now(),
        }
    }

    /// Primary text of the entry (user message or reply).
    pub fn text(&self) -> &str {
        self.slots.first().map(String::as_str).unwrap_or("")
    }

    /// Feedback annotation, if this entry carries one.
    pub fn feedback(&self) -> Option<&str> {
        self.slots.get(FEEDBACK_SLOT).map(String::as_str)
    }

    /// Whether the feedback slot still holds the placeholder sentinel.
    pub fn feedback_pending(&self) -> bool {
        self.feedback() == Some(FEEDBACK_PLACEHOLDER)
    }
}

/// Transcript errors.
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("transcript lock poisoned")]
    Lock,
}

#[derive(Debug, Default)]
struct TranscriptState {
    entries: Vec<Entry>,
    /// Position of the first entry appended for each identity. The incoming
    /// entry is appended before its reply, so patches resolve to it even
    /// when the reply landed first.
    index: HashMap<TurnId, usize>,
}

/// Ordered collection of [`Entry`] values with identity-addressed patching.
#[derive(Debug, Default)]
pub struct Transcript {
    state: RwLock<TranscriptState>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry at the tail.
    pub fn append(&self, entry: Entry) -> Result<(), TranscriptError> {
        let mut state = self.state.write().map_err(|_| TranscriptError::Lock)?;
        let position = state.entries.len();
        state.index.entry(entry.turn).or_insert(position);
        state.entries.push(entry);
        Ok(())
    }

    /// Position of the first-appended entry with the given identity.
    pub fn find(&self, turn: TurnId) -> Result<Option<usize>, TranscriptError> {
        let state = self.state.read().map_err(|_| TranscriptError::Lock)?;
        Ok(state.index.get(&turn).copied())
    }

    /// Replace one slot of the entry with the given identity, in place.
    ///
    /// Returns `true` when the patch was applied. A patch addressing an
    /// identity not present in the transcript, or a slot the entry does not
    /// have, is silently dropped and reports `false` — the caller treats
    /// this as a no-op, not an error.
    pub fn patch_slot(
        &self,
        turn: TurnId,
        slot: usize,
        value: impl Into<String>,
    ) -> Result<bool, TranscriptError> {
        let mut state = self.state.write().map_err(|_| TranscriptError::Lock)?;
        let Some(position) = state.index.get(&turn).copied() else {
            return Ok(false);
        };
        let Some(entry) = state.entries.get_mut(position) else {
            return Ok(false);
        };
        let Some(existing) = entry.slots.get_mut(slot) else {
            return Ok(false);
        };
        *existing = value.into();
        Ok(true)
    }

    /// Snapshot of the ordered entries for the render boundary.
    ///
    /// A snapshot taken concurrently with a patch sees either the old or the
    /// fully-updated entry, never a half-written one.
    pub fn snapshot(&self) -> Result<Vec<Entry>, TranscriptError> {
        let state = self.state.read().map_err(|_| TranscriptError::Lock)?;
        Ok(state.entries.clone())
    }

    pub fn len(&self) -> Result<usize, TranscriptError> {
        let state = self.state.read().map_err(|_| TranscriptError::Lock)?;
        Ok(state.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, TranscriptError> {
        Ok(self.len()? == 0)
    }
}
