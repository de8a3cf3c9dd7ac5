//! Shared record plumbing for the favorite and follow trackers.
//!
//! Both trackers persist through the same two rules: insert-or-update is decided by
//! whether a record already carries a store identity ([`Tracked`]), and a reversal
//! timestamp is an `Option` that maps to a nullable column. Everything here is
//! storage-agnostic; the SQL lives in the tracker modules.

use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which kind of action a record tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// A favorite placed on a content item, reversed by an unfavorite
    Favorite,
    /// A follow placed on an account, reversed by an unfollow
    Follow,
}

impl ActionKind {
    /// Lower-case name used in logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Favorite => "favorite",
            Self::Follow => "follow",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common view over an action that can later be reversed.
pub trait ActionRecord {
    /// The kind of action this record tracks
    const KIND: ActionKind;

    /// When the action was taken
    fn acted_at(&self) -> DateTime<Utc>;

    /// When the action was reversed, `None` while still active
    fn reversed_at(&self) -> Option<DateTime<Utc>>;

    /// Records the reversal instant
    fn set_reversed_at(&mut self, at: DateTime<Utc>);

    /// Last time the record was written
    fn last_action(&self) -> DateTime<Utc>;

    /// Overwrites the bookkeeping timestamp
    fn set_last_action(&mut self, at: DateTime<Utc>);

    /// Whether the action has not been reversed yet
    fn is_active(&self) -> bool {
        self.reversed_at().is_none()
    }
}

/// Rejects a record whose reversal precedes the action itself.
pub fn ensure_reversal_order<R: ActionRecord>(record: &R) -> Result<()> {
    ensure_action_precedes(R::KIND, record.acted_at(), record.reversed_at())
}

/// Rejects an action date that falls after a known reversal.
pub fn ensure_action_precedes(
    kind: ActionKind,
    acted_at: DateTime<Utc>,
    reversed_at: Option<DateTime<Utc>>,
) -> Result<()> {
    match reversed_at {
        Some(reversed_at) if reversed_at < acted_at => Err(Error::ReversalBeforeAction {
            kind,
            acted_at,
            reversed_at,
        }),
        _ => Ok(()),
    }
}

/// A record together with the identity the store assigned to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Saved<T> {
    /// Store-assigned identity, immutable once issued
    pub id: i64,
    /// The persisted fields
    pub record: T,
}

impl<T: ActionRecord> Saved<T> {
    /// Marks the action as reversed at `at` and touches the record.
    ///
    /// The change only reaches the store once the value is persisted again.
    pub fn reverse(&mut self, at: DateTime<Utc>) {
        self.record.set_reversed_at(at);
        self.record.set_last_action(at);
    }

    /// Refreshes the bookkeeping timestamp without changing the action state.
    ///
    /// Callers that fail to reverse a due record touch it so the next batch
    /// moves on to other candidates.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.record.set_last_action(at);
    }
}

/// Upsert state of a record: new, or already stored under an identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tracked<T> {
    /// Never persisted; persisting it inserts a new row
    Unsaved(T),
    /// Already persisted; persisting it updates the row with this identity
    Saved(Saved<T>),
}

impl<T> Tracked<T> {
    /// Identity of the record, if it has one.
    #[must_use]
    pub const fn id(&self) -> Option<i64> {
        match self {
            Self::Unsaved(_) => None,
            Self::Saved(saved) => Some(saved.id),
        }
    }

    /// The record fields regardless of upsert state.
    #[must_use]
    pub const fn record(&self) -> &T {
        match self {
            Self::Unsaved(record) => record,
            Self::Saved(saved) => &saved.record,
        }
    }
}

impl<T> From<Saved<T>> for Tracked<T> {
    fn from(saved: Saved<T>) -> Self {
        Self::Saved(saved)
    }
}

/// Outcome of a duplicate check before taking an action.
///
/// Nothing locks the subject between the check and a later insert, so two
/// concurrent callers can both see [`DuplicateCheck::Absent`] and both record the
/// action. Callers get at-least-once semantics per subject.
#[derive(Debug)]
pub enum DuplicateCheck {
    /// No record exists for the subject
    Absent,
    /// At least one record exists for the subject
    Present,
    /// The store could not answer; treated as present
    Undetermined(Error),
}

impl DuplicateCheck {
    pub(crate) fn from_lookup(lookup: Result<bool>) -> Self {
        match lookup {
            Ok(true) => Self::Present,
            Ok(false) => Self::Absent,
            Err(err) => Self::Undetermined(err),
        }
    }

    /// Whether the caller should skip the action.
    ///
    /// An undetermined check counts as a duplicate: skipping an action is
    /// preferred over performing it twice.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// Converts into the plain answer, surfacing the store error if there was one.
    pub fn into_result(self) -> Result<bool> {
        match self {
            Self::Absent => Ok(false),
            Self::Present => Ok(true),
            Self::Undetermined(err) => Err(err),
        }
    }
}
