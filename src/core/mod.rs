//! Action tracking - insert-or-update persistence for favorites and follows, plus
//! discovery of the ones now due for reversal.

/// Favorite records and their tracker
pub mod favorite;
/// Follow records and their tracker
pub mod follow;
/// Types shared by both trackers
pub mod record;

pub use favorite::{Favorite, FavoriteTracker};
pub use follow::{Follow, FollowTracker};
pub use record::{ActionKind, ActionRecord, DuplicateCheck, Saved, Tracked};
