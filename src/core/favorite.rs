//! Favorite tracking - Records favorites and finds the ones due for an unfavorite.
//!
//! A favorite is inserted once when the bot favorites a content item and updated
//! once more when it is undone. Rows with no `unfav_date` are "active"; active rows
//! older than a cutoff are "due" and are handed out least-recently-touched first,
//! so repeated polling eventually covers every eligible row even when earlier
//! batches could not be reversed.

use crate::{
    core::record::{
        ActionKind, ActionRecord, DuplicateCheck, Saved, Tracked, ensure_action_precedes,
        ensure_reversal_order,
    },
    entities::favorite,
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::NotSet, QueryOrder, QuerySelect, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

/// A favorite placed by the bot, as seen by callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    /// Account that placed the favorite
    pub actor_id: i64,
    /// Display name of the actor
    pub actor_name: String,
    /// Content item that was favorited
    pub subject_id: i64,
    /// Free-form status tag
    pub status: String,
    /// When the favorite was placed
    pub fav_date: DateTime<Utc>,
    /// When it was undone, `None` while active
    pub unfav_date: Option<DateTime<Utc>>,
    /// Last time the record was written
    pub last_action: DateTime<Utc>,
}

impl Favorite {
    /// Describes a favorite placed just now.
    #[must_use]
    pub fn new(
        actor_id: i64,
        actor_name: impl Into<String>,
        subject_id: i64,
        status: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            actor_id,
            actor_name: actor_name.into(),
            subject_id,
            status: status.into(),
            fav_date: now,
            unfav_date: None,
            last_action: now,
        }
    }
}

impl ActionRecord for Favorite {
    const KIND: ActionKind = ActionKind::Favorite;

    fn acted_at(&self) -> DateTime<Utc> {
        self.fav_date
    }

    fn reversed_at(&self) -> Option<DateTime<Utc>> {
        self.unfav_date
    }

    fn set_reversed_at(&mut self, at: DateTime<Utc>) {
        self.unfav_date = Some(at);
    }

    fn last_action(&self) -> DateTime<Utc> {
        self.last_action
    }

    fn set_last_action(&mut self, at: DateTime<Utc>) {
        self.last_action = at;
    }
}

impl From<favorite::Model> for Saved<Favorite> {
    fn from(model: favorite::Model) -> Self {
        Self {
            id: model.id,
            record: Favorite {
                actor_id: model.actor_id,
                actor_name: model.actor_name,
                subject_id: model.subject_id,
                status: model.status,
                fav_date: model.fav_date,
                unfav_date: model.unfav_date,
                last_action: model.last_action,
            },
        }
    }
}

/// Persists favorites and exposes the ones pending reversal.
///
/// Holds a clone of the shared connection pool; cloning the tracker is cheap.
#[derive(Clone, Debug)]
pub struct FavoriteTracker {
    db: Arc<DatabaseConnection>,
}

impl FavoriteTracker {
    /// Creates a tracker on top of an already initialised store.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Inserts a new favorite or updates an existing one.
    ///
    /// An `Unsaved` record is inserted with `last_action` set to now, whatever the
    /// caller supplied. A `Saved` record overwrites every mutable column of its row,
    /// including the caller's `last_action`. A stored `unfav_date` is never cleared:
    /// once reversed, a favorite stays reversed.
    ///
    /// Returns the row as stored after the write.
    ///
    /// # Errors
    /// * `Error::ReversalBeforeAction` if `unfav_date` precedes `fav_date`
    /// * `Error::RecordNotFound` if a `Saved` identity matches no row
    /// * `Error::Database` for any store failure
    #[instrument(skip(self, tracked), fields(id = tracked.id(), subject_id = tracked.record().subject_id))]
    pub async fn record_or_update(&self, tracked: Tracked<Favorite>) -> Result<Saved<Favorite>> {
        ensure_reversal_order(tracked.record())?;

        match tracked {
            Tracked::Unsaved(record) => {
                let row = favorite::ActiveModel {
                    actor_id: Set(record.actor_id),
                    actor_name: Set(record.actor_name),
                    subject_id: Set(record.subject_id),
                    status: Set(record.status),
                    fav_date: Set(record.fav_date),
                    unfav_date: Set(record.unfav_date),
                    last_action: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(self.db.as_ref())
                .await?;

                debug!(id = row.id, "Inserted favorite");
                Ok(row.into())
            }
            Tracked::Saved(Saved { id, record }) => {
                if record.unfav_date.is_none() {
                    // The stored reversal is kept, so the new action date must not pass it.
                    let stored = self.get(id).await?.ok_or(Error::RecordNotFound {
                        kind: ActionKind::Favorite,
                        id,
                    })?;
                    ensure_action_precedes(
                        ActionKind::Favorite,
                        record.fav_date,
                        stored.record.unfav_date,
                    )?;
                }

                let changes = favorite::ActiveModel {
                    actor_id: Set(record.actor_id),
                    actor_name: Set(record.actor_name),
                    subject_id: Set(record.subject_id),
                    status: Set(record.status),
                    fav_date: Set(record.fav_date),
                    unfav_date: record.unfav_date.map_or(NotSet, |at| Set(Some(at))),
                    last_action: Set(record.last_action),
                    ..Default::default()
                };

                let result = favorite::Entity::update_many()
                    .set(changes)
                    .filter(favorite::Column::Id.eq(id))
                    .exec(self.db.as_ref())
                    .await?;
                if result.rows_affected == 0 {
                    return Err(Error::RecordNotFound {
                        kind: ActionKind::Favorite,
                        id,
                    });
                }

                debug!(id, "Updated favorite");
                self.get(id).await?.ok_or(Error::RecordNotFound {
                    kind: ActionKind::Favorite,
                    id,
                })
            }
        }
    }

    /// Checks whether the bot already favorited `subject_id`, in any state.
    ///
    /// A failed lookup yields [`DuplicateCheck::Undetermined`], which still counts
    /// as a duplicate.
    #[instrument(skip(self))]
    pub async fn exists_for_subject(&self, subject_id: i64) -> DuplicateCheck {
        let lookup = favorite::Entity::find()
            .filter(favorite::Column::SubjectId.eq(subject_id))
            .one(self.db.as_ref())
            .await
            .map(|row| row.is_some())
            .map_err(Error::from);

        DuplicateCheck::from_lookup(lookup)
    }

    /// Finds up to `limit` active favorites placed at or before `cutoff`.
    ///
    /// Results are ordered by `last_action` ascending, ties broken by identity.
    /// A row that fails to map aborts the call and nothing is returned.
    #[instrument(skip(self))]
    pub async fn find_due(&self, cutoff: DateTime<Utc>, limit: u64) -> Result<Vec<Saved<Favorite>>> {
        let rows = favorite::Entity::find()
            .filter(favorite::Column::UnfavDate.is_null())
            .filter(favorite::Column::FavDate.lte(cutoff))
            .order_by_asc(favorite::Column::LastAction)
            .order_by_asc(favorite::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        debug!(count = rows.len(), "Fetched favorites due for unfavorite");
        Ok(rows.into_iter().map(Saved::from).collect())
    }

    /// Looks a favorite up by identity.
    pub async fn get(&self, id: i64) -> Result<Option<Saved<Favorite>>> {
        favorite::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map(|row| row.map(Saved::from))
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase, PaginatorTrait, Value};
    use std::collections::BTreeMap;

    async fn setup() -> Result<(Arc<DatabaseConnection>, FavoriteTracker)> {
        init_test_tracing();
        let db = Arc::new(setup_test_db().await?);
        let tracker = FavoriteTracker::new(Arc::clone(&db));
        Ok((db, tracker))
    }

    #[tokio::test]
    async fn test_insert_assigns_identity_and_refreshes_last_action() -> Result<()> {
        let (db, tracker) = setup().await?;

        let mut favorite = favorite_at(42, at_minute(0));
        favorite.last_action = DateTime::<Utc>::UNIX_EPOCH;

        let before = Utc::now();
        let saved = tracker.record_or_update(Tracked::Unsaved(favorite)).await?;

        assert!(saved.id > 0);
        assert!(saved.record.last_action >= before);
        assert_eq!(saved.record.subject_id, 42);
        assert_eq!(saved.record.fav_date, at_minute(0));
        assert_eq!(saved.record.unfav_date, None);
        assert_eq!(favorite::Entity::find().count(db.as_ref()).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_each_insert_creates_a_new_row() -> Result<()> {
        let (db, tracker) = setup().await?;

        let first = tracker
            .record_or_update(Tracked::Unsaved(favorite_at(1, at_minute(0))))
            .await?;
        let second = tracker
            .record_or_update(Tracked::Unsaved(favorite_at(1, at_minute(0))))
            .await?;

        assert_ne!(first.id, second.id);
        assert_eq!(favorite::Entity::find().count(db.as_ref()).await?, 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_mutates_existing_row_only() -> Result<()> {
        let (db, tracker) = setup().await?;

        let mut saved = tracker
            .record_or_update(Tracked::Unsaved(favorite_at(5, at_minute(0))))
            .await?;
        saved.record.status = "unfavorited".to_string();
        saved.reverse(at_minute(60));

        let updated = tracker.record_or_update(saved.clone().into()).await?;

        assert_eq!(updated, saved);
        assert_eq!(favorite::Entity::find().count(db.as_ref()).await?, 1);
        let stored = tracker.get(saved.id).await?.unwrap();
        assert_eq!(stored.record.status, "unfavorited");
        assert_eq!(stored.record.unfav_date, Some(at_minute(60)));
        assert_eq!(stored.record.last_action, at_minute(60));

        Ok(())
    }

    #[tokio::test]
    async fn test_update_of_unknown_identity_fails() -> Result<()> {
        let (db, tracker) = setup().await?;

        let result = tracker
            .record_or_update(Tracked::Saved(Saved {
                id: 999,
                record: favorite_at(5, at_minute(0)),
            }))
            .await;

        assert!(matches!(
            result.unwrap_err(),
            Error::RecordNotFound {
                kind: ActionKind::Favorite,
                id: 999
            }
        ));
        assert_eq!(favorite::Entity::find().count(db.as_ref()).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_reversal_before_action_is_rejected_without_writing() -> Result<()> {
        let (db, tracker) = setup().await?;

        let mut favorite = favorite_at(5, at_minute(10));
        favorite.unfav_date = Some(at_minute(9));
        let result = tracker.record_or_update(Tracked::Unsaved(favorite)).await;

        assert!(matches!(
            result.unwrap_err(),
            Error::ReversalBeforeAction { .. }
        ));
        assert_eq!(favorite::Entity::find().count(db.as_ref()).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_reversal_timestamp_round_trips() -> Result<()> {
        let (_db, tracker) = setup().await?;

        let instants = [
            DateTime::<Utc>::UNIX_EPOCH,
            Utc::now(),
            Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap(),
            Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap(),
        ];

        for instant in instants {
            let mut favorite = favorite_at(1, instant);
            favorite.unfav_date = Some(instant);
            let saved = tracker.record_or_update(Tracked::Unsaved(favorite)).await?;

            let stored = tracker.get(saved.id).await?.unwrap();
            assert_eq!(stored.record.fav_date, instant);
            assert_eq!(stored.record.unfav_date, Some(instant));
        }

        let saved = tracker
            .record_or_update(Tracked::Unsaved(favorite_at(2, at_minute(0))))
            .await?;
        let stored = tracker.get(saved.id).await?.unwrap();
        assert_eq!(stored.record.unfav_date, None);

        Ok(())
    }

    #[tokio::test]
    async fn test_find_due_filters_on_reversal_and_cutoff() -> Result<()> {
        let (_db, tracker) = setup().await?;
        let cutoff = at_minute(100);

        let due = tracker
            .record_or_update(Tracked::Unsaved(favorite_at(1, at_minute(10))))
            .await?;
        tracker
            .record_or_update(Tracked::Unsaved(favorite_at(2, at_minute(200))))
            .await?;
        let mut reversed = favorite_at(3, at_minute(10));
        reversed.unfav_date = Some(at_minute(20));
        tracker.record_or_update(Tracked::Unsaved(reversed)).await?;

        let found = tracker.find_due(cutoff, 10).await?;
        assert_eq!(found, vec![due]);

        Ok(())
    }

    #[tokio::test]
    async fn test_find_due_includes_action_exactly_at_cutoff() -> Result<()> {
        let (_db, tracker) = setup().await?;

        tracker
            .record_or_update(Tracked::Unsaved(favorite_at(1, at_minute(100))))
            .await?;

        assert_eq!(tracker.find_due(at_minute(100), 10).await?.len(), 1);
        assert!(tracker.find_due(at_minute(99), 10).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_find_due_orders_by_last_action() -> Result<()> {
        let (_db, tracker) = setup().await?;

        // Inserted in one order, touched in another.
        let touches = [at_minute(30), at_minute(10), at_minute(20)];
        for (subject_id, touched_at) in (1..).zip(touches) {
            let mut saved = tracker
                .record_or_update(Tracked::Unsaved(favorite_at(subject_id, at_minute(0))))
                .await?;
            saved.touch(touched_at);
            tracker.record_or_update(saved.into()).await?;
        }

        let found = tracker.find_due(at_minute(1), 10).await?;
        let subjects: Vec<i64> = found.iter().map(|f| f.record.subject_id).collect();
        assert_eq!(subjects, vec![2, 3, 1]);

        Ok(())
    }

    #[tokio::test]
    async fn test_find_due_respects_limit() -> Result<()> {
        let (_db, tracker) = setup().await?;

        for subject_id in 1..=5 {
            let mut saved = tracker
                .record_or_update(Tracked::Unsaved(favorite_at(subject_id, at_minute(0))))
                .await?;
            saved.touch(at_minute(100 - subject_id));
            tracker.record_or_update(saved.into()).await?;
        }

        let found = tracker.find_due(at_minute(1), 2).await?;
        let subjects: Vec<i64> = found.iter().map(|f| f.record.subject_id).collect();
        assert_eq!(subjects, vec![5, 4]);

        Ok(())
    }

    #[tokio::test]
    async fn test_find_due_empty_store() -> Result<()> {
        let (_db, tracker) = setup().await?;
        assert!(tracker.find_due(Utc::now(), 10).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_reversed_favorite_stays_reversed() -> Result<()> {
        let (_db, tracker) = setup().await?;

        let mut saved = tracker
            .record_or_update(Tracked::Unsaved(favorite_at(1, at_minute(0))))
            .await?;
        saved.reverse(at_minute(5));
        let mut reversed = tracker.record_or_update(saved.into()).await?;
        assert!(tracker.find_due(at_minute(10), 10).await?.is_empty());

        // Persisting with the reversal cleared must not resurrect the row.
        reversed.record.unfav_date = None;
        let stored = tracker.record_or_update(reversed.into()).await?;

        assert_eq!(stored.record.unfav_date, Some(at_minute(5)));
        assert!(tracker.find_due(at_minute(10), 10).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_update_cannot_move_action_past_stored_reversal() -> Result<()> {
        let (_db, tracker) = setup().await?;

        let mut saved = tracker
            .record_or_update(Tracked::Unsaved(favorite_at(1, at_minute(0))))
            .await?;
        saved.reverse(at_minute(5));
        let mut reversed = tracker.record_or_update(saved.into()).await?;

        reversed.record.unfav_date = None;
        reversed.record.fav_date = at_minute(100);
        let result = tracker.record_or_update(reversed.clone().into()).await;

        assert!(matches!(
            result.unwrap_err(),
            Error::ReversalBeforeAction {
                kind: ActionKind::Favorite,
                ..
            }
        ));
        let stored = tracker.get(reversed.id).await?.unwrap();
        assert_eq!(stored.record.fav_date, at_minute(0));
        assert_eq!(stored.record.unfav_date, Some(at_minute(5)));

        Ok(())
    }

    #[tokio::test]
    async fn test_exists_for_subject() -> Result<()> {
        let (_db, tracker) = setup().await?;

        assert!(matches!(
            tracker.exists_for_subject(77).await,
            DuplicateCheck::Absent
        ));

        let mut saved = tracker
            .record_or_update(Tracked::Unsaved(favorite_at(77, at_minute(0))))
            .await?;
        assert!(tracker.exists_for_subject(77).await.is_duplicate());
        assert!(!tracker.exists_for_subject(78).await.is_duplicate());

        // Reversal does not free the subject for another favorite.
        saved.reverse(at_minute(1));
        tracker.record_or_update(saved.into()).await?;
        assert!(tracker.exists_for_subject(77).await.into_result()?);

        Ok(())
    }

    #[tokio::test]
    async fn test_exists_for_subject_fails_safe() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_errors([DbErr::Custom("connection dropped".to_string())])
            .into_connection();
        let tracker = FavoriteTracker::new(Arc::new(db));

        let check = tracker.exists_for_subject(1).await;
        assert!(matches!(check, DuplicateCheck::Undetermined(_)));
        assert!(check.is_duplicate());
        assert!(matches!(check.into_result(), Err(Error::Database(_))));

        Ok(())
    }

    #[tokio::test]
    async fn test_find_due_malformed_row_aborts() -> Result<()> {
        let good = favorite::Model {
            id: 1,
            actor_id: 1,
            actor_name: "bot".to_string(),
            subject_id: 1,
            status: "liked".to_string(),
            fav_date: at_minute(0),
            unfav_date: None,
            last_action: at_minute(0),
        };
        let good_row: BTreeMap<&str, Value> = BTreeMap::from([
            ("id", good.id.into()),
            ("actor_id", good.actor_id.into()),
            ("actor_name", good.actor_name.clone().into()),
            ("subject_id", good.subject_id.into()),
            ("status", good.status.clone().into()),
            ("fav_date", good.fav_date.into()),
            ("unfav_date", good.unfav_date.into()),
            ("last_action", good.last_action.into()),
        ]);
        let malformed_row: BTreeMap<&str, Value> =
            BTreeMap::from([("id", 2_i64.into()), ("actor_id", "not a number".into())]);

        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([vec![good_row, malformed_row]])
            .into_connection();
        let tracker = FavoriteTracker::new(Arc::new(db));

        let result = tracker.find_due(at_minute(10), 10).await;
        assert!(matches!(result, Err(Error::Database(_))));

        Ok(())
    }
}
