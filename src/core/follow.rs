//! Follow tracking - Records follows and finds the ones due for an unfollow.
//!
//! Mirrors the favorite tracker. The duplicate check is keyed by the followed
//! account (`target_id`), never by the bot account that placed the follow.

use crate::{
    core::record::{
        ActionKind, ActionRecord, DuplicateCheck, Saved, Tracked, ensure_action_precedes,
        ensure_reversal_order,
    },
    entities::follow,
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::NotSet, QueryOrder, QuerySelect, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

/// A follow placed by the bot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    /// Bot account that placed the follow
    pub actor_id: i64,
    /// Display name of the actor
    pub actor_name: String,
    /// Account being followed
    pub target_id: i64,
    /// Free-form status tag
    pub status: String,
    /// When the follow was placed
    pub follow_date: DateTime<Utc>,
    /// When the account was unfollowed, `None` while active
    pub unfollow_date: Option<DateTime<Utc>>,
    /// Last time the record was written
    pub last_action: DateTime<Utc>,
}

impl Follow {
    /// Describes a follow placed just now.
    #[must_use]
    pub fn new(
        actor_id: i64,
        actor_name: impl Into<String>,
        target_id: i64,
        status: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            actor_id,
            actor_name: actor_name.into(),
            target_id,
            status: status.into(),
            follow_date: now,
            unfollow_date: None,
            last_action: now,
        }
    }
}

impl ActionRecord for Follow {
    const KIND: ActionKind = ActionKind::Follow;

    fn acted_at(&self) -> DateTime<Utc> {
        self.follow_date
    }

    fn reversed_at(&self) -> Option<DateTime<Utc>> {
        self.unfollow_date
    }

    fn set_reversed_at(&mut self, at: DateTime<Utc>) {
        self.unfollow_date = Some(at);
    }

    fn last_action(&self) -> DateTime<Utc> {
        self.last_action
    }

    fn set_last_action(&mut self, at: DateTime<Utc>) {
        self.last_action = at;
    }
}

impl From<follow::Model> for Saved<Follow> {
    fn from(model: follow::Model) -> Self {
        Self {
            id: model.id,
            record: Follow {
                actor_id: model.actor_id,
                actor_name: model.actor_name,
                target_id: model.target_id,
                status: model.status,
                follow_date: model.follow_date,
                unfollow_date: model.unfollow_date,
                last_action: model.last_action,
            },
        }
    }
}

/// Persists follows and exposes the ones pending an unfollow.
#[derive(Clone, Debug)]
pub struct FollowTracker {
    db: Arc<DatabaseConnection>,
}

impl FollowTracker {
    /// Creates a tracker on top of an already initialised store.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Inserts a new follow or updates an existing one.
    ///
    /// Same dispatch as the favorite tracker: inserts stamp `last_action` with now,
    /// updates write the caller's value, and a stored `unfollow_date` is never cleared.
    #[instrument(skip(self, tracked), fields(id = tracked.id(), target_id = tracked.record().target_id))]
    pub async fn record_or_update(&self, tracked: Tracked<Follow>) -> Result<Saved<Follow>> {
        ensure_reversal_order(tracked.record())?;

        match tracked {
            Tracked::Unsaved(record) => {
                let row = follow::ActiveModel {
                    actor_id: Set(record.actor_id),
                    actor_name: Set(record.actor_name),
                    target_id: Set(record.target_id),
                    status: Set(record.status),
                    follow_date: Set(record.follow_date),
                    unfollow_date: Set(record.unfollow_date),
                    last_action: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(self.db.as_ref())
                .await?;

                debug!(id = row.id, "Inserted follow");
                Ok(row.into())
            }
            Tracked::Saved(Saved { id, record }) => {
                if record.unfollow_date.is_none() {
                    // The stored reversal is kept, so the new action date must not pass it.
                    let stored = self.get(id).await?.ok_or(Error::RecordNotFound {
                        kind: ActionKind::Follow,
                        id,
                    })?;
                    ensure_action_precedes(
                        ActionKind::Follow,
                        record.follow_date,
                        stored.record.unfollow_date,
                    )?;
                }

                let changes = follow::ActiveModel {
                    actor_id: Set(record.actor_id),
                    actor_name: Set(record.actor_name),
                    target_id: Set(record.target_id),
                    status: Set(record.status),
                    follow_date: Set(record.follow_date),
                    unfollow_date: record.unfollow_date.map_or(NotSet, |at| Set(Some(at))),
                    last_action: Set(record.last_action),
                    ..Default::default()
                };

                let result = follow::Entity::update_many()
                    .set(changes)
                    .filter(follow::Column::Id.eq(id))
                    .exec(self.db.as_ref())
                    .await?;
                if result.rows_affected == 0 {
                    return Err(Error::RecordNotFound {
                        kind: ActionKind::Follow,
                        id,
                    });
                }

                debug!(id, "Updated follow");
                self.get(id).await?.ok_or(Error::RecordNotFound {
                    kind: ActionKind::Follow,
                    id,
                })
            }
        }
    }

    /// Checks whether the bot already followed `target_id`, in any state.
    ///
    /// See [`DuplicateCheck`] for the fail-safe on lookup errors and the
    /// check-then-insert race.
    #[instrument(skip(self))]
    pub async fn already_follow(&self, target_id: i64) -> DuplicateCheck {
        let lookup = follow::Entity::find()
            .filter(follow::Column::TargetId.eq(target_id))
            .one(self.db.as_ref())
            .await
            .map(|row| row.is_some())
            .map_err(Error::from);

        DuplicateCheck::from_lookup(lookup)
    }

    /// Finds up to `limit` active follows placed at or before `cutoff`,
    /// least-recently-touched first.
    #[instrument(skip(self))]
    pub async fn find_due(&self, cutoff: DateTime<Utc>, limit: u64) -> Result<Vec<Saved<Follow>>> {
        let rows = follow::Entity::find()
            .filter(follow::Column::UnfollowDate.is_null())
            .filter(follow::Column::FollowDate.lte(cutoff))
            .order_by_asc(follow::Column::LastAction)
            .order_by_asc(follow::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        debug!(count = rows.len(), "Fetched follows due for unfollow");
        Ok(rows.into_iter().map(Saved::from).collect())
    }

    /// Looks a follow up by identity.
    pub async fn get(&self, id: i64) -> Result<Option<Saved<Follow>>> {
        follow::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map(|row| row.map(Saved::from))
            .map_err(Into::into)
    }
}
