//! Follow entity - One follow the bot placed on another account.
//!
//! `actor_id` is the bot account and `target_id` the account being followed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Follow database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "follows")]
pub struct Model {
    /// Store-assigned identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Bot account that placed the follow
    pub actor_id: i64,
    /// Display name of the actor
    pub actor_name: String,
    /// Account being followed
    pub target_id: i64,
    /// Free-form status tag
    pub status: String,
    /// When the follow was placed
    pub follow_date: DateTimeUtc,
    /// When the account was unfollowed, NULL while still active
    pub unfollow_date: Option<DateTimeUtc>,
    /// Last time this row was written
    pub last_action: DateTimeUtc,
}

/// `Follow` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
