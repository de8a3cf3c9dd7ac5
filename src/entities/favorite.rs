//! Favorite entity - One favorite the bot placed on a content item.
//!
//! A row stays "active" while `unfav_date` is NULL. Once the favorite has been
//! undone the column holds the instant it happened and the row is never due again.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Favorite database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "favorites")]
pub struct Model {
    /// Store-assigned identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Account that placed the favorite
    pub actor_id: i64,
    /// Display name of the actor, denormalized for reporting
    pub actor_name: String,
    /// Content item that was favorited
    pub subject_id: i64,
    /// Free-form status tag
    pub status: String,
    /// When the favorite was placed
    pub fav_date: DateTimeUtc,
    /// When the favorite was undone, NULL while still active
    pub unfav_date: Option<DateTimeUtc>,
    /// Last time this row was written, used to order due candidates
    pub last_action: DateTimeUtc,
}

/// `Favorite` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
