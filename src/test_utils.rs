//! Shared test utilities.
//!
//! Helpers for setting up a fresh in-memory store and building records at fixed,
//! readable instants.

use crate::{
    core::{Favorite, Follow},
    errors::Result,
};
use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::DatabaseConnection;
use tracing_subscriber::EnvFilter;

/// 2024-01-01T00:00:00Z, the reference instant for `at_minute`.
const BASE_TIMESTAMP: i64 = 1_704_067_200;

/// Routes tracing output through the test harness; safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A fixed instant `minutes` after the reference instant.
#[must_use]
pub fn at_minute(minutes: i64) -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(BASE_TIMESTAMP) + TimeDelta::minutes(minutes)
}

/// An active favorite on `subject_id` placed at `fav_date`.
///
/// # Defaults
/// * `actor_id`: 1
/// * `actor_name`: `"ledger_bot"`
/// * `status`: `"favorited"`
#[must_use]
pub fn favorite_at(subject_id: i64, fav_date: DateTime<Utc>) -> Favorite {
    Favorite {
        fav_date,
        last_action: fav_date,
        ..Favorite::new(1, "ledger_bot", subject_id, "favorited")
    }
}

/// An active follow of `target_id` placed at `follow_date`, by actor 1.
#[must_use]
pub fn follow_at(target_id: i64, follow_date: DateTime<Utc>) -> Follow {
    Follow {
        follow_date,
        last_action: follow_date,
        ..Follow::new(1, "ledger_bot", target_id, "followed")
    }
}
