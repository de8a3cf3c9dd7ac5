use action_ledger::{
    config::{database, settings},
    core::{FavoriteTracker, FollowTracker},
    errors::Result,
};
use chrono::Utc;
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Load .env file first so RUST_LOG and DATABASE_URL can come from it
    let dotenv_loaded = dotenv().is_ok();

    // 2. Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    info!(dotenv_loaded, "Starting action ledger");

    // 3. Load due-query settings
    let settings = settings::load_from_env()
        .inspect_err(|e| error!("Failed to load settings: {}", e))?;

    // 4. Open the store and make sure the tables exist
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Report what is due; reversing it is the scheduler's job
    let db = Arc::new(db);
    let favorites = FavoriteTracker::new(Arc::clone(&db));
    let follows = FollowTracker::new(db);
    let now = Utc::now();

    let due_favorites = favorites
        .find_due(settings.favorite_cutoff(now), settings.batch_size)
        .await?;
    for due in &due_favorites {
        info!(
            id = due.id,
            subject_id = due.record.subject_id,
            actor = %due.record.actor_name,
            favorited_at = %due.record.fav_date,
            "Favorite due for unfavorite"
        );
    }

    let due_follows = follows
        .find_due(settings.follow_cutoff(now), settings.batch_size)
        .await?;
    for due in &due_follows {
        info!(
            id = due.id,
            target_id = due.record.target_id,
            actor = %due.record.actor_name,
            followed_at = %due.record.follow_date,
            "Follow due for unfollow"
        );
    }

    info!(
        favorites = due_favorites.len(),
        follows = due_follows.len(),
        "Due report complete"
    );
    Ok(())
}
