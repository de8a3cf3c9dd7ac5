//! Database configuration module.
//!
//! Resolves the store URL, opens the shared connection pool and creates the
//! `favorites` and `follows` tables from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the models.
//! The returned `DatabaseConnection` is the handle every tracker is built from.

use crate::entities::{FavoriteEntity, FollowEntity};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info, instrument};

/// Store used when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/action_ledger.sqlite?mode=rwc";

/// Gets the database URL from the environment or returns the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Connects to `database_url` and checks the store answers before handing the
/// pool out.
#[instrument]
pub async fn connect(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Opening database connection");
    let db = Database::connect(database_url).await?;
    db.ping().await?;
    info!("Database connection established");
    Ok(db)
}

/// Establishes a connection using `DATABASE_URL`, falling back to the default.
pub async fn create_connection() -> Result<DatabaseConnection> {
    connect(&get_database_url()).await
}

/// Creates the action tables if they do not exist yet.
#[instrument(skip(db))]
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    create_table(db, FavoriteEntity).await?;
    create_table(db, FollowEntity).await?;
    info!("Action tables ensured");
    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;
    Ok(())
}
