use crate::core::record::ActionKind;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Unified error type for the ledger.
#[derive(Debug, Error)]
pub enum Error {
    /// Settings or environment could not be turned into a usable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Statement preparation, execution or row mapping failed in the store
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// An update addressed an identity the store does not know
    #[error("{kind} record {id} not found")]
    RecordNotFound {
        /// Which table was addressed
        kind: ActionKind,
        /// The identity that matched no row
        id: i64,
    },

    /// A reversal timestamp earlier than the action it reverses
    #[error("{kind} reversed at {reversed_at} before it was taken at {acted_at}")]
    ReversalBeforeAction {
        /// Which kind of action
        kind: ActionKind,
        /// When the action was taken
        acted_at: DateTime<Utc>,
        /// The offending reversal timestamp
        reversed_at: DateTime<Utc>,
    },

    /// I/O failure while reading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required environment variable was missing or not unicode
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
