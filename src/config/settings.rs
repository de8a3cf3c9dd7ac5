//! Due-query settings loaded from an optional TOML file.
//!
//! The file only tunes how old an action must be before it is due and how many
//! candidates one poll hands out. Every key is optional:
//!
//! ```toml
//! favorite_hold_hours = 48
//! follow_hold_hours = 72
//! batch_size = 50
//! ```

use crate::errors::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use std::env::{self, VarError};
use std::path::Path;
use tracing::{debug, info};

/// Environment variable naming the settings file.
pub const CONFIG_PATH_VAR: &str = "ACTION_LEDGER_CONFIG";

/// How long actions are kept before reversal and how many are polled at once.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Hours a favorite stays in place before it is due for an unfavorite
    pub favorite_hold_hours: u32,
    /// Hours a follow stays in place before it is due for an unfollow
    pub follow_hold_hours: u32,
    /// Maximum number of due records fetched per poll
    pub batch_size: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            favorite_hold_hours: 48,
            follow_hold_hours: 72,
            batch_size: 50,
        }
    }
}

impl Settings {
    /// Parses settings from TOML text and validates them.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings: Self = toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse settings: {e}"),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config {
                message: "batch_size must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Latest favorite date that is due for an unfavorite at `now`.
    #[must_use]
    pub fn favorite_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        cutoff(now, self.favorite_hold_hours)
    }

    /// Latest follow date that is due for an unfollow at `now`.
    #[must_use]
    pub fn follow_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        cutoff(now, self.follow_hold_hours)
    }
}

fn cutoff(now: DateTime<Utc>, hold_hours: u32) -> DateTime<Utc> {
    now.checked_sub_signed(TimeDelta::hours(i64::from(hold_hours)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Loads settings from a TOML file.
///
/// # Errors
/// Returns `Error::Io` if the file cannot be read and `Error::Config` if it does
/// not parse or holds invalid values.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    debug!("Loading settings from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref)?;
    Settings::from_toml_str(&contents)
}

/// Loads settings from the file named by `ACTION_LEDGER_CONFIG`, or the defaults
/// when the variable is unset.
pub fn load_from_env() -> Result<Settings> {
    match env::var(CONFIG_PATH_VAR) {
        Ok(path) => load_settings(path),
        Err(VarError::NotPresent) => {
            info!("{} not set, using default settings", CONFIG_PATH_VAR);
            Ok(Settings::default())
        }
        Err(e) => Err(e.into()),
    }
}
