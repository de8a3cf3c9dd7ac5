/// Database connection and table creation
pub mod database;

/// Due-query settings loaded from an optional TOML file
pub mod settings;
