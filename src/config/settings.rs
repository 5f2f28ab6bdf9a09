//! Process settings read from environment variables.
//!
//! Values are usually provided through the `.env` file loaded at start-up. Every
//! setting has a default so a fresh checkout runs without any configuration.

const DEFAULT_DATABASE_URL: &str = "sqlite://data/step_ordering.sqlite?mode=rwc";
const DEFAULT_VENUE_CONFIG: &str = "venue.toml";

/// Settings needed to bootstrap the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    /// `SeaORM` connection URL (`DATABASE_URL`)
    pub database_url: String,
    /// Path of the venue TOML file (`VENUE_CONFIG`)
    pub venue_config_path: String,
}

impl AppSettings {
    /// Reads settings from the environment, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            venue_config_path: lookup("VENUE_CONFIG")
                .unwrap_or_else(|| DEFAULT_VENUE_CONFIG.to_string()),
        }
    }
}
