use std::time::Duration;

use anyhow::Context;

use crate::collect::Deadlines;

const DEFAULT_RATING_TIMEOUT_SECS: u64 = 20;
const DEFAULT_SELECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub rating_timeout: Duration,
    pub select_timeout: Duration,
    pub max_connections: u32,
}

impl Settings {
    /// Reads the process environment after loading an optional `.env`.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let number = |key: &str, default: u64| -> anyhow::Result<u64> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{key} must be a whole number, got {raw:?}")),
                None => Ok(default),
            }
        };

        let max_connections = number("MOOD_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS as u64)?;

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            rating_timeout: Duration::from_secs(number(
                "MOOD_RATING_TIMEOUT_SECS",
                DEFAULT_RATING_TIMEOUT_SECS,
            )?),
            select_timeout: Duration::from_secs(number(
                "MOOD_SELECT_TIMEOUT_SECS",
                DEFAULT_SELECT_TIMEOUT_SECS,
            )?),
            max_connections: u32::try_from(max_connections)
                .context("MOOD_DB_MAX_CONNECTIONS is out of range")?,
        })
    }

    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a Postgres instance")
    }

    pub fn deadlines(&self) -> Deadlines {
        Deadlines {
            rating: self.rating_timeout,
            selection: self.select_timeout,
        }
    }
}
