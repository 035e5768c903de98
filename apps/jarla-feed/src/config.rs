use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use jarla_db::loader::DEFAULT_BATCH_SIZE;
use jarla_db::recent::DEFAULT_RECENT_CAPACITY;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Hosted REST endpoint (PostgREST).
    #[default]
    Rest,
    /// Direct Postgres connection.
    Postgres,
}

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" => Ok(BackendKind::Rest),
            "postgres" | "postgresql" => Ok(BackendKind::Postgres),
            other => Err(anyhow::anyhow!("Unknown backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default)]
    pub backend: BackendKind,
    pub database_url: Option<String>,
    pub rest_url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    #[serde(default = "default_recent_capacity")]
    pub recent_capacity: usize,
    #[serde(default = "default_recent_path")]
    pub recent_path: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_active_only")]
    pub active_only: bool,
}

fn default_batch_size() -> u64 {
    DEFAULT_BATCH_SIZE
}

fn default_recent_capacity() -> usize {
    DEFAULT_RECENT_CAPACITY
}

fn default_recent_path() -> String {
    "./jarla-recent.json".to_string()
}

fn default_currency() -> String {
    "sek".to_string()
}

fn default_active_only() -> bool {
    true
}

impl FeedConfig {
    pub fn load() -> Result<Self> {
        let config_paths = ["/etc/jarla/feed.toml", "./jarla.toml"];

        for path in config_paths {
            if let Ok(contents) = fs::read_to_string(path) {
                tracing::info!("Loading config from {}", path);
                let config: Self =
                    toml::from_str(&contents).with_context(|| format!("Invalid config in {}", path))?;
                config.validate()?;
                return Ok(config);
            }
        }

        tracing::info!("Loading config from environment");
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let backend = match lookup("JARLA_BACKEND") {
            Some(value) => value.parse()?,
            None => BackendKind::default(),
        };

        Ok(Self {
            backend,
            database_url: lookup("DATABASE_URL"),
            rest_url: lookup("JARLA_REST_URL"),
            api_key: lookup("JARLA_API_KEY"),
            batch_size: lookup("JARLA_BATCH_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_batch_size),
            recent_capacity: lookup("JARLA_RECENT_CAPACITY")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_recent_capacity),
            recent_path: lookup("JARLA_RECENT_PATH").unwrap_or_else(default_recent_path),
            currency: lookup("JARLA_CURRENCY").unwrap_or_else(default_currency),
            active_only: lookup("JARLA_ACTIVE_ONLY")
                .map(|v| !matches!(v.as_str(), "0" | "false" | "no"))
                .unwrap_or_else(default_active_only),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(anyhow::anyhow!("batch_size must be greater than zero"));
        }
        if self.recent_capacity == 0 {
            return Err(anyhow::anyhow!("recent_capacity must be greater than zero"));
        }
        match self.backend {
            BackendKind::Rest if self.rest_url.is_none() => Err(anyhow::anyhow!(
                "rest backend selected but JARLA_REST_URL / rest_url is not set"
            )),
            BackendKind::Postgres if self.database_url.is_none() => Err(anyhow::anyhow!(
                "postgres backend selected but DATABASE_URL / database_url is not set"
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn toml_defaults_fill_missing_fields() {
        let config: FeedConfig = toml::from_str(r#"rest_url = "https://api.example.com""#).unwrap();

        assert_eq!(config.backend, BackendKind::Rest);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.recent_capacity, DEFAULT_RECENT_CAPACITY);
        assert_eq!(config.currency, "sek");
        assert!(config.active_only);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn environment_overrides() {
        let config = FeedConfig::from_lookup(lookup(&[
            ("JARLA_BACKEND", "postgres"),
            ("DATABASE_URL", "postgres://localhost/jarla"),
            ("JARLA_BATCH_SIZE", "24"),
            ("JARLA_ACTIVE_ONLY", "false"),
        ]))
        .unwrap();

        assert_eq!(config.backend, BackendKind::Postgres);
        assert_eq!(config.batch_size, 24);
        assert!(!config.active_only);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(FeedConfig::from_lookup(lookup(&[("JARLA_BACKEND", "mongo")])).is_err());
    }

    #[test]
    fn backend_without_url_fails_validation() {
        let config = FeedConfig::from_lookup(lookup(&[("JARLA_BACKEND", "postgres")])).unwrap();
        assert!(config.validate().is_err());

        let config = FeedConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_batch_size_fails_validation() {
        let config: FeedConfig =
            toml::from_str("rest_url = \"https://api.example.com\"\nbatch_size = 0").unwrap();
        assert!(config.validate().is_err());
    }
}
