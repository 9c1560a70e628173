use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::classify::Classifier;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub store_timeout: Duration,
    pub rules_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub store_timeout_secs: Option<u64>,
    pub rules_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            store_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
            rules_path: None,
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        config.database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());

        if let Some(raw) = lookup("QUALITY_MAX_CONNECTIONS") {
            config.max_connections = raw
                .trim()
                .parse()
                .with_context(|| format!("QUALITY_MAX_CONNECTIONS is not a number: {raw}"))?;
        }
        if let Some(raw) = lookup("QUALITY_STORE_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("QUALITY_STORE_TIMEOUT_SECS is not a number: {raw}"))?;
            config.store_timeout = Duration::from_secs(secs.max(1));
        }
        config.rules_path = lookup("QUALITY_RULES_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.database_url {
            self.database_url = Some(url);
        }
        if let Some(secs) = overrides.store_timeout_secs {
            self.store_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(path) = overrides.rules_path {
            self.rules_path = Some(path);
        }
    }

    pub fn database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a production Postgres instance")
    }

    pub fn classifier(&self) -> Result<Classifier> {
        match &self.rules_path {
            Some(path) => Classifier::from_json_file(path),
            None => Ok(Classifier::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.database_url().is_err());
    }

    #[test]
    fn reads_environment_values() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/quality"),
            ("QUALITY_MAX_CONNECTIONS", "8"),
            ("QUALITY_STORE_TIMEOUT_SECS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.database_url().unwrap(), "postgres://localhost/quality");
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.store_timeout, Duration::from_secs(1));
    }

    #[test]
    fn rejects_malformed_numbers() {
        let err = Config::from_lookup(lookup(&[("QUALITY_MAX_CONNECTIONS", "many")])).unwrap_err();
        assert!(err.to_string().contains("QUALITY_MAX_CONNECTIONS"));
    }

    #[test]
    fn overrides_win_over_environment() {
        let mut config =
            Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://env/quality")])).unwrap();
        config.apply_overrides(ConfigOverrides {
            database_url: Some("postgres://cli/quality".to_string()),
            store_timeout_secs: Some(5),
            rules_path: None,
        });
        assert_eq!(config.database_url().unwrap(), "postgres://cli/quality");
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert!(config.classifier().is_ok());
    }
}
