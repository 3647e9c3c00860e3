//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "catalogUrl": "https://cdn.example/games.json",
//!   "segmentBaseUrl": "https://cdn.example/games",
//!   "bind": "127.0.0.1:3000",
//!   "fetchTimeoutSecs": 30,
//!   "argon2": { "memoryCost": 19456, "timeCost": 2, "parallelism": 1 },
//!   "seedAccounts": [
//!     { "identity": "admin", "credential": "...", "displayName": "Admin",
//!       "contactEmail": "admin@example.com", "tier": "administrator" }
//!   ]
//! }
//! ```
//! Every key is optional. `GAMEDROP_*` environment variables override the
//! file for the network settings.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{Argon2Params, Tier};

pub const SETTINGS_FILE: &str = "settings.json";

pub const DEFAULT_CATALOG_URL: &str =
    "https://cdn.jsdelivr.net/gh/jacobinathanialpeterson/GS@main/games.json";
pub const DEFAULT_SEGMENT_BASE_URL: &str =
    "https://cdn.jsdelivr.net/gh/jacobinathanialpeterson/GS@main/games";
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    catalog_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    segment_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fetch_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    argon2: Option<Argon2Params>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    seed_accounts: Vec<SeedAccount>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Account created at startup if its identity does not exist yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedAccount {
    pub identity: String,
    pub credential: String,
    pub display_name: String,
    pub contact_email: String,
    #[serde(default = "default_seed_tier")]
    pub tier: Tier,
}

fn default_seed_tier() -> Tier {
    Tier::Approved
}

/// Gamedrop configuration (resolved view of settings plus environment)
#[derive(Debug, Clone)]
pub struct Config {
    pub catalog_url: String,
    pub segment_base_url: String,
    pub bind: String,
    pub fetch_timeout: Duration,
    pub argon2: Argon2Params,
    pub seed_accounts: Vec<SeedAccount>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            segment_base_url: DEFAULT_SEGMENT_BASE_URL.to_string(),
            bind: DEFAULT_BIND.to_string(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            argon2: Argon2Params::default(),
            seed_accounts: Vec::new(),
        }
    }
}

impl Config {
    /// Load config from the data directory, then apply env overrides
    pub fn load(data_dir: &Path) -> Result<Self> {
        Self::load_with_env(data_dir, |key| std::env::var(key).ok())
    }

    /// Load with an explicit environment lookup
    pub fn load_with_env<F>(data_dir: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = read_settings(data_dir)?;

        let fetch_timeout_secs = match env("GAMEDROP_FETCH_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .with_context(|| format!("GAMEDROP_FETCH_TIMEOUT_SECS must be a number, got '{}'", value))?,
            None => raw.fetch_timeout_secs.unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
        };
        if fetch_timeout_secs == 0 {
            anyhow::bail!("fetchTimeoutSecs must be greater than zero");
        }

        let pick = |var: &str, file: &Option<String>, default: &str| {
            env(var)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| file.clone())
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            catalog_url: pick("GAMEDROP_CATALOG_URL", &raw.catalog_url, DEFAULT_CATALOG_URL),
            segment_base_url: pick(
                "GAMEDROP_SEGMENT_BASE_URL",
                &raw.segment_base_url,
                DEFAULT_SEGMENT_BASE_URL,
            ),
            bind: pick("GAMEDROP_BIND", &raw.bind, DEFAULT_BIND),
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            argon2: raw.argon2.unwrap_or_default(),
            seed_accounts: raw.seed_accounts,
        })
    }

    /// Save config to the data directory
    /// Preserves other settings that gamedrop doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join(SETTINGS_FILE);

        let mut settings = read_settings(data_dir)?;
        settings.catalog_url = Some(self.catalog_url.clone());
        settings.segment_base_url = Some(self.segment_base_url.clone());
        settings.bind = Some(self.bind.clone());
        settings.fetch_timeout_secs = Some(self.fetch_timeout.as_secs());
        settings.argon2 = Some(self.argon2.clone());
        settings.seed_accounts = self.seed_accounts.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid {}", settings_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_with_env(dir.path(), no_env).unwrap();

        assert_eq!(config.catalog_url, DEFAULT_CATALOG_URL);
        assert_eq!(config.segment_base_url, DEFAULT_SEGMENT_BASE_URL);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert!(config.seed_accounts.is_empty());
    }

    #[test]
    fn test_settings_file_values() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{
                "catalogUrl": "http://localhost:9000/games.json",
                "fetchTimeoutSecs": 5,
                "argon2": { "timeCost": 3 },
                "seedAccounts": [
                    { "identity": "root", "credential": "pw", "displayName": "Root",
                      "contactEmail": "root@example.com", "tier": "administrator" },
                    { "identity": "viewer", "credential": "pw", "displayName": "Viewer",
                      "contactEmail": "viewer@example.com" }
                ]
            }"#,
        )
        .unwrap();

        let config = Config::load_with_env(dir.path(), no_env).unwrap();
        assert_eq!(config.catalog_url, "http://localhost:9000/games.json");
        assert_eq!(config.segment_base_url, DEFAULT_SEGMENT_BASE_URL);
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.argon2.time_cost, 3);
        assert_eq!(config.seed_accounts.len(), 2);
        assert_eq!(config.seed_accounts[0].tier, Tier::Administrator);
        assert_eq!(config.seed_accounts[1].tier, Tier::Approved);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"bind": "0.0.0.0:80", "fetchTimeoutSecs": 5}"#,
        )
        .unwrap();

        let config = Config::load_with_env(dir.path(), |key| match key {
            "GAMEDROP_BIND" => Some("127.0.0.1:8088".to_string()),
            "GAMEDROP_FETCH_TIMEOUT_SECS" => Some("12".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.bind, "127.0.0.1:8088");
        assert_eq!(config.fetch_timeout, Duration::from_secs(12));
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = Config::load_with_env(dir.path(), |key| {
            (key == "GAMEDROP_FETCH_TIMEOUT_SECS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("GAMEDROP_FETCH_TIMEOUT_SECS"));

        std::fs::write(dir.path().join(SETTINGS_FILE), r#"{"fetchTimeoutSecs": 0}"#).unwrap();
        assert!(Config::load_with_env(dir.path(), no_env).is_err());
    }

    #[test]
    fn test_malformed_settings_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{ nope").unwrap();
        assert!(Config::load_with_env(dir.path(), no_env).is_err());
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"theme": "dark", "bind": "127.0.0.1:1"}"#,
        )
        .unwrap();

        let mut config = Config::load_with_env(dir.path(), no_env).unwrap();
        config.bind = "127.0.0.1:2".to_string();
        config.save(dir.path()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(raw["bind"], "127.0.0.1:2");
        assert_eq!(raw["fetchTimeoutSecs"], 30);
    }
}
