//! Runtime configuration.
//!
//! `StacksConfig` is read from an optional JSON file and then overridden by
//! `STACKS_*` environment variables. Paths left unset are resolved by the
//! client (the CLI uses the platform data directory).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::db::SyncConfig;
use crate::error::{Error, Result};
use crate::util::{is_remote_db_url, normalize_text_option};

pub const ENV_DB_PATH: &str = "STACKS_DB_PATH";
pub const ENV_BACKUPS_DIR: &str = "STACKS_BACKUPS_DIR";
pub const ENV_SYNC_URL: &str = "STACKS_SYNC_URL";
pub const ENV_SYNC_AUTH_TOKEN: &str = "STACKS_SYNC_AUTH_TOKEN";
pub const ENV_SYNC_INTERVAL_SECS: &str = "STACKS_SYNC_INTERVAL_SECS";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StacksConfig {
    /// Canonical store database file
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// Directory holding one subdirectory per snapshot
    #[serde(default)]
    pub backups_dir: Option<PathBuf>,
    /// Remote database to replicate, e.g. `libsql://stacks-user.example.io`
    #[serde(default)]
    pub sync_url: Option<String>,
    #[serde(default)]
    pub sync_auth_token: Option<String>,
    /// Background sync interval; 0 disables automatic sync
    #[serde(default)]
    pub sync_interval_secs: Option<u64>,
}

impl StacksConfig {
    /// Load from a JSON file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::parse(&raw)
                .map_err(|e| Error::Config(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {}", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Config(format!("invalid config JSON: {e}")))
    }

    /// Apply overrides from the process environment
    pub fn with_process_env(self) -> Result<Self> {
        self.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; blank values are ignored
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| normalize_text_option(lookup(key));

        if let Some(path) = var(ENV_DB_PATH) {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Some(path) = var(ENV_BACKUPS_DIR) {
            self.backups_dir = Some(PathBuf::from(path));
        }
        if let Some(url) = var(ENV_SYNC_URL) {
            self.sync_url = Some(url);
        }
        if let Some(token) = var(ENV_SYNC_AUTH_TOKEN) {
            self.sync_auth_token = Some(token);
        }
        if let Some(secs) = var(ENV_SYNC_INTERVAL_SECS) {
            let secs = secs.parse::<u64>().map_err(|e| {
                Error::Config(format!("{ENV_SYNC_INTERVAL_SECS} must be a number of seconds: {e}"))
            })?;
            self.sync_interval_secs = Some(secs);
        }
        Ok(self)
    }

    /// Replica settings, when both a sync url and token are configured
    ///
    /// Only one of the two is a configuration error.
    pub fn sync_config(&self) -> Result<Option<SyncConfig>> {
        let url = normalize_text_option(self.sync_url.clone());
        let token = normalize_text_option(self.sync_auth_token.clone());

        let (url, token) = match (url, token) {
            (None, None) => return Ok(None),
            (Some(url), Some(token)) => (url, token),
            (Some(_), None) => {
                return Err(Error::Config(format!(
                    "{ENV_SYNC_URL} is set but {ENV_SYNC_AUTH_TOKEN} is missing"
                )))
            }
            (None, Some(_)) => {
                return Err(Error::Config(format!(
                    "{ENV_SYNC_AUTH_TOKEN} is set but {ENV_SYNC_URL} is missing"
                )))
            }
        };
        if !is_remote_db_url(&url) {
            return Err(Error::Config(format!(
                "sync url must use libsql://, https:// or http://: {url}"
            )));
        }

        let config = SyncConfig::new(url, token);
        Ok(Some(match self.sync_interval_secs {
            Some(0) => config.without_auto_sync(),
            Some(secs) => config.with_sync_interval(Duration::from_secs(secs)),
            None => config,
        }))
    }
}
