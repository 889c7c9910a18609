//! Configuration file for the helpdesk router.
//!
//! ```toml
//! [store]
//! path = "${HOME}/.helpdesk/helpdesk.db"
//! busy_timeout_ms = 5000
//!
//! [policy]
//! edit_after_claim = false
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

/// Environment variable naming an alternate config file.
pub const CONFIG_ENV: &str = "HELPDESK_CONFIG";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Default, Deserialize)]
pub struct HelpdeskConfig {
    pub store: Option<StoreConfig>,
    pub policy: Option<PolicyConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
pub struct StoreConfig {
    /// Database file. Supports `${VAR}` expansion.
    pub path: Option<String>,
    /// Milliseconds a writer waits on a locked database. Default: 5000.
    pub busy_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PolicyConfig {
    /// Let creators edit title and description after a responder claims
    /// the ticket. Default: false.
    #[serde(default)]
    pub edit_after_claim: bool,
}

/// Replace every `${VAR}` with the variable's value (empty when unset).
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(end_rel) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + end_rel];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 2 + end_rel + 1..];
    }

    out.push_str(rest);
    out
}

impl HelpdeskConfig {
    /// Load from [`config_path`]. A missing file is not an error.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Configured database path with `${VAR}` expanded.
    #[must_use]
    pub fn db_path(&self) -> Option<PathBuf> {
        let raw = self.store.as_ref()?.path.as_deref()?;
        let expanded = expand_env_vars(raw);
        if expanded.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(expanded))
        }
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        let ms = self
            .store
            .as_ref()
            .and_then(|store| store.busy_timeout_ms)
            .unwrap_or(DEFAULT_BUSY_TIMEOUT_MS);
        Duration::from_millis(ms)
    }

    #[must_use]
    pub fn edit_after_claim(&self) -> bool {
        self.policy
            .as_ref()
            .is_some_and(|policy| policy.edit_after_claim)
    }
}

/// `$HELPDESK_CONFIG` if set, else `~/.helpdesk/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".helpdesk").join("config.toml"))
}

/// `~/.helpdesk/helpdesk.db`.
#[must_use]
pub fn default_db_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".helpdesk").join("helpdesk.db"))
}
