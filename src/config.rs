//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "RALLY_SCORE_CONFIG_PATH";
const DEFAULT_LOCAL_STORAGE_DIR: &str = "data";
const DEFAULT_SYNC_FLUSH_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_FREE_HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Directory holding the device storage slots.
    pub local_storage_dir: PathBuf,
    /// Upper bound on the wait for a pending score sync when a match ends.
    pub sync_flush_timeout: Duration,
    /// Number of history entries visible without the pro entitlement.
    pub free_history_limit: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        storage_dir = %app_config.local_storage_dir.display(),
                        "loaded config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
/// Every field is optional.
struct RawConfig {
    local_storage_dir: Option<PathBuf>,
    sync_flush_timeout_ms: Option<u64>,
    free_history_limit: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            local_storage_dir: value
                .local_storage_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_STORAGE_DIR)),
            sync_flush_timeout: Duration::from_millis(
                value
                    .sync_flush_timeout_ms
                    .unwrap_or(DEFAULT_SYNC_FLUSH_TIMEOUT_MS),
            ),
            free_history_limit: value
                .free_history_limit
                .unwrap_or(DEFAULT_FREE_HISTORY_LIMIT),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
