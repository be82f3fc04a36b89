//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::controller::{GameReconcilerConfig, game::DEFAULT_MAX_GUESSES};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "NULLGAME_CONFIG_PATH";
/// Environment variable that overrides the guess limit from the file.
const MAX_GUESSES_ENV: &str = "NULLGAME_MAX_GUESSES";
const DEFAULT_PORT: u16 = 8080;

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Guesses a game accepts before it is lost.
    pub max_guesses: usize,
    /// Worker tasks per controller.
    pub workers: usize,
    /// First retry delay after a failed reconciliation.
    pub retry_initial_delay: Duration,
    /// Upper bound of the retry delay.
    pub retry_max_delay: Duration,
    /// HTTP listen port.
    pub port: u16,
}

impl AppConfig {
    /// Load the configuration from disk, then apply environment overrides.
    ///
    /// A missing or unreadable file falls back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        max_guesses = config.max_guesses,
                        workers = config.workers,
                        "loaded configuration"
                    );
                    config
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
        };

        config.with_env_overrides(|name| env::var(name).ok())
    }

    /// Apply `NULLGAME_MAX_GUESSES` and `PORT`/`SERVER_PORT` from `lookup`.
    fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(MAX_GUESSES_ENV) {
            match raw.parse::<usize>() {
                Ok(max_guesses) => self.max_guesses = max_guesses,
                Err(err) => warn!(value = %raw, error = %err, "ignoring invalid {MAX_GUESSES_ENV}"),
            }
        }

        if let Some(port) = lookup("PORT")
            .or_else(|| lookup("SERVER_PORT"))
            .and_then(|value| value.parse::<u16>().ok())
        {
            self.port = port;
        }

        self
    }

    /// Settings handed to the game reconciler.
    pub fn reconciler(&self) -> GameReconcilerConfig {
        GameReconcilerConfig {
            max_guesses: self.max_guesses,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawConfig {
    max_guesses: usize,
    workers: usize,
    retry_initial_delay_ms: u64,
    retry_max_delay_ms: u64,
    port: u16,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            max_guesses: DEFAULT_MAX_GUESSES,
            workers: 2,
            retry_initial_delay_ms: 1_000,
            retry_max_delay_ms: 10_000,
            port: DEFAULT_PORT,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            max_guesses: value.max_guesses,
            workers: value.workers.max(1),
            retry_initial_delay: Duration::from_millis(value.retry_initial_delay_ms),
            retry_max_delay: Duration::from_millis(value.retry_max_delay_ms),
            port: value.port,
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
