//! Tunables read once when the queue is built.
//!
//! The settings file is a JSON object:
//!
//! ```json
//! { "funds": 1000.0, "rep": 1.0, "queueLength": 5, "interval": 1.0 }
//! ```
//!
//! `interval` (seconds) is optional and may not exceed one day.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_INTERVAL_SECS: f64 = 1.0;
const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors that can occur while loading the settings file
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed settings file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid settings in {}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// Funds granted per science point.
    pub funds: f64,
    /// Reputation granted per science point.
    pub rep: f64,
    /// Backlog size that must be exceeded for an expiry to flush.
    #[serde(rename = "queueLength")]
    pub queue_length: usize,
    /// Debounce interval in seconds.
    #[serde(rename = "interval", default = "default_interval_secs")]
    pub interval_secs: f64,
}

fn default_interval_secs() -> f64 {
    DEFAULT_INTERVAL_SECS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            funds: 1000.0,
            rep: 1.0,
            queue_length: 5,
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl Settings {
    /// Read and validate the settings file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings =
            serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate().map_err(|message| SettingsError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), String> {
        let (funds, rep) = (self.funds, self.rep);
        if !funds.is_finite() {
            return Err(format!("funds multiplier must be finite, got {funds}"));
        }
        if !rep.is_finite() {
            return Err(format!("rep multiplier must be finite, got {rep}"));
        }
        if self.queue_length == 0 {
            return Err("queueLength must be at least 1".to_string());
        }
        let interval = self.interval_secs;
        if !(interval.is_finite() && interval > 0.0) {
            return Err(format!("interval must be positive, got {interval}"));
        }
        if interval > MAX_INTERVAL.as_secs_f64() {
            return Err(format!("interval longer than a day, got {interval}"));
        }
        Ok(())
    }

    /// Debounce interval; falls back to one second if `interval_secs` is unusable.
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval_secs)
            .ok()
            .filter(|interval| !interval.is_zero() && *interval <= MAX_INTERVAL)
            .unwrap_or(Duration::from_secs_f64(DEFAULT_INTERVAL_SECS))
    }
}
