//! Engine configuration.
//!
//! ```toml
//! [retry]
//! max_attempts = 5
//! base_delay_ms = 2000
//! multiplier = 2.0
//! max_delay_ms = 60000
//!
//! [sync]
//! periodic_interval_secs = 300
//! sync_on_startup = true
//! ```
//!
//! Every field is optional. `SYNCQ_MAX_ATTEMPTS`, `SYNCQ_BASE_DELAY_MS`,
//! `SYNCQ_MULTIPLIER` and `SYNCQ_MAX_DELAY_MS` override the retry section.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::queue::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub retry: RetryConfig,
    pub sync: ScheduleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            multiplier: policy.multiplier,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Run a sync every N seconds while online. `None` disables the timer.
    pub periodic_interval_secs: Option<u64>,
    /// Trigger one run as soon as the worker starts, if online.
    pub sync_on_startup: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            periodic_interval_secs: None,
            sync_on_startup: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl SyncConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path`, apply environment overrides, validate.
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => {
                let config: SyncConfig = toml::from_str(&contents)?;
                tracing::debug!(path = %path.display(), "loaded config");
                config
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                SyncConfig::default()
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from<F>(&mut self, mut lookup: F)
    where
        F: FnMut(&str) -> Option<String>,
    {
        override_from(&mut lookup, "SYNCQ_MAX_ATTEMPTS", &mut self.retry.max_attempts);
        override_from(&mut lookup, "SYNCQ_BASE_DELAY_MS", &mut self.retry.base_delay_ms);
        override_from(&mut lookup, "SYNCQ_MULTIPLIER", &mut self.retry.multiplier);
        override_from(&mut lookup, "SYNCQ_MAX_DELAY_MS", &mut self.retry.max_delay_ms);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let retry = &self.retry;
        if retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if !retry.multiplier.is_finite() || retry.multiplier < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "retry.multiplier must be a finite number >= 1.0, got {}",
                retry.multiplier
            )));
        }
        if retry.max_delay_ms < retry.base_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "retry.max_delay_ms ({}) is below retry.base_delay_ms ({})",
                retry.max_delay_ms, retry.base_delay_ms
            )));
        }
        if self.sync.periodic_interval_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "sync.periodic_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            multiplier: self.retry.multiplier,
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    pub fn periodic_interval(&self) -> Option<Duration> {
        self.sync.periodic_interval_secs.map(Duration::from_secs)
    }
}

fn override_from<F, T>(lookup: &mut F, key: &str, target: &mut T)
where
    F: FnMut(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    match trimmed.parse::<T>() {
        Ok(value) => *target = value,
        Err(err) => tracing::warn!("invalid {key}, ignoring: {err}"),
    }
}
