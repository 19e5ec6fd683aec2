//! Query configuration via `beacon.toml`
//!
//! Bounds on how long a blocking query may wait. On first start a default
//! `beacon.toml` is written next to the server's data; edit it and restart to
//! change the limits.

use std::path::Path;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use beacon_core::{Error, Result};

/// Config file name placed in the server's data directory.
pub const CONFIG_FILE_NAME: &str = "beacon.toml";

fn default_max_query_time_ms() -> u64 {
    300_000
}

fn default_default_query_time_ms() -> u64 {
    300_000
}

fn default_jitter_fraction() -> u32 {
    16
}

/// Blocking-query limits loaded from `beacon.toml`.
///
/// # Example
///
/// ```toml
/// max_query_time_ms = 300000
/// default_query_time_ms = 300000
/// jitter_fraction = 16
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryConfig {
    /// Longest wait a caller may request; longer requests are clamped.
    #[serde(default = "default_max_query_time_ms")]
    pub max_query_time_ms: u64,
    /// Wait used when the caller leaves it unset.
    #[serde(default = "default_default_query_time_ms")]
    pub default_query_time_ms: u64,
    /// Up to `wait / jitter_fraction` is added to every wait so that many
    /// watchers do not time out together. 0 disables the stagger.
    #[serde(default = "default_jitter_fraction")]
    pub jitter_fraction: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_query_time_ms: default_max_query_time_ms(),
            default_query_time_ms: default_default_query_time_ms(),
            jitter_fraction: default_jitter_fraction(),
        }
    }
}

impl QueryConfig {
    /// Check the limits are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either time is zero or the default
    /// exceeds the maximum.
    pub fn validate(&self) -> Result<()> {
        if self.max_query_time_ms == 0 {
            return Err(Error::Config("max_query_time_ms must be positive".into()));
        }
        if self.default_query_time_ms == 0 {
            return Err(Error::Config(
                "default_query_time_ms must be positive".into(),
            ));
        }
        if self.default_query_time_ms > self.max_query_time_ms {
            return Err(Error::Config(format!(
                "default_query_time_ms ({}) exceeds max_query_time_ms ({})",
                self.default_query_time_ms, self.max_query_time_ms
            )));
        }
        Ok(())
    }

    /// Longest wait a caller may request
    pub fn max_query_time(&self) -> Duration {
        Duration::from_millis(self.max_query_time_ms)
    }

    /// Wait used when the caller leaves it unset
    pub fn default_query_time(&self) -> Duration {
        Duration::from_millis(self.default_query_time_ms)
    }

    /// Wait bound for a request, before stagger.
    ///
    /// Zero selects the default; anything above the maximum is clamped.
    pub fn normalize_wait(&self, requested: Duration) -> Duration {
        if requested.is_zero() {
            self.default_query_time()
        } else {
            requested.min(self.max_query_time())
        }
    }

    /// Normalized wait plus a random stagger of up to `wait / jitter_fraction`.
    pub fn effective_wait(&self, requested: Duration) -> Duration {
        let wait = self.normalize_wait(requested);
        if self.jitter_fraction == 0 {
            return wait;
        }
        wait + random_stagger(wait / self.jitter_fraction)
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Beacon query configuration
#
# Longest wait a blocking query may request, in milliseconds.
# Longer requests are clamped to this value.
max_query_time_ms = 300000

# Wait used when a blocking query does not set one, in milliseconds.
# Must not exceed max_query_time_ms.
default_query_time_ms = 300000

# Each wait is extended by a random amount up to wait / jitter_fraction
# so that watchers do not all time out at once. 0 disables it.
jitter_fraction = 16
"#
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or fails
    /// [`QueryConfig::validate`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: QueryConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

/// Uniform random duration in `[0, intv)`.
fn random_stagger(intv: Duration) -> Duration {
    let nanos = u64::try_from(intv.as_nanos()).unwrap_or(u64::MAX);
    if nanos == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(rand::thread_rng().gen_range(0..nanos))
}
