//! Worker configuration loaded from environment variables.
//!
//! | variable                           | default       |
//! |------------------------------------|---------------|
//! | `CONVEYOR_POLL_INTERVAL_MS`        | `1000`        |
//! | `CONVEYOR_VISIBILITY_TIMEOUT_SECS` | `30`          |
//! | `CONVEYOR_QUEUE_DIR`               | `./var/queue` |
//! | `CONVEYOR_LOG_FORMAT`              | `pretty`      |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse environment variable '{key}': {details}")]
    Parse { key: String, details: String },
}

/// Log output format for the worker binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("pretty") {
            Ok(LogFormat::Pretty)
        } else if s.eq_ignore_ascii_case("json") {
            Ok(LogFormat::Json)
        } else {
            Err(format!("expected `pretty` or `json`, got `{s}`"))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Idle wait between polls in daemon mode.
    pub poll_interval: Duration,
    /// How long a received message stays hidden before redelivery.
    pub visibility_timeout: Duration,
    /// Root directory of the file-backed queue.
    pub queue_dir: PathBuf,
    pub log_format: LogFormat,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            visibility_timeout: Duration::from_secs(30),
            queue_dir: PathBuf::from("./var/queue"),
            log_format: LogFormat::Pretty,
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            poll_interval: parse_env::<u64>("CONVEYOR_POLL_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            visibility_timeout: parse_env::<u64>("CONVEYOR_VISIBILITY_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.visibility_timeout),
            queue_dir: env::var("CONVEYOR_QUEUE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.queue_dir),
            log_format: parse_env::<LogFormat>("CONVEYOR_LOG_FORMAT")?
                .unwrap_or(defaults.log_format),
        })
    }
}

/// Unset is `None`; set but unparsable is an error.
fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|e: T::Err| ConfigError::Parse {
            key: key.to_string(),
            details: e.to_string(),
        }),
        Err(_) => Ok(None),
    }
}
