use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::StagehandError;

/// Default post-batch settle wait.
pub const DEFAULT_SETTLE_MS: u64 = 350;

/// What `reset()` does to a run that is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetPolicy {
    /// Cancel the run at its current suspension point. It publishes nothing further.
    #[default]
    CancelRun,
    /// Only overwrite published state. The run resumes later and keeps publishing.
    OverwriteOnly,
}

impl FromStr for ResetPolicy {
    type Err = StagehandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cancel" | "cancel_run" => Ok(ResetPolicy::CancelRun),
            "overwrite" | "overwrite_only" => Ok(ResetPolicy::OverwriteOnly),
            other => Err(StagehandError::Config(format!(
                "STAGEHAND_RESET_POLICY must be 'cancel' or 'overwrite', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = StagehandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(StagehandError::Config(format!(
                "STAGEHAND_LOG_FORMAT must be 'text' or 'json', got '{other}'"
            ))),
        }
    }
}

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub settle: Duration,
    pub reset_policy: ResetPolicy,
    pub sequence_path: PathBuf,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
            reset_policy: ResetPolicy::default(),
            sequence_path: PathBuf::from("sequence.toml"),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, StagehandError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup. Missing keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StagehandError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let settle = match lookup("STAGEHAND_SETTLE_MS") {
            Some(raw) => {
                let ms: u64 = raw.trim().parse().map_err(|_| {
                    StagehandError::Config(format!(
                        "STAGEHAND_SETTLE_MS must be a whole number of milliseconds, got '{raw}'"
                    ))
                })?;
                Duration::from_millis(ms)
            }
            None => defaults.settle,
        };

        let reset_policy = match lookup("STAGEHAND_RESET_POLICY") {
            Some(raw) => raw.parse()?,
            None => defaults.reset_policy,
        };

        let log_format = match lookup("STAGEHAND_LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => defaults.log_format,
        };

        let sequence_path = lookup("STAGEHAND_SEQUENCE")
            .map(PathBuf::from)
            .unwrap_or(defaults.sequence_path);

        Ok(Self {
            settle,
            reset_policy,
            sequence_path,
            log_format,
        })
    }

    /// Log the effective configuration.
    pub fn log_summary(&self) {
        info!(
            settle_ms = self.settle.as_millis() as u64,
            reset_policy = ?self.reset_policy,
            sequence = %self.sequence_path.display(),
            log_format = ?self.log_format,
            "Loaded config"
        );
    }
}
