//! Engine configuration: reminder defaults, priority policy and bulk limits.
//!
//! # Responsibility
//! - Provide deployment-tunable knobs with safe defaults.
//! - Load and validate configuration from JSON.
//!
//! # Invariants
//! - A validated config has positive windows and limits and no blank keywords.
//! - Missing JSON fields fall back to `Default` values.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

const DEFAULT_DAYS_AHEAD: i64 = 30;
const DEFAULT_RECENT_VACCINATION_DAYS: i64 = 30;
const DEFAULT_CRITICAL_HIGH_WITHIN_DAYS: i64 = 14;
const DEFAULT_MAX_BATCH_SIZE: usize = 10_000;
const DEFAULT_MAX_DURATION_MS: u64 = 30_000;
const DEFAULT_CRITICAL_KEYWORDS: &[&str] = &["rabies", "core", "mandatory", "required"];

/// Configuration load or validation failure.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read engine config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse engine config: {err}"),
            Self::Invalid(message) => write!(f, "invalid engine config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// One vaccine-type keyword that raises reminder priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalKeyword {
    /// Matched case-insensitively as a substring of the vaccination type.
    pub keyword: String,
    /// Matching reminders are `High` when due within this many days, else `Medium`.
    #[serde(default = "default_critical_high_within_days")]
    pub high_within_days: i64,
}

impl CriticalKeyword {
    pub fn new(keyword: impl Into<String>, high_within_days: i64) -> Self {
        Self {
            keyword: keyword.into(),
            high_within_days,
        }
    }
}

/// Ranking policy for critical vaccines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityPolicy {
    /// Checked in order; the first match wins.
    pub critical_keywords: Vec<CriticalKeyword>,
}

impl Default for PriorityPolicy {
    fn default() -> Self {
        Self {
            critical_keywords: DEFAULT_CRITICAL_KEYWORDS
                .iter()
                .map(|keyword| CriticalKeyword::new(*keyword, DEFAULT_CRITICAL_HIGH_WITHIN_DAYS))
                .collect(),
        }
    }
}

impl PriorityPolicy {
    /// Returns the first critical keyword contained in `vaccination_type`.
    ///
    /// Blank keywords never match, even when the policy was built in code
    /// without `EngineConfig::validate`.
    pub fn critical_match(&self, vaccination_type: &str) -> Option<&CriticalKeyword> {
        let normalized = vaccination_type.to_lowercase();
        self.critical_keywords.iter().find(|critical| {
            let keyword = critical.keyword.trim();
            !keyword.is_empty() && normalized.contains(&keyword.to_lowercase())
        })
    }
}

/// Reminder query defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Lookahead window used when a query does not set one.
    pub default_days_ahead: i64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            default_days_ahead: DEFAULT_DAYS_AHEAD,
        }
    }
}

/// Bulk scheduling defaults and bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    pub default_recent_vaccination_days: i64,
    /// Upper bound on animals x schedule items per call.
    pub max_batch_size: usize,
    /// Wall-clock budget for one bulk call.
    pub max_duration_ms: u64,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            default_recent_vaccination_days: DEFAULT_RECENT_VACCINATION_DAYS,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_duration_ms: DEFAULT_MAX_DURATION_MS,
        }
    }
}

impl BulkConfig {
    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_duration_ms)
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub reminders: ReminderConfig,
    pub priority: PriorityPolicy,
    pub bulk: BulkConfig,
}

impl EngineConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reminders.default_days_ahead < 1 {
            return Err(ConfigError::Invalid(format!(
                "reminders.default_days_ahead must be >= 1, got {}",
                self.reminders.default_days_ahead
            )));
        }
        if self.bulk.default_recent_vaccination_days < 1 {
            return Err(ConfigError::Invalid(format!(
                "bulk.default_recent_vaccination_days must be >= 1, got {}",
                self.bulk.default_recent_vaccination_days
            )));
        }
        if self.bulk.max_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "bulk.max_batch_size must be >= 1".to_string(),
            ));
        }
        for critical in &self.priority.critical_keywords {
            if critical.keyword.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "priority.critical_keywords must not contain blank keywords".to_string(),
                ));
            }
            if critical.high_within_days < 0 {
                return Err(ConfigError::Invalid(format!(
                    "high_within_days for `{}` must be >= 0",
                    critical.keyword
                )));
            }
        }
        Ok(())
    }
}

fn default_critical_high_within_days() -> i64 {
    DEFAULT_CRITICAL_HIGH_WITHIN_DAYS
}
