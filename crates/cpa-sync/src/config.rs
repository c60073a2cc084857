//! Sync configuration
//!
//! Loaded from TOML; every field has a default so a config file only needs
//! the values that differ.
//!
//! ```toml
//! directory = "/outbound/cpa"
//! timezone = "Europe/Oslo"
//! due_policy = "exact_day"
//! activation_file_mode = "rename"
//!
//! [schedule]
//! sync_interval_secs = 300
//! activation_interval_secs = 3600
//! ```

use chrono_tz::Tz;
use cpa_core::{CpaError, CpaResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How a quarantine file's release fields are judged against "now"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuePolicy {
    /// Only entries scheduled for today, once their hour and minute have passed
    #[default]
    ExactDay,
    /// Same-month entries once passed, plus any entry from the previous month
    MonthRollover,
}

/// What the filesystem step of activation does with the quarantine file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFileMode {
    /// Rename to the canonical name, overwriting any existing file
    #[default]
    Rename,
    /// Copy to the canonical name; promoted quarantine files are purged later
    Copy,
}

/// Timer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Delay before the first tick of every timer
    pub startup_delay_secs: u64,
    /// Interval between sync runs
    pub sync_interval_secs: u64,
    /// Interval between standalone activation runs
    pub activation_interval_secs: u64,
    /// Run the standalone activation timer
    pub activation_enabled: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            startup_delay_secs: 5,
            sync_interval_secs: 300,
            activation_interval_secs: 3600,
            activation_enabled: true,
        }
    }
}

impl ScheduleConfig {
    /// Startup delay as a duration
    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    /// Sync interval as a duration
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    /// Activation interval as a duration
    pub fn activation_interval(&self) -> Duration {
        Duration::from_secs(self.activation_interval_secs)
    }
}

/// Top-level CPA sync configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpaSyncConfig {
    /// File-store directory holding active and quarantined CPAs
    pub directory: String,
    /// Zone the release fields of quarantine filenames are written in
    pub timezone: Tz,
    /// Due-date policy for quarantine files
    pub due_policy: DuePolicy,
    /// Filesystem step of activation
    pub activation_file_mode: ActivationFileMode,
    /// Suffix of the reference token stamped on promoted generations
    pub promotion_actor: String,
    /// Activate due quarantine files at the start of every sync run
    pub activate_during_sync: bool,
    /// Timers
    pub schedule: ScheduleConfig,
}

impl Default for CpaSyncConfig {
    fn default() -> Self {
        Self {
            directory: "/outbound/cpa".to_string(),
            timezone: chrono_tz::Europe::Oslo,
            due_policy: DuePolicy::default(),
            activation_file_mode: ActivationFileMode::default(),
            promotion_actor: "cpa-aktivering".to_string(),
            activate_during_sync: true,
            schedule: ScheduleConfig::default(),
        }
    }
}

impl CpaSyncConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> CpaResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| CpaError::config(format!("Invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load_from_file(path: &Path) -> CpaResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CpaError::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> CpaResult<()> {
        if self.directory.trim().is_empty() {
            return Err(CpaError::config("directory must not be empty"));
        }
        if self.promotion_actor.trim().is_empty() {
            return Err(CpaError::config("promotion_actor must not be empty"));
        }
        if self.schedule.sync_interval_secs == 0 {
            return Err(CpaError::config("sync_interval_secs must be positive"));
        }
        if self.schedule.activation_enabled && self.schedule.activation_interval_secs == 0 {
            return Err(CpaError::config("activation_interval_secs must be positive"));
        }
        Ok(())
    }

    /// Set the due policy
    pub fn with_due_policy(mut self, policy: DuePolicy) -> Self {
        self.due_policy = policy;
        self
    }

    /// Set the activation file mode
    pub fn with_activation_file_mode(mut self, mode: ActivationFileMode) -> Self {
        self.activation_file_mode = mode;
        self
    }

    /// Set the release time zone
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Set the file-store directory
    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = directory.into();
        self
    }
}
