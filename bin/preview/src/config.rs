//! Preview configuration.
//!
//! Loaded via the `config` crate from an optional TOML file, then from
//! environment variables prefixed with `VARFLOW__` (nested keys separated by
//! `__`, e.g. `VARFLOW__SCHEDULE__MAX_MONTH_LOOKAHEAD=24`).

use chrono::FixedOffset;
use serde::Deserialize;
use std::path::Path;
use varflow_scheduler::ScheduleOptions;

/// Settings for the preview tool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PreviewConfig {
    /// How many upcoming firings to list for timer triggers.
    #[serde(default = "default_upcoming_count")]
    pub upcoming_count: usize,

    /// Offset from UTC, in minutes, of the wall clock schedules are
    /// evaluated in.
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Schedule evaluation options.
    #[serde(default)]
    pub schedule: ScheduleOptions,
}

fn default_upcoming_count() -> usize {
    5
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            upcoming_count: default_upcoming_count(),
            utc_offset_minutes: 0,
            schedule: ScheduleOptions::default(),
        }
    }
}

impl PreviewConfig {
    /// Loads configuration from `file` (if given) and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value has the
    /// wrong type.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(
                config::File::from(file)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        builder
            .add_source(
                config::Environment::with_prefix("VARFLOW")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Returns the configured offset, or `None` when it is out of range.
    #[must_use]
    pub fn offset(&self) -> Option<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
    }
}
