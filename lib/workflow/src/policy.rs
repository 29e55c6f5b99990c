//! Error policies for data-flow triggered updates.
//!
//! When the upstream value feeding a data-flow trigger is null, zero or
//! stale, the trigger's [`ErrorPolicy`] for that [`DataflowErrorKind`]
//! decides what happens to the variable.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::num::NonZeroU32;

/// A recoverable problem with an upstream value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataflowErrorKind {
    /// The upstream produced null or nothing.
    NullValue,
    /// The upstream produced a numeric zero.
    ZeroValue,
    /// The upstream value is older than the configured expiry.
    Expired,
}

impl DataflowErrorKind {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NullValue => "null_value",
            Self::ZeroValue => "zero_value",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for DataflowErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a policy log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    #[default]
    Warn,
    Error,
}

/// Whether applying a policy should leave a trace in the run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorLog {
    /// Emit a log entry when the policy is applied.
    #[serde(default)]
    pub notify: bool,
    /// Entry severity. Only meaningful with `notify`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,
}

impl ErrorLog {
    /// No log entry.
    #[must_use]
    pub const fn silent() -> Self {
        Self {
            notify: false,
            level: None,
        }
    }

    /// Log at the given level.
    #[must_use]
    pub const fn notify(level: LogLevel) -> Self {
        Self {
            notify: true,
            level: Some(level),
        }
    }

    /// The level to log at, if this policy logs at all.
    #[must_use]
    pub fn effective_level(&self) -> Option<LogLevel> {
        self.notify.then(|| self.level.unwrap_or_default())
    }
}

/// The remedy configured for one error kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Leave the variable untouched.
    Skip {
        #[serde(default)]
        log: ErrorLog,
    },
    /// Apply the faulty value anyway.
    StillUpdate {
        #[serde(default)]
        log: ErrorLog,
    },
    /// Apply a fixed substitute value.
    ValueReplace {
        replacement: JsonValue,
        #[serde(default)]
        log: ErrorLog,
    },
    /// Apply the last good value, at most `max_use_times` times in a row.
    UsePreviousValue {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_use_times: Option<NonZeroU32>,
        #[serde(default)]
        log: ErrorLog,
    },
}

impl ErrorPolicy {
    /// Returns the strategy without its payload.
    #[must_use]
    pub const fn kind(&self) -> StrategyKind {
        match self {
            Self::Skip { .. } => StrategyKind::Skip,
            Self::StillUpdate { .. } => StrategyKind::StillUpdate,
            Self::ValueReplace { .. } => StrategyKind::ValueReplace,
            Self::UsePreviousValue { .. } => StrategyKind::UsePreviousValue,
        }
    }

    /// Returns the log settings shared by every strategy.
    #[must_use]
    pub const fn log(&self) -> &ErrorLog {
        match self {
            Self::Skip { log }
            | Self::StillUpdate { log }
            | Self::ValueReplace { log, .. }
            | Self::UsePreviousValue { log, .. } => log,
        }
    }
}

/// Strategy discriminant, used by the compatibility tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Skip,
    StillUpdate,
    ValueReplace,
    UsePreviousValue,
}

impl StrategyKind {
    /// Every strategy, in presentation order.
    pub const ALL: [Self; 4] = [
        Self::Skip,
        Self::StillUpdate,
        Self::ValueReplace,
        Self::UsePreviousValue,
    ];

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::StillUpdate => "still_update",
            Self::ValueReplace => "value_replace",
            Self::UsePreviousValue => "use_previous_value",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
