//! Error types for the preview tool.

use std::fmt;

/// Errors from loading or previewing a trigger document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewError {
    /// The document could not be read.
    ReadFailed { path: String, reason: String },
    /// The document is not a valid trigger.
    ParseFailed { path: String, reason: String },
    /// The configured UTC offset is out of range.
    InvalidOffset { minutes: i32 },
    /// Schedule evaluation failed.
    ScheduleFailed { reason: String },
}

impl fmt::Display for PreviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed { path, reason } => write!(f, "failed to read {path}: {reason}"),
            Self::ParseFailed { path, reason } => {
                write!(f, "{path} is not a valid trigger: {reason}")
            }
            Self::InvalidOffset { minutes } => {
                write!(f, "UTC offset of {minutes} minutes is out of range")
            }
            Self::ScheduleFailed { reason } => write!(f, "schedule evaluation failed: {reason}"),
        }
    }
}

impl std::error::Error for PreviewError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_error_display() {
        let err = PreviewError::ParseFailed {
            path: "trigger.json".to_string(),
            reason: "missing field `source`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "trigger.json is not a valid trigger: missing field `source`"
        );
    }
}
