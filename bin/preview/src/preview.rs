//! Builds a human-readable preview of a trigger.

use crate::config::PreviewConfig;
use crate::error::PreviewError;
use chrono::{DateTime, FixedOffset, Utc};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};
use varflow_core::{Result, TriggerId};
use varflow_scheduler::{CronSchedule, ScheduleCalculator};
use varflow_workflow::dataflow::default_policy;
use varflow_workflow::{
    DataflowErrorKind, FieldError, Operation, StrategyKind, TriggerSource, VariableTrigger,
    allowed_error_kinds, allowed_strategies, validate_trigger,
};

/// Reads and parses a trigger document.
///
/// # Errors
///
/// Returns [`PreviewError::ReadFailed`] or [`PreviewError::ParseFailed`].
pub fn load_trigger(path: &Path) -> Result<VariableTrigger, PreviewError> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|e| PreviewError::ReadFailed {
        path: display.clone(),
        reason: e.to_string(),
    })?;
    let trigger = serde_json::from_str(&raw).map_err(|e| PreviewError::ParseFailed {
        path: display,
        reason: e.to_string(),
    })?;
    Ok(trigger)
}

/// Error strategy summary for one error kind of a data-flow trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyLine {
    pub kind: DataflowErrorKind,
    /// The configured strategy, if any.
    pub configured: Option<StrategyKind>,
    /// What the runtime will apply.
    pub effective: StrategyKind,
    pub allowed: Vec<StrategyKind>,
}

/// Source-specific part of a preview.
#[derive(Debug, Clone, PartialEq)]
pub enum Detail {
    Condition {
        branch: String,
    },
    Timer {
        cron: CronSchedule,
        upcoming: Vec<DateTime<FixedOffset>>,
    },
    DataFlow {
        strategies: Vec<StrategyLine>,
    },
}

/// Everything the preview shows for one trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewReport {
    pub trigger_id: TriggerId,
    pub variable: String,
    pub errors: Vec<FieldError>,
    pub detail: Detail,
}

impl PreviewReport {
    /// Returns whether the trigger could be saved as is.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validates `trigger` and computes its preview relative to `now`.
///
/// Upcoming firings are only computed for triggers that pass validation.
///
/// # Errors
///
/// Returns [`PreviewError::InvalidOffset`] for an unusable configured
/// offset and [`PreviewError::ScheduleFailed`] when a valid schedule still
/// cannot be evaluated.
pub fn build_report(
    trigger: &VariableTrigger,
    config: &PreviewConfig,
    now: DateTime<Utc>,
) -> Result<PreviewReport, PreviewError> {
    let errors = validate_trigger(trigger);
    debug!(errors = errors.len(), "validated trigger document");

    let detail = match &trigger.source {
        TriggerSource::Condition { branch } => Detail::Condition {
            branch: branch.clone(),
        },
        TriggerSource::Timer { recurrence } => {
            let offset = config.offset().ok_or(PreviewError::InvalidOffset {
                minutes: config.utc_offset_minutes,
            })?;
            let cron = CronSchedule::from_recurrence(recurrence).with_timezone(offset.to_string());
            let upcoming = if errors.is_empty() {
                ScheduleCalculator::new(config.schedule)
                    .upcoming(recurrence, &now.with_timezone(&offset), config.upcoming_count)
                    .map_err(|e| PreviewError::ScheduleFailed {
                        reason: e.to_string(),
                    })?
            } else {
                Vec::new()
            };
            Detail::Timer { cron, upcoming }
        }
        TriggerSource::DataFlow { spec, .. } => {
            let operation = trigger.action.operation().unwrap_or(Operation::Set);
            let strategies = allowed_error_kinds(trigger.variable.value_type)
                .iter()
                .map(|&kind| {
                    let configured = spec.error_policy.get(&kind).map(|policy| policy.kind());
                    StrategyLine {
                        kind,
                        configured,
                        effective: configured
                            .unwrap_or_else(|| default_policy(kind, operation).kind()),
                        allowed: allowed_strategies(kind, operation),
                    }
                })
                .collect();
            Detail::DataFlow { strategies }
        }
    };

    info!(trigger_id = %trigger.id, valid = errors.is_empty(), "built trigger preview");
    Ok(PreviewReport {
        trigger_id: trigger.id,
        variable: trigger.variable.name.clone(),
        errors,
        detail,
    })
}

impl fmt::Display for PreviewReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "trigger {} on variable '{}'", self.trigger_id, self.variable)?;
        if self.errors.is_empty() {
            writeln!(f, "  valid")?;
        } else {
            writeln!(f, "  {} problem(s):", self.errors.len())?;
            for error in &self.errors {
                writeln!(f, "    {error}")?;
            }
        }
        match &self.detail {
            Detail::Condition { branch } => writeln!(f, "  fires on branch '{branch}'"),
            Detail::Timer { cron, upcoming } => {
                write!(f, "  cron: {}", cron.expression)?;
                if let Some(timezone) = &cron.timezone {
                    write!(f, " ({timezone})")?;
                }
                writeln!(f)?;
                for run in upcoming {
                    writeln!(f, "    next: {}", run.to_rfc3339())?;
                }
                Ok(())
            }
            Detail::DataFlow { strategies } => {
                for line in strategies {
                    let origin = if line.configured.is_some() {
                        "configured"
                    } else {
                        "default"
                    };
                    let allowed: Vec<&str> = line.allowed.iter().map(|s| s.as_str()).collect();
                    writeln!(
                        f,
                        "  {}: {} ({origin}; allowed: {})",
                        line.kind,
                        line.effective,
                        allowed.join(", ")
                    )?;
                }
                Ok(())
            }
        }
    }
}
