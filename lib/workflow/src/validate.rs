//! Save-time validation of trigger configurations.
//!
//! Validation never fails: it returns every problem it finds as a
//! [`FieldError`] so the editor can show them inline. An empty list means
//! the configuration may be saved.

use crate::dataflow::DataFlowSpec;
use crate::matrix::{allowed_error_kinds, allowed_operations, is_strategy_allowed};
use crate::policy::{DataflowErrorKind, ErrorPolicy};
use crate::recurrence::{RecurrenceSpec, ScheduledRecurrence, parse_time};
use crate::trigger::{TriggerSource, VariableTrigger};
use crate::value::{Operation, ValueType};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use tracing::{debug, instrument};

/// A problem with one field of a trigger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Dotted path to the offending field, e.g. `source.recurrence.time`.
    pub path: String,
    pub message: String,
}

impl FieldError {
    fn new(path: String, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn join(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

/// Validates a complete trigger.
#[instrument(level = "debug", skip_all, fields(trigger_id = %trigger.id))]
#[must_use]
pub fn validate_trigger(trigger: &VariableTrigger) -> Vec<FieldError> {
    let value_type = trigger.variable.value_type;
    let operation = trigger.action.operation();
    let mut errors = Vec::new();

    match &trigger.source {
        TriggerSource::Condition { branch } => {
            if branch.trim().is_empty() {
                errors.push(FieldError::new(
                    "source.branch".to_string(),
                    "branch must not be empty",
                ));
            }
        }
        TriggerSource::Timer { recurrence } => {
            errors.extend(validate_recurrence(recurrence, "source.recurrence"));
        }
        TriggerSource::DataFlow { upstream, spec } => {
            if upstream.port.trim().is_empty() {
                errors.push(FieldError::new(
                    "source.upstream.port".to_string(),
                    "upstream port must not be empty",
                ));
            }
            errors.extend(validate_data_flow(spec, value_type, operation, "source.spec"));
        }
    }

    if let Some(operation) = operation {
        let style = trigger.source.style();
        if !allowed_operations(value_type, style).contains(&operation) {
            errors.push(FieldError::new(
                "action.operation".to_string(),
                format!("{operation} is not allowed for {value_type} with {style} triggers"),
            ));
        }
    }

    debug!(errors = errors.len(), "validated trigger");
    errors
}

/// Validates a recurrence. `prefix` is prepended to every error path.
#[must_use]
pub fn validate_recurrence(spec: &RecurrenceSpec, prefix: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();

    match spec {
        RecurrenceSpec::Interval { amount, .. } => {
            if *amount == 0 {
                errors.push(FieldError::new(join(prefix, "amount"), "must be positive"));
            }
        }
        RecurrenceSpec::Scheduled(ScheduledRecurrence::Hourly {
            hourly_interval,
            minute_of_hour,
        }) => {
            if !(1..=24).contains(hourly_interval) {
                errors.push(FieldError::new(
                    join(prefix, "hourly_interval"),
                    "must be between 1 and 24",
                ));
            }
            if *minute_of_hour > 59 {
                errors.push(FieldError::new(
                    join(prefix, "minute_of_hour"),
                    "must be between 0 and 59",
                ));
            }
        }
        RecurrenceSpec::Scheduled(ScheduledRecurrence::Daily { time, days_of_week }) => {
            check_time(&mut errors, prefix, time);
            for (index, day) in days_of_week.iter().enumerate() {
                if !(1..=7).contains(day) {
                    errors.push(FieldError::new(
                        join(prefix, &format!("days_of_week[{index}]")),
                        "must be between 1 (Monday) and 7 (Sunday)",
                    ));
                }
            }
        }
        RecurrenceSpec::Scheduled(ScheduledRecurrence::Weekly { time, day_of_week }) => {
            check_time(&mut errors, prefix, time);
            if !(1..=7).contains(day_of_week) {
                errors.push(FieldError::new(
                    join(prefix, "day_of_week"),
                    "must be between 1 (Monday) and 7 (Sunday)",
                ));
            }
        }
        RecurrenceSpec::Scheduled(ScheduledRecurrence::Monthly {
            time,
            day_of_month,
            monthly_fallback,
        }) => {
            check_time(&mut errors, prefix, time);
            if let Err(e) = day_of_month.check() {
                errors.push(FieldError::new(join(prefix, "day_of_month"), e.to_string()));
            }
            match (day_of_month.needs_fallback(), monthly_fallback) {
                (true, None) => errors.push(FieldError::new(
                    join(prefix, "monthly_fallback"),
                    "required when day_of_month is 29 or later",
                )),
                (false, Some(_)) => errors.push(FieldError::new(
                    join(prefix, "monthly_fallback"),
                    "only allowed when day_of_month is 29 or later",
                )),
                _ => {}
            }
        }
    }
    errors
}

fn check_time(errors: &mut Vec<FieldError>, prefix: &str, time: &str) {
    if let Err(e) = parse_time(time) {
        errors.push(FieldError::new(join(prefix, "time"), e.to_string()));
    }
}

/// Validates a data-flow spec for a variable of `value_type`.
///
/// `operation` is the update operation, or `None` for get/reset actions.
#[must_use]
pub fn validate_data_flow(
    spec: &DataFlowSpec,
    value_type: ValueType,
    operation: Option<Operation>,
    prefix: &str,
) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if spec.expire_duration.amount == 0 {
        errors.push(FieldError::new(
            join(prefix, "expire_duration.amount"),
            "must be positive",
        ));
    }

    for (kind, policy) in &spec.error_policy {
        let policy_path = join(prefix, &format!("error_policy.{kind}"));

        if let ErrorPolicy::ValueReplace { replacement, .. } = policy {
            if let Some(message) =
                replacement_problem(*kind, value_type, operation, replacement)
            {
                errors.push(FieldError::new(join(&policy_path, "replacement"), message));
            }
        }

        if let Some(operation) = operation {
            if !is_strategy_allowed(*kind, operation, policy.kind()) {
                errors.push(FieldError::new(
                    join(&policy_path, "strategy"),
                    format!("{} is not allowed for {kind} with {operation}", policy.kind()),
                ));
            }
        }

        let log = policy.log();
        if log.level.is_some() && !log.notify {
            errors.push(FieldError::new(
                join(&policy_path, "log.level"),
                "level is only allowed when notify is enabled",
            ));
        }
    }

    let allowed = allowed_error_kinds(value_type);
    for kind in spec.error_policy.keys() {
        if !allowed.contains(kind) {
            errors.push(FieldError::new(
                join(prefix, &format!("error_policy.{kind}")),
                format!("{kind} does not apply to {value_type} variables"),
            ));
        }
    }

    errors
}

/// Returns why a replacement cannot stand in for the faulty value: it has
/// the wrong shape for the variable, or it would re-trigger the condition it
/// replaces.
fn replacement_problem(
    kind: DataflowErrorKind,
    value_type: ValueType,
    operation: Option<Operation>,
    replacement: &JsonValue,
) -> Option<&'static str> {
    if kind == DataflowErrorKind::NullValue && replacement.is_null() {
        return Some("replacement for a null value must not be null");
    }
    if !fits_value_type(value_type, replacement) {
        return Some(match value_type {
            ValueType::Number | ValueType::Percentage => "replacement must be a number",
            ValueType::Boolean => "replacement must be true or false",
            ValueType::String | ValueType::Time => "replacement must be a string",
            ValueType::Enum => "replacement must be a string or a list of strings",
        });
    }
    let is_zero = replacement.as_f64() == Some(0.0);
    if is_zero && operation == Some(Operation::Divide) {
        return Some("replacement must not be 0 when the operation is divide");
    }
    if kind == DataflowErrorKind::ZeroValue && is_zero {
        return Some("replacement for a zero value must not be 0");
    }
    None
}

fn fits_value_type(value_type: ValueType, value: &JsonValue) -> bool {
    match value_type {
        ValueType::Number | ValueType::Percentage => value.is_number(),
        ValueType::Boolean => value.is_boolean(),
        ValueType::String | ValueType::Time => value.is_string(),
        ValueType::Enum => match value {
            JsonValue::String(_) => true,
            JsonValue::Array(items) => items.iter().all(JsonValue::is_string),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::{ExpireDuration, ExpireUnit};
    use crate::policy::{ErrorLog, LogLevel};
    use crate::recurrence::{DayOfMonth, IntervalUnit, MonthlyFallback};
    use crate::trigger::{UpstreamRef, VariableRef};
    use crate::value::VariableAction;
    use serde_json::json;
    use varflow_core::{NodeId, VariableId};

    fn replace(value: JsonValue) -> ErrorPolicy {
        ErrorPolicy::ValueReplace {
            replacement: value,
            log: ErrorLog::silent(),
        }
    }

    fn flow_spec() -> DataFlowSpec {
        DataFlowSpec::new(ExpireDuration::new(10, ExpireUnit::Min))
    }

    fn trigger(
        value_type: ValueType,
        action: VariableAction,
        source: TriggerSource,
    ) -> VariableTrigger {
        VariableTrigger::new(
            VariableRef {
                id: VariableId::new(),
                name: "ratio".to_string(),
                value_type,
            },
            action,
            source,
        )
    }

    #[test]
    fn valid_recurrences_pass() {
        for spec in [
            RecurrenceSpec::every(5, IntervalUnit::Minute),
            RecurrenceSpec::hourly(24, 59),
            RecurrenceSpec::daily("09:00", vec![6, 7]),
            RecurrenceSpec::weekly("23:59", 7),
            RecurrenceSpec::monthly("00:00", DayOfMonth::Last, None),
            RecurrenceSpec::monthly("12:30", DayOfMonth::Day(28), None),
            RecurrenceSpec::monthly("12:30", DayOfMonth::Day(31), Some(MonthlyFallback::Skip)),
        ] {
            assert_eq!(validate_recurrence(&spec, ""), Vec::new(), "{spec:?}");
        }
    }

    #[test]
    fn recurrence_numeric_ranges() {
        let errors = validate_recurrence(&RecurrenceSpec::every(0, IntervalUnit::Second), "r");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "r.amount");

        let errors = validate_recurrence(&RecurrenceSpec::hourly(0, 60), "");
        let paths: Vec<_> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["hourly_interval", "minute_of_hour"]);

        let errors = validate_recurrence(&RecurrenceSpec::daily("09:00", vec![1, 8]), "");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "days_of_week[1]");

        let errors = validate_recurrence(&RecurrenceSpec::weekly("09:00", 0), "");
        assert_eq!(errors[0].path, "day_of_week");
    }

    #[test]
    fn recurrence_time_must_be_well_formed() {
        let errors = validate_recurrence(&RecurrenceSpec::weekly("9am", 1), "source.recurrence");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "source.recurrence.time");
        assert!(errors[0].message.contains("HH:MM"));
    }

    #[test]
    fn monthly_fallback_presence() {
        let missing = validate_recurrence(
            &RecurrenceSpec::monthly("08:00", DayOfMonth::Day(30), None),
            "",
        );
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].path, "monthly_fallback");
        assert!(missing[0].message.contains("required"));

        let extra = validate_recurrence(
            &RecurrenceSpec::monthly("08:00", DayOfMonth::First, Some(MonthlyFallback::LastDay)),
            "",
        );
        assert_eq!(extra.len(), 1);
        assert!(extra[0].message.contains("only allowed"));

        let out_of_range = validate_recurrence(
            &RecurrenceSpec::monthly("08:00", DayOfMonth::Day(0), None),
            "",
        );
        assert_eq!(out_of_range.len(), 1);
        assert_eq!(out_of_range[0].path, "day_of_month");
        assert_eq!(
            out_of_range[0].message,
            "invalid day of month 0: expected 1 to 31"
        );
    }

    #[test]
    fn zero_replacement_for_divide_is_one_error() {
        let spec = flow_spec().with_policy(DataflowErrorKind::ZeroValue, replace(json!(0)));
        let errors = validate_data_flow(&spec, ValueType::Number, Some(Operation::Divide), "");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "error_policy.zero_value.replacement");
        assert!(errors[0].message.contains("must not be 0"));
    }

    #[test]
    fn zero_replacement_rejected_for_every_divide_error_kind() {
        for kind in [
            DataflowErrorKind::NullValue,
            DataflowErrorKind::ZeroValue,
            DataflowErrorKind::Expired,
        ] {
            let spec = flow_spec().with_policy(kind, replace(json!(0.0)));
            let errors = validate_data_flow(&spec, ValueType::Number, Some(Operation::Divide), "");
            assert_eq!(errors.len(), 1, "{kind}");
        }

        let spec = flow_spec().with_policy(DataflowErrorKind::Expired, replace(json!(0)));
        assert!(validate_data_flow(&spec, ValueType::Number, Some(Operation::Add), "").is_empty());
    }

    #[test]
    fn replacement_must_not_retrigger_its_condition() {
        let spec = flow_spec().with_policy(DataflowErrorKind::NullValue, replace(JsonValue::Null));
        let errors = validate_data_flow(&spec, ValueType::String, Some(Operation::Set), "");
        assert_eq!(errors.len(), 1);

        let spec = flow_spec().with_policy(DataflowErrorKind::ZeroValue, replace(json!(0)));
        let errors = validate_data_flow(&spec, ValueType::Number, Some(Operation::Add), "");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn replacement_must_fit_value_type() {
        for wrong in [json!("0"), json!(true), json!([1])] {
            let spec = flow_spec().with_policy(DataflowErrorKind::NullValue, replace(wrong));
            let errors =
                validate_data_flow(&spec, ValueType::Number, Some(Operation::Divide), "");
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].path, "error_policy.null_value.replacement");
            assert_eq!(errors[0].message, "replacement must be a number");
        }

        let cases = [
            (ValueType::Percentage, Operation::Set, json!(12.5), true),
            (ValueType::Boolean, Operation::Set, json!(false), true),
            (ValueType::Boolean, Operation::Set, json!("false"), false),
            (ValueType::String, Operation::Set, json!("n/a"), true),
            (ValueType::Time, Operation::Set, json!(900), false),
            (ValueType::Enum, Operation::Append, json!("red"), true),
            (ValueType::Enum, Operation::Append, json!(["red", "blue"]), true),
            (ValueType::Enum, Operation::Append, json!(["red", 1]), false),
            (ValueType::Enum, Operation::Set, json!({ "red": true }), false),
        ];
        for (value_type, operation, replacement, ok) in cases {
            let spec = flow_spec().with_policy(DataflowErrorKind::Expired, replace(replacement));
            let errors = validate_data_flow(&spec, value_type, Some(operation), "");
            assert_eq!(errors.is_empty(), ok, "{value_type} {errors:?}");
        }
    }

    #[test]
    fn still_update_rejected_for_zero_divide() {
        let spec = flow_spec().with_policy(
            DataflowErrorKind::ZeroValue,
            ErrorPolicy::StillUpdate {
                log: ErrorLog::silent(),
            },
        );
        let errors = validate_data_flow(&spec, ValueType::Number, Some(Operation::Divide), "");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "error_policy.zero_value.strategy");
    }

    #[test]
    fn error_kinds_must_fit_value_type() {
        let spec = flow_spec().with_policy(
            DataflowErrorKind::ZeroValue,
            ErrorPolicy::Skip {
                log: ErrorLog::notify(LogLevel::Warn),
            },
        );
        let errors = validate_data_flow(&spec, ValueType::Boolean, Some(Operation::Toggle), "spec");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "spec.error_policy.zero_value");
        assert!(errors[0].message.contains("boolean"));
    }

    #[test]
    fn log_level_requires_notify() {
        let spec = flow_spec().with_policy(
            DataflowErrorKind::Expired,
            ErrorPolicy::Skip {
                log: ErrorLog {
                    notify: false,
                    level: Some(LogLevel::Error),
                },
            },
        );
        let errors = validate_data_flow(&spec, ValueType::Number, None, "");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "error_policy.expired.log.level");
    }

    #[test]
    fn trigger_operation_must_fit_style() {
        let timer_max = trigger(
            ValueType::Number,
            VariableAction::Update {
                operation: Operation::Max,
            },
            TriggerSource::Timer {
                recurrence: RecurrenceSpec::every(1, IntervalUnit::Hour),
            },
        );
        let errors = validate_trigger(&timer_max);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "action.operation");
        assert_eq!(errors[0].message, "max is not allowed for number with timer triggers");

        let flow_max = trigger(
            ValueType::Number,
            VariableAction::Update {
                operation: Operation::Max,
            },
            TriggerSource::DataFlow {
                upstream: UpstreamRef {
                    node_id: NodeId::new(),
                    port: "out".to_string(),
                },
                spec: flow_spec(),
            },
        );
        assert!(validate_trigger(&flow_max).is_empty());
    }

    #[test]
    fn trigger_collects_nested_errors() {
        let bad = trigger(
            ValueType::Number,
            VariableAction::Update {
                operation: Operation::Divide,
            },
            TriggerSource::DataFlow {
                upstream: UpstreamRef {
                    node_id: NodeId::new(),
                    port: "value".to_string(),
                },
                spec: flow_spec().with_policy(DataflowErrorKind::ZeroValue, replace(json!(0))),
            },
        );
        let errors = validate_trigger(&bad);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "source.spec.error_policy.zero_value.replacement");
        assert_eq!(
            errors[0].to_string(),
            "source.spec.error_policy.zero_value.replacement: replacement must not be 0 when the operation is divide"
        );

        let reset = trigger(
            ValueType::Boolean,
            VariableAction::Reset,
            TriggerSource::Condition {
                branch: " ".to_string(),
            },
        );
        let errors = validate_trigger(&reset);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "source.branch");
    }
}
