//! Compatibility tables between value types, operations, error kinds and
//! error strategies.
//!
//! The editor uses these to decide which choices to offer; the validator
//! uses the same tables to reject configurations the editor would never
//! have produced.

use crate::policy::{DataflowErrorKind, StrategyKind};
use crate::value::{Operation, TriggerStyle, ValueType};

const NUMERIC_OPERATIONS: &[Operation] = &[
    Operation::Set,
    Operation::Add,
    Operation::Subtract,
    Operation::Multiply,
    Operation::Divide,
];

const NUMERIC_DATA_FLOW_OPERATIONS: &[Operation] = &[
    Operation::Set,
    Operation::Add,
    Operation::Subtract,
    Operation::Multiply,
    Operation::Divide,
    Operation::Max,
    Operation::Min,
];

const BOOLEAN_OPERATIONS: &[Operation] = &[Operation::Set, Operation::Toggle];

const ENUM_OPERATIONS: &[Operation] = &[
    Operation::Set,
    Operation::Append,
    Operation::Remove,
    Operation::Clear,
];

const SET_ONLY: &[Operation] = &[Operation::Set];

const ALL_ERROR_KINDS: &[DataflowErrorKind] = &[
    DataflowErrorKind::NullValue,
    DataflowErrorKind::ZeroValue,
    DataflowErrorKind::Expired,
];

const NON_NUMERIC_ERROR_KINDS: &[DataflowErrorKind] =
    &[DataflowErrorKind::NullValue, DataflowErrorKind::Expired];

/// Operations an update trigger may apply to a variable of `value_type`.
///
/// `max` and `min` compare against a moving upstream value, so they are
/// only offered for data-flow triggers.
#[must_use]
pub fn allowed_operations(value_type: ValueType, style: TriggerStyle) -> &'static [Operation] {
    match value_type {
        ValueType::Number | ValueType::Percentage => match style {
            TriggerStyle::DataFlow => NUMERIC_DATA_FLOW_OPERATIONS,
            TriggerStyle::Condition | TriggerStyle::Timer => NUMERIC_OPERATIONS,
        },
        ValueType::Boolean => BOOLEAN_OPERATIONS,
        ValueType::Enum => ENUM_OPERATIONS,
        ValueType::String | ValueType::Time => SET_ONLY,
    }
}

/// Error kinds that can occur for an upstream value feeding `value_type`.
#[must_use]
pub fn allowed_error_kinds(value_type: ValueType) -> &'static [DataflowErrorKind] {
    if value_type.is_numeric() {
        ALL_ERROR_KINDS
    } else {
        NON_NUMERIC_ERROR_KINDS
    }
}

/// Strategies that make sense for `error_kind` under `operation`.
///
/// Propagating a zero into a division is never useful, so `still_update`
/// is withheld for that pair.
#[must_use]
pub fn allowed_strategies(
    error_kind: DataflowErrorKind,
    operation: Operation,
) -> Vec<StrategyKind> {
    StrategyKind::ALL
        .into_iter()
        .filter(|&strategy| is_strategy_allowed(error_kind, operation, strategy))
        .collect()
}

/// Returns whether `strategy` is offered for `error_kind` under `operation`.
#[must_use]
pub fn is_strategy_allowed(
    error_kind: DataflowErrorKind,
    operation: Operation,
    strategy: StrategyKind,
) -> bool {
    !(strategy == StrategyKind::StillUpdate
        && error_kind == DataflowErrorKind::ZeroValue
        && operation == Operation::Divide)
}
