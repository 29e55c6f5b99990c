//! Variable value types, update operations and trigger styles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The declared type of a workflow variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Plain number.
    Number,
    /// Number interpreted as a percentage.
    Percentage,
    /// True/false flag.
    Boolean,
    /// Free text.
    String,
    /// Time of day or timestamp text.
    Time,
    /// One or more members of a fixed option set.
    Enum,
}

impl ValueType {
    /// Returns whether values of this type support arithmetic.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Number | Self::Percentage)
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Percentage => "percentage",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Time => "time",
            Self::Enum => "enum",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An update operation applied to a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Overwrite the current value.
    Set,
    /// Add the incoming value.
    Add,
    /// Subtract the incoming value.
    Subtract,
    /// Multiply by the incoming value.
    Multiply,
    /// Divide by the incoming value.
    Divide,
    /// Keep the larger of current and incoming.
    Max,
    /// Keep the smaller of current and incoming.
    Min,
    /// Flip a boolean.
    Toggle,
    /// Add members to an enum set.
    Append,
    /// Remove members from an enum set.
    Remove,
    /// Empty an enum set.
    Clear,
}

impl Operation {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
            Self::Max => "max",
            Self::Min => "min",
            Self::Toggle => "toggle",
            Self::Append => "append",
            Self::Remove => "remove",
            Self::Clear => "clear",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a variable mutation is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerStyle {
    /// Fired when a condition branch is taken.
    Condition,
    /// Fired by a recurring timer.
    Timer,
    /// Fired whenever an upstream node's output changes.
    DataFlow,
}

impl fmt::Display for TriggerStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Condition => "condition",
            Self::Timer => "timer",
            Self::DataFlow => "data_flow",
        })
    }
}

/// What a trigger does to its variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariableAction {
    /// Read the variable into the flow.
    Get,
    /// Apply an operation.
    Update {
        /// The operation to apply.
        operation: Operation,
    },
    /// Restore the variable's initial value.
    Reset,
}

impl VariableAction {
    /// Returns the update operation, if this action is an update.
    #[must_use]
    pub const fn operation(&self) -> Option<Operation> {
        match self {
            Self::Update { operation } => Some(*operation),
            Self::Get | Self::Reset => None,
        }
    }
}
