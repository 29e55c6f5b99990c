//! Variable triggers.
//!
//! A trigger binds a [`VariableAction`] on one workflow variable to a
//! source that decides when the action runs: a condition branch, a
//! recurring timer, or a data-flow link to an upstream node's output.

use crate::dataflow::DataFlowSpec;
use crate::recurrence::RecurrenceSpec;
use crate::value::{TriggerStyle, ValueType, VariableAction};
use serde::{Deserialize, Serialize};
use varflow_core::{NodeId, TriggerId, VariableId};

/// The variable a trigger acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRef {
    pub id: VariableId,
    /// Display name, only used in messages.
    pub name: String,
    pub value_type: ValueType,
}

/// An output port of an upstream node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamRef {
    pub node_id: NodeId,
    pub port: String,
}

/// What fires the trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerSource {
    /// Runs when the named branch of a condition node is taken.
    Condition { branch: String },
    /// Runs on a recurring timer.
    Timer { recurrence: RecurrenceSpec },
    /// Runs whenever the upstream output changes.
    DataFlow {
        upstream: UpstreamRef,
        spec: DataFlowSpec,
    },
}

impl TriggerSource {
    /// Returns the trigger style.
    #[must_use]
    pub const fn style(&self) -> TriggerStyle {
        match self {
            Self::Condition { .. } => TriggerStyle::Condition,
            Self::Timer { .. } => TriggerStyle::Timer,
            Self::DataFlow { .. } => TriggerStyle::DataFlow,
        }
    }
}

/// A variable mutation attached to a trigger source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableTrigger {
    pub id: TriggerId,
    pub variable: VariableRef,
    pub action: VariableAction,
    pub source: TriggerSource,
}

impl VariableTrigger {
    /// Creates a trigger with a fresh id.
    #[must_use]
    pub fn new(variable: VariableRef, action: VariableAction, source: TriggerSource) -> Self {
        Self {
            id: TriggerId::new(),
            variable,
            action,
            source,
        }
    }

    /// Returns the recurrence, for timer triggers.
    #[must_use]
    pub const fn recurrence(&self) -> Option<&RecurrenceSpec> {
        match &self.source {
            TriggerSource::Timer { recurrence } => Some(recurrence),
            TriggerSource::Condition { .. } | TriggerSource::DataFlow { .. } => None,
        }
    }
}
