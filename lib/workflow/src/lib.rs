//! Variable triggers for varflow workflows.
//!
//! This crate provides:
//!
//! - **Trigger model**: variable actions bound to condition, timer or
//!   data-flow sources
//! - **Recurrence specs**: interval and calendar schedules for timers
//! - **Value-type matrix**: which operations, error kinds and error
//!   strategies apply to which variable types
//! - **Data-flow policies**: classification of faulty upstream values and
//!   resolution of the configured error policy
//! - **Validation**: field-level checks run before a trigger is saved

pub mod dataflow;
pub mod error;
pub mod matrix;
pub mod policy;
pub mod recurrence;
pub mod trigger;
pub mod validate;
pub mod value;

pub use dataflow::{
    DataFlowSpec, ExpireDuration, ExpireUnit, Handled, LogEntry, Outcome, Resolution,
    ResolveContext, resolve,
};
pub use error::SpecError;
pub use matrix::{allowed_error_kinds, allowed_operations, allowed_strategies};
pub use policy::{DataflowErrorKind, ErrorLog, ErrorPolicy, LogLevel, StrategyKind};
pub use recurrence::{
    DayOfMonth, IntervalUnit, MonthlyFallback, RecurrenceSpec, ScheduledRecurrence,
};
pub use trigger::{TriggerSource, UpstreamRef, VariableRef, VariableTrigger};
pub use validate::{FieldError, validate_data_flow, validate_recurrence, validate_trigger};
pub use value::{Operation, TriggerStyle, ValueType, VariableAction};
