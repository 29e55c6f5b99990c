//! Data-flow trigger configuration and error-policy resolution.
//!
//! A data-flow trigger updates a variable every time an upstream node's
//! output changes. Before the value is applied it is classified (null,
//! zero, stale) and, if faulty, the configured [`ErrorPolicy`] is resolved
//! into an [`Outcome`].
//!
//! Resolution is a pure function. The "last good value" and the number of
//! times it has been reused belong to the caller, which passes them in
//! through [`ResolveContext`] and updates them from the [`Resolution`].

use crate::matrix::{allowed_error_kinds, is_strategy_allowed};
use crate::policy::{DataflowErrorKind, ErrorLog, ErrorPolicy, LogLevel, StrategyKind};
use crate::value::{Operation, ValueType};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Unit of an expiry duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpireUnit {
    Ms,
    S,
    Min,
    Hour,
    Day,
}

/// How long an upstream value stays fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpireDuration {
    pub unit: ExpireUnit,
    /// Must be positive.
    pub amount: u32,
}

impl ExpireDuration {
    /// Creates an expiry duration.
    #[must_use]
    pub const fn new(amount: u32, unit: ExpireUnit) -> Self {
        Self { unit, amount }
    }

    /// Converts to a chrono duration.
    #[must_use]
    pub fn to_duration(self) -> Duration {
        let amount = i64::from(self.amount);
        match self.unit {
            ExpireUnit::Ms => Duration::milliseconds(amount),
            ExpireUnit::S => Duration::seconds(amount),
            ExpireUnit::Min => Duration::minutes(amount),
            ExpireUnit::Hour => Duration::hours(amount),
            ExpireUnit::Day => Duration::days(amount),
        }
    }
}

/// Configuration of a data-flow triggered update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFlowSpec {
    /// Values older than this are treated as [`DataflowErrorKind::Expired`].
    pub expire_duration: ExpireDuration,
    /// Policy per error kind. Kinds without an entry use
    /// [`default_policy`].
    #[serde(default)]
    pub error_policy: BTreeMap<DataflowErrorKind, ErrorPolicy>,
}

impl DataFlowSpec {
    /// Creates a spec with no configured policies.
    #[must_use]
    pub fn new(expire_duration: ExpireDuration) -> Self {
        Self {
            expire_duration,
            error_policy: BTreeMap::new(),
        }
    }

    /// Sets the policy for an error kind.
    #[must_use]
    pub fn with_policy(mut self, kind: DataflowErrorKind, policy: ErrorPolicy) -> Self {
        self.error_policy.insert(kind, policy);
        self
    }

    /// Classifies an upstream value.
    ///
    /// Checks run in order null, expired, zero, and only kinds that can
    /// occur for `value_type` are reported. A value is expired once its age
    /// reaches the expiry duration.
    #[must_use]
    pub fn detect(
        &self,
        value_type: ValueType,
        candidate: &JsonValue,
        produced_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<DataflowErrorKind> {
        let allowed = allowed_error_kinds(value_type);
        let age = now.signed_duration_since(produced_at);
        [
            (DataflowErrorKind::NullValue, candidate.is_null()),
            (
                DataflowErrorKind::Expired,
                age >= self.expire_duration.to_duration(),
            ),
            (DataflowErrorKind::ZeroValue, is_numeric_zero(candidate)),
        ]
        .into_iter()
        .find(|(kind, hit)| *hit && allowed.contains(kind))
        .map(|(kind, _)| kind)
    }

    /// Classifies an upstream value and resolves the policy for it.
    ///
    /// A clean value resolves to an update with the value itself; the
    /// caller should then record it as the last good value and reset its
    /// reuse counter.
    #[must_use]
    pub fn handle(
        &self,
        value_type: ValueType,
        operation: Operation,
        ctx: &ResolveContext<'_>,
        produced_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Handled {
        let Some(kind) = self.detect(value_type, ctx.candidate, produced_at, now) else {
            return Handled {
                error_kind: None,
                resolution: Resolution::update(ctx.candidate.clone()),
            };
        };
        let resolution = match self.error_policy.get(&kind) {
            Some(policy) => resolve(kind, policy, ctx),
            None => resolve(kind, &default_policy(kind, operation), ctx),
        };
        Handled {
            error_kind: Some(kind),
            resolution,
        }
    }
}

/// The policy applied to an error kind that has no configured entry:
/// update anyway where that is allowed, otherwise skip.
#[must_use]
pub fn default_policy(kind: DataflowErrorKind, operation: Operation) -> ErrorPolicy {
    if is_strategy_allowed(kind, operation, StrategyKind::StillUpdate) {
        ErrorPolicy::StillUpdate {
            log: ErrorLog::silent(),
        }
    } else {
        ErrorPolicy::Skip {
            log: ErrorLog::silent(),
        }
    }
}

fn is_numeric_zero(value: &JsonValue) -> bool {
    value.as_f64() == Some(0.0)
}

/// Caller-owned state passed to [`resolve`].
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    /// The value the upstream just produced.
    pub candidate: &'a JsonValue,
    /// The last value that was applied without error, if any.
    pub previous: Option<&'a JsonValue>,
    /// How many consecutive times `previous` has already been reused.
    pub previous_uses: u32,
}

impl<'a> ResolveContext<'a> {
    /// Context for a candidate with no history.
    #[must_use]
    pub const fn new(candidate: &'a JsonValue) -> Self {
        Self {
            candidate,
            previous: None,
            previous_uses: 0,
        }
    }

    /// Adds the last good value and its reuse count.
    #[must_use]
    pub const fn with_previous(mut self, previous: &'a JsonValue, previous_uses: u32) -> Self {
        self.previous = Some(previous);
        self.previous_uses = previous_uses;
        self
    }
}

/// What should happen to the variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Apply the operation with this value.
    Update(JsonValue),
    /// Leave the variable untouched.
    Skip,
    /// Leave the variable untouched; only the log entry matters.
    LogOnly,
}

/// A run-log entry requested by a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub error_kind: DataflowErrorKind,
    pub message: String,
}

impl LogEntry {
    /// Writes the entry through `tracing` at its level.
    pub fn emit(&self) {
        match self.level {
            LogLevel::Warn => {
                tracing::warn!(error_kind = %self.error_kind, "{}", self.message);
            }
            LogLevel::Error => {
                tracing::error!(error_kind = %self.error_kind, "{}", self.message);
            }
        }
    }
}

/// Result of resolving a policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub outcome: Outcome,
    pub log: Option<LogEntry>,
    /// The previous value was reused; the caller must increment its
    /// reuse counter.
    pub consumed_previous: bool,
}

impl Resolution {
    fn update(value: JsonValue) -> Self {
        Self {
            outcome: Outcome::Update(value),
            log: None,
            consumed_previous: false,
        }
    }
}

/// Result of [`DataFlowSpec::handle`].
#[derive(Debug, Clone, PartialEq)]
pub struct Handled {
    /// The detected problem, `None` for a clean value.
    pub error_kind: Option<DataflowErrorKind>,
    pub resolution: Resolution,
}

/// Resolves `policy` for an upstream value that exhibited `error_kind`.
#[instrument(level = "debug", skip(policy, ctx), fields(strategy = %policy.kind()))]
#[must_use]
pub fn resolve(
    error_kind: DataflowErrorKind,
    policy: &ErrorPolicy,
    ctx: &ResolveContext<'_>,
) -> Resolution {
    let entry = |level: LogLevel, message: String| LogEntry {
        level,
        error_kind,
        message,
    };
    let optional_entry = |message: String| {
        policy
            .log()
            .effective_level()
            .map(|level| entry(level, message))
    };
    let forced_level = policy.log().level.unwrap_or_default();

    match policy {
        ErrorPolicy::Skip { .. } => Resolution {
            outcome: Outcome::Skip,
            log: optional_entry(format!("upstream {error_kind}: update skipped")),
            consumed_previous: false,
        },
        ErrorPolicy::StillUpdate { .. } => Resolution {
            outcome: Outcome::Update(ctx.candidate.clone()),
            log: optional_entry(format!("upstream {error_kind}: applied value anyway")),
            consumed_previous: false,
        },
        ErrorPolicy::ValueReplace { replacement, .. } => Resolution {
            outcome: Outcome::Update(replacement.clone()),
            log: optional_entry(format!(
                "upstream {error_kind}: applied replacement {replacement}"
            )),
            consumed_previous: false,
        },
        ErrorPolicy::UsePreviousValue { max_use_times, .. } => {
            let Some(previous) = ctx.previous else {
                debug!("no previous value recorded");
                return Resolution {
                    outcome: Outcome::LogOnly,
                    log: Some(entry(
                        forced_level,
                        format!("upstream {error_kind}: no previous value to reuse"),
                    )),
                    consumed_previous: false,
                };
            };
            let exhausted = max_use_times.is_some_and(|limit| ctx.previous_uses >= limit.get());
            if exhausted {
                debug!(uses = ctx.previous_uses, "previous value reuse limit reached");
                return Resolution {
                    outcome: Outcome::Skip,
                    log: Some(entry(
                        forced_level,
                        format!(
                            "upstream {error_kind}: previous value reused {} times, update skipped",
                            ctx.previous_uses
                        ),
                    )),
                    consumed_previous: false,
                };
            }
            Resolution {
                outcome: Outcome::Update(previous.clone()),
                log: optional_entry(format!("upstream {error_kind}: reused previous value")),
                consumed_previous: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::num::NonZeroU32;

    fn use_previous(limit: Option<u32>) -> ErrorPolicy {
        ErrorPolicy::UsePreviousValue {
            max_use_times: limit.and_then(NonZeroU32::new),
            log: ErrorLog::silent(),
        }
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + seconds, 0).expect("timestamp")
    }

    #[test]
    fn skip_logs_only_when_notifying() {
        let candidate = JsonValue::Null;
        let ctx = ResolveContext::new(&candidate);

        let quiet = resolve(
            DataflowErrorKind::NullValue,
            &ErrorPolicy::Skip {
                log: ErrorLog::silent(),
            },
            &ctx,
        );
        assert_eq!(quiet.outcome, Outcome::Skip);
        assert!(quiet.log.is_none());

        let loud = resolve(
            DataflowErrorKind::NullValue,
            &ErrorPolicy::Skip {
                log: ErrorLog::notify(LogLevel::Error),
            },
            &ctx,
        );
        assert_eq!(loud.outcome, Outcome::Skip);
        let log = loud.log.expect("log entry");
        assert_eq!(log.level, LogLevel::Error);
        assert_eq!(log.error_kind, DataflowErrorKind::NullValue);
        log.emit();
    }

    #[test]
    fn still_update_propagates_candidate() {
        let candidate = json!(0);
        let resolution = resolve(
            DataflowErrorKind::ZeroValue,
            &ErrorPolicy::StillUpdate {
                log: ErrorLog::silent(),
            },
            &ResolveContext::new(&candidate),
        );
        assert_eq!(resolution.outcome, Outcome::Update(json!(0)));
    }

    #[test]
    fn value_replace_applies_replacement() {
        let candidate = json!(0);
        let resolution = resolve(
            DataflowErrorKind::ZeroValue,
            &ErrorPolicy::ValueReplace {
                replacement: json!(1),
                log: ErrorLog::notify(LogLevel::Warn),
            },
            &ResolveContext::new(&candidate),
        );
        assert_eq!(resolution.outcome, Outcome::Update(json!(1)));
        assert_eq!(resolution.log.map(|l| l.level), Some(LogLevel::Warn));
    }

    #[test]
    fn use_previous_within_limit() {
        let candidate = JsonValue::Null;
        let previous = json!(42);
        let ctx = ResolveContext::new(&candidate).with_previous(&previous, 1);

        let resolution = resolve(DataflowErrorKind::NullValue, &use_previous(Some(2)), &ctx);
        assert_eq!(resolution.outcome, Outcome::Update(json!(42)));
        assert!(resolution.consumed_previous);
        assert!(resolution.log.is_none());
    }

    #[test]
    fn use_previous_exhausted_skips_with_log() {
        let candidate = JsonValue::Null;
        let previous = json!(42);
        let ctx = ResolveContext::new(&candidate).with_previous(&previous, 2);

        let resolution = resolve(DataflowErrorKind::NullValue, &use_previous(Some(2)), &ctx);
        assert_eq!(resolution.outcome, Outcome::Skip);
        assert!(!resolution.consumed_previous);
        assert!(resolution.log.is_some());
    }

    #[test]
    fn use_previous_unlimited() {
        let candidate = JsonValue::Null;
        let previous = json!("last");
        let ctx = ResolveContext::new(&candidate).with_previous(&previous, 10_000);

        let resolution = resolve(DataflowErrorKind::Expired, &use_previous(None), &ctx);
        assert_eq!(resolution.outcome, Outcome::Update(json!("last")));
    }

    #[test]
    fn use_previous_without_history_is_log_only() {
        let candidate = JsonValue::Null;
        let resolution = resolve(
            DataflowErrorKind::NullValue,
            &use_previous(Some(3)),
            &ResolveContext::new(&candidate),
        );
        assert_eq!(resolution.outcome, Outcome::LogOnly);
        assert_eq!(resolution.log.map(|l| l.level), Some(LogLevel::Warn));
    }

    #[test]
    fn resolve_is_deterministic() {
        let candidate = json!(0);
        let previous = json!(5);
        let ctx = ResolveContext::new(&candidate).with_previous(&previous, 0);
        let policy = use_previous(Some(1));
        assert_eq!(
            resolve(DataflowErrorKind::ZeroValue, &policy, &ctx),
            resolve(DataflowErrorKind::ZeroValue, &policy, &ctx)
        );
    }

    #[test]
    fn detect_order_and_type_filter() {
        let spec = DataFlowSpec::new(ExpireDuration::new(30, ExpireUnit::S));

        assert_eq!(
            spec.detect(ValueType::Number, &JsonValue::Null, at(0), at(60)),
            Some(DataflowErrorKind::NullValue)
        );
        assert_eq!(
            spec.detect(ValueType::Number, &json!(0), at(0), at(60)),
            Some(DataflowErrorKind::Expired)
        );
        assert_eq!(
            spec.detect(ValueType::Number, &json!(0.0), at(0), at(29)),
            Some(DataflowErrorKind::ZeroValue)
        );
        assert_eq!(spec.detect(ValueType::String, &json!(0), at(0), at(1)), None);
        assert_eq!(spec.detect(ValueType::Number, &json!(3), at(0), at(1)), None);
    }

    #[test]
    fn expiry_includes_the_boundary() {
        let spec = DataFlowSpec::new(ExpireDuration::new(30, ExpireUnit::S));
        let value = json!(5);

        assert_eq!(spec.detect(ValueType::Number, &value, at(0), at(29)), None);
        assert_eq!(
            spec.detect(ValueType::Number, &value, at(0), at(30)),
            Some(DataflowErrorKind::Expired)
        );

        let millis = DataFlowSpec::new(ExpireDuration::new(1500, ExpireUnit::Ms));
        let produced = at(0);
        let now = produced + Duration::milliseconds(1500);
        assert_eq!(
            millis.detect(ValueType::String, &json!("x"), produced, now),
            Some(DataflowErrorKind::Expired)
        );
        let just_before = now - Duration::milliseconds(1);
        assert_eq!(
            millis.detect(ValueType::String, &json!("x"), produced, just_before),
            None
        );
    }

    #[test]
    fn expired_at_boundary_uses_expired_policy() {
        let spec = DataFlowSpec::new(ExpireDuration::new(30, ExpireUnit::S)).with_policy(
            DataflowErrorKind::Expired,
            ErrorPolicy::Skip {
                log: ErrorLog::silent(),
            },
        );
        let candidate = json!(5);
        let handled = spec.handle(
            ValueType::Number,
            Operation::Add,
            &ResolveContext::new(&candidate),
            at(0),
            at(30),
        );
        assert_eq!(handled.error_kind, Some(DataflowErrorKind::Expired));
        assert_eq!(handled.resolution.outcome, Outcome::Skip);
    }

    #[test]
    fn handle_uses_configured_policy() {
        let spec = DataFlowSpec::new(ExpireDuration::new(1, ExpireUnit::Min)).with_policy(
            DataflowErrorKind::ZeroValue,
            ErrorPolicy::ValueReplace {
                replacement: json!(1),
                log: ErrorLog::silent(),
            },
        );
        let candidate = json!(0);
        let handled = spec.handle(
            ValueType::Number,
            Operation::Divide,
            &ResolveContext::new(&candidate),
            at(0),
            at(5),
        );
        assert_eq!(handled.error_kind, Some(DataflowErrorKind::ZeroValue));
        assert_eq!(handled.resolution.outcome, Outcome::Update(json!(1)));
    }

    #[test]
    fn handle_defaults_when_unconfigured() {
        let spec = DataFlowSpec::new(ExpireDuration::new(1, ExpireUnit::Hour));
        let candidate = json!(0);
        let ctx = ResolveContext::new(&candidate);

        let divide = spec.handle(ValueType::Number, Operation::Divide, &ctx, at(0), at(1));
        assert_eq!(divide.resolution.outcome, Outcome::Skip);

        let add = spec.handle(ValueType::Number, Operation::Add, &ctx, at(0), at(1));
        assert_eq!(add.resolution.outcome, Outcome::Update(json!(0)));

        let clean_value = json!(7);
        let clean = spec.handle(
            ValueType::Number,
            Operation::Divide,
            &ResolveContext::new(&clean_value),
            at(0),
            at(1),
        );
        assert_eq!(clean.error_kind, None);
        assert_eq!(clean.resolution.outcome, Outcome::Update(json!(7)));
    }

    #[test]
    fn data_flow_wire_format() {
        let json = json!({
            "expire_duration": { "unit": "min", "amount": 5 },
            "error_policy": {
                "null_value": { "strategy": "skip", "log": { "notify": true } },
                "zero_value": { "strategy": "value_replace", "replacement": 1 }
            }
        });
        let spec: DataFlowSpec = serde_json::from_value(json).expect("deserialize");
        assert_eq!(spec.expire_duration.to_duration(), Duration::minutes(5));
        assert_eq!(spec.error_policy.len(), 2);
        assert_eq!(
            spec.error_policy
                .get(&DataflowErrorKind::ZeroValue)
                .map(ErrorPolicy::kind),
            Some(StrategyKind::ValueReplace)
        );
    }
}
