//! Validation strategies and the registry that dispatches rules to them.
//!
//! Every rule type is handled by one [`Validator`]. Validators come in two
//! kinds:
//!
//! - **Row-level** validators test a predicate per row. Their [`Evaluation`]
//!   carries the subset of offending rows, which the engine can quarantine.
//! - **Aggregate** validators compute one statistic over the column and never
//!   produce a row subset.
//!
//! Row-level rules ignore null values, except for `is_not_null` which exists to
//! find them.
//!
//! ## Adding a rule type
//!
//! ```rust,ignore
//! use term_gate::validators::{Validator, ValidatorKind, ValidatorRegistry};
//! use std::sync::Arc;
//!
//! let mut registry = ValidatorRegistry::with_builtins();
//! registry.register("is_positive", Arc::new(IsPositive));
//! ```

use crate::core::{Dataset, RowSubset};
use crate::prelude::*;
use crate::rules::Rule;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Debug;

mod completeness;
mod pattern;
mod registry;
mod statistics;
mod uniqueness;
mod values;

pub use completeness::{IsNotNullValidator, NullPercentageValidator};
pub use pattern::MatchesRegexValidator;
pub use registry::ValidatorRegistry;
pub use statistics::MeanBetweenValidator;
pub use uniqueness::IsUniqueValidator;
pub use values::{AcceptedValuesValidator, InRangeValidator};

/// Pass/fail verdict of one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleStatus {
    Pass,
    Fail,
}

impl RuleStatus {
    pub fn is_pass(&self) -> bool {
        matches!(self, RuleStatus::Pass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, RuleStatus::Fail)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Pass => "PASS",
            RuleStatus::Fail => "FAIL",
        }
    }
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single metric value in a rule outcome.
///
/// Serializes untagged, so counts stay integers in the report and undefined
/// statistics appear as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(u64),
    Number(f64),
    Flag(bool),
    Text(String),
    List(Vec<serde_json::Value>),
    /// The statistic has no value (for example the mean of zero rows).
    Undefined,
}

impl MetricValue {
    /// Reads the value as a float if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Count(n) => Some(*n as f64),
            MetricValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, MetricValue::Undefined)
    }
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        MetricValue::Count(value)
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Number(value)
    }
}

impl From<bool> for MetricValue {
    fn from(value: bool) -> Self {
        MetricValue::Flag(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        MetricValue::Text(value.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        MetricValue::Text(value)
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(MetricValue::Undefined, MetricValue::Number)
    }
}

impl From<Vec<serde_json::Value>> for MetricValue {
    fn from(value: Vec<serde_json::Value>) -> Self {
        MetricValue::List(value)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Count(n) => write!(f, "{n}"),
            MetricValue::Number(n) => write!(f, "{n:.2}"),
            MetricValue::Flag(b) => write!(f, "{b}"),
            MetricValue::Text(s) => f.write_str(s),
            MetricValue::List(items) => {
                let rendered: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            MetricValue::Undefined => f.write_str("undefined"),
        }
    }
}

/// Metrics of one rule, ordered by name.
pub type Metrics = BTreeMap<String, MetricValue>;

/// Whether a validator tests rows or computes a statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    RowLevel,
    Aggregate,
}

/// The result of evaluating one rule against one dataset.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub status: RuleStatus,
    pub metrics: Metrics,
    /// Offending rows. Only row-level validators produce this, and only on failure.
    pub failing_rows: Option<RowSubset>,
    pub message: Option<String>,
}

impl Evaluation {
    /// A passing evaluation with no metrics.
    pub fn pass() -> Self {
        Self {
            status: RuleStatus::Pass,
            metrics: Metrics::new(),
            failing_rows: None,
            message: None,
        }
    }

    /// A failing evaluation.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: RuleStatus::Fail,
            metrics: Metrics::new(),
            failing_rows: None,
            message: Some(message.into()),
        }
    }

    /// Passes when `passed` holds, fails with `message` otherwise.
    pub fn check(passed: bool, message: impl FnOnce() -> String) -> Self {
        if passed {
            Self::pass()
        } else {
            Self::fail(message())
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.metrics.insert(name.into(), value.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_failing_rows(mut self, rows: RowSubset) -> Self {
        self.failing_rows = Some(rows);
        self
    }
}

/// A validation strategy for one rule type.
#[async_trait]
pub trait Validator: Debug + Send + Sync {
    /// Evaluates `rule` against `dataset`.
    ///
    /// Parameter problems are returned as [`GateError::InvalidParams`]; any
    /// other error means the rule could not be evaluated at all.
    async fn evaluate(&self, dataset: &Dataset, rule: &Rule) -> Result<Evaluation>;

    /// The rule type name this validator handles.
    fn name(&self) -> &str;

    fn kind(&self) -> ValidatorKind;
}

/// Shared evaluation for row-level rules: the rule fails when any row matches
/// `violation`, and those rows become the failing subset.
pub(crate) async fn evaluate_violations(
    dataset: &Dataset,
    rule: &Rule,
    violation: &str,
    count_metric: &str,
) -> Result<Evaluation> {
    let offending = dataset.filter(violation).await?;
    let count = offending.row_count();

    if count == 0 {
        return Ok(Evaluation::pass().with_metric(count_metric, 0u64));
    }

    Ok(Evaluation::fail(format!(
        "{count} row(s) in column '{}' violate {}",
        rule.column, rule.rule_type
    ))
    .with_metric(count_metric, count)
    .with_failing_rows(offending))
}

/// Checks that `column` exists and returns it quoted for SQL.
pub(crate) async fn column_identifier(dataset: &Dataset, column: &str) -> Result<String> {
    dataset.column_type(column).await?;
    crate::security::SqlSecurity::escape_identifier(column)
}

/// Maps a pattern/identifier security error on a rule parameter to `InvalidParams`.
pub(crate) fn params_error(rule: &Rule, param: &str, err: GateError) -> GateError {
    match err {
        GateError::Security(message) => GateError::invalid_params(rule.rule_type.as_str(), param, message),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_values_serialize_untagged() {
        let mut metrics = Metrics::new();
        metrics.insert("count".to_string(), 3u64.into());
        metrics.insert("mean".to_string(), 18.5.into());
        metrics.insert("undefined".to_string(), true.into());
        metrics.insert("missing".to_string(), MetricValue::from(None::<f64>));
        metrics.insert("pattern".to_string(), "^a".into());

        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "count": 3,
                "mean": 18.5,
                "undefined": true,
                "missing": null,
                "pattern": "^a"
            })
        );
    }

    #[test]
    fn test_metric_display() {
        assert_eq!(MetricValue::Number(18.3333).to_string(), "18.33");
        assert_eq!(MetricValue::Count(2).to_string(), "2");
        assert_eq!(MetricValue::Undefined.to_string(), "undefined");
    }

    #[test]
    fn test_evaluation_check() {
        let passed = Evaluation::check(true, || "unused".to_string());
        assert!(passed.status.is_pass());
        assert!(passed.message.is_none());

        let failed = Evaluation::check(false, || "mean too low".to_string());
        assert!(failed.status.is_fail());
        assert_eq!(failed.message.as_deref(), Some("mean too low"));
    }

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&RuleStatus::Pass).unwrap(), "\"PASS\"");
        assert_eq!(serde_json::to_string(&RuleStatus::Fail).unwrap(), "\"FAIL\"");
    }
}
