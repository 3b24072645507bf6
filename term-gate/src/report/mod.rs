//! Rule outcomes and the run report.
//!
//! The engine appends one [`RuleOutcome`] per evaluated rule to a
//! [`ReportBuilder`] as soon as the rule is done, so an aborted run still
//! reports everything that happened before the abort. [`ReportBuilder::finish`]
//! derives the summary from those outcomes; the summary is never tracked
//! separately.
//!
//! ```json
//! {
//!   "report_id": "dq_report_20240101_120000_000000",
//!   "pipeline_name": "AdvancedDataQualityFramework",
//!   "generated_at": "2024-01-01T12:00:00Z",
//!   "summary": { "total": 2, "passed": 1, "failed": 1 },
//!   "aborted": true,
//!   "abort_reason": "Critical rule 'is_unique' failed for column 'customer_id' in dataset 'Clientes'",
//!   "datasets": [ { "dataset_name": "Clientes", "state": "aborted", "rules_evaluated": 2 } ],
//!   "details": [ ... ]
//! }
//! ```

use crate::core::SetState;
use crate::error::GateError;
use crate::quarantine::QuarantineReceipt;
use crate::rules::{OnFail, Rule};
use crate::validators::{Evaluation, MetricValue, Metrics, RuleStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod builder;
mod sink;

pub use builder::ReportBuilder;
pub use sink::{FileReportSink, MemoryReportSink, ReportSink};

/// The recorded result of one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub dataset_name: String,
    pub rule_type: String,
    pub column: String,
    pub status: RuleStatus,
    pub on_fail: OnFail,
    pub metrics: Metrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failing_row_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarantine: Option<QuarantineReceipt>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RuleOutcome {
    /// Records a completed evaluation.
    pub fn from_evaluation(dataset_name: &str, rule: &Rule, evaluation: &Evaluation) -> Self {
        Self {
            dataset_name: dataset_name.to_string(),
            rule_type: rule.rule_type.to_string(),
            column: rule.column.clone(),
            status: evaluation.status,
            on_fail: rule.on_fail,
            metrics: evaluation.metrics.clone(),
            failing_row_count: evaluation.failing_rows.as_ref().map(|rows| rows.row_count()),
            message: evaluation.message.clone(),
            quarantine: None,
            warnings: Vec::new(),
        }
    }

    /// Records a rule that could not be evaluated. The outcome is a FAIL with
    /// the error's kind in the `error` metric.
    pub fn from_error(dataset_name: &str, rule: &Rule, error: &GateError) -> Self {
        let mut metrics = Metrics::new();
        metrics.insert("error".to_string(), MetricValue::from(error.kind()));
        Self {
            dataset_name: dataset_name.to_string(),
            rule_type: rule.rule_type.to_string(),
            column: rule.column.clone(),
            status: RuleStatus::Fail,
            on_fail: rule.on_fail,
            metrics,
            failing_row_count: None,
            message: Some(error.to_string()),
            quarantine: None,
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_quarantine(mut self, receipt: QuarantineReceipt) -> Self {
        self.quarantine = Some(receipt);
        self
    }

    /// The `error` metric, set when the rule could not be evaluated.
    pub fn error_kind(&self) -> Option<&str> {
        match self.metrics.get("error") {
            Some(MetricValue::Text(kind)) => Some(kind),
            _ => None,
        }
    }

    pub fn is_pass(&self) -> bool {
        self.status.is_pass()
    }
}

/// Pass/fail counts over a report's details.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl Summary {
    pub fn from_outcomes(outcomes: &[RuleOutcome]) -> Self {
        let passed = outcomes.iter().filter(|o| o.is_pass()).count();
        Self {
            total: outcomes.len(),
            passed,
            failed: outcomes.len() - passed,
        }
    }
}

/// Where one validation set ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub dataset_name: String,
    pub state: SetState,
    pub rules_evaluated: usize,
}

/// The structured report of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub report_id: String,
    pub pipeline_name: String,
    pub generated_at: DateTime<Utc>,
    pub summary: Summary,
    pub aborted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
    pub datasets: Vec<DatasetSummary>,
    pub details: Vec<RuleOutcome>,
}

impl RunReport {
    /// True when nothing failed and the run was not aborted.
    pub fn is_success(&self) -> bool {
        !self.aborted && self.summary.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.details.iter().filter(|o| !o.is_pass())
    }

    pub fn outcomes_for<'a>(&'a self, dataset_name: &'a str) -> impl Iterator<Item = &'a RuleOutcome> {
        self.details.iter().filter(move |o| o.dataset_name == dataset_name)
    }

    pub fn dataset(&self, dataset_name: &str) -> Option<&DatasetSummary> {
        self.datasets.iter().find(|d| d.dataset_name == dataset_name)
    }
}
