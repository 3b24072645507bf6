//! Incremental report accumulation.

use super::{DatasetSummary, RuleOutcome, RunReport, Summary};
use crate::core::{AbortReason, SetState};
use chrono::{DateTime, Utc};

/// Accumulates outcomes and set states for one run.
///
/// # Examples
///
/// ```rust
/// use term_gate::report::ReportBuilder;
///
/// let mut builder = ReportBuilder::new("nightly");
/// builder.register_set("customers");
/// let report = builder.finish();
/// assert_eq!(report.summary.total, 0);
/// assert!(!report.aborted);
/// ```
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    report_id: String,
    pipeline_name: String,
    generated_at: DateTime<Utc>,
    datasets: Vec<DatasetSummary>,
    details: Vec<RuleOutcome>,
    abort_reason: Option<AbortReason>,
}

impl ReportBuilder {
    pub fn new(pipeline_name: impl Into<String>) -> Self {
        Self::at(pipeline_name, Utc::now())
    }

    /// Starts a report stamped with `generated_at`.
    pub fn at(pipeline_name: impl Into<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            report_id: report_id_for(generated_at),
            pipeline_name: pipeline_name.into(),
            generated_at,
            datasets: Vec::new(),
            details: Vec::new(),
            abort_reason: None,
        }
    }

    pub fn report_id(&self) -> &str {
        &self.report_id
    }

    /// Declares a validation set in `Pending` state.
    pub fn register_set(&mut self, dataset_name: impl Into<String>) {
        self.datasets.push(DatasetSummary {
            dataset_name: dataset_name.into(),
            state: SetState::Pending,
            rules_evaluated: 0,
        });
    }

    pub fn set_state(&mut self, dataset_name: &str, state: SetState) {
        if let Some(summary) = self.dataset_mut(dataset_name) {
            summary.state = state;
        }
    }

    /// Appends an outcome. Outcomes are immutable once recorded.
    pub fn record(&mut self, outcome: RuleOutcome) {
        if let Some(summary) = self.dataset_mut(&outcome.dataset_name) {
            summary.rules_evaluated += 1;
        }
        self.details.push(outcome);
    }

    /// Marks the run aborted. The first reason wins.
    pub fn abort(&mut self, reason: AbortReason) {
        if self.abort_reason.is_none() {
            self.abort_reason = Some(reason);
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.abort_reason.is_some()
    }

    pub fn details(&self) -> &[RuleOutcome] {
        &self.details
    }

    pub fn finish(self) -> RunReport {
        RunReport {
            summary: Summary::from_outcomes(&self.details),
            report_id: self.report_id,
            pipeline_name: self.pipeline_name,
            generated_at: self.generated_at,
            aborted: self.abort_reason.is_some(),
            abort_reason: self.abort_reason.map(|r| r.to_string()),
            datasets: self.datasets,
            details: self.details,
        }
    }

    fn dataset_mut(&mut self, dataset_name: &str) -> Option<&mut DatasetSummary> {
        self.datasets
            .iter_mut()
            .find(|d| d.dataset_name == dataset_name)
    }
}

/// `dq_report_YYYYmmdd_HHMMSS_ffffff`. Sorts chronologically.
pub fn report_id_for(timestamp: DateTime<Utc>) -> String {
    format!("dq_report_{}", timestamp.format("%Y%m%d_%H%M%S_%6f"))
}
