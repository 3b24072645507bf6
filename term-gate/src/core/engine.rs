//! The execution engine.
//!
//! [`QualityGate`] walks a [`RuleSet`] strictly in document order. Each
//! validation set's dataset is loaded once and shared by its rules. After every
//! rule the outcome is appended to the report, failing rows are quarantined
//! when the rule asks for it, and a failing `STOP` rule ends the whole run.
//!
//! Rule failures and evaluation errors never surface as `Err`: they become
//! `FAIL` outcomes in the report. The only error [`QualityGate::run`] returns is
//! a failure to persist the report.

use super::state::{AbortReason, RulePhase, RunState, SetState};
use super::{Dataset, GateContext, GateContextConfig};
use crate::config::GateConfig;
use crate::logging::truncate_field;
use crate::prelude::*;
use crate::quarantine::{ParquetQuarantineWriter, QuarantineSink, QuarantineTarget};
use crate::report::{FileReportSink, ReportBuilder, ReportSink, RuleOutcome, RunReport};
use crate::rules::{OnFail, Rule, RuleSet, ValidationSet};
use crate::sources::{DatasetLoader, FileLoader};
use crate::validators::{Validator, ValidatorKind, ValidatorRegistry};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

const MAX_LOGGED_MESSAGE: usize = 256;

/// The result of [`QualityGate::run`]: the report and where it was saved.
#[derive(Debug, Clone)]
pub struct GateRun {
    pub report: RunReport,
    pub report_path: String,
}

impl GateRun {
    pub fn is_success(&self) -> bool {
        self.report.is_success()
    }
}

/// Evaluates rule sets and produces run reports.
///
/// # Examples
///
/// ```rust,no_run
/// use term_gate::config::GateConfig;
/// use term_gate::core::QualityGate;
/// use term_gate::rules::RuleSet;
///
/// # async fn example() -> term_gate::error::Result<()> {
/// let config = GateConfig::from_path("config.yaml")?;
/// let rules = RuleSet::from_path("rules.json")?;
///
/// let gate = QualityGate::from_config(&config)?;
/// let run = gate.run(&rules).await?;
/// println!("{} passed, {} failed", run.report.summary.passed, run.report.summary.failed);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct QualityGate {
    pipeline_name: String,
    registry: ValidatorRegistry,
    loader: Arc<dyn DatasetLoader>,
    quarantine: Arc<dyn QuarantineSink>,
    report_sink: Arc<dyn ReportSink>,
    context_config: GateContextConfig,
}

impl QualityGate {
    pub fn builder() -> QualityGateBuilder {
        QualityGateBuilder::default()
    }

    /// Wires file loading, Parquet quarantine and JSON reports from `config`.
    pub fn from_config(config: &GateConfig) -> Result<Self> {
        Self::builder()
            .pipeline_name(&config.pipeline_name)
            .context_config(config.engine.clone())
            .loader(FileLoader::new())
            .quarantine(
                ParquetQuarantineWriter::new(&config.paths.quarantine_path)
                    .with_policy(config.quarantine.write_policy),
            )
            .report_sink(FileReportSink::new(&config.paths.report_path))
            .build()
    }

    pub fn pipeline_name(&self) -> &str {
        &self.pipeline_name
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    /// Evaluates every rule set and persists the report.
    ///
    /// Fails only with [`GateError::ReportWrite`]; the report is still built
    /// in that case but could not be saved.
    pub async fn run(&self, rule_set: &RuleSet) -> Result<GateRun> {
        let report = self.evaluate(rule_set).await;
        let report_path = self.report_sink.persist(&report).await.map_err(|e| match e {
            err @ GateError::ReportWrite { .. } => err,
            other => GateError::ReportWrite {
                path: "unknown".to_string(),
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        })?;
        Ok(GateRun {
            report,
            report_path,
        })
    }

    /// Evaluates every rule set in order and returns the report.
    #[instrument(skip(self, rule_set), fields(
        gate.pipeline = %self.pipeline_name,
        gate.sets = rule_set.validation_sets.len()
    ))]
    pub async fn evaluate(&self, rule_set: &RuleSet) -> RunReport {
        let mut report = ReportBuilder::new(&self.pipeline_name);
        for set in &rule_set.validation_sets {
            report.register_set(&set.dataset_name);
        }
        info!(report.id = %report.report_id(), "Starting quality gate");

        let mut ctx = GateContext::with_config(self.context_config.clone());
        let mut state = RunState::Running;

        for (idx, set) in rule_set.validation_sets.iter().enumerate() {
            if state.is_aborted() {
                break;
            }
            report.set_state(&set.dataset_name, SetState::Running);
            info!(
                dataset.name = %set.dataset_name,
                dataset.source = %set.source,
                dataset.rules = set.rules.len(),
                "Starting validation set"
            );

            let table_name = format!("dq_set_{idx}");
            let loaded = match ctx.as_mut() {
                Ok(ctx) => self.load(ctx, &table_name, set).await,
                Err(e) => Err(GateError::data_source("session", e.to_string())),
            };

            let abort = match loaded {
                Ok(dataset) => self.run_rules(&dataset, set, &mut report).await,
                Err(e) => Self::record_load_failure(set, &e, &mut report),
            };

            if let Ok(ctx) = ctx.as_mut() {
                if ctx.has_table(&table_name) {
                    if let Err(e) = ctx.deregister_table(&table_name) {
                        warn!(dataset.name = %set.dataset_name, error = %e, "Failed to release dataset");
                    }
                }
            }

            match abort {
                Some(reason) => {
                    error!(dataset.name = %set.dataset_name, reason = %reason, "Run aborted");
                    report.set_state(&set.dataset_name, SetState::Aborted);
                    report.abort(reason.clone());
                    state = RunState::Aborted(reason);
                }
                None => {
                    report.set_state(&set.dataset_name, SetState::Completed);
                    info!(dataset.name = %set.dataset_name, "Validation set completed");
                }
            }
        }

        let report = report.finish();
        info!(
            report.id = %report.report_id,
            result.passed = report.summary.passed,
            result.failed = report.summary.failed,
            result.aborted = report.aborted,
            "SUMMARY: {} passed, {} failed",
            report.summary.passed,
            report.summary.failed
        );
        report
    }

    async fn load(&self, ctx: &mut GateContext, table_name: &str, set: &ValidationSet) -> Result<Dataset> {
        let provider = self
            .loader
            .load(ctx.inner(), &set.source)
            .await
            .map_err(|e| match e {
                err @ GateError::DataSource { .. } => err,
                other => GateError::data_source_with_source(
                    set.source.format.as_str(),
                    format!("Failed to load '{}'", set.source.path),
                    Box::new(other),
                ),
            })?;
        ctx.register_table_provider(table_name, provider).map_err(|e| {
            GateError::data_source_with_source(
                set.source.format.as_str(),
                format!("Failed to register '{}'", set.source.path),
                Box::new(e),
            )
        })?;
        Ok(Dataset::new(
            set.dataset_name.as_str(),
            table_name,
            ctx.inner().clone(),
        ))
    }

    /// One FAIL outcome per rule. Stops at the first rule declared `STOP`.
    fn record_load_failure(
        set: &ValidationSet,
        error: &GateError,
        report: &mut ReportBuilder,
    ) -> Option<AbortReason> {
        error!(dataset.name = %set.dataset_name, error = %error, "Failed to load dataset");
        for rule in &set.rules {
            let outcome = RuleOutcome::from_error(&set.dataset_name, rule, error);
            report.record(outcome);
            if rule.on_fail == OnFail::Stop {
                return Some(AbortReason::RuleFailed {
                    dataset_name: set.dataset_name.clone(),
                    rule_type: rule.rule_type.to_string(),
                    column: rule.column.clone(),
                });
            }
        }
        None
    }

    async fn run_rules(
        &self,
        dataset: &Dataset,
        set: &ValidationSet,
        report: &mut ReportBuilder,
    ) -> Option<AbortReason> {
        for rule in &set.rules {
            if let Some(reason) = self.execute_rule(dataset, rule, report).await {
                return Some(reason);
            }
        }
        None
    }

    /// Evaluates, quarantines and records one rule. Returns the abort reason
    /// when the run must stop.
    #[instrument(skip(self, dataset, rule, report), fields(
        dataset.name = %dataset.name(),
        rule.type = %rule.rule_type,
        rule.column = %rule.column
    ))]
    async fn execute_rule(
        &self,
        dataset: &Dataset,
        rule: &Rule,
        report: &mut ReportBuilder,
    ) -> Option<AbortReason> {
        let mut phase = RulePhase::Scheduled;
        debug!(rule.state = %phase, "Rule scheduled");

        let validator = match self.registry.resolve(&rule.rule_type) {
            Ok(validator) => validator,
            Err(e) => {
                error!(error = %e, "No validator for rule type");
                report.record(RuleOutcome::from_error(dataset.name(), rule, &e));
                return Some(AbortReason::UnknownRuleType {
                    dataset_name: dataset.name().to_string(),
                    rule_type: rule.rule_type.to_string(),
                    column: rule.column.clone(),
                });
            }
        };

        let mut outcome = match validator.evaluate(dataset, rule).await {
            Ok(mut evaluation) => {
                phase = RulePhase::Evaluated(evaluation.status);
                debug!(rule.state = %phase, "Rule evaluated");

                let failing_rows = evaluation.failing_rows.take();
                let mut outcome = RuleOutcome::from_evaluation(dataset.name(), rule, &evaluation);
                outcome.failing_row_count = failing_rows.as_ref().map(|rows| rows.row_count());

                if evaluation.status.is_fail() && rule.quarantine {
                    if let (ValidatorKind::RowLevel, Some(rows)) = (validator.kind(), failing_rows) {
                        let target = QuarantineTarget::new(dataset.name(), rule.rule_type.as_str(), &rule.column);
                        outcome = match self.quarantine.write(&target, rows).await {
                            Ok(receipt) => outcome.with_quarantine(receipt),
                            Err(e) => {
                                warn!(error = %e, "Quarantine write failed");
                                outcome.with_warning(format!("Quarantine failed: {e}"))
                            }
                        };
                    }
                }
                outcome
            }
            Err(e) => {
                let e = Self::classify(rule, e);
                RuleOutcome::from_error(dataset.name(), rule, &e)
            }
        };

        if rule.quarantine && validator.kind() == ValidatorKind::Aggregate {
            outcome = outcome.with_warning(Self::aggregate_quarantine_warning(validator.as_ref()));
        }

        let message = outcome.message.as_deref().unwrap_or_default();
        if outcome.is_pass() {
            debug!(result.status = %outcome.status, "Rule passed");
        } else {
            warn!(
                result.status = %outcome.status,
                rule.on_fail = %rule.on_fail,
                rule.message = %truncate_field(message, MAX_LOGGED_MESSAGE),
                "Rule failed"
            );
        }

        let failed = !outcome.is_pass();
        report.record(outcome);
        phase = RulePhase::Recorded;
        debug!(rule.state = %phase, "Rule recorded");

        if failed && rule.on_fail == OnFail::Stop {
            return Some(AbortReason::RuleFailed {
                dataset_name: dataset.name().to_string(),
                rule_type: rule.rule_type.to_string(),
                column: rule.column.clone(),
            });
        }
        None
    }

    /// Keeps parameter errors as they are and wraps everything else as an
    /// evaluation error for the rule.
    fn classify(rule: &Rule, error: GateError) -> GateError {
        match error {
            err @ (GateError::InvalidParams { .. } | GateError::ValidationEvaluation { .. }) => err,
            other => GateError::ValidationEvaluation {
                rule_type: rule.rule_type.to_string(),
                column: rule.column.clone(),
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }

    fn aggregate_quarantine_warning(validator: &dyn Validator) -> String {
        format!(
            "Quarantine requested but '{}' is an aggregate rule with no row-level subset; nothing was isolated",
            validator.name()
        )
    }
}

/// Builder for [`QualityGate`].
///
/// Unset parts default to the built-in validators, a [`FileLoader`],
/// Parquet quarantine under `quarantine/` and JSON reports under `reports/`.
#[derive(Debug, Default)]
pub struct QualityGateBuilder {
    pipeline_name: Option<String>,
    registry: Option<ValidatorRegistry>,
    loader: Option<Arc<dyn DatasetLoader>>,
    quarantine: Option<Arc<dyn QuarantineSink>>,
    report_sink: Option<Arc<dyn ReportSink>>,
    context_config: Option<GateContextConfig>,
}

impl QualityGateBuilder {
    pub fn pipeline_name(mut self, name: impl Into<String>) -> Self {
        self.pipeline_name = Some(name.into());
        self
    }

    pub fn registry(mut self, registry: ValidatorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn loader(mut self, loader: impl DatasetLoader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    pub fn quarantine(mut self, sink: impl QuarantineSink + 'static) -> Self {
        self.quarantine = Some(Arc::new(sink));
        self
    }

    pub fn report_sink(mut self, sink: impl ReportSink + 'static) -> Self {
        self.report_sink = Some(Arc::new(sink));
        self
    }

    pub fn context_config(mut self, config: GateContextConfig) -> Self {
        self.context_config = Some(config);
        self
    }

    pub fn build(self) -> Result<QualityGate> {
        let context_config = self.context_config.unwrap_or_default();
        // Fail fast on settings the session would reject at run time.
        GateContext::with_config(context_config.clone())?;

        let pipeline_name = self.pipeline_name.unwrap_or_else(|| "term-gate".to_string());
        if pipeline_name.trim().is_empty() {
            return Err(GateError::config("pipeline_name cannot be empty"));
        }

        Ok(QualityGate {
            pipeline_name,
            registry: self.registry.unwrap_or_else(ValidatorRegistry::with_builtins),
            loader: self.loader.unwrap_or_else(|| Arc::new(FileLoader::new())),
            quarantine: self
                .quarantine
                .unwrap_or_else(|| Arc::new(ParquetQuarantineWriter::new("quarantine"))),
            report_sink: self
                .report_sink
                .unwrap_or_else(|| Arc::new(FileReportSink::new("reports"))),
            context_config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReportSink;
    use crate::rules::{DataSourceSpec, SourceFormat};
    use crate::sources::MemoryLoader;
    use crate::test_helpers::{batch_from_columns, TestColumn};
    use crate::validators::{MetricValue, RuleStatus};

    fn customers() -> MemoryLoader {
        MemoryLoader::new().with_batch(
            "mem://customers",
            batch_from_columns(vec![
                TestColumn::int("customer_id", vec![Some(1), Some(2), Some(2), Some(3), Some(4)]),
                TestColumn::utf8("state", vec![Some("SP"), None, Some("RJ"), Some("MG"), Some("SP")]),
                TestColumn::int("age", vec![Some(25), Some(30), Some(35), Some(30), Some(30)]),
            ]),
        )
    }

    fn customer_set() -> ValidationSet {
        ValidationSet::new(
            "customers",
            DataSourceSpec::new("mem://customers", SourceFormat::Csv),
        )
    }

    fn gate(quarantine_root: &std::path::Path) -> QualityGate {
        QualityGate::builder()
            .pipeline_name("test")
            .loader(customers())
            .quarantine(ParquetQuarantineWriter::new(quarantine_root))
            .report_sink(MemoryReportSink::new())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_all_rules_pass() {
        let dir = tempfile::tempdir().unwrap();
        let rules = RuleSet::new(vec![customer_set()
            .rule(Rule::new("is_not_null", "customer_id"))
            .rule(Rule::new("mean_is_between", "age").with_param("min", 20).with_param("max", 40))]);

        let report = gate(dir.path()).evaluate(&rules).await;
        assert!(!report.aborted);
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.failed, 0);
        assert!(report.is_success());
        assert_eq!(report.dataset("customers").unwrap().state, SetState::Completed);
    }

    #[tokio::test]
    async fn test_stop_aborts_remaining_rules() {
        let dir = tempfile::tempdir().unwrap();
        let rules = RuleSet::new(vec![customer_set()
            .rule(Rule::new("is_not_null", "customer_id"))
            .rule(Rule::new("is_unique", "customer_id").on_fail(OnFail::Stop))
            .rule(Rule::new("is_not_null", "state"))]);

        let report = gate(dir.path()).evaluate(&rules).await;
        assert!(report.aborted);
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.details[1].status, RuleStatus::Fail);
        assert_eq!(report.dataset("customers").unwrap().state, SetState::Aborted);
        assert!(report.abort_reason.unwrap().contains("is_unique"));
    }

    #[tokio::test]
    async fn test_warn_failures_continue() {
        let dir = tempfile::tempdir().unwrap();
        let rules = RuleSet::new(vec![customer_set()
            .rule(Rule::new("is_unique", "customer_id"))
            .rule(Rule::new("is_not_null", "state"))]);

        let report = gate(dir.path()).evaluate(&rules).await;
        assert!(!report.aborted);
        assert_eq!(report.summary.failed, 2);
    }

    #[tokio::test]
    async fn test_unknown_rule_type_aborts_even_with_warn() {
        let dir = tempfile::tempdir().unwrap();
        let rules = RuleSet::new(vec![customer_set()
            .rule(Rule::new("is_positive", "age"))
            .rule(Rule::new("is_not_null", "customer_id"))]);

        let report = gate(dir.path()).evaluate(&rules).await;
        assert!(report.aborted);
        assert_eq!(report.summary.total, 1);
        assert_eq!(report.details[0].error_kind(), Some("unknown_rule_type"));
    }

    #[tokio::test]
    async fn test_invalid_params_follow_on_fail() {
        let dir = tempfile::tempdir().unwrap();
        let rules = RuleSet::new(vec![customer_set()
            .rule(Rule::new("is_in_range", "age"))
            .rule(Rule::new("is_not_null", "customer_id"))]);

        let report = gate(dir.path()).evaluate(&rules).await;
        assert!(!report.aborted);
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.details[0].error_kind(), Some("invalid_params"));
        assert_eq!(report.details[1].status, RuleStatus::Pass);
    }

    #[tokio::test]
    async fn test_evaluation_errors_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let rules = RuleSet::new(vec![customer_set()
            .rule(Rule::new("is_not_null", "missing_column"))
            .rule(Rule::new("mean_is_between", "state").with_param("min", 0).with_param("max", 1))]);

        let report = gate(dir.path()).evaluate(&rules).await;
        assert_eq!(report.summary.failed, 2);
        for outcome in &report.details {
            assert_eq!(outcome.error_kind(), Some("evaluation_failed"));
        }
    }

    #[tokio::test]
    async fn test_quarantine_only_for_failing_row_level_rules() {
        let dir = tempfile::tempdir().unwrap();
        let rules = RuleSet::new(vec![customer_set()
            .rule(Rule::new("is_unique", "customer_id").quarantined())
            .rule(Rule::new("is_not_null", "customer_id").quarantined())
            .rule(
                Rule::new("null_percentage_is_less_than", "state")
                    .with_param("threshold", 10)
                    .quarantined(),
            )]);

        let report = gate(dir.path()).evaluate(&rules).await;

        let unique = &report.details[0];
        let receipt = unique.quarantine.as_ref().unwrap();
        assert_eq!(receipt.rows_written, 2);
        assert_eq!(unique.failing_row_count, Some(2));

        assert!(report.details[1].quarantine.is_none());

        let aggregate = &report.details[2];
        assert_eq!(aggregate.status, RuleStatus::Fail);
        assert!(aggregate.quarantine.is_none());
        assert_eq!(aggregate.warnings.len(), 1);
        assert!(!dir.path().join("customers").join("null_percentage_is_less_than_state").exists());
    }

    #[tokio::test]
    async fn test_load_failure_records_every_rule() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ValidationSet::new("orders", DataSourceSpec::new("mem://orders", SourceFormat::Csv))
            .rule(Rule::new("is_not_null", "id"))
            .rule(Rule::new("is_unique", "id"));
        let rules = RuleSet::new(vec![
            missing,
            customer_set().rule(Rule::new("is_not_null", "customer_id")),
        ]);

        let report = gate(dir.path()).evaluate(&rules).await;
        assert!(!report.aborted);
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.details[0].error_kind(), Some("dataset_load_failed"));
        assert_eq!(report.details[1].error_kind(), Some("dataset_load_failed"));
        assert_eq!(report.details[2].status, RuleStatus::Pass);
    }

    #[tokio::test]
    async fn test_sets_after_abort_stay_pending() {
        let dir = tempfile::tempdir().unwrap();
        let first = customer_set().rule(Rule::new("is_unique", "customer_id").on_fail(OnFail::Stop));
        let second = ValidationSet::new(
            "customers_again",
            DataSourceSpec::new("mem://customers", SourceFormat::Csv),
        )
        .rule(Rule::new("is_not_null", "customer_id"));

        let report = gate(dir.path()).evaluate(&RuleSet::new(vec![first, second])).await;
        assert!(report.aborted);
        assert_eq!(report.summary.total, 1);
        assert_eq!(report.dataset("customers_again").unwrap().state, SetState::Pending);
        assert_eq!(report.outcomes_for("customers_again").count(), 0);
    }

    #[tokio::test]
    async fn test_run_persists_report() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MemoryReportSink::new();
        let gate = QualityGate::builder()
            .loader(customers())
            .quarantine(ParquetQuarantineWriter::new(dir.path()))
            .report_sink(sink.clone())
            .build()
            .unwrap();

        let rules = RuleSet::new(vec![customer_set().rule(Rule::new("is_not_null", "customer_id"))]);
        let run = gate.run(&rules).await.unwrap();
        assert!(run.is_success());
        assert!(run.report_path.starts_with("memory://dq_report_"));
        assert_eq!(sink.reports().len(), 1);
        assert_eq!(
            sink.reports()[0].details[0].metrics.get("null_count"),
            Some(&MetricValue::Count(0))
        );
    }

    #[tokio::test]
    async fn test_quarantine_failure_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("quarantine");
        std::fs::write(&not_a_dir, "occupied").unwrap();
        let sink = MemoryReportSink::new();
        let gate = QualityGate::builder()
            .loader(customers())
            .quarantine(ParquetQuarantineWriter::new(&not_a_dir))
            .report_sink(sink.clone())
            .build()
            .unwrap();

        let rules = RuleSet::new(vec![customer_set()
            .rule(Rule::new("is_unique", "customer_id").quarantined())
            .rule(Rule::new("is_not_null", "customer_id"))]);
        let run = gate.run(&rules).await.unwrap();
        let report = &run.report;

        let unique = &report.details[0];
        assert_eq!(unique.status, RuleStatus::Fail);
        assert!(unique.quarantine.is_none());
        assert_eq!(unique.failing_row_count, Some(2));
        assert_eq!(unique.warnings.len(), 1);
        assert!(unique.warnings[0].starts_with("Quarantine failed"));

        assert_eq!(report.details[1].status, RuleStatus::Pass);
        assert!(!report.aborted);
        assert_eq!(report.dataset("customers").unwrap().state, SetState::Completed);
        assert_eq!(sink.reports().len(), 1);
    }

    #[tokio::test]
    async fn test_colliding_quarantine_targets_keep_first_rows() {
        let dir = tempfile::tempdir().unwrap();
        let loader = MemoryLoader::new()
            .with_batch(
                "mem://spaced",
                batch_from_columns(vec![TestColumn::int("id", vec![Some(1), Some(1)])]),
            )
            .with_batch(
                "mem://underscored",
                batch_from_columns(vec![TestColumn::int("id", vec![Some(5), Some(5), Some(5)])]),
            );
        let gate = QualityGate::builder()
            .loader(loader)
            .quarantine(ParquetQuarantineWriter::new(dir.path()))
            .report_sink(MemoryReportSink::new())
            .build()
            .unwrap();

        let rules = RuleSet::new(vec![
            ValidationSet::new("a b", DataSourceSpec::new("mem://spaced", SourceFormat::Csv))
                .rule(Rule::new("is_unique", "id").quarantined()),
            ValidationSet::new("a_b", DataSourceSpec::new("mem://underscored", SourceFormat::Csv))
                .rule(Rule::new("is_unique", "id").quarantined()),
        ]);
        let report = gate.evaluate(&rules).await;

        let first = report.details[0].quarantine.as_ref().unwrap();
        assert_eq!(first.rows_written, 2);
        assert!(report.details[1].quarantine.is_none());
        assert!(report.details[1].warnings[0].contains("a b"));
        assert!(!report.aborted);

        let file = std::fs::File::open(&first.file).unwrap();
        let rows: usize = parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap()
            .map(|b| b.unwrap().num_rows())
            .sum();
        assert_eq!(rows, 2);
    }

    #[tokio::test]
    async fn test_registration_failure_is_a_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(dir.path());
        let mut ctx = GateContext::new().unwrap();

        let err = gate
            .load(&mut ctx, "0 invalid table", &customer_set())
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::DataSource { .. }));
        assert_eq!(err.kind(), "dataset_load_failed");
    }

    #[test]
    fn test_builder_rejects_bad_context_config() {
        let result = QualityGate::builder()
            .context_config(GateContextConfig {
                batch_size: 0,
                ..Default::default()
            })
            .build();
        assert!(matches!(result, Err(GateError::Config(_))));
    }
}
