//! Rendering of run reports.
//!
//! [`JsonFormatter`] produces the persisted report document.
//! [`HumanFormatter`] produces a console summary in the spirit of a CI log:
//!
//! ```text
//! Pipeline: nightly (dq_report_20240101_120000_000000)
//! ABORTED: Critical rule 'is_unique' failed for column 'customer_id' in dataset 'Clientes'
//!
//! Failures:
//!   [STOP] Clientes.customer_id is_unique: 2 row(s) in column 'customer_id' violate is_unique
//!
//! SUMMARY: 3 passed, 1 failed
//! ```

use crate::prelude::*;
use crate::report::{RuleOutcome, RunReport};
use crate::rules::OnFail;
use std::fmt::Write;

/// Configuration options for formatting reports.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include each failure's metrics
    pub include_metrics: bool,
    /// Include individual failure lines
    pub include_failures: bool,
    /// Maximum number of failures to display (`None` for all)
    pub max_failures: Option<usize>,
    /// Whether to use colorized output (for the human formatter)
    pub use_colors: bool,
    /// Whether to include the report timestamp
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_metrics: true,
            include_failures: true,
            max_failures: None,
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Only the summary line and abort status.
    pub fn minimal() -> Self {
        Self {
            include_metrics: false,
            include_failures: false,
            max_failures: Some(0),
            use_colors: false,
            include_timestamps: false,
        }
    }

    /// Plain text with a bounded failure list, for CI logs.
    pub fn ci() -> Self {
        Self {
            include_metrics: true,
            include_failures: true,
            max_failures: Some(50),
            use_colors: false,
            include_timestamps: true,
        }
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn with_max_failures(mut self, max: usize) -> Self {
        self.max_failures = Some(max);
        self
    }
}

/// Turns a [`RunReport`] into text.
pub trait ResultFormatter {
    fn format(&self, report: &RunReport) -> Result<String>;
}

/// Serializes the full report as JSON.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// A pretty-printing formatter.
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for JsonFormatter {
    fn format(&self, report: &RunReport) -> Result<String> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        };
        rendered.map_err(|e| GateError::Serialization(format!("Failed to serialize report to JSON: {e}")))
    }
}

/// Console-friendly summary of a report.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn paint(&self, text: &str, color: &str) -> String {
        if self.config.use_colors {
            format!("\x1b[{color}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn write_failure(&self, output: &mut String, outcome: &RuleOutcome) -> Result<()> {
        let tag = match outcome.on_fail {
            OnFail::Stop => self.paint("[STOP]", "31"),
            OnFail::Warn => self.paint("[WARN]", "33"),
        };
        write!(
            output,
            "  {tag} {}.{} {}",
            outcome.dataset_name, outcome.column, outcome.rule_type
        )?;
        if let Some(message) = &outcome.message {
            write!(output, ": {message}")?;
        }
        writeln!(output)?;

        if self.config.include_metrics && !outcome.metrics.is_empty() {
            let metrics: Vec<String> = outcome
                .metrics
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            writeln!(output, "        {}", metrics.join(", "))?;
        }
        if let Some(receipt) = &outcome.quarantine {
            writeln!(
                output,
                "        quarantined {} row(s) to {}",
                receipt.rows_written, receipt.path
            )?;
        }
        for warning in &outcome.warnings {
            writeln!(output, "        warning: {warning}")?;
        }
        Ok(())
    }
}

impl ResultFormatter for HumanFormatter {
    fn format(&self, report: &RunReport) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "Pipeline: {} ({})", report.pipeline_name, report.report_id)?;
        if self.config.include_timestamps {
            writeln!(output, "Generated: {}", report.generated_at.to_rfc3339())?;
        }
        if let Some(reason) = &report.abort_reason {
            writeln!(output, "{} {reason}", self.paint("ABORTED:", "31"))?;
        }

        if self.config.include_failures && report.summary.failed > 0 {
            let limit = self.config.max_failures.unwrap_or(usize::MAX);
            writeln!(output)?;
            writeln!(output, "Failures:")?;
            for outcome in report.failures().take(limit) {
                self.write_failure(&mut output, outcome)?;
            }
            if report.summary.failed > limit {
                writeln!(output, "  ... and {} more", report.summary.failed - limit)?;
            }
        }

        writeln!(output)?;
        writeln!(
            output,
            "SUMMARY: {} passed, {} failed",
            self.paint(&report.summary.passed.to_string(), "32"),
            self.paint(&report.summary.failed.to_string(), "31")
        )?;
        Ok(output)
    }
}
