//! # term-gate - a data-quality gate on DataFusion
//!
//! term-gate evaluates a declarative set of validation rules against tabular
//! datasets, decides from each rule's severity whether the pipeline may
//! continue, isolates offending rows for offline diagnosis, and writes a
//! structured report of everything it evaluated.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use term_gate::prelude::*;
//! use term_gate::config::GateConfig;
//!
//! # async fn example() -> term_gate::error::Result<()> {
//! let rules = RuleSet::from_json_str(r#"{
//!   "validation_sets": [{
//!     "dataset_name": "Clientes",
//!     "data_source_path": "data/customers_v2.csv",
//!     "data_source_format": "csv",
//!     "rules": [
//!       {"rule_type": "is_unique", "column": "customer_id", "on_fail": "STOP", "quarantine": true},
//!       {"rule_type": "null_percentage_is_less_than", "column": "state", "params": {"threshold": 15}},
//!       {"rule_type": "mean_is_between", "column": "age", "params": {"min": 20, "max": 40}}
//!     ]
//!   }]
//! }"#)?;
//!
//! let gate = QualityGate::from_config(&GateConfig::new("reports/", "quarantine/"))?;
//! let run = gate.run(&rules).await?;
//!
//! if run.report.aborted {
//!     eprintln!("blocked: {}", run.report.abort_reason.unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Severity
//!
//! Every rule declares `on_fail`:
//!
//! - `WARN` (default): the failure is recorded and evaluation continues.
//! - `STOP`: the failure is recorded and the run ends. No later rule, in this
//!   or any later validation set, is evaluated. The report is still written.
//!
//! A rule whose type has no registered validator always stops the run.
//!
//! ## Quarantine
//!
//! A failing row-level rule with `quarantine: true` has its offending rows
//! written as Parquet under `{quarantine_path}/{dataset}/{rule_type}_{column}/`.
//! Aggregate rules (`null_percentage_is_less_than`, `mean_is_between`) have no
//! rows to isolate; requesting quarantine on them produces a warning.
//!
//! ## Architecture
//!
//! - **`rules`**: rule model and document parsing
//! - **`validators`**: the `Validator` trait, built-in validators, registry
//! - **`core`**: DataFusion context, dataset handle and the execution engine
//! - **`sources`**: dataset loaders
//! - **`quarantine`**: failing-row isolation
//! - **`report`**: outcomes, report accumulation and persistence
//! - **`formatters`**: JSON and console rendering
//! - **`config`**, **`logging`**: gate configuration and subscriber setup

pub mod config;
pub mod core;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod quarantine;
pub mod report;
pub mod rules;
pub mod security;
pub mod sources;
pub mod validators;

#[cfg(test)]
pub mod test_helpers;
