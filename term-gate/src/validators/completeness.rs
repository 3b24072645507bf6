//! Null checks: `is_not_null` and `null_percentage_is_less_than`.

use super::{column_identifier, evaluate_violations, Evaluation, Validator, ValidatorKind};
use crate::core::{Aggregate, Dataset};
use crate::prelude::*;
use crate::rules::Rule;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Fails when any row has a null in the column. Null rows are the failing subset.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsNotNullValidator;

#[async_trait]
impl Validator for IsNotNullValidator {
    async fn evaluate(&self, dataset: &Dataset, rule: &Rule) -> Result<Evaluation> {
        let column = column_identifier(dataset, &rule.column).await?;
        evaluate_violations(dataset, rule, &format!("{column} IS NULL"), "null_count").await
    }

    fn name(&self) -> &str {
        "is_not_null"
    }

    fn kind(&self) -> ValidatorKind {
        ValidatorKind::RowLevel
    }
}

/// Fails when the share of null values, as a percentage of all rows, reaches
/// `threshold`. The comparison is strict: 15% nulls fail a threshold of 15.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPercentageValidator;

#[async_trait]
impl Validator for NullPercentageValidator {
    #[instrument(skip(self, dataset, rule), fields(
        dataset.name = %dataset.name(),
        rule.column = %rule.column
    ))]
    async fn evaluate(&self, dataset: &Dataset, rule: &Rule) -> Result<Evaluation> {
        let threshold = rule.params.require_f64(self.name(), "threshold")?;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(GateError::invalid_params(
                self.name(),
                "threshold",
                format!("must be a percentage between 0 and 100, got {threshold}"),
            ));
        }

        dataset.column_type(&rule.column).await?;
        let total_rows = dataset.row_count().await?;

        if total_rows == 0 {
            return Ok(Evaluation::pass()
                .with_metric("total_rows", 0u64)
                .with_metric("null_count", 0u64)
                .with_metric("null_percentage", None::<f64>)
                .with_metric("threshold", threshold)
                .with_metric("undefined", true)
                .with_message("Dataset has no rows; null percentage is undefined"));
        }

        let null_count = dataset
            .aggregate(&rule.column, Aggregate::NullCount)
            .await?
            .unwrap_or(0.0) as u64;
        let null_percentage = null_count as f64 / total_rows as f64 * 100.0;
        debug!(
            rule.null_count = null_count,
            rule.null_percentage = null_percentage,
            "Computed null percentage"
        );

        let evaluation = Evaluation::check(null_percentage < threshold, || {
            format!(
                "Column '{}' is {null_percentage:.2}% null, threshold is < {threshold}%",
                rule.column
            )
        });

        Ok(evaluation
            .with_metric("total_rows", total_rows)
            .with_metric("null_count", null_count)
            .with_metric("null_percentage", null_percentage)
            .with_metric("threshold", threshold))
    }

    fn name(&self) -> &str {
        "null_percentage_is_less_than"
    }

    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Aggregate
    }
}
