//! `mean_is_between`: the column mean lies in an inclusive range.

use super::{Evaluation, Validator, ValidatorKind};
use crate::core::{Aggregate, Dataset};
use crate::prelude::*;
use crate::rules::Rule;
use crate::security::SqlSecurity;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Fails when the mean of the non-null values is outside `[min, max]`.
///
/// A dataset with no rows passes with an undefined mean. A non-empty dataset
/// whose column is entirely null fails: there is no mean to satisfy the bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanBetweenValidator;

#[async_trait]
impl Validator for MeanBetweenValidator {
    #[instrument(skip(self, dataset, rule), fields(
        dataset.name = %dataset.name(),
        rule.column = %rule.column
    ))]
    async fn evaluate(&self, dataset: &Dataset, rule: &Rule) -> Result<Evaluation> {
        let (min, max) = rule.params.require_bounds(self.name())?;
        dataset.require_numeric(&rule.column).await?;

        let column = SqlSecurity::escape_identifier(&rule.column)?;
        let stats = dataset
            .scalar_row(&format!(
                "SELECT COUNT(*) AS total, COUNT({column}) AS non_null FROM {}",
                dataset.table_name()
            ))
            .await?;
        let total = stats.first().copied().flatten().unwrap_or(0.0) as u64;
        let non_null = stats.get(1).copied().flatten().unwrap_or(0.0) as u64;

        if total == 0 {
            return Ok(Evaluation::pass()
                .with_metric("mean_value", None::<f64>)
                .with_metric("non_null_count", 0u64)
                .with_metric("min", min)
                .with_metric("max", max)
                .with_metric("undefined", true)
                .with_message("Dataset has no rows; mean is undefined"));
        }

        let mean = dataset.aggregate(&rule.column, Aggregate::Mean).await?;
        debug!(rule.mean = ?mean, rule.non_null = non_null, "Computed mean");

        let evaluation = match mean {
            Some(value) => Evaluation::check(value >= min && value <= max, || {
                format!(
                    "Mean of '{}' is {value:.2}, expected between {min} and {max}",
                    rule.column
                )
            }),
            None => Evaluation::fail(format!(
                "Column '{}' has no non-null values to average",
                rule.column
            )),
        };

        Ok(evaluation
            .with_metric("mean_value", mean)
            .with_metric("non_null_count", non_null)
            .with_metric("min", min)
            .with_metric("max", max))
    }

    fn name(&self) -> &str {
        "mean_is_between"
    }

    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Aggregate
    }
}
