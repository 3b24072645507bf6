//! `is_unique`: every non-null value of the column occurs once.

use super::{column_identifier, evaluate_violations, Evaluation, Validator, ValidatorKind};
use crate::core::Dataset;
use crate::prelude::*;
use crate::rules::Rule;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Fails when a non-null value occurs more than once. Every row carrying a
/// duplicated value is part of the failing subset, not just the extra copies.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsUniqueValidator;

#[async_trait]
impl Validator for IsUniqueValidator {
    #[instrument(skip(self, dataset, rule), fields(
        dataset.name = %dataset.name(),
        rule.column = %rule.column
    ))]
    async fn evaluate(&self, dataset: &Dataset, rule: &Rule) -> Result<Evaluation> {
        let column = column_identifier(dataset, &rule.column).await?;
        let table = dataset.table_name();

        let duplicated = format!(
            "SELECT {column} FROM {table} WHERE {column} IS NOT NULL GROUP BY {column} HAVING COUNT(*) > 1"
        );

        let groups = dataset
            .scalar_row(&format!("SELECT COUNT(*) AS duplicate_groups FROM ({duplicated}) AS dup"))
            .await?;
        let duplicate_groups = groups.first().copied().flatten().unwrap_or(0.0) as u64;
        debug!(rule.duplicate_groups = duplicate_groups, "Counted duplicate groups");

        let evaluation = evaluate_violations(
            dataset,
            rule,
            &format!("{column} IN ({duplicated})"),
            "duplicate_rows",
        )
        .await?;

        Ok(evaluation.with_metric("duplicate_groups", duplicate_groups))
    }

    fn name(&self) -> &str {
        "is_unique"
    }

    fn kind(&self) -> ValidatorKind {
        ValidatorKind::RowLevel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{dataset_from_columns, TestColumn};
    use crate::validators::MetricValue;

    #[tokio::test]
    async fn test_duplicates_fail_with_every_copy() {
        let dataset = dataset_from_columns(
            "customers",
            vec![
                TestColumn::int("customer_id", vec![Some(1), Some(2), Some(2), Some(3)]),
                TestColumn::utf8("name", vec![Some("a"), Some("b"), Some("c"), Some("d")]),
            ],
        )
        .await;
        let rule = Rule::new("is_unique", "customer_id");

        let evaluation = IsUniqueValidator.evaluate(&dataset, &rule).await.unwrap();
        assert!(evaluation.status.is_fail());
        assert_eq!(
            evaluation.metrics.get("duplicate_groups"),
            Some(&MetricValue::Count(1))
        );
        assert_eq!(
            evaluation.metrics.get("duplicate_rows"),
            Some(&MetricValue::Count(2))
        );

        let rows = evaluation.failing_rows.unwrap();
        assert_eq!(rows.row_count(), 2);
        assert_eq!(rows.schema().fields().len(), 2);
    }

    #[tokio::test]
    async fn test_unique_values_pass() {
        let dataset = dataset_from_columns(
            "customers",
            vec![TestColumn::int("customer_id", vec![Some(1), Some(2), Some(3)])],
        )
        .await;
        let evaluation = IsUniqueValidator
            .evaluate(&dataset, &Rule::new("is_unique", "customer_id"))
            .await
            .unwrap();
        assert!(evaluation.status.is_pass());
        assert!(evaluation.failing_rows.is_none());
    }

    #[tokio::test]
    async fn test_repeated_nulls_are_not_duplicates() {
        let dataset = dataset_from_columns(
            "customers",
            vec![TestColumn::utf8("email", vec![Some("a@x"), None, None])],
        )
        .await;
        let evaluation = IsUniqueValidator
            .evaluate(&dataset, &Rule::new("is_unique", "email"))
            .await
            .unwrap();
        assert!(evaluation.status.is_pass());
    }

    #[tokio::test]
    async fn test_unknown_column() {
        let dataset =
            dataset_from_columns("customers", vec![TestColumn::int("id", vec![Some(1)])]).await;
        let err = IsUniqueValidator
            .evaluate(&dataset, &Rule::new("is_unique", "missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::ColumnNotFound { .. }));
    }
}
