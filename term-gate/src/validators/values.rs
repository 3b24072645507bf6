//! Value-domain checks: `has_accepted_values` and `is_in_range`.

use super::{column_identifier, evaluate_violations, Evaluation, Validator, ValidatorKind};
use crate::core::Dataset;
use crate::prelude::*;
use crate::rules::Rule;
use crate::security::SqlSecurity;
use async_trait::async_trait;
use serde_json::Value;

/// Fails when a non-null value is outside the `values` list.
///
/// Numeric columns checked against an all-numeric list are compared as
/// numbers. Everything else is compared on the value's text form.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptedValuesValidator;

impl AcceptedValuesValidator {
    fn numeric_literals(values: &[Value]) -> Option<Vec<f64>> {
        values.iter().map(Value::as_f64).collect()
    }

    fn text_literal(value: &Value) -> Result<String> {
        match value {
            Value::String(s) => SqlSecurity::quote_literal(s),
            other => SqlSecurity::quote_literal(&other.to_string()),
        }
    }
}

#[async_trait]
impl Validator for AcceptedValuesValidator {
    async fn evaluate(&self, dataset: &Dataset, rule: &Rule) -> Result<Evaluation> {
        let accepted = rule.params.require_list(self.name(), "values")?;
        let column = column_identifier(dataset, &rule.column).await?;
        let data_type = dataset.column_type(&rule.column).await?;

        let (expr, literals) = match Self::numeric_literals(accepted) {
            Some(numbers) if data_type.is_numeric() => (
                format!("CAST({column} AS DOUBLE)"),
                numbers
                    .into_iter()
                    .map(SqlSecurity::numeric_literal)
                    .collect::<Result<Vec<_>>>()?,
            ),
            _ => (
                format!("CAST({column} AS VARCHAR)"),
                accepted
                    .iter()
                    .map(Self::text_literal)
                    .collect::<Result<Vec<_>>>()?,
            ),
        };

        let predicate = format!(
            "{column} IS NOT NULL AND {expr} NOT IN ({})",
            literals.join(", ")
        );
        let evaluation = evaluate_violations(dataset, rule, &predicate, "invalid_count").await?;
        Ok(evaluation.with_metric("accepted_values", accepted.to_vec()))
    }

    fn name(&self) -> &str {
        "has_accepted_values"
    }

    fn kind(&self) -> ValidatorKind {
        ValidatorKind::RowLevel
    }
}

/// Fails when a value lies outside the inclusive `[min, max]` range.
#[derive(Debug, Clone, Copy, Default)]
pub struct InRangeValidator;

#[async_trait]
impl Validator for InRangeValidator {
    async fn evaluate(&self, dataset: &Dataset, rule: &Rule) -> Result<Evaluation> {
        let (min, max) = rule.params.require_bounds(self.name())?;
        dataset.require_numeric(&rule.column).await?;
        let column = SqlSecurity::escape_identifier(&rule.column)?;

        let predicate = format!(
            "({column} < {} OR {column} > {})",
            SqlSecurity::numeric_literal(min)?,
            SqlSecurity::numeric_literal(max)?
        );
        let evaluation = evaluate_violations(dataset, rule, &predicate, "out_of_range_count").await?;
        Ok(evaluation.with_metric("min", min).with_metric("max", max))
    }

    fn name(&self) -> &str {
        "is_in_range"
    }

    fn kind(&self) -> ValidatorKind {
        ValidatorKind::RowLevel
    }
}
