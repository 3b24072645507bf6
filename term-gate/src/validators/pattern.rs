//! `matches_regex`: non-null values must contain a match of `pattern`.

use super::{column_identifier, evaluate_violations, params_error, Evaluation, Validator, ValidatorKind};
use crate::core::Dataset;
use crate::prelude::*;
use crate::rules::Rule;
use crate::security::SqlSecurity;
use async_trait::async_trait;

/// Fails when a non-null value has no match for `pattern`.
///
/// Matching is unanchored: `\d{3}` accepts `"ab123"`. Use `^...$` to require a
/// full match. Non-text columns are matched on their text form.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchesRegexValidator;

#[async_trait]
impl Validator for MatchesRegexValidator {
    async fn evaluate(&self, dataset: &Dataset, rule: &Rule) -> Result<Evaluation> {
        let pattern = rule.params.require_str(self.name(), "pattern")?;
        let escaped =
            SqlSecurity::validate_regex_pattern(pattern).map_err(|e| params_error(rule, "pattern", e))?;
        let column = column_identifier(dataset, &rule.column).await?;

        let predicate = format!("{column} IS NOT NULL AND CAST({column} AS VARCHAR) !~ '{escaped}'");
        let evaluation = evaluate_violations(dataset, rule, &predicate, "mismatch_count").await?;
        Ok(evaluation.with_metric("pattern", pattern))
    }

    fn name(&self) -> &str {
        "matches_regex"
    }

    fn kind(&self) -> ValidatorKind {
        ValidatorKind::RowLevel
    }
}
