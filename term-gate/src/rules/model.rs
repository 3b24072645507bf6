//! Typed rule model.

use super::RuleParams;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The type tag of a rule.
///
/// Built-in validators have their own variant. Any other name parses into
/// [`RuleType::Custom`] and must be resolved against the registry at dispatch
/// time; an unresolved name is a blocking configuration defect, not a skip.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleType {
    IsUnique,
    IsNotNull,
    HasAcceptedValues,
    IsInRange,
    MatchesRegex,
    NullPercentageIsLessThan,
    MeanIsBetween,
    /// A rule type outside the built-in set.
    Custom(String),
}

impl RuleType {
    /// Returns the rule type name as written in rule documents.
    pub fn as_str(&self) -> &str {
        match self {
            RuleType::IsUnique => "is_unique",
            RuleType::IsNotNull => "is_not_null",
            RuleType::HasAcceptedValues => "has_accepted_values",
            RuleType::IsInRange => "is_in_range",
            RuleType::MatchesRegex => "matches_regex",
            RuleType::NullPercentageIsLessThan => "null_percentage_is_less_than",
            RuleType::MeanIsBetween => "mean_is_between",
            RuleType::Custom(name) => name,
        }
    }

    /// Whether this is one of the built-in rule types.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, RuleType::Custom(_))
    }

    /// Whether the built-in type computes a single statistic and therefore has
    /// no offending rows to isolate.
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            RuleType::NullPercentageIsLessThan | RuleType::MeanIsBetween
        )
    }
}

impl From<&str> for RuleType {
    fn from(name: &str) -> Self {
        match name {
            "is_unique" => RuleType::IsUnique,
            "is_not_null" => RuleType::IsNotNull,
            "has_accepted_values" => RuleType::HasAcceptedValues,
            "is_in_range" => RuleType::IsInRange,
            "matches_regex" => RuleType::MatchesRegex,
            "null_percentage_is_less_than" => RuleType::NullPercentageIsLessThan,
            "mean_is_between" => RuleType::MeanIsBetween,
            other => RuleType::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RuleType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RuleType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(RuleType::from(name.as_str()))
    }
}

/// What the gate does when a rule fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OnFail {
    /// Record the failure and continue with the next rule.
    #[default]
    Warn,
    /// Abort the whole run immediately.
    Stop,
}

impl OnFail {
    /// Parses a severity case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "WARN" => Some(OnFail::Warn),
            "STOP" => Some(OnFail::Stop),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OnFail::Warn => "WARN",
            OnFail::Stop => "STOP",
        }
    }
}

impl fmt::Display for OnFail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File format of a dataset source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Parquet,
    Json,
}

impl SourceFormat {
    /// Parses a format name case-insensitively. `ndjson` is accepted for JSON.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(SourceFormat::Csv),
            "parquet" => Some(SourceFormat::Parquet),
            "json" | "ndjson" => Some(SourceFormat::Json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Parquet => "parquet",
            SourceFormat::Json => "json",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a dataset comes from. Resolved by a [`DatasetLoader`](crate::sources::DatasetLoader).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataSourceSpec {
    /// File, directory or glob pattern.
    pub path: String,
    pub format: SourceFormat,
}

impl DataSourceSpec {
    pub fn new(path: impl Into<String>, format: SourceFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }
}

impl fmt::Display for DataSourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path, self.format)
    }
}

/// One validation check against one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub rule_type: RuleType,
    pub column: String,
    #[serde(default, skip_serializing_if = "RuleParams::is_empty")]
    pub params: RuleParams,
    #[serde(default)]
    pub on_fail: OnFail,
    #[serde(default)]
    pub quarantine: bool,
}

impl Rule {
    /// Creates a WARN rule with no parameters and quarantine disabled.
    pub fn new(rule_type: impl Into<RuleType>, column: impl Into<String>) -> Self {
        Self {
            rule_type: rule_type.into(),
            column: column.into(),
            params: RuleParams::default(),
            on_fail: OnFail::Warn,
            quarantine: false,
        }
    }

    /// Adds a parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(name, value);
        self
    }

    /// Sets the failure action.
    pub fn on_fail(mut self, on_fail: OnFail) -> Self {
        self.on_fail = on_fail;
        self
    }

    /// Requests quarantine of failing rows.
    pub fn quarantined(mut self) -> Self {
        self.quarantine = true;
        self
    }

    /// `{rule_type}_{column}`, the rule's identity within a dataset.
    pub fn key(&self) -> String {
        format!("{}_{}", self.rule_type, self.column)
    }
}

impl From<String> for RuleType {
    fn from(name: String) -> Self {
        RuleType::from(name.as_str())
    }
}

/// One dataset plus the ordered rules applied to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSet {
    pub dataset_name: String,
    pub source: DataSourceSpec,
    pub rules: Vec<Rule>,
}

impl ValidationSet {
    pub fn new(dataset_name: impl Into<String>, source: DataSourceSpec) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            source,
            rules: Vec::new(),
        }
    }

    /// Appends a rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }
}

/// The parsed rule-set document: validation sets in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub validation_sets: Vec<ValidationSet>,
}

impl RuleSet {
    pub fn new(validation_sets: Vec<ValidationSet>) -> Self {
        Self { validation_sets }
    }

    /// Total number of declared rules across all sets.
    pub fn rule_count(&self) -> usize {
        self.validation_sets.iter().map(|s| s.rules.len()).sum()
    }
}
