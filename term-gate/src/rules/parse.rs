//! Rule-set document parsing.

use super::{DataSourceSpec, OnFail, Rule, RuleParams, RuleSet, RuleType, SourceFormat, ValidationSet};
use crate::error::{GateError, Result};
use crate::quarantine::{sanitize_component, QuarantineTarget};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct RawDocument {
    validation_sets: Option<Vec<RawValidationSet>>,
}

#[derive(Debug, Deserialize)]
struct RawValidationSet {
    dataset_name: Option<String>,
    data_source_path: Option<String>,
    data_source_format: Option<String>,
    #[serde(default)]
    rules: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    rule_type: Option<String>,
    column: Option<String>,
    params: Option<serde_json::Value>,
    on_fail: Option<String>,
    quarantine: Option<bool>,
}

impl RuleSet {
    /// Parses a JSON rule-set document.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use term_gate::rules::{OnFail, RuleSet};
    ///
    /// let doc = r#"{"validation_sets": [{
    ///     "dataset_name": "customers",
    ///     "data_source_path": "data/customers.csv",
    ///     "data_source_format": "csv",
    ///     "rules": [{"rule_type": "is_unique", "column": "customer_id", "on_fail": "STOP"}]
    /// }]}"#;
    /// let rule_set = RuleSet::from_json_str(doc).unwrap();
    /// assert_eq!(rule_set.validation_sets[0].rules[0].on_fail, OnFail::Stop);
    /// ```
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawDocument = serde_json::from_str(content)
            .map_err(|e| GateError::config(format!("Invalid rule document: {e}")))?;
        Self::from_raw(raw)
    }

    /// Parses a YAML rule-set document with the same shape as the JSON one.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let raw: RawDocument = serde_yaml::from_str(content)
            .map_err(|e| GateError::config(format!("Invalid rule document: {e}")))?;
        Self::from_raw(raw)
    }

    /// Reads a rule-set document from disk. `.yaml`/`.yml` files are parsed as
    /// YAML, everything else as JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GateError::config(format!("Cannot read rule document {}: {e}", path.display()))
        })?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        debug!(rules.path = %path.display(), rules.yaml = is_yaml, "Parsing rule document");
        if is_yaml {
            Self::from_yaml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    fn from_raw(raw: RawDocument) -> Result<Self> {
        let raw_sets = raw
            .validation_sets
            .ok_or_else(|| GateError::config("Rule document has no 'validation_sets'"))?;

        let mut seen = HashSet::new();
        let mut quarantine_names: HashMap<String, String> = HashMap::new();
        let mut validation_sets = Vec::with_capacity(raw_sets.len());
        for (set_idx, raw_set) in raw_sets.into_iter().enumerate() {
            let set = parse_set(set_idx, raw_set)?;
            if !seen.insert(set.dataset_name.clone()) {
                return Err(GateError::config(format!(
                    "validation_sets[{set_idx}]: duplicate dataset_name '{}'",
                    set.dataset_name
                )));
            }
            let component = sanitize_component(&set.dataset_name);
            if let Some(other) = quarantine_names.insert(component.clone(), set.dataset_name.clone()) {
                return Err(GateError::config(format!(
                    "validation_sets[{set_idx}]: dataset_name '{}' and '{other}' share the quarantine directory '{component}'",
                    set.dataset_name
                )));
            }
            check_quarantine_targets(set_idx, &set)?;
            validation_sets.push(set);
        }

        Ok(RuleSet { validation_sets })
    }
}

/// Quarantined rules of one set must not clean up to the same directory
/// unless they are the same rule target.
fn check_quarantine_targets(set_idx: usize, set: &ValidationSet) -> Result<()> {
    let mut owners: HashMap<std::path::PathBuf, (String, String)> = HashMap::new();
    for (rule_idx, rule) in set.rules.iter().enumerate().filter(|(_, r)| r.quarantine) {
        let target = QuarantineTarget::new(&set.dataset_name, rule.rule_type.as_str(), &rule.column);
        let owner = (rule.rule_type.to_string(), rule.column.clone());
        match owners.get(&target.relative_dir()) {
            Some(existing) if *existing != owner => {
                return Err(GateError::config(format!(
                    "validation_sets[{set_idx}].rules[{rule_idx}]: quarantine for '{}' on column '{}' collides with '{}' on column '{}'",
                    owner.0, owner.1, existing.0, existing.1
                )));
            }
            Some(_) => {}
            None => {
                owners.insert(target.relative_dir(), owner);
            }
        }
    }
    Ok(())
}

fn parse_set(set_idx: usize, raw: RawValidationSet) -> Result<ValidationSet> {
    let location = format!("validation_sets[{set_idx}]");
    let dataset_name = required(raw.dataset_name, &location, "dataset_name")?;
    let path = required(raw.data_source_path, &location, "data_source_path")?;
    let format_name = required(raw.data_source_format, &location, "data_source_format")?;
    let format = SourceFormat::parse(&format_name).ok_or_else(|| {
        GateError::config(format!(
            "{location}: unsupported data_source_format '{format_name}' (expected csv, parquet or json)"
        ))
    })?;

    let rules = raw
        .rules
        .into_iter()
        .enumerate()
        .map(|(rule_idx, raw_rule)| {
            parse_rule(&format!("{location}.rules[{rule_idx}]"), &dataset_name, raw_rule)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ValidationSet {
        dataset_name,
        source: DataSourceSpec { path, format },
        rules,
    })
}

fn parse_rule(location: &str, dataset_name: &str, raw: RawRule) -> Result<Rule> {
    let rule_type = RuleType::from(required(raw.rule_type, location, "rule_type")?);
    let column = required(raw.column, location, "column")?;

    let on_fail = match raw.on_fail {
        None => OnFail::Warn,
        Some(value) => OnFail::parse(&value).ok_or_else(|| {
            GateError::config(format!(
                "{location}: on_fail must be WARN or STOP, got '{value}'"
            ))
        })?,
    };

    let params = match raw.params {
        None | Some(serde_json::Value::Null) => RuleParams::default(),
        Some(value @ serde_json::Value::Object(_)) => serde_json::from_value(value)
            .map_err(|e| GateError::config(format!("{location}: invalid params: {e}")))?,
        Some(other) => {
            return Err(GateError::config(format!(
                "{location}: params must be an object, got {other}"
            )))
        }
    };

    let quarantine = raw.quarantine.unwrap_or(false);
    if quarantine && rule_type.is_aggregate() {
        warn!(
            dataset.name = %dataset_name,
            rule.type = %rule_type,
            rule.column = %column,
            "Quarantine requested on an aggregate rule; it has no row-level subset and nothing will be isolated"
        );
    }

    Ok(Rule {
        rule_type,
        column,
        params,
        on_fail,
        quarantine,
    })
}

fn required(value: Option<String>, location: &str, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(GateError::config(format!(
            "{location}: missing required field '{field}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUSTOMERS: &str = r#"{
        "validation_sets": [
            {
                "dataset_name": "Clientes",
                "data_source_path": "data/customers_v2.csv",
                "data_source_format": "csv",
                "rules": [
                    {"rule_type": "is_unique", "column": "customer_id", "on_fail": "STOP", "quarantine": true},
                    {"rule_type": "null_percentage_is_less_than", "column": "state", "params": {"threshold": 15}, "on_fail": "WARN"},
                    {"rule_type": "mean_is_between", "column": "age", "params": {"min": 20, "max": 40}}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_document() {
        let rule_set = RuleSet::from_json_str(CUSTOMERS).unwrap();
        assert_eq!(rule_set.validation_sets.len(), 1);

        let set = &rule_set.validation_sets[0];
        assert_eq!(set.dataset_name, "Clientes");
        assert_eq!(set.source.format, SourceFormat::Csv);
        assert_eq!(set.rules.len(), 3);

        assert_eq!(set.rules[0].rule_type, RuleType::IsUnique);
        assert_eq!(set.rules[0].on_fail, OnFail::Stop);
        assert!(set.rules[0].quarantine);

        assert_eq!(set.rules[1].params.require_f64("x", "threshold").unwrap(), 15.0);
        assert_eq!(set.rules[2].on_fail, OnFail::Warn);
        assert!(!set.rules[2].quarantine);
    }

    #[test]
    fn test_yaml_document() {
        let yaml = r#"
validation_sets:
  - dataset_name: orders
    data_source_path: data/orders.parquet
    data_source_format: PARQUET
    rules:
      - rule_type: has_accepted_values
        column: status
        params:
          values: [open, closed]
        on_fail: stop
"#;
        let rule_set = RuleSet::from_yaml_str(yaml).unwrap();
        let rule = &rule_set.validation_sets[0].rules[0];
        assert_eq!(rule_set.validation_sets[0].source.format, SourceFormat::Parquet);
        assert_eq!(rule.on_fail, OnFail::Stop);
        assert_eq!(rule.params.require_list("x", "values").unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_rule_type_is_not_a_parse_error() {
        let doc = r#"{"validation_sets": [{"dataset_name": "d", "data_source_path": "p",
            "data_source_format": "csv", "rules": [{"rule_type": "is_positive", "column": "x"}]}]}"#;
        let rule_set = RuleSet::from_json_str(doc).unwrap();
        assert_eq!(
            rule_set.validation_sets[0].rules[0].rule_type,
            RuleType::Custom("is_positive".to_string())
        );
    }

    #[test]
    fn test_missing_params_are_not_a_parse_error() {
        let doc = r#"{"validation_sets": [{"dataset_name": "d", "data_source_path": "p",
            "data_source_format": "csv", "rules": [{"rule_type": "is_in_range", "column": "x"}]}]}"#;
        assert!(RuleSet::from_json_str(doc).is_ok());
    }

    #[test]
    fn test_config_errors() {
        let cases = [
            (r#"{}"#, "validation_sets"),
            (
                r#"{"validation_sets": [{"data_source_path": "p", "data_source_format": "csv"}]}"#,
                "dataset_name",
            ),
            (
                r#"{"validation_sets": [{"dataset_name": "d", "data_source_format": "csv"}]}"#,
                "data_source_path",
            ),
            (
                r#"{"validation_sets": [{"dataset_name": "d", "data_source_path": "p", "data_source_format": "avro"}]}"#,
                "avro",
            ),
            (
                r#"{"validation_sets": [{"dataset_name": "d", "data_source_path": "p", "data_source_format": "csv",
                    "rules": [{"column": "x"}]}]}"#,
                "rules[0]: missing required field 'rule_type'",
            ),
            (
                r#"{"validation_sets": [{"dataset_name": "d", "data_source_path": "p", "data_source_format": "csv",
                    "rules": [{"rule_type": "is_unique", "column": ""}]}]}"#,
                "'column'",
            ),
            (
                r#"{"validation_sets": [{"dataset_name": "d", "data_source_path": "p", "data_source_format": "csv",
                    "rules": [{"rule_type": "is_unique", "column": "x", "on_fail": "PANIC"}]}]}"#,
                "on_fail must be WARN or STOP",
            ),
            (
                r#"{"validation_sets": [{"dataset_name": "d", "data_source_path": "p", "data_source_format": "csv",
                    "rules": [{"rule_type": "is_unique", "column": "x", "params": [1]}]}]}"#,
                "params must be an object",
            ),
            ("not json", "Invalid rule document"),
        ];

        for (doc, expected) in cases {
            let err = RuleSet::from_json_str(doc).unwrap_err();
            assert!(matches!(err, GateError::Config(_)), "{doc}");
            assert!(err.to_string().contains(expected), "{err} should mention {expected}");
        }
    }

    #[test]
    fn test_duplicate_dataset_names() {
        let doc = r#"{"validation_sets": [
            {"dataset_name": "d", "data_source_path": "a", "data_source_format": "csv"},
            {"dataset_name": "d", "data_source_path": "b", "data_source_format": "csv"}
        ]}"#;
        let err = RuleSet::from_json_str(doc).unwrap_err();
        assert!(err.to_string().contains("duplicate dataset_name 'd'"));
    }

    #[test]
    fn test_from_path_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("rules.json");
        std::fs::write(&json_path, CUSTOMERS).unwrap();
        assert_eq!(RuleSet::from_path(&json_path).unwrap().rule_count(), 3);

        let err = RuleSet::from_path(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, GateError::Config(_)));
    }

    #[test]
    fn test_dataset_names_sharing_quarantine_dir() {
        let doc = r#"{"validation_sets": [
            {"dataset_name": "a b", "data_source_path": "a", "data_source_format": "csv"},
            {"dataset_name": "a_b", "data_source_path": "b", "data_source_format": "csv"}
        ]}"#;
        let err = RuleSet::from_json_str(doc).unwrap_err();
        assert!(matches!(err, GateError::Config(_)));
        assert!(err.to_string().contains("validation_sets[1]"));
        assert!(err.to_string().contains("'a_b'"));
    }

    #[test]
    fn test_columns_sharing_quarantine_dir() {
        let doc = r#"{"validation_sets": [{
            "dataset_name": "d", "data_source_path": "a", "data_source_format": "csv",
            "rules": [
                {"rule_type": "is_unique", "column": "x y", "quarantine": true},
                {"rule_type": "is_unique", "column": "x_y", "quarantine": true}
            ]
        }]}"#;
        let err = RuleSet::from_json_str(doc).unwrap_err();
        assert!(matches!(err, GateError::Config(_)));
        assert!(err.to_string().contains("validation_sets[0].rules[1]"));

        // Without quarantine the names never meet on disk.
        let doc = doc.replace(r#""quarantine": true"#, r#""quarantine": false"#);
        assert!(RuleSet::from_json_str(&doc).is_ok());
    }

    #[test]
    fn test_repeated_quarantine_target_is_allowed() {
        let doc = r#"{"validation_sets": [{
            "dataset_name": "d", "data_source_path": "a", "data_source_format": "csv",
            "rules": [
                {"rule_type": "is_not_null", "column": "id", "quarantine": true},
                {"rule_type": "is_not_null", "column": "id", "quarantine": true, "on_fail": "STOP"}
            ]
        }]}"#;
        assert_eq!(RuleSet::from_json_str(doc).unwrap().rule_count(), 2);
    }
}
