//! Rule parameters with typed, lazily-checked accessors.
//!
//! Parameters are kept as raw JSON values at parse time. Each validator pulls
//! what it needs when it is dispatched, so a rule with a missing or ill-typed
//! parameter fails on its own instead of rejecting the whole document.

use crate::error::{GateError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Rule-specific parameters keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleParams(BTreeMap<String, Value>);

impl RuleParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reads a required number. Numeric strings such as `"15"` are accepted.
    pub fn require_f64(&self, rule_type: &str, name: &str) -> Result<f64> {
        let value = self.require(rule_type, name)?;
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match number {
            Some(n) if n.is_finite() => Ok(n),
            _ => Err(GateError::invalid_params(
                rule_type,
                name,
                format!("expected a number, got {value}"),
            )),
        }
    }

    /// Reads a required non-empty string.
    pub fn require_str(&self, rule_type: &str, name: &str) -> Result<&str> {
        match self.require(rule_type, name)? {
            Value::String(s) if !s.is_empty() => Ok(s),
            other => Err(GateError::invalid_params(
                rule_type,
                name,
                format!("expected a non-empty string, got {other}"),
            )),
        }
    }

    /// Reads a required non-empty list of scalar values.
    pub fn require_list(&self, rule_type: &str, name: &str) -> Result<&[Value]> {
        match self.require(rule_type, name)? {
            Value::Array(items) if !items.is_empty() => {
                if let Some(bad) = items.iter().find(|v| v.is_array() || v.is_object()) {
                    return Err(GateError::invalid_params(
                        rule_type,
                        name,
                        format!("list items must be scalars, got {bad}"),
                    ));
                }
                Ok(items)
            }
            other => Err(GateError::invalid_params(
                rule_type,
                name,
                format!("expected a non-empty list, got {other}"),
            )),
        }
    }

    /// Reads an inclusive `[min, max]` pair, rejecting `min > max`.
    pub fn require_bounds(&self, rule_type: &str) -> Result<(f64, f64)> {
        let min = self.require_f64(rule_type, "min")?;
        let max = self.require_f64(rule_type, "max")?;
        if min > max {
            return Err(GateError::invalid_params(
                rule_type,
                "min",
                format!("min ({min}) is greater than max ({max})"),
            ));
        }
        Ok((min, max))
    }

    fn require(&self, rule_type: &str, name: &str) -> Result<&Value> {
        match self.0.get(name) {
            Some(Value::Null) | None => Err(GateError::invalid_params(
                rule_type,
                name,
                "required parameter is missing",
            )),
            Some(value) => Ok(value),
        }
    }
}

impl From<BTreeMap<String, Value>> for RuleParams {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}
