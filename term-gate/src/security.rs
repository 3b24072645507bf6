//! SQL hardening for values that flow from rule documents into queries.
//!
//! Column names, literal values and regex patterns all come from a
//! user-supplied rule document and end up inside SQL text executed by
//! DataFusion. Everything passes through [`SqlSecurity`] first.

use crate::error::{GateError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// SQL identifier, literal and pattern validation utilities.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates and escapes a column identifier.
    ///
    /// Column names in tabular files routinely contain spaces or start with
    /// digits, so unlike table names they are not restricted to a strict
    /// pattern. They are always double-quoted, with internal quotes doubled.
    ///
    /// # Examples
    /// ```rust
    /// use term_gate::security::SqlSecurity;
    ///
    /// assert_eq!(SqlSecurity::escape_identifier("customer_id").unwrap(), "\"customer_id\"");
    /// assert_eq!(SqlSecurity::escape_identifier("first name").unwrap(), "\"first name\"");
    /// assert!(SqlSecurity::escape_identifier("").is_err());
    /// ```
    pub fn escape_identifier(identifier: &str) -> Result<String> {
        Self::validate_identifier(identifier)?;
        let escaped = identifier.replace('"', "\"\"");
        Ok(format!("\"{escaped}\""))
    }

    /// Validates an identifier without escaping it.
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.trim().is_empty() {
            return Err(GateError::Security(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }

        // Check identifier length (prevent DoS)
        if identifier.len() > 128 {
            return Err(GateError::Security(
                "SQL identifier too long (max 128 characters)".to_string(),
            ));
        }

        if identifier.contains('\0') {
            return Err(GateError::Security(
                "SQL identifier cannot contain null bytes".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates a table name generated by the engine.
    ///
    /// Registered table names are interpolated unquoted, so they must match a
    /// strict identifier pattern.
    pub fn validate_table_name(name: &str) -> Result<()> {
        static TABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
            #[allow(clippy::expect_used)]
            Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("Hard-coded regex pattern should be valid")
        });

        if name.len() > 128 || !TABLE_REGEX.is_match(name) {
            return Err(GateError::Security(format!(
                "Invalid table name '{name}'. Table names must start with a letter or underscore and contain only letters, numbers and underscores"
            )));
        }
        Ok(())
    }

    /// Renders a string as a single-quoted SQL literal.
    pub fn quote_literal(value: &str) -> Result<String> {
        if value.contains('\0') {
            return Err(GateError::Security(
                "SQL literal cannot contain null bytes".to_string(),
            ));
        }
        Ok(format!("'{}'", value.replace('\'', "''")))
    }

    /// Renders a float as a SQL numeric literal.
    pub fn numeric_literal(value: f64) -> Result<String> {
        if !value.is_finite() {
            return Err(GateError::Security(format!(
                "Numeric literal must be finite, got {value}"
            )));
        }
        // Debug formatting keeps a decimal point, so DataFusion reads a float.
        Ok(format!("{value:?}"))
    }

    /// Validates a regex pattern and returns it escaped for a SQL string literal.
    pub fn validate_regex_pattern(pattern: &str) -> Result<String> {
        if pattern.len() > 1000 {
            return Err(GateError::Security(
                "Regex pattern too long (max 1000 characters)".to_string(),
            ));
        }

        if pattern.contains('\0') {
            return Err(GateError::Security(
                "Regex pattern cannot contain null bytes".to_string(),
            ));
        }

        if let Err(e) = Regex::new(pattern) {
            return Err(GateError::Security(format!("Invalid regex pattern: {e}")));
        }

        Ok(pattern.replace('\'', "''"))
    }
}
