//! Error types for the term-gate data-quality gate.
//!
//! All errors are represented by the [`GateError`] enum. Only two of them are
//! meant to end a run without a report: [`GateError::Config`] (the rule or gate
//! document is malformed) and [`GateError::ReportWrite`] (everything was
//! evaluated but the report could not be persisted). Every other variant is
//! captured per rule by the execution engine and recorded in the report.

use thiserror::Error;

/// The main error type for term-gate.
#[derive(Error, Debug)]
pub enum GateError {
    /// The rule-set or gate configuration document is malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A rule names a type that no registered validator handles.
    #[error("Unknown rule type '{rule_type}'")]
    UnknownRuleType { rule_type: String },

    /// A rule is missing a parameter its validator requires, or the value is unusable.
    #[error("Invalid parameter '{param}' for rule '{rule_type}': {message}")]
    InvalidParams {
        rule_type: String,
        param: String,
        message: String,
    },

    /// A validator could not finish evaluating a rule.
    #[error("Evaluation of '{rule_type}' on column '{column}' failed: {message}")]
    ValidationEvaluation {
        rule_type: String,
        column: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Failing rows could not be written to the quarantine area.
    #[error("Quarantine write to '{path}' failed: {message}")]
    QuarantineWrite { path: String, message: String },

    /// The run report could not be persisted.
    #[error("Report write to '{path}' failed: {message}")]
    ReportWrite {
        path: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from data source operations.
    #[error("Data source error: {message}")]
    DataSource {
        /// Type of data source (e.g., "csv", "parquet", "memory")
        source_type: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error when a required column is not found in the dataset.
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// Error when data types don't match expected types.
    #[error("Type mismatch on column '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    /// Security-related error (unsafe identifier, pattern, ...).
    #[error("Security error: {0}")]
    Security(String),

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from Parquet encoding.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, GateError>`.
pub type Result<T> = std::result::Result<T, GateError>;

impl GateError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an invalid-parameter error.
    pub fn invalid_params(
        rule_type: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParams {
            rule_type: rule_type.into(),
            param: param.into(),
            message: message.into(),
        }
    }

    /// Creates an evaluation error with no underlying source.
    pub fn evaluation(
        rule_type: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ValidationEvaluation {
            rule_type: rule_type.into(),
            column: column.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new data source error.
    pub fn data_source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new data source error with a source error.
    pub fn data_source_with_source(
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a quarantine write error.
    pub fn quarantine_write(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QuarantineWrite {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a report write error wrapping the underlying failure.
    pub fn report_write(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ReportWrite {
            path: path.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Short machine-readable tag recorded as the `error` metric of a failed rule.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::UnknownRuleType { .. } => "unknown_rule_type",
            Self::InvalidParams { .. } => "invalid_params",
            Self::DataSource { .. } => "dataset_load_failed",
            Self::QuarantineWrite { .. } => "quarantine_write_failed",
            Self::ReportWrite { .. } => "report_write_failed",
            _ => "evaluation_failed",
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<GateError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.with_context(|| msg.to_string())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e.into() {
            GateError::Config(inner) => GateError::Config(format!("{}: {inner}", f())),
            GateError::Internal(inner) => GateError::Internal(format!("{}: {inner}", f())),
            other => GateError::Internal(format!("{}: {other}", f())),
        })
    }
}

impl From<serde_json::Error> for GateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::fmt::Error> for GateError {
    fn from(err: std::fmt::Error) -> Self {
        Self::Internal(format!("Formatting failed: {err}"))
    }
}
