//! Prelude for commonly used types and traits in term-gate.

pub use crate::core::{GateContext, GateContextConfig, QualityGate};
pub use crate::error::{ErrorContext, GateError, Result};
pub use crate::formatters::{FormatterConfig, ResultFormatter};
pub use crate::report::RunReport;
pub use crate::rules::{OnFail, Rule, RuleSet};
