//! Name-to-validator lookup.

use super::{
    AcceptedValuesValidator, InRangeValidator, IsNotNullValidator, IsUniqueValidator,
    MatchesRegexValidator, MeanBetweenValidator, NullPercentageValidator, Validator,
};
use crate::prelude::*;
use crate::rules::RuleType;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Maps rule type names to validators.
///
/// The engine only ever talks to the registry, so adding a rule type means
/// registering one more validator here.
///
/// # Examples
///
/// ```rust
/// use term_gate::rules::RuleType;
/// use term_gate::validators::ValidatorRegistry;
///
/// let registry = ValidatorRegistry::with_builtins();
/// assert!(registry.resolve(&RuleType::IsUnique).is_ok());
/// assert!(registry.resolve(&RuleType::from("is_positive")).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValidatorRegistry {
    validators: HashMap<String, Arc<dyn Validator>>,
}

impl ValidatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the seven built-in validators.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let builtins: [Arc<dyn Validator>; 7] = [
            Arc::new(IsUniqueValidator),
            Arc::new(IsNotNullValidator),
            Arc::new(AcceptedValuesValidator),
            Arc::new(InRangeValidator),
            Arc::new(MatchesRegexValidator),
            Arc::new(NullPercentageValidator),
            Arc::new(MeanBetweenValidator),
        ];
        for validator in builtins {
            let name = validator.name().to_string();
            registry.register(name, validator);
        }
        registry
    }

    /// Adds a validator, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, validator: Arc<dyn Validator>) -> &mut Self {
        let name = name.into();
        debug!(validator.name = %name, "Registered validator");
        self.validators.insert(name, validator);
        self
    }

    /// Finds the validator for `rule_type`.
    pub fn resolve(&self, rule_type: &RuleType) -> Result<Arc<dyn Validator>> {
        self.validators
            .get(rule_type.as_str())
            .cloned()
            .ok_or_else(|| GateError::UnknownRuleType {
                rule_type: rule_type.to_string(),
            })
    }

    pub fn contains(&self, rule_type: &RuleType) -> bool {
        self.validators.contains_key(rule_type.as_str())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.validators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
