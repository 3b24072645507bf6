//! Rule model and rule-set document parsing.
//!
//! A rule-set document lists validation sets in the order they run. Each set
//! names a dataset, where to load it from, and the ordered rules applied to it:
//!
//! ```text
//! RuleSet
//!     ├── ValidationSet "customers" (data/customers.csv, csv)
//!     │   ├── Rule is_unique(customer_id)           on_fail=STOP quarantine
//!     │   └── Rule null_percentage_is_less_than(state)
//!     └── ValidationSet "orders" (data/orders.parquet, parquet)
//!         └── Rule has_accepted_values(status)
//! ```
//!
//! Structural problems (missing names, bad severities) fail parsing with
//! [`GateError::Config`](crate::error::GateError::Config). Rule-specific
//! parameters are checked later, when the rule is dispatched.

mod model;
mod params;
mod parse;

pub use model::{DataSourceSpec, OnFail, Rule, RuleSet, RuleType, SourceFormat, ValidationSet};
pub use params::RuleParams;
