//! Core execution types.
//!
//! - **[`QualityGate`]**: runs a rule set and produces a run report
//! - **[`GateContext`]**: the DataFusion session datasets are registered in
//! - **[`Dataset`]**: read-only handle validators evaluate against
//! - **[`SetState`]**, **[`RunState`]**, **[`AbortReason`]**: lifecycle states
//!
//! ## Control flow
//!
//! ```text
//! for each validation set (document order):
//!     load dataset once                 -- failure: FAIL every rule (dataset_load_failed)
//!     for each rule (document order):
//!         resolve validator             -- unknown type: FAIL and abort
//!         evaluate                      -- error: FAIL (invalid_params / evaluation_failed)
//!         record outcome
//!         FAIL + quarantine + row-level -> write failing rows
//!         FAIL + STOP                   -> abort, finalize report
//! ```

mod context;
mod dataset;
mod engine;
mod state;

pub use context::{GateContext, GateContextConfig};
pub use dataset::{Aggregate, Dataset, RowSubset};
pub use engine::{GateRun, QualityGate, QualityGateBuilder};
pub use state::{AbortReason, RulePhase, RunState, SetState};
