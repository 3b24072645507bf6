//! Run, validation-set and rule lifecycle states.

use crate::validators::RuleStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one validation set.
///
/// ```text
/// Pending -> Running -> Completed
///                  \-> Aborted
/// ```
///
/// Sets that were never reached because an earlier rule stopped the run stay
/// `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetState {
    #[default]
    Pending,
    Running,
    Completed,
    Aborted,
}

impl SetState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SetState::Completed | SetState::Aborted)
    }
}

impl fmt::Display for SetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SetState::Pending => "pending",
            SetState::Running => "running",
            SetState::Completed => "completed",
            SetState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Lifecycle of one rule inside a running set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulePhase {
    Scheduled,
    Evaluated(RuleStatus),
    Recorded,
}

impl fmt::Display for RulePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RulePhase::Scheduled => f.write_str("scheduled"),
            RulePhase::Evaluated(status) => write!(f, "evaluated({status})"),
            RulePhase::Recorded => f.write_str("recorded"),
        }
    }
}

/// Why a run stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    /// A rule declared `on_fail: STOP` failed.
    RuleFailed {
        dataset_name: String,
        rule_type: String,
        column: String,
    },
    /// A rule names a type with no registered validator.
    UnknownRuleType {
        dataset_name: String,
        rule_type: String,
        column: String,
    },
}

impl AbortReason {
    pub fn dataset_name(&self) -> &str {
        match self {
            AbortReason::RuleFailed { dataset_name, .. }
            | AbortReason::UnknownRuleType { dataset_name, .. } => dataset_name,
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::RuleFailed {
                dataset_name,
                rule_type,
                column,
            } => write!(
                f,
                "Critical rule '{rule_type}' failed for column '{column}' in dataset '{dataset_name}'"
            ),
            AbortReason::UnknownRuleType {
                dataset_name,
                rule_type,
                column,
            } => write!(
                f,
                "Unknown rule type '{rule_type}' for column '{column}' in dataset '{dataset_name}'"
            ),
        }
    }
}

/// State of the whole run. `Aborted` is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Running,
    Aborted(AbortReason),
}

impl RunState {
    pub fn is_aborted(&self) -> bool {
        matches!(self, RunState::Aborted(_))
    }

    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match self {
            RunState::Running => None,
            RunState::Aborted(reason) => Some(reason),
        }
    }
}
