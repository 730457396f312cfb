//! Per-parameter notes produced by a recalculation pass
//!
//! None of these abort a pass. They tell the caller why a value or a
//! bound was left as it was.

use serde::{Deserialize, Serialize};

use crate::core::expression::EvalError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The formula produced no result; the previous value was kept
    Formula(EvalError),
    /// The lower bound did not resolve and was treated as absent
    RangeMin(EvalError),
    /// The upper bound did not resolve and was treated as absent
    RangeMax(EvalError),
    /// Dependency-order mode only: the parameter is part of a reference cycle
    Cycle { members: Vec<String> },
    /// Dependency-order mode only: an input is in, or downstream of, a cycle
    DependsOnCycle { name: String },
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticKind::Formula(e) => write!(f, "formula: {}", e),
            DiagnosticKind::RangeMin(e) => write!(f, "range_min ignored: {}", e),
            DiagnosticKind::RangeMax(e) => write!(f, "range_max ignored: {}", e),
            DiagnosticKind::Cycle { members } => {
                write!(f, "circular reference: {}", members.join(" -> "))
            }
            DiagnosticKind::DependsOnCycle { name } => {
                write!(f, "not calculated: [{}] is unresolved", name)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub test_id: String,
    pub parameter: String,
    pub kind: DiagnosticKind,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}: {}", self.test_id, self.parameter, self.kind)
    }
}
