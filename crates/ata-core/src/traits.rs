//! Solver trait definitions.
//!
//! The MILP solver is an external collaborator. It is consumed only through
//! [`SolverAdapter`]; implementations live in the `ata-solver` crate.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::formulation::Formulation;

// ---------------------------------------------------------------------------
// Solver adapter trait
// ---------------------------------------------------------------------------

/// A MILP backend able to solve a [`Formulation`].
///
/// Implementations declare one variable per column (with the domain and
/// bounds from the formulation), add every constraint, set the objective,
/// and honour the tolerances where the backend supports them. Settings the
/// backend cannot apply should be logged, not dropped silently.
pub trait SolverAdapter: Send + Sync {
    /// Human-readable backend name (e.g. "microlp").
    fn name(&self) -> &str;

    /// Solve the formulation.
    ///
    /// Infeasibility is reported through [`SolveStatus::Infeasible`] in the
    /// outcome, not as an `Err`. `Err` is reserved for failures to even hand
    /// the model to the backend.
    fn solve(&self, formulation: &Formulation) -> Result<SolverOutcome>;
}

// ---------------------------------------------------------------------------
// Solver outcome
// ---------------------------------------------------------------------------

/// Status reported by a solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolveStatus {
    /// Proven optimal within the configured gap.
    Optimal,
    /// Feasible but stopped early (time or gap limit); acceptable.
    Suboptimal,
    Infeasible,
    Unbounded,
    Error,
}

impl SolveStatus {
    /// Whether the outcome carries a usable value vector.
    pub fn has_solution(&self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Suboptimal)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "optimal"),
            SolveStatus::Suboptimal => write!(f, "suboptimal"),
            SolveStatus::Infeasible => write!(f, "infeasible"),
            SolveStatus::Unbounded => write!(f, "unbounded"),
            SolveStatus::Error => write!(f, "error"),
        }
    }
}

/// What the solver returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverOutcome {
    pub status: SolveStatus,
    /// One value per column; empty unless `status.has_solution()`.
    pub values: Vec<f64>,
    /// Objective value, when a solution exists.
    pub objective: Option<f64>,
    /// Backend message for non-optimal outcomes.
    pub message: Option<String>,
}

impl SolverOutcome {
    pub fn solved(status: SolveStatus, values: Vec<f64>, objective: f64) -> Self {
        Self {
            status,
            values,
            objective: Some(objective),
            message: None,
        }
    }

    pub fn failed(status: SolveStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective: None,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_and_solution_flag() {
        assert_eq!(SolveStatus::Infeasible.to_string(), "infeasible");
        assert!(SolveStatus::Optimal.has_solution());
        assert!(SolveStatus::Suboptimal.has_solution());
        assert!(!SolveStatus::Infeasible.has_solution());
        assert!(!SolveStatus::Error.has_solution());
    }

    #[test]
    fn failed_outcome_has_no_values() {
        let outcome = SolverOutcome::failed(SolveStatus::Infeasible, "no solution");
        assert!(outcome.values.is_empty());
        assert_eq!(outcome.objective, None);
        assert_eq!(outcome.message.as_deref(), Some("no solution"));
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&SolveStatus::Suboptimal).unwrap();
        assert_eq!(json, "\"suboptimal\"");
    }
}
