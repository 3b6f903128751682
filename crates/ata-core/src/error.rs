//! Assembly error types.
//!
//! Every stage of the pipeline returns [`AssemblyError`]. Data and parameter
//! errors are raised before any model is built, so the solver is never
//! invoked for them.

use std::path::PathBuf;

use thiserror::Error;

use crate::traits::SolveStatus;

/// Errors that can occur while loading, formulating, solving or extracting
/// an assembly problem.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// Malformed item bank rows, bad category labels, or content tables that
    /// do not match the category count.
    #[error("data error: {0}")]
    Data(String),

    /// Invalid item parameters or assembly configuration.
    #[error("parameter error: {0}")]
    Parameter(String),

    /// Internal inconsistency between the variable space and the model.
    #[error("model error: {0}")]
    Model(String),

    /// The solver proved that no feasible assignment exists.
    #[error("no feasible assembly ({status}): {message}")]
    Infeasible { status: SolveStatus, message: String },

    /// The solver failed for a reason other than infeasibility.
    #[error("solver failed ({status}): {message}")]
    Solver { status: SolveStatus, message: String },

    /// A returned indicator value is neither 0 nor 1 within tolerance.
    #[error("indicator for item {item_id} in form {form} is {value}, not within {tolerance} of 0 or 1")]
    Tolerance {
        item_id: String,
        form: usize,
        value: f64,
        tolerance: f64,
    },

    /// Reading an input file failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AssemblyError {
    /// Short stable tag for the error kind, used in reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AssemblyError::Data(_) => "data",
            AssemblyError::Parameter(_) => "parameter",
            AssemblyError::Model(_) => "model",
            AssemblyError::Infeasible { .. } => "infeasible",
            AssemblyError::Solver { .. } => "solver",
            AssemblyError::Tolerance { .. } => "tolerance",
            AssemblyError::Io { .. } => "io",
        }
    }

    /// Returns `true` if the error was detected before the solver ran.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            AssemblyError::Data(_) | AssemblyError::Parameter(_) | AssemblyError::Io { .. }
        )
    }

    /// Returns the solver status attached to the error, if any.
    pub fn solve_status(&self) -> Option<SolveStatus> {
        match self {
            AssemblyError::Infeasible { status, .. } | AssemblyError::Solver { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

pub type Result<T, E = AssemblyError> = std::result::Result<T, E>;
