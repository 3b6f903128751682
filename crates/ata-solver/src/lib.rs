//! ata-solver — MILP backends for ata.
//!
//! Implements [`SolverAdapter`] on top of `good_lp` with the pure-Rust
//! `microlp` branch-and-bound solver, plus a [`mock::FixedSolver`] for tests.

pub mod mock;

use good_lp::solvers::microlp::microlp;
use good_lp::{variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable};

use ata_core::constraints::Comparison;
use ata_core::error::Result;
use ata_core::formulation::Formulation;
use ata_core::traits::{SolveStatus, SolverAdapter, SolverOutcome};
use ata_core::variables::VariableDomain;

pub use mock::FixedSolver;

/// `good_lp` + `microlp` backend.
///
/// microlp always solves to proven optimality and has no time limit, so a
/// configured gap or time limit is logged and otherwise ignored.
#[derive(Debug, Default, Clone)]
pub struct MicroLpSolver;

impl MicroLpSolver {
    pub fn new() -> Self {
        Self
    }
}

impl SolverAdapter for MicroLpSolver {
    fn name(&self) -> &str {
        "microlp"
    }

    fn solve(&self, formulation: &Formulation) -> Result<SolverOutcome> {
        let settings = &formulation.settings;
        if let Some(limit) = settings.time_limit_secs {
            tracing::warn!(limit, "microlp has no time limit support, ignoring time_limit_secs");
        }
        if settings.mip_gap > 0.0 {
            tracing::debug!(
                gap = settings.mip_gap,
                "microlp solves to optimality, mip_gap is not needed"
            );
        }

        let mut vars = ProblemVariables::new();
        let columns: Vec<Variable> = formulation
            .domains
            .iter()
            .map(|domain| match *domain {
                VariableDomain::Binary => vars.add(variable().binary()),
                VariableDomain::Continuous { lower, upper } => {
                    let def = variable().min(lower);
                    match upper {
                        Some(upper) => vars.add(def.max(upper)),
                        None => vars.add(def),
                    }
                }
            })
            .collect();

        let objective = linear_expression(&formulation.objective.terms, &columns);
        let mut model = vars.minimise(objective).using(microlp);

        for constraint in &formulation.constraints {
            let lhs = linear_expression(&constraint.terms, &columns);
            model = match constraint.comparison {
                Comparison::LessEq => model.with(lhs.leq(constraint.rhs)),
                Comparison::GreaterEq => model.with(lhs.geq(constraint.rhs)),
                Comparison::Equal => model.with(lhs.eq(constraint.rhs)),
            };
        }

        tracing::debug!(
            variables = columns.len(),
            constraints = formulation.constraints.len(),
            "solving with microlp"
        );

        match model.solve() {
            Ok(solution) => {
                let values: Vec<f64> = columns.iter().map(|&v| solution.value(v)).collect();
                let objective = formulation.objective.evaluate(&values);
                Ok(SolverOutcome::solved(SolveStatus::Optimal, values, objective))
            }
            Err(ResolutionError::Infeasible) => Ok(SolverOutcome::failed(
                SolveStatus::Infeasible,
                "microlp: the problem is infeasible",
            )),
            Err(ResolutionError::Unbounded) => Ok(SolverOutcome::failed(
                SolveStatus::Unbounded,
                "microlp: the objective is unbounded",
            )),
            Err(other) => Ok(SolverOutcome::failed(
                SolveStatus::Error,
                format!("microlp: {other}"),
            )),
        }
    }
}

fn linear_expression(terms: &[(usize, f64)], columns: &[Variable]) -> Expression {
    let mut expr = Expression::default();
    for &(col, coef) in terms {
        if let Some(&var) = columns.get(col) {
            expr += var * coef;
        }
    }
    expr
}
