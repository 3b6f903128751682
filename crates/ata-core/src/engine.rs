//! Central assembly pipeline.
//!
//! Validates the inputs, computes item information, formulates the model,
//! hands it to a [`SolverAdapter`], and turns the solution into an
//! [`AssemblyReport`]. Each run is a pure function of the pool and the
//! configuration; nothing is retried.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use uuid::Uuid;

use crate::config::AssemblyConfig;
use crate::error::{AssemblyError, Result};
use crate::extract::ResultExtractor;
use crate::formulation::{Formulation, FormulationStats};
use crate::information::InformationMatrix;
use crate::model::ItemPool;
use crate::report::{AssemblyReport, PoolSummary};
use crate::statistics::{summarize_forms, worst_deviation};
use crate::traits::{SolveStatus, SolverAdapter, SolverOutcome};

/// Progress reporting trait.
pub trait AssemblyObserver {
    fn on_formulated(&self, stats: &FormulationStats);
    fn on_solved(&self, solver: &str, outcome: &SolverOutcome, elapsed: Duration);
}

/// No-op observer.
pub struct NoopObserver;

impl AssemblyObserver for NoopObserver {
    fn on_formulated(&self, _: &FormulationStats) {}
    fn on_solved(&self, _: &str, _: &SolverOutcome, _: Duration) {}
}

/// The formulation-and-solve pipeline.
pub struct Assembler {
    solver: Arc<dyn SolverAdapter>,
    config: AssemblyConfig,
}

impl Assembler {
    pub fn new(solver: Arc<dyn SolverAdapter>, config: AssemblyConfig) -> Self {
        Self { solver, config }
    }

    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Build the information matrix and the model without solving.
    pub fn formulate(&self, pool: &ItemPool) -> Result<(InformationMatrix, Formulation)> {
        Formulation::from_config(pool, &self.config)
    }

    /// Assemble forms from `pool`.
    ///
    /// Input errors are returned before the solver is called. An infeasible
    /// model yields [`AssemblyError::Infeasible`] with no partial result.
    pub fn run(&self, pool: &ItemPool, observer: &dyn AssemblyObserver) -> Result<AssemblyReport> {
        let start = Instant::now();
        let (matrix, formulation) = self.formulate(pool)?;
        self.solve_and_report(pool, &matrix, &formulation, observer, start)
    }

    /// Like [`Assembler::run`], for a model already built by
    /// [`Assembler::formulate`] from the same pool.
    pub fn run_formulated(
        &self,
        pool: &ItemPool,
        matrix: &InformationMatrix,
        formulation: &Formulation,
        observer: &dyn AssemblyObserver,
    ) -> Result<AssemblyReport> {
        self.solve_and_report(pool, matrix, formulation, observer, Instant::now())
    }

    fn solve_and_report(
        &self,
        pool: &ItemPool,
        matrix: &InformationMatrix,
        formulation: &Formulation,
        observer: &dyn AssemblyObserver,
        start: Instant,
    ) -> Result<AssemblyReport> {
        let stats = formulation.stats();
        observer.on_formulated(&stats);

        let solve_start = Instant::now();
        let outcome = self.solver.solve(formulation)?;
        let solve_elapsed = solve_start.elapsed();
        observer.on_solved(self.solver.name(), &outcome, solve_elapsed);

        match outcome.status {
            SolveStatus::Optimal | SolveStatus::Suboptimal => {}
            SolveStatus::Infeasible => {
                tracing::info!(solver = self.solver.name(), "model is infeasible");
                return Err(AssemblyError::Infeasible {
                    status: outcome.status,
                    message: outcome
                        .message
                        .unwrap_or_else(|| "solver reported no feasible solution".into()),
                });
            }
            SolveStatus::Unbounded | SolveStatus::Error => {
                return Err(AssemblyError::Solver {
                    status: outcome.status,
                    message: outcome.message.unwrap_or_else(|| "no details".into()),
                });
            }
        }

        let tolerance = formulation.settings.integrality_tolerance;
        let extraction =
            ResultExtractor::new(&formulation.space, tolerance).extract(&outcome.values, pool)?;
        extraction.verify(pool, &self.config)?;

        let levels = self.config.ability_levels();
        let forms = summarize_forms(&extraction, pool, matrix, &levels);
        let worst = worst_deviation(&forms);
        tracing::info!(
            solver = self.solver.name(),
            status = %outcome.status,
            deviation = extraction.deviation,
            worst_deviation = worst,
            elapsed_ms = solve_elapsed.as_millis() as u64,
            "assembled {} forms",
            forms.len()
        );

        Ok(AssemblyReport {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            solver: self.solver.name().to_string(),
            status: outcome.status,
            deviation: extraction.deviation,
            worst_deviation: worst,
            pool: PoolSummary {
                items: pool.len(),
                categories: pool.num_categories(),
                category_sizes: pool.category_sizes(),
            },
            config: self.config.clone(),
            stats,
            forms,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::model::Item;

    /// Returns a fixed assignment, or a fixed status without values.
    struct StubSolver {
        assignment: Vec<Vec<usize>>,
        status: SolveStatus,
        calls: AtomicUsize,
    }

    impl StubSolver {
        fn new(assignment: Vec<Vec<usize>>, status: SolveStatus) -> Self {
            Self {
                assignment,
                status,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SolverAdapter for StubSolver {
        fn name(&self) -> &str {
            "stub"
        }

        fn solve(&self, formulation: &Formulation) -> Result<SolverOutcome> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if !self.status.has_solution() {
                return Ok(SolverOutcome::failed(self.status, "stubbed"));
            }
            let mut values = vec![0.0; formulation.variable_count()];
            for (form, items) in self.assignment.iter().enumerate() {
                for &item in items {
                    values[formulation.space.item_form_index(item, form)?] = 1.0;
                }
            }
            values[formulation.space.deviation_index()] = 0.3;
            Ok(SolverOutcome::solved(self.status, values, 0.3))
        }
    }

    fn pool() -> ItemPool {
        ItemPool::new(vec![
            Item::new("i1", 1.0, -1.0, 0.0, 1),
            Item::new("i2", 1.2, 0.0, 0.1, 1),
            Item::new("i3", 0.8, 1.0, 0.2, 1),
            Item::new("i4", 1.1, -0.5, 0.0, 2),
            Item::new("i5", 0.9, 0.5, 0.15, 2),
            Item::new("i6", 1.4, 0.2, 0.05, 2),
        ])
        .unwrap()
    }

    fn config() -> AssemblyConfig {
        AssemblyConfig {
            num_forms: 2,
            items_per_form: 3,
            thetas: vec![-1.0, 0.0, 1.0],
            targets: vec![1.5, 2.0, 1.5],
            content_minimums: vec![1, 1],
            ..AssemblyConfig::default()
        }
    }

    #[test]
    fn run_builds_report_from_solution() {
        let solver = Arc::new(StubSolver::new(
            vec![vec![0, 1, 3], vec![2, 4, 5]],
            SolveStatus::Optimal,
        ));
        let assembler = Assembler::new(solver.clone(), config());
        let report = assembler.run(&pool(), &NoopObserver).unwrap();

        assert_eq!(solver.calls.load(Ordering::Relaxed), 1);
        assert_eq!(report.status, SolveStatus::Optimal);
        assert_eq!(report.solver, "stub");
        assert_eq!(report.forms.len(), 2);
        assert_eq!(report.forms[0].item_ids, vec!["i1", "i2", "i4"]);
        assert_eq!(report.forms[1].category_counts, vec![1, 2]);
        assert_eq!(report.deviation, 0.3);
        assert_eq!(report.stats.variables, 13);
        assert_eq!(report.pool.categories, 2);
    }

    #[test]
    fn prebuilt_formulation_is_solved_as_is() {
        let solver = Arc::new(StubSolver::new(
            vec![vec![0, 1, 3], vec![2, 4, 5]],
            SolveStatus::Optimal,
        ));
        let assembler = Assembler::new(solver.clone(), config());
        let (matrix, formulation) = assembler.formulate(&pool()).unwrap();
        let report = assembler
            .run_formulated(&pool(), &matrix, &formulation, &NoopObserver)
            .unwrap();

        assert_eq!(solver.calls.load(Ordering::Relaxed), 1);
        assert_eq!(report.stats, formulation.stats());
        assert_eq!(report.forms[0].item_ids, vec!["i1", "i2", "i4"]);

        // A model built for another pool does not fit this one.
        let smaller = ItemPool::new(pool().items()[..5].to_vec()).unwrap();
        let err = assembler
            .run_formulated(&smaller, &matrix, &formulation, &NoopObserver)
            .unwrap_err();
        assert!(matches!(err, AssemblyError::Model(_)), "{err}");
    }

    #[test]
    fn infeasible_outcome_is_surfaced() {
        let solver = Arc::new(StubSolver::new(vec![], SolveStatus::Infeasible));
        let err = Assembler::new(solver, config())
            .run(&pool(), &NoopObserver)
            .unwrap_err();
        match err {
            AssemblyError::Infeasible { status, message } => {
                assert_eq!(status, SolveStatus::Infeasible);
                assert_eq!(message, "stubbed");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn solver_error_is_surfaced_verbatim() {
        let solver = Arc::new(StubSolver::new(vec![], SolveStatus::Error));
        let err = Assembler::new(solver, config())
            .run(&pool(), &NoopObserver)
            .unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::Solver {
                status: SolveStatus::Error,
                ..
            }
        ));
    }

    #[test]
    fn input_errors_skip_the_solver() {
        let solver = Arc::new(StubSolver::new(vec![], SolveStatus::Optimal));
        let bad = AssemblyConfig {
            targets: vec![1.0],
            ..config()
        };
        let err = Assembler::new(solver.clone(), bad)
            .run(&pool(), &NoopObserver)
            .unwrap_err();
        assert!(err.is_input_error());
        assert_eq!(solver.calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn inconsistent_solution_is_model_error() {
        // Form 1 gets four items, violating the form size.
        let solver = Arc::new(StubSolver::new(
            vec![vec![0, 1, 2, 3], vec![4, 5]],
            SolveStatus::Optimal,
        ));
        let err = Assembler::new(solver, config())
            .run(&pool(), &NoopObserver)
            .unwrap_err();
        assert!(matches!(err, AssemblyError::Model(_)));
    }

    #[test]
    fn observer_sees_formulation_and_outcome() {
        struct Recording {
            constraints: Mutex<Option<usize>>,
            status: Mutex<Option<SolveStatus>>,
        }
        impl AssemblyObserver for Recording {
            fn on_formulated(&self, stats: &FormulationStats) {
                *self.constraints.lock().unwrap() = Some(stats.constraints);
            }
            fn on_solved(&self, _: &str, outcome: &SolverOutcome, _: Duration) {
                *self.status.lock().unwrap() = Some(outcome.status);
            }
        }

        let observer = Recording {
            constraints: Mutex::new(None),
            status: Mutex::new(None),
        };
        let solver = Arc::new(StubSolver::new(
            vec![vec![0, 1, 3], vec![2, 4, 5]],
            SolveStatus::Suboptimal,
        ));
        Assembler::new(solver, config())
            .run(&pool(), &observer)
            .unwrap();
        // 6 exclusivity + 4 content + 2 size + 12 information.
        assert_eq!(*observer.constraints.lock().unwrap(), Some(24));
        assert_eq!(*observer.status.lock().unwrap(), Some(SolveStatus::Suboptimal));
    }
}
