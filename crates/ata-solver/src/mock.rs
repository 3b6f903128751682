//! Fixed-outcome solver for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use ata_core::error::Result;
use ata_core::formulation::Formulation;
use ata_core::traits::{SolveStatus, SolverAdapter, SolverOutcome};

/// A solver double that never looks at the model's constraints.
///
/// Either returns a fixed assignment (`forms[f]` lists the pool positions of
/// form `f`) with a fixed deviation, or a fixed failure status.
pub struct FixedSolver {
    forms: Vec<Vec<usize>>,
    deviation: f64,
    failure: Option<(SolveStatus, String)>,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Variable count of the last formulation received.
    last_variable_count: Mutex<Option<usize>>,
}

impl FixedSolver {
    /// Always return this assignment.
    pub fn with_assignment(forms: Vec<Vec<usize>>, deviation: f64) -> Self {
        Self {
            forms,
            deviation,
            failure: None,
            call_count: AtomicU32::new(0),
            last_variable_count: Mutex::new(None),
        }
    }

    /// Always fail with this status.
    pub fn failing(status: SolveStatus, message: &str) -> Self {
        Self {
            forms: Vec::new(),
            deviation: 0.0,
            failure: Some((status, message.to_string())),
            call_count: AtomicU32::new(0),
            last_variable_count: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_variable_count(&self) -> Option<usize> {
        self.last_variable_count
            .lock()
            .ok()
            .and_then(|guard| *guard)
    }
}

impl SolverAdapter for FixedSolver {
    fn name(&self) -> &str {
        "fixed"
    }

    fn solve(&self, formulation: &Formulation) -> Result<SolverOutcome> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_variable_count.lock() {
            *last = Some(formulation.variable_count());
        }

        if let Some((status, message)) = &self.failure {
            return Ok(SolverOutcome::failed(*status, message.clone()));
        }

        let mut values = vec![0.0; formulation.variable_count()];
        for (form, items) in self.forms.iter().enumerate() {
            for &item in items {
                values[formulation.space.item_form_index(item, form)?] = 1.0;
            }
        }
        values[formulation.space.deviation_index()] = self.deviation;
        Ok(SolverOutcome::solved(
            SolveStatus::Optimal,
            values,
            self.deviation,
        ))
    }
}
