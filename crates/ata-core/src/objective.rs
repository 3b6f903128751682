//! The min-max objective.

use serde::{Deserialize, Serialize};

use crate::variables::VariableSpace;

/// Sparse linear objective, always minimized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub terms: Vec<(usize, f64)>,
}

impl Objective {
    /// Minimize the shared deviation variable. Since every information bound
    /// uses the same deviation column, this minimizes the worst deviation
    /// over all forms and ability levels at once.
    pub fn min_deviation(space: &VariableSpace) -> Self {
        Self {
            terms: vec![(space.deviation_index(), 1.0)],
        }
    }

    /// Coefficient of `column`; zero for columns not in the objective.
    pub fn coefficient(&self, column: usize) -> f64 {
        self.terms
            .iter()
            .filter(|(col, _)| *col == column)
            .map(|(_, coef)| coef)
            .sum()
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(col, coef)| coef * values.get(col).copied().unwrap_or(0.0))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_deviation_is_weighted() {
        let space = VariableSpace::new(4, 2);
        let objective = Objective::min_deviation(&space);
        assert_eq!(objective.coefficient(8), 1.0);
        for col in 0..8 {
            assert_eq!(objective.coefficient(col), 0.0);
        }
        let mut values = vec![1.0; 9];
        values[8] = 0.25;
        assert_eq!(objective.evaluate(&values), 0.25);
    }
}
