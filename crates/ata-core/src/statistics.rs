//! Achieved test information and content statistics of assembled forms.

use serde::{Deserialize, Serialize};

use crate::extract::Extraction;
use crate::information::InformationMatrix;
use crate::model::{AbilityLevel, ItemPool};

/// Achieved test information of one form at one ability level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelInformation {
    pub theta: f64,
    pub target: f64,
    pub achieved: f64,
}

impl LevelInformation {
    pub fn deviation(&self) -> f64 {
        (self.achieved - self.target).abs()
    }
}

/// One assembled form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledForm {
    /// 1-based form number.
    pub form: usize,
    pub item_ids: Vec<String>,
    /// Pool positions of the items.
    pub positions: Vec<usize>,
    /// Item count per category, indexed by `label - 1`.
    pub category_counts: Vec<usize>,
    pub information: Vec<LevelInformation>,
}

impl AssembledForm {
    /// Largest absolute deviation from target over all ability levels.
    pub fn max_deviation(&self) -> f64 {
        self.information
            .iter()
            .map(LevelInformation::deviation)
            .fold(0.0, f64::max)
    }
}

/// Compute per-form statistics for an extraction.
pub fn summarize_forms(
    extraction: &Extraction,
    pool: &ItemPool,
    matrix: &InformationMatrix,
    levels: &[AbilityLevel],
) -> Vec<AssembledForm> {
    extraction
        .forms
        .iter()
        .map(|assignment| {
            let mut category_counts = vec![0; pool.num_categories()];
            let mut item_ids = Vec::with_capacity(assignment.items.len());
            for item in assignment.items.iter().filter_map(|&i| pool.get(i)) {
                category_counts[item.category as usize - 1] += 1;
                item_ids.push(item.id.clone());
            }

            let information = levels
                .iter()
                .enumerate()
                .map(|(idx, level)| LevelInformation {
                    theta: level.theta,
                    target: level.target,
                    achieved: matrix.form_information(&assignment.items, idx),
                })
                .collect();

            AssembledForm {
                form: assignment.form + 1,
                item_ids,
                positions: assignment.items.clone(),
                category_counts,
                information,
            }
        })
        .collect()
}

/// Worst deviation over all forms; equals the optimal deviation variable
/// when the solver's bound is tight.
pub fn worst_deviation(forms: &[AssembledForm]) -> f64 {
    forms
        .iter()
        .map(AssembledForm::max_deviation)
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FormAssignment;
    use crate::model::Item;

    #[test]
    fn summarizes_information_and_content() {
        let pool = ItemPool::new(vec![
            Item::new("i1", 1.0, 0.0, 0.0, 1),
            Item::new("i2", 1.0, 0.0, 0.0, 2),
            Item::new("i3", 1.0, 0.0, 0.0, 2),
        ])
        .unwrap();
        let levels = [AbilityLevel {
            theta: 0.0,
            target: 1.0,
        }];
        let matrix = InformationMatrix::compute(&pool, &levels, 1.0).unwrap();
        let extraction = Extraction {
            forms: vec![FormAssignment {
                form: 0,
                items: vec![0, 2],
            }],
            deviation: 0.5,
        };

        let forms = summarize_forms(&extraction, &pool, &matrix, &levels);
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].form, 1);
        assert_eq!(forms[0].item_ids, vec!["i1", "i3"]);
        assert_eq!(forms[0].category_counts, vec![1, 1]);
        // D = 1, a = 1, p = 0.5: each item carries 0.25.
        assert!((forms[0].information[0].achieved - 0.5).abs() < 1e-12);
        assert!((worst_deviation(&forms) - 0.5).abs() < 1e-12);
    }
}
