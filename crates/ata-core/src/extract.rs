//! Mapping a solver's value vector back to per-form item assignments.

use serde::{Deserialize, Serialize};

use crate::config::AssemblyConfig;
use crate::error::{AssemblyError, Result};
use crate::model::ItemPool;
use crate::variables::VariableSpace;

/// Items selected for one form, as pool positions in pool order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormAssignment {
    /// Zero-based form index.
    pub form: usize,
    pub items: Vec<usize>,
}

/// The decoded solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub forms: Vec<FormAssignment>,
    /// Value of the deviation variable.
    pub deviation: f64,
}

/// Reads item-form indicators using the integrality tolerance as the
/// rounding boundary.
pub struct ResultExtractor<'a> {
    space: &'a VariableSpace,
    tolerance: f64,
}

impl<'a> ResultExtractor<'a> {
    pub fn new(space: &'a VariableSpace, tolerance: f64) -> Self {
        Self { space, tolerance }
    }

    /// Decode `values` into form assignments.
    ///
    /// An indicator within `tolerance` of 1 is assigned, within `tolerance` of
    /// 0 is not; anything else, NaN and infinities included, is a tolerance
    /// error.
    pub fn extract(&self, values: &[f64], pool: &ItemPool) -> Result<Extraction> {
        if values.len() != self.space.variable_count() {
            return Err(AssemblyError::Model(format!(
                "solution has {} values but the model has {} variables",
                values.len(),
                self.space.variable_count()
            )));
        }
        if pool.len() != self.space.num_items() {
            return Err(AssemblyError::Model(format!(
                "pool has {} items but the variable space has {}",
                pool.len(),
                self.space.num_items()
            )));
        }

        let mut forms = Vec::with_capacity(self.space.num_forms());
        for form in 0..self.space.num_forms() {
            let mut items = Vec::new();
            for (item, entry) in pool.items().iter().enumerate() {
                let value = values[self.space.item_form_index(item, form)?];
                if (value - 1.0).abs() <= self.tolerance {
                    items.push(item);
                    continue;
                }
                if value.abs() <= self.tolerance {
                    continue;
                }
                return Err(AssemblyError::Tolerance {
                    item_id: entry.id.clone(),
                    form: form + 1,
                    value,
                    tolerance: self.tolerance,
                });
            }
            forms.push(FormAssignment { form, items });
        }

        Ok(Extraction {
            forms,
            deviation: values[self.space.deviation_index()],
        })
    }
}

impl Extraction {
    /// Check the decoded assignment against the assembly rules.
    ///
    /// A violation means the solver returned a vector inconsistent with the
    /// model it was given.
    pub fn verify(&self, pool: &ItemPool, config: &AssemblyConfig) -> Result<()> {
        let mut owner: Vec<Option<usize>> = vec![None; pool.len()];
        for assignment in &self.forms {
            if assignment.items.len() != config.items_per_form {
                return Err(AssemblyError::Model(format!(
                    "form {} has {} items, expected {}",
                    assignment.form + 1,
                    assignment.items.len(),
                    config.items_per_form
                )));
            }

            let mut counts = vec![0u32; pool.num_categories()];
            for &item in &assignment.items {
                let entry = pool
                    .get(item)
                    .ok_or_else(|| AssemblyError::Model(format!("no item at position {item}")))?;
                if let Some(other) = owner[item].replace(assignment.form) {
                    return Err(AssemblyError::Model(format!(
                        "item {} assigned to forms {} and {}",
                        entry.id,
                        other + 1,
                        assignment.form + 1
                    )));
                }
                counts[entry.category as usize - 1] += 1;
            }

            for (idx, &count) in counts.iter().enumerate() {
                let min = config.content_minimums.get(idx).copied().unwrap_or(0);
                if count < min {
                    return Err(AssemblyError::Model(format!(
                        "form {} has {count} items of category {}, minimum is {min}",
                        assignment.form + 1,
                        idx + 1
                    )));
                }
                if let Some(max) = config.content_maximums.as_ref().and_then(|m| m.get(idx)) {
                    if count > *max {
                        return Err(AssemblyError::Model(format!(
                            "form {} has {count} items of category {}, maximum is {max}",
                            assignment.form + 1,
                            idx + 1
                        )));
                    }
                }
            }

            for rule in &config.attribute_constraints {
                for (key, &limit) in &rule.values {
                    let parts = rule.key_parts(key);
                    let count = assignment
                        .items
                        .iter()
                        .filter(|&&item| {
                            pool.get(item).is_some_and(|entry| {
                                rule.columns
                                    .iter()
                                    .zip(&parts)
                                    .all(|(col, want)| entry.attribute(col).as_deref() == Some(*want))
                            })
                        })
                        .count();
                    if !rule.comparison.holds(count as f64, f64::from(limit), 0.0) {
                        return Err(AssemblyError::Model(format!(
                            "form {} has {count} items with {} = {key}, required {} {limit}",
                            assignment.form + 1,
                            rule.columns.join(","),
                            rule.comparison
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
