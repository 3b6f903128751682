//! Item information under the three-parameter logistic (3PL) model.
//!
//! ```text
//! p(θ) = c + (1 - c) / (1 + exp(-D a (θ - b)))
//! I(θ) = D² a² ((p - c) / (1 - c))² (q / p)
//! ```
//!
//! Information is evaluated once per (item, ability level) and memoized in an
//! [`InformationMatrix`], since every form reuses the same values.

use serde::{Deserialize, Serialize};

use crate::error::{AssemblyError, Result};
use crate::model::{AbilityLevel, Item, ItemPool};

/// Probability of a correct response at `theta`.
pub fn probability(item: &Item, theta: f64, scaling: f64) -> f64 {
    let logistic = 1.0 / (1.0 + (-scaling * item.a * (theta - item.b)).exp());
    item.c + (1.0 - item.c) * logistic
}

/// Fisher information of `item` at `theta`.
///
/// Fails with a parameter error when the item parameters are invalid, when
/// `p(θ)` underflows to zero, or when the result is not a finite
/// non-negative number.
pub fn information(item: &Item, theta: f64, scaling: f64) -> Result<f64> {
    item.validate()?;
    if !theta.is_finite() {
        return Err(AssemblyError::Parameter(format!(
            "ability level must be finite, got {theta}"
        )));
    }

    let p = probability(item, theta, scaling);
    if p <= 0.0 {
        return Err(AssemblyError::Parameter(format!(
            "item {}: response probability is zero at theta {theta}",
            item.id
        )));
    }
    let q = 1.0 - p;
    let ratio = (p - item.c) / (1.0 - item.c);
    let info = scaling.powi(2) * item.a.powi(2) * ratio.powi(2) * (q / p);

    if !info.is_finite() || info < 0.0 {
        return Err(AssemblyError::Parameter(format!(
            "item {}: information at theta {theta} is not a finite non-negative value ({info})",
            item.id
        )));
    }
    Ok(info)
}

/// Information of every item at every ability level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InformationMatrix {
    values: Vec<f64>,
    num_items: usize,
    num_levels: usize,
}

impl InformationMatrix {
    pub fn compute(pool: &ItemPool, levels: &[AbilityLevel], scaling: f64) -> Result<Self> {
        let mut values = Vec::with_capacity(pool.len() * levels.len());
        for item in pool.items() {
            for level in levels {
                values.push(information(item, level.theta, scaling)?);
            }
        }
        tracing::debug!(
            items = pool.len(),
            levels = levels.len(),
            "computed information matrix"
        );
        Ok(Self {
            values,
            num_items: pool.len(),
            num_levels: levels.len(),
        })
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    pub fn num_levels(&self) -> usize {
        self.num_levels
    }

    /// Information of item `item` at ability level `level`.
    pub fn get(&self, item: usize, level: usize) -> Option<f64> {
        if item >= self.num_items || level >= self.num_levels {
            return None;
        }
        self.values.get(item * self.num_levels + level).copied()
    }

    /// All levels for one item.
    pub fn row(&self, item: usize) -> Option<&[f64]> {
        if item >= self.num_items {
            return None;
        }
        let start = item * self.num_levels;
        Some(&self.values[start..start + self.num_levels])
    }

    /// Test information of a set of items at one ability level.
    pub fn form_information(&self, items: &[usize], level: usize) -> f64 {
        items.iter().filter_map(|&i| self.get(i, level)).sum()
    }
}
