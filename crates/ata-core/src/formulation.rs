//! The assembled MILP handed to a [`SolverAdapter`](crate::traits::SolverAdapter).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{AssemblyConfig, SolverSettings};
use crate::constraints::{ConstraintBuilder, ConstraintFamily, LinearConstraint};
use crate::error::{AssemblyError, Result};
use crate::information::InformationMatrix;
use crate::model::{AbilityLevel, ItemPool};
use crate::objective::Objective;
use crate::variables::{VariableDomain, VariableSpace};

/// A complete model: columns with domains, constraints, objective and
/// solver settings. Built once per solve and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formulation {
    pub space: VariableSpace,
    /// Domain and bounds of every column, indexed by column.
    pub domains: Vec<VariableDomain>,
    /// Column names, indexed by column.
    pub names: Vec<String>,
    pub constraints: Vec<LinearConstraint>,
    pub objective: Objective,
    pub settings: SolverSettings,
}

/// Size summary of a formulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulationStats {
    pub variables: usize,
    pub binary_variables: usize,
    pub constraints: usize,
    pub per_family: BTreeMap<ConstraintFamily, usize>,
}

impl Formulation {
    /// Build the model for `pool` under `config`.
    ///
    /// `matrix` must have been computed for `levels`; both must match the
    /// pool. The configuration is validated first, so invalid input never
    /// reaches constraint construction.
    pub fn build(
        pool: &ItemPool,
        matrix: &InformationMatrix,
        levels: &[AbilityLevel],
        config: &AssemblyConfig,
    ) -> Result<Self> {
        config.validate()?;
        config.validate_content(pool.num_categories())?;

        let space = VariableSpace::new(pool.len(), config.num_forms)
            .with_deviation_bound(config.deviation_upper_bound());

        let (domains, names): (Vec<VariableDomain>, Vec<String>) = (0..space.variable_count())
            .map(|col| {
                let domain = space.domain(col);
                let name = space.column_name(col, pool);
                match (domain, name) {
                    (Some(domain), Some(name)) => Ok((domain, name)),
                    _ => Err(AssemblyError::Model(format!(
                        "column {col} has no identity in the variable space"
                    ))),
                }
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .unzip();

        let constraints = ConstraintBuilder::new(&space, pool, matrix, levels, config).build()?;
        let objective = Objective::min_deviation(&space);

        let formulation = Self {
            space,
            domains,
            names,
            constraints,
            objective,
            settings: config.solver.clone(),
        };
        let stats = formulation.stats();
        tracing::debug!(
            variables = stats.variables,
            constraints = stats.constraints,
            "formulated assembly model"
        );
        Ok(formulation)
    }

    /// Compute the information matrix for `config` and build the model.
    pub fn from_config(pool: &ItemPool, config: &AssemblyConfig) -> Result<(InformationMatrix, Self)> {
        config.validate()?;
        config.validate_content(pool.num_categories())?;

        let levels = config.ability_levels();
        let matrix = InformationMatrix::compute(pool, &levels, config.scaling_constant)?;
        let formulation = Self::build(pool, &matrix, &levels, config)?;
        Ok((matrix, formulation))
    }

    pub fn variable_count(&self) -> usize {
        self.domains.len()
    }

    pub fn stats(&self) -> FormulationStats {
        let mut per_family = BTreeMap::new();
        for constraint in &self.constraints {
            *per_family.entry(constraint.family).or_insert(0) += 1;
        }
        FormulationStats {
            variables: self.domains.len(),
            binary_variables: self.domains.iter().filter(|d| d.is_integer()).count(),
            constraints: self.constraints.len(),
            per_family,
        }
    }

    /// Constraints that `values` violates by more than `tolerance`.
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<&LinearConstraint> {
        self.constraints
            .iter()
            .filter(|c| !c.is_satisfied(values, tolerance))
            .collect()
    }
}
