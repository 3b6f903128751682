//! Assembly configuration.
//!
//! Ability levels, information targets, the scaling constant, content tables
//! and solver tolerances all come from here. Nothing in the formulation
//! hard-codes them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constraints::Comparison;
use crate::error::{AssemblyError, Result};
use crate::model::{AbilityLevel, ItemPool};

/// Conventional logistic scaling constant that approximates the normal ogive.
pub const DEFAULT_SCALING_CONSTANT: f64 = 1.702;

/// Default configuration file name searched in the current directory.
pub const CONFIG_FILE_NAME: &str = "ata.toml";

/// Separates the per-column values in the key of a combined attribute.
pub const ATTRIBUTE_KEY_SEPARATOR: char = ',';

/// Everything the formulation needs besides the item pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Number of forms to assemble.
    #[serde(default = "default_num_forms")]
    pub num_forms: usize,
    /// Exact number of items in every form.
    #[serde(default = "default_items_per_form")]
    pub items_per_form: usize,
    /// Scaling constant `D` of the logistic response function.
    #[serde(default = "default_scaling_constant")]
    pub scaling_constant: f64,
    /// Ability levels at which information is evaluated.
    #[serde(default = "default_thetas")]
    pub thetas: Vec<f64>,
    /// Information targets, paired with `thetas` by position.
    #[serde(default = "default_targets")]
    pub targets: Vec<f64>,
    /// Minimum item count per category, indexed by `label - 1`.
    #[serde(default)]
    pub content_minimums: Vec<u32>,
    /// Optional maximum item count per category, indexed by `label - 1`.
    #[serde(default)]
    pub content_maximums: Option<Vec<u32>>,
    /// Upper bound of the deviation variable.
    #[serde(default = "default_deviation_bound")]
    pub deviation_bound: f64,
    /// Drop the upper bound of the deviation variable entirely.
    #[serde(default)]
    pub unbounded_deviation: bool,
    /// Count limits on further classification columns, applied per form.
    #[serde(default)]
    pub attribute_constraints: Vec<AttributeConstraint>,
    /// Solver tolerances and pass-through limits.
    #[serde(default)]
    pub solver: SolverSettings,
}

/// Limits the number of items per form whose classification columns take
/// given values.
///
/// ```toml
/// [[attribute_constraints]]
/// columns = ["band", "gender"]
/// comparison = "<="
/// values = { "hard,female" = 2, "hard,male" = 2 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeConstraint {
    /// One column, or several selecting on their combination.
    pub columns: Vec<String>,
    pub comparison: Comparison,
    /// Limit per value key. Keys of combined columns list one value per
    /// column, joined by [`ATTRIBUTE_KEY_SEPARATOR`].
    pub values: BTreeMap<String, u32>,
}

impl AttributeConstraint {
    /// Split a value key into one value per column.
    pub fn key_parts<'a>(&self, key: &'a str) -> Vec<&'a str> {
        key.split(ATTRIBUTE_KEY_SEPARATOR).map(str::trim).collect()
    }

    fn validate(&self, rule: usize) -> Result<()> {
        if self.columns.is_empty() || self.columns.iter().any(|c| c.trim().is_empty()) {
            return Err(AssemblyError::Parameter(format!(
                "attribute constraint {rule}: columns must be non-empty names"
            )));
        }
        if self.values.is_empty() {
            return Err(AssemblyError::Parameter(format!(
                "attribute constraint {rule}: no values to constrain"
            )));
        }
        if let Some(key) = self
            .values
            .keys()
            .find(|key| self.key_parts(key).len() != self.columns.len())
        {
            return Err(AssemblyError::Parameter(format!(
                "attribute constraint {rule}: key '{key}' needs {} value(s) for columns [{}]",
                self.columns.len(),
                self.columns.join(", ")
            )));
        }
        Ok(())
    }
}

/// Numeric tolerances handed to the solver and used during extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Distance from 0 or 1 within which an indicator counts as integral.
    #[serde(default = "default_integrality_tolerance")]
    pub integrality_tolerance: f64,
    /// Relative optimality gap at which the solver may stop.
    #[serde(default)]
    pub mip_gap: f64,
    /// Wall-clock limit, passed through to solvers that support one.
    #[serde(default)]
    pub time_limit_secs: Option<u64>,
}

fn default_num_forms() -> usize {
    2
}
fn default_items_per_form() -> usize {
    18
}
fn default_scaling_constant() -> f64 {
    DEFAULT_SCALING_CONSTANT
}
fn default_thetas() -> Vec<f64> {
    vec![-1.0, 0.0, 1.0]
}
fn default_targets() -> Vec<f64> {
    vec![3.0, 4.0, 3.0]
}
fn default_deviation_bound() -> f64 {
    1.0
}
fn default_integrality_tolerance() -> f64 {
    1e-6
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            integrality_tolerance: default_integrality_tolerance(),
            mip_gap: 0.0,
            time_limit_secs: None,
        }
    }
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            num_forms: default_num_forms(),
            items_per_form: default_items_per_form(),
            scaling_constant: default_scaling_constant(),
            thetas: default_thetas(),
            targets: default_targets(),
            content_minimums: Vec::new(),
            content_maximums: None,
            deviation_bound: default_deviation_bound(),
            unbounded_deviation: false,
            attribute_constraints: Vec::new(),
            solver: SolverSettings::default(),
        }
    }
}

impl AssemblyConfig {
    /// Check everything that can be checked without the item pool.
    pub fn validate(&self) -> Result<()> {
        if self.num_forms == 0 {
            return Err(AssemblyError::Parameter("num_forms must be at least 1".into()));
        }
        if self.items_per_form == 0 {
            return Err(AssemblyError::Parameter(
                "items_per_form must be at least 1".into(),
            ));
        }
        if !self.scaling_constant.is_finite() || self.scaling_constant <= 0.0 {
            return Err(AssemblyError::Parameter(format!(
                "scaling_constant must be positive, got {}",
                self.scaling_constant
            )));
        }
        if self.thetas.is_empty() {
            return Err(AssemblyError::Parameter(
                "at least one ability level is required".into(),
            ));
        }
        if self.thetas.len() != self.targets.len() {
            return Err(AssemblyError::Parameter(format!(
                "{} ability levels but {} information targets",
                self.thetas.len(),
                self.targets.len()
            )));
        }
        if let Some(bad) = self.thetas.iter().chain(&self.targets).find(|v| !v.is_finite()) {
            return Err(AssemblyError::Parameter(format!(
                "ability levels and targets must be finite, got {bad}"
            )));
        }
        if !self.unbounded_deviation
            && (!self.deviation_bound.is_finite() || self.deviation_bound < 0.0)
        {
            return Err(AssemblyError::Parameter(format!(
                "deviation_bound must be a non-negative number, got {}",
                self.deviation_bound
            )));
        }
        let tol = self.solver.integrality_tolerance;
        if !(tol > 0.0 && tol < 0.5) {
            return Err(AssemblyError::Parameter(format!(
                "integrality_tolerance must be in (0, 0.5), got {tol}"
            )));
        }
        if !self.solver.mip_gap.is_finite() || self.solver.mip_gap < 0.0 {
            return Err(AssemblyError::Parameter(format!(
                "mip_gap must be non-negative, got {}",
                self.solver.mip_gap
            )));
        }
        if let Some(maximums) = &self.content_maximums {
            if maximums.len() == self.content_minimums.len() {
                for (idx, (min, max)) in self.content_minimums.iter().zip(maximums).enumerate() {
                    if min > max {
                        return Err(AssemblyError::Parameter(format!(
                            "category {}: minimum {min} exceeds maximum {max}",
                            idx + 1
                        )));
                    }
                }
            }
        }
        for (idx, rule) in self.attribute_constraints.iter().enumerate() {
            rule.validate(idx + 1)?;
        }
        Ok(())
    }

    /// Check that every constrained attribute column exists in the pool.
    pub fn validate_attributes(&self, pool: &ItemPool) -> Result<()> {
        for (idx, rule) in self.attribute_constraints.iter().enumerate() {
            if let Some(column) = rule.columns.iter().find(|c| !pool.has_attribute(c)) {
                return Err(AssemblyError::Data(format!(
                    "attribute constraint {}: no item has a '{column}' column",
                    idx + 1
                )));
            }
        }
        Ok(())
    }

    /// Check the content tables against the number of categories in the pool.
    pub fn validate_content(&self, num_categories: usize) -> Result<()> {
        if self.content_minimums.len() != num_categories {
            return Err(AssemblyError::Data(format!(
                "content_minimums has {} entries but the pool has {} categories",
                self.content_minimums.len(),
                num_categories
            )));
        }
        if let Some(maximums) = &self.content_maximums {
            if maximums.len() != num_categories {
                return Err(AssemblyError::Data(format!(
                    "content_maximums has {} entries but the pool has {} categories",
                    maximums.len(),
                    num_categories
                )));
            }
        }
        Ok(())
    }

    /// Ability levels paired with their targets.
    pub fn ability_levels(&self) -> Vec<AbilityLevel> {
        self.thetas
            .iter()
            .zip(&self.targets)
            .map(|(&theta, &target)| AbilityLevel { theta, target })
            .collect()
    }

    /// Upper bound of the deviation variable, `None` when unbounded.
    pub fn deviation_upper_bound(&self) -> Option<f64> {
        (!self.unbounded_deviation).then_some(self.deviation_bound)
    }
}

/// Parse a configuration from a TOML string.
pub fn parse_config_str(content: &str) -> anyhow::Result<AssemblyConfig> {
    let config: AssemblyConfig = toml::from_str(content)?;
    Ok(config)
}

/// Load configuration from `ata.toml` in the current directory, or defaults.
pub fn load_config() -> anyhow::Result<AssemblyConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default location.
///
/// An explicit path that does not exist is an error. Without one,
/// `ata.toml` in the current directory is used when present; otherwise the
/// defaults apply.
pub fn load_config_from(path: Option<&Path>) -> anyhow::Result<AssemblyConfig> {
    use anyhow::Context;

    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            local.exists().then_some(local)
        }
    };

    let Some(config_path) = config_path else {
        tracing::debug!("no {CONFIG_FILE_NAME} found, using defaults");
        return Ok(AssemblyConfig::default());
    };

    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read config: {}", config_path.display()))?;
    parse_config_str(&content)
        .with_context(|| format!("failed to parse config: {}", config_path.display()))
}
