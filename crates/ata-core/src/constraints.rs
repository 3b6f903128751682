//! Linear constraint generation.
//!
//! Every constraint is expressed over [`VariableSpace`] columns. Families are
//! emitted in a fixed order (exclusivity, content minimum, content maximum,
//! attribute limits, form size, information bounds) and terms are sorted by
//! column, so the same inputs always produce the same constraint list.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AssemblyConfig;
use crate::error::{AssemblyError, Result};
use crate::information::InformationMatrix;
use crate::model::{AbilityLevel, ItemPool};
use crate::variables::VariableSpace;

/// Comparison operator of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = "<=")]
    LessEq,
    #[serde(rename = ">=")]
    GreaterEq,
    #[serde(rename = "=")]
    Equal,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::LessEq => write!(f, "<="),
            Comparison::GreaterEq => write!(f, ">="),
            Comparison::Equal => write!(f, "="),
        }
    }
}

impl Comparison {
    /// `lhs <op> rhs` within `tolerance`.
    pub fn holds(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            Comparison::LessEq => lhs <= rhs + tolerance,
            Comparison::GreaterEq => lhs >= rhs - tolerance,
            Comparison::Equal => (lhs - rhs).abs() <= tolerance,
        }
    }
}

/// Which requirement a constraint encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintFamily {
    Exclusivity,
    ContentMinimum,
    ContentMaximum,
    Attribute,
    FormSize,
    InformationUpper,
    InformationLower,
}

impl fmt::Display for ConstraintFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintFamily::Exclusivity => "exclusivity",
            ConstraintFamily::ContentMinimum => "content_min",
            ConstraintFamily::ContentMaximum => "content_max",
            ConstraintFamily::Attribute => "attr",
            ConstraintFamily::FormSize => "form_size",
            ConstraintFamily::InformationUpper => "info_upper",
            ConstraintFamily::InformationLower => "info_lower",
        };
        write!(f, "{name}")
    }
}

/// `Σ coefficient * column  <op>  rhs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearConstraint {
    /// Unique row name, e.g. `content_min_f2_c3`.
    pub name: String,
    pub family: ConstraintFamily,
    /// Sparse `(column, coefficient)` terms, sorted by column.
    pub terms: Vec<(usize, f64)>,
    pub comparison: Comparison,
    pub rhs: f64,
}

impl LinearConstraint {
    fn new(
        name: String,
        family: ConstraintFamily,
        mut terms: Vec<(usize, f64)>,
        comparison: Comparison,
        rhs: f64,
    ) -> Self {
        terms.sort_by_key(|&(col, _)| col);
        Self {
            name,
            family,
            terms,
            comparison,
            rhs,
        }
    }

    /// Left-hand side evaluated at `values`.
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(col, coef)| coef * values.get(col).copied().unwrap_or(0.0))
            .sum()
    }

    /// Whether `values` satisfies this constraint within `tolerance`.
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        self.comparison.holds(self.lhs(values), self.rhs, tolerance)
    }
}

/// Builds all constraint families for one assembly problem.
pub struct ConstraintBuilder<'a> {
    space: &'a VariableSpace,
    pool: &'a ItemPool,
    matrix: &'a InformationMatrix,
    levels: &'a [AbilityLevel],
    config: &'a AssemblyConfig,
}

impl<'a> ConstraintBuilder<'a> {
    pub fn new(
        space: &'a VariableSpace,
        pool: &'a ItemPool,
        matrix: &'a InformationMatrix,
        levels: &'a [AbilityLevel],
        config: &'a AssemblyConfig,
    ) -> Self {
        Self {
            space,
            pool,
            matrix,
            levels,
            config,
        }
    }

    /// Generate every family, in order.
    pub fn build(&self) -> Result<Vec<LinearConstraint>> {
        self.check_dimensions()?;

        let mut constraints = self.exclusivity()?;
        constraints.extend(self.content_minimums()?);
        constraints.extend(self.content_maximums()?);
        constraints.extend(self.attributes()?);
        constraints.extend(self.form_size()?);
        constraints.extend(self.information_bounds()?);

        tracing::debug!(constraints = constraints.len(), "built constraint set");
        Ok(constraints)
    }

    fn check_dimensions(&self) -> Result<()> {
        self.config.validate_content(self.pool.num_categories())?;
        self.config.validate_attributes(self.pool)?;
        if self.space.num_items() != self.pool.len()
            || self.matrix.num_items() != self.pool.len()
        {
            return Err(AssemblyError::Model(format!(
                "variable space has {} items, information matrix {}, pool {}",
                self.space.num_items(),
                self.matrix.num_items(),
                self.pool.len()
            )));
        }
        if self.matrix.num_levels() != self.levels.len() {
            return Err(AssemblyError::Model(format!(
                "information matrix has {} levels but {} ability levels are configured",
                self.matrix.num_levels(),
                self.levels.len()
            )));
        }
        Ok(())
    }

    /// Each item appears in at most one form.
    pub fn exclusivity(&self) -> Result<Vec<LinearConstraint>> {
        (0..self.pool.len())
            .map(|item| {
                let terms = self
                    .space
                    .item_columns(item)?
                    .into_iter()
                    .map(|col| (col, 1.0))
                    .collect();
                Ok(LinearConstraint::new(
                    format!("{}_i{}", ConstraintFamily::Exclusivity, item + 1),
                    ConstraintFamily::Exclusivity,
                    terms,
                    Comparison::LessEq,
                    1.0,
                ))
            })
            .collect()
    }

    /// Each form carries at least the configured count of every category.
    pub fn content_minimums(&self) -> Result<Vec<LinearConstraint>> {
        self.content_family(
            ConstraintFamily::ContentMinimum,
            Comparison::GreaterEq,
            &self.config.content_minimums,
        )
    }

    /// Each form carries at most the configured count of every category.
    /// Empty when no maximums are configured.
    pub fn content_maximums(&self) -> Result<Vec<LinearConstraint>> {
        match &self.config.content_maximums {
            Some(maximums) => {
                self.content_family(ConstraintFamily::ContentMaximum, Comparison::LessEq, maximums)
            }
            None => Ok(Vec::new()),
        }
    }

    fn content_family(
        &self,
        family: ConstraintFamily,
        comparison: Comparison,
        limits: &[u32],
    ) -> Result<Vec<LinearConstraint>> {
        if limits.len() != self.pool.num_categories() {
            return Err(AssemblyError::Data(format!(
                "{family} table has {} entries but the pool has {} categories",
                limits.len(),
                self.pool.num_categories()
            )));
        }

        let members: Vec<Vec<usize>> = (1..=self.pool.num_categories() as u32)
            .map(|label| self.pool.category_members(label))
            .collect();

        let mut constraints = Vec::with_capacity(self.space.num_forms() * limits.len());
        for form in 0..self.space.num_forms() {
            for (cat_idx, &limit) in limits.iter().enumerate() {
                let terms = members[cat_idx]
                    .iter()
                    .map(|&item| Ok((self.space.item_form_index(item, form)?, 1.0)))
                    .collect::<Result<Vec<_>>>()?;
                constraints.push(LinearConstraint::new(
                    format!("{family}_f{}_c{}", form + 1, cat_idx + 1),
                    family,
                    terms,
                    comparison,
                    f64::from(limit),
                ));
            }
        }
        Ok(constraints)
    }

    /// One row per form and constrained value of every
    /// `[[attribute_constraints]]` entry, named `attr{rule}_f{form}_v{value}`
    /// with values numbered in key order.
    pub fn attributes(&self) -> Result<Vec<LinearConstraint>> {
        let family = ConstraintFamily::Attribute;
        let mut constraints = Vec::new();
        for (rule_idx, rule) in self.config.attribute_constraints.iter().enumerate() {
            let members: Vec<(usize, Vec<usize>, u32)> = rule
                .values
                .iter()
                .enumerate()
                .map(|(value_idx, (key, &limit))| {
                    let items = self
                        .pool
                        .attribute_members(&rule.columns, &rule.key_parts(key));
                    if items.is_empty() {
                        tracing::debug!(rule = rule_idx + 1, key = %key, "no item matches attribute value");
                    }
                    (value_idx, items, limit)
                })
                .collect();

            for form in 0..self.space.num_forms() {
                for (value_idx, items, limit) in &members {
                    let terms = items
                        .iter()
                        .map(|&item| Ok((self.space.item_form_index(item, form)?, 1.0)))
                        .collect::<Result<Vec<_>>>()?;
                    constraints.push(LinearConstraint::new(
                        format!("{family}{}_f{}_v{}", rule_idx + 1, form + 1, value_idx + 1),
                        family,
                        terms,
                        rule.comparison,
                        f64::from(*limit),
                    ));
                }
            }
        }
        Ok(constraints)
    }

    /// Each form holds exactly `items_per_form` items.
    pub fn form_size(&self) -> Result<Vec<LinearConstraint>> {
        (0..self.space.num_forms())
            .map(|form| {
                let terms = self
                    .space
                    .form_columns(form)?
                    .into_iter()
                    .map(|col| (col, 1.0))
                    .collect();
                Ok(LinearConstraint::new(
                    format!("{}_f{}", ConstraintFamily::FormSize, form + 1),
                    ConstraintFamily::FormSize,
                    terms,
                    Comparison::Equal,
                    self.config.items_per_form as f64,
                ))
            })
            .collect()
    }

    /// `I_f(θ_k) - δ <= target_k` and `I_f(θ_k) + δ >= target_k` for every
    /// form and ability level, all sharing the single deviation column.
    pub fn information_bounds(&self) -> Result<Vec<LinearConstraint>> {
        let deviation = self.space.deviation_index();
        let mut constraints =
            Vec::with_capacity(2 * self.space.num_forms() * self.levels.len());

        for form in 0..self.space.num_forms() {
            for (level_idx, level) in self.levels.iter().enumerate() {
                let mut info_terms = Vec::with_capacity(self.pool.len() + 1);
                for item in 0..self.pool.len() {
                    let info = self.matrix.get(item, level_idx).ok_or_else(|| {
                        AssemblyError::Model(format!(
                            "no information for item {item} at level {level_idx}"
                        ))
                    })?;
                    info_terms.push((self.space.item_form_index(item, form)?, info));
                }

                let mut upper = info_terms.clone();
                upper.push((deviation, -1.0));
                constraints.push(LinearConstraint::new(
                    format!(
                        "{}_f{}_t{}",
                        ConstraintFamily::InformationUpper,
                        form + 1,
                        level_idx + 1
                    ),
                    ConstraintFamily::InformationUpper,
                    upper,
                    Comparison::LessEq,
                    level.target,
                ));

                let mut lower = info_terms;
                lower.push((deviation, 1.0));
                constraints.push(LinearConstraint::new(
                    format!(
                        "{}_f{}_t{}",
                        ConstraintFamily::InformationLower,
                        form + 1,
                        level_idx + 1
                    ),
                    ConstraintFamily::InformationLower,
                    lower,
                    Comparison::GreaterEq,
                    level.target,
                ));
            }
        }
        Ok(constraints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Item;

    struct Fixture {
        pool: ItemPool,
        config: AssemblyConfig,
        levels: Vec<AbilityLevel>,
        matrix: InformationMatrix,
        space: VariableSpace,
    }

    fn fixture(content_maximums: Option<Vec<u32>>) -> Fixture {
        let pool = ItemPool::new(vec![
            Item::new("i1", 1.0, -1.0, 0.0, 1),
            Item::new("i2", 1.2, 0.0, 0.1, 1),
            Item::new("i3", 0.8, 1.0, 0.2, 1),
            Item::new("i4", 1.1, -0.5, 0.0, 2),
            Item::new("i5", 0.9, 0.5, 0.15, 2),
            Item::new("i6", 1.4, 0.2, 0.05, 2),
        ])
        .unwrap();
        let config = AssemblyConfig {
            num_forms: 2,
            items_per_form: 3,
            thetas: vec![-1.0, 0.0, 1.0],
            targets: vec![1.5, 2.0, 1.5],
            content_minimums: vec![1, 1],
            content_maximums,
            ..AssemblyConfig::default()
        };
        let levels = config.ability_levels();
        let matrix = InformationMatrix::compute(&pool, &levels, config.scaling_constant).unwrap();
        let space = VariableSpace::new(pool.len(), config.num_forms);
        Fixture {
            pool,
            config,
            levels,
            matrix,
            space,
        }
    }

    fn build(f: &Fixture) -> Vec<LinearConstraint> {
        ConstraintBuilder::new(&f.space, &f.pool, &f.matrix, &f.levels, &f.config)
            .build()
            .unwrap()
    }

    fn count(constraints: &[LinearConstraint], family: ConstraintFamily) -> usize {
        constraints.iter().filter(|c| c.family == family).count()
    }

    #[test]
    fn family_counts_for_six_item_scenario() {
        let f = fixture(None);
        let constraints = build(&f);
        assert_eq!(count(&constraints, ConstraintFamily::Exclusivity), 6);
        assert_eq!(count(&constraints, ConstraintFamily::FormSize), 2);
        assert_eq!(count(&constraints, ConstraintFamily::ContentMinimum), 4);
        assert_eq!(count(&constraints, ConstraintFamily::ContentMaximum), 0);
        assert_eq!(count(&constraints, ConstraintFamily::InformationUpper), 6);
        assert_eq!(count(&constraints, ConstraintFamily::InformationLower), 6);
        assert_eq!(constraints.len(), 6 + 4 + 2 + 12);
    }

    #[test]
    fn exclusivity_spans_all_forms() {
        let f = fixture(None);
        let constraints = build(&f);
        let excl = &constraints[2];
        assert_eq!(excl.name, "exclusivity_i3");
        assert_eq!(excl.terms, vec![(2, 1.0), (8, 1.0)]);
        assert_eq!(excl.comparison, Comparison::LessEq);
        assert_eq!(excl.rhs, 1.0);
    }

    #[test]
    fn content_minimum_selects_category_members() {
        let f = fixture(None);
        let constraints = build(&f);
        let c = constraints
            .iter()
            .find(|c| c.name == "content_min_f2_c2")
            .unwrap();
        // Items 4..6 in form 2 are columns 9, 10, 11.
        assert_eq!(c.terms, vec![(9, 1.0), (10, 1.0), (11, 1.0)]);
        assert_eq!(c.comparison, Comparison::GreaterEq);
        assert_eq!(c.rhs, 1.0);
    }

    #[test]
    fn content_maximums_are_optional() {
        let f = fixture(Some(vec![2, 2]));
        let constraints = build(&f);
        assert_eq!(count(&constraints, ConstraintFamily::ContentMaximum), 4);
        let c = constraints
            .iter()
            .find(|c| c.name == "content_max_f1_c1")
            .unwrap();
        assert_eq!(c.comparison, Comparison::LessEq);
        assert_eq!(c.rhs, 2.0);
    }

    #[test]
    fn form_size_is_equality() {
        let f = fixture(None);
        let constraints = build(&f);
        let size = constraints
            .iter()
            .find(|c| c.name == "form_size_f2")
            .unwrap();
        assert_eq!(size.comparison, Comparison::Equal);
        assert_eq!(size.rhs, 3.0);
        assert_eq!(size.terms.len(), 6);
        assert_eq!(size.terms[0].0, 6);
    }

    #[test]
    fn information_bounds_share_deviation_column() {
        let f = fixture(None);
        let constraints = build(&f);
        let deviation = f.space.deviation_index();

        let upper = constraints
            .iter()
            .find(|c| c.name == "info_upper_f1_t2")
            .unwrap();
        let lower = constraints
            .iter()
            .find(|c| c.name == "info_lower_f1_t2")
            .unwrap();

        assert_eq!(upper.comparison, Comparison::LessEq);
        assert_eq!(lower.comparison, Comparison::GreaterEq);
        assert_eq!(upper.rhs, 2.0);
        assert_eq!(upper.terms.last(), Some(&(deviation, -1.0)));
        assert_eq!(lower.terms.last(), Some(&(deviation, 1.0)));
        assert_eq!(upper.terms[3], (3, f.matrix.get(3, 1).unwrap()));
    }

    #[test]
    fn content_mismatch_fails_fast() {
        let mut f = fixture(None);
        f.config.content_minimums = vec![1, 1, 1];
        let err = ConstraintBuilder::new(&f.space, &f.pool, &f.matrix, &f.levels, &f.config)
            .build()
            .unwrap_err();
        assert!(matches!(err, AssemblyError::Data(_)));
    }

    #[test]
    fn space_mismatch_is_model_error() {
        let f = fixture(None);
        let wrong = VariableSpace::new(5, 2);
        let err = ConstraintBuilder::new(&wrong, &f.pool, &f.matrix, &f.levels, &f.config)
            .build()
            .unwrap_err();
        assert!(matches!(err, AssemblyError::Model(_)));
    }

    #[test]
    fn satisfaction_check() {
        let c = LinearConstraint::new(
            "t".into(),
            ConstraintFamily::FormSize,
            vec![(1, 1.0), (0, 1.0)],
            Comparison::Equal,
            2.0,
        );
        assert_eq!(c.terms[0].0, 0);
        assert!(c.is_satisfied(&[1.0, 1.0], 1e-9));
        assert!(!c.is_satisfied(&[1.0, 0.0], 1e-9));
    }

    fn banded(f: &mut Fixture) {
        let bands = ["easy", "medium", "hard", "easy", "medium", "hard"];
        let formats = ["mc", "mc", "cr", "cr", "mc", "mc"];
        let items = f
            .pool
            .items()
            .iter()
            .zip(bands.iter().zip(formats))
            .map(|(item, (band, format))| {
                item.clone()
                    .with_attribute("band", *band)
                    .with_attribute("format", format)
            })
            .collect();
        f.pool = ItemPool::new(items).unwrap();
    }

    #[test]
    fn attribute_rows_per_form_and_value() {
        use crate::config::AttributeConstraint;
        use std::collections::BTreeMap;

        let mut f = fixture(None);
        banded(&mut f);
        f.config.attribute_constraints = vec![
            AttributeConstraint {
                columns: vec!["band".into()],
                comparison: Comparison::Equal,
                values: BTreeMap::from([("easy".to_string(), 1), ("hard".to_string(), 1)]),
            },
            AttributeConstraint {
                columns: vec!["band".into(), "format".into()],
                comparison: Comparison::LessEq,
                values: BTreeMap::from([("hard,mc".to_string(), 0)]),
            },
        ];
        let constraints = build(&f);
        assert_eq!(count(&constraints, ConstraintFamily::Attribute), 2 * 2 + 2);

        // Attribute rows sit between content and form size rows.
        let first = constraints
            .iter()
            .position(|c| c.family == ConstraintFamily::Attribute)
            .unwrap();
        assert_eq!(constraints[first - 1].family, ConstraintFamily::ContentMinimum);
        assert_eq!(constraints[first].name, "attr1_f1_v1");

        // "hard" is the second key; i3 and i6 in form 2 are columns 8 and 11.
        let hard = constraints.iter().find(|c| c.name == "attr1_f2_v2").unwrap();
        assert_eq!(hard.terms, vec![(8, 1.0), (11, 1.0)]);
        assert_eq!(hard.comparison, Comparison::Equal);

        let combined = constraints.iter().find(|c| c.name == "attr2_f1_v1").unwrap();
        assert_eq!(combined.terms, vec![(5, 1.0)]);
        assert_eq!(combined.comparison, Comparison::LessEq);
        assert_eq!(combined.rhs, 0.0);
    }

    #[test]
    fn attribute_on_missing_column_fails_fast() {
        use crate::config::AttributeConstraint;
        use std::collections::BTreeMap;

        let mut f = fixture(None);
        f.config.attribute_constraints = vec![AttributeConstraint {
            columns: vec!["band".into()],
            comparison: Comparison::GreaterEq,
            values: BTreeMap::from([("easy".to_string(), 1)]),
        }];
        let err = ConstraintBuilder::new(&f.space, &f.pool, &f.matrix, &f.levels, &f.config)
            .build()
            .unwrap_err();
        assert!(matches!(err, AssemblyError::Data(_)));
    }

    #[test]
    fn comparison_holds_within_tolerance() {
        assert!(Comparison::LessEq.holds(2.0 + 1e-9, 2.0, 1e-6));
        assert!(!Comparison::GreaterEq.holds(0.5, 1.0, 1e-6));
        assert!(Comparison::Equal.holds(1.0, 1.0, 0.0));
    }

    #[test]
    fn rebuild_is_identical() {
        let f = fixture(Some(vec![3, 3]));
        assert_eq!(build(&f), build(&f));
    }
}
