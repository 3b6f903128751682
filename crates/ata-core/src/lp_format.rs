//! lp_solve LP text export.
//!
//! Writes a [`Formulation`] in the LP format understood by `lp_solve`, so the
//! model can be solved or inspected outside this workspace.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;

use crate::constraints::LinearConstraint;
use crate::error::{AssemblyError, Result};
use crate::formulation::Formulation;
use crate::variables::VariableDomain;

/// Render the formulation as LP text.
///
/// Fails with a data error when two columns end up with the same name
/// (item ids that only differ in characters LP identifiers cannot hold).
pub fn to_lp_string(formulation: &Formulation) -> Result<String> {
    let mut seen = HashSet::new();
    if let Some(dup) = formulation.names.iter().find(|n| !seen.insert(n.as_str())) {
        return Err(AssemblyError::Data(format!(
            "column name {dup} is not unique after sanitizing item ids"
        )));
    }

    let mut out = String::new();
    // `write!` into a String cannot fail.
    let _ = writeln!(out, "/* Objective function */");
    let _ = writeln!(
        out,
        "min: {};",
        render_terms(&formulation.objective.terms, &formulation.names)
    );

    let _ = writeln!(out, "\n/* Constraints */");
    for constraint in &formulation.constraints {
        let _ = writeln!(out, "{}", render_constraint(constraint, &formulation.names));
    }

    let _ = writeln!(out, "\n/* Bounds */");
    for (name, domain) in formulation.names.iter().zip(&formulation.domains) {
        if let VariableDomain::Continuous { lower, upper } = domain {
            if *lower != 0.0 {
                let _ = writeln!(out, "{name} >= {};", number(*lower));
            }
            if let Some(upper) = upper {
                let _ = writeln!(out, "{name} <= {};", number(*upper));
            }
        }
    }

    let binaries: Vec<&str> = formulation
        .names
        .iter()
        .zip(&formulation.domains)
        .filter(|(_, d)| d.is_integer())
        .map(|(n, _)| n.as_str())
        .collect();
    if !binaries.is_empty() {
        let _ = writeln!(out, "\nbin {};", binaries.join(", "));
    }

    Ok(out)
}

/// Write the LP text to `path`, creating parent directories.
pub fn write_lp_file(formulation: &Formulation, path: &Path) -> anyhow::Result<()> {
    let text = to_lp_string(formulation)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)
        .with_context(|| format!("failed to write LP model to {}", path.display()))?;
    Ok(())
}

fn render_constraint(constraint: &LinearConstraint, names: &[String]) -> String {
    format!(
        "{}: {} {} {};",
        constraint.name,
        render_terms(&constraint.terms, names),
        constraint.comparison,
        number(constraint.rhs)
    )
}

fn render_terms(terms: &[(usize, f64)], names: &[String]) -> String {
    if terms.is_empty() {
        return "0".to_string();
    }
    terms
        .iter()
        .filter_map(|&(col, coef)| {
            let name = names.get(col)?;
            Some(if coef == 1.0 {
                format!("+{name}")
            } else if coef == -1.0 {
                format!("-{name}")
            } else if coef < 0.0 {
                format!("-{} {name}", number(-coef))
            } else {
                format!("+{} {name}", number(coef))
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Shortest decimal text that parses back to the same `f64`; integral
/// values print without a fraction.
fn number(value: f64) -> String {
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssemblyConfig;
    use crate::information::InformationMatrix;
    use crate::model::{Item, ItemPool};

    fn formulation(pool: &ItemPool) -> Formulation {
        let config = AssemblyConfig {
            num_forms: 2,
            items_per_form: 1,
            thetas: vec![0.0],
            targets: vec![0.5],
            content_minimums: vec![0],
            ..AssemblyConfig::default()
        };
        let levels = config.ability_levels();
        let matrix = InformationMatrix::compute(pool, &levels, 1.0).unwrap();
        Formulation::build(pool, &matrix, &levels, &config).unwrap()
    }

    #[test]
    fn renders_all_sections() {
        let pool = ItemPool::new(vec![
            Item::new("A1", 1.0, 0.0, 0.0, 1),
            Item::new("A2", 1.0, 0.0, 0.0, 1),
        ])
        .unwrap();
        let f = formulation(&pool);
        let lp = to_lp_string(&f).unwrap();

        assert!(lp.contains("min: +delta;"));
        assert!(lp.contains("exclusivity_i1: +A1_1 +A1_2 <= 1;"));
        assert!(lp.contains("form_size_f2: +A1_2 +A2_2 = 1;"));
        assert!(lp.contains("info_upper_f1_t1: +0.25 A1_1 +0.25 A2_1 -delta <= 0.5;"));
        assert!(lp.contains("delta <= 1;"));
        assert!(lp.contains("bin A1_1, A2_1, A1_2, A2_2;"));
        for c in &f.constraints {
            assert!(lp.contains(&format!("{}:", c.name)), "missing {}", c.name);
        }
    }

    #[test]
    fn coefficients_parse_back_exactly() {
        let pool = ItemPool::new(vec![Item::new("R1", 0.3, 4.0, 0.3, 1)]).unwrap();
        let config = AssemblyConfig {
            num_forms: 1,
            items_per_form: 1,
            thetas: vec![-3.0],
            targets: vec![0.123456789],
            content_minimums: vec![0],
            ..AssemblyConfig::default()
        };
        let levels = config.ability_levels();
        let matrix = InformationMatrix::compute(&pool, &levels, config.scaling_constant).unwrap();
        let f = Formulation::build(&pool, &matrix, &levels, &config).unwrap();
        let lp = to_lp_string(&f).unwrap();

        let line = lp
            .lines()
            .find(|l| l.starts_with("info_upper_f1_t1:"))
            .unwrap();
        let fields: Vec<&str> = line.trim_end_matches(';').split_whitespace().collect();
        assert_eq!(fields[2], "R1_1");
        assert_eq!(fields[3], "-delta");

        // An item far above the ability level carries very little information.
        let coef: f64 = fields[1].trim_start_matches('+').parse().unwrap();
        let info = matrix.get(0, 0).unwrap();
        assert!(info < 1e-3);
        assert_eq!(coef, info);

        let rhs: f64 = fields[5].parse().unwrap();
        assert_eq!(rhs, 0.123456789);
    }

    #[test]
    fn colliding_names_are_rejected() {
        let pool = ItemPool::new(vec![
            Item::new("Q-1", 1.0, 0.0, 0.0, 1),
            Item::new("Q_1", 1.0, 0.0, 0.0, 1),
        ])
        .unwrap();
        let f = formulation(&pool);
        assert!(matches!(
            to_lp_string(&f).unwrap_err(),
            AssemblyError::Data(_)
        ));
    }

    #[test]
    fn writes_file() {
        let pool = ItemPool::new(vec![
            Item::new("A1", 1.0, 0.0, 0.0, 1),
            Item::new("A2", 1.0, 0.0, 0.0, 1),
        ])
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models/run.lp");
        write_lp_file(&formulation(&pool), &path).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with("/* Objective function */"));
    }
}
