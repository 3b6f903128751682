//! Item bank loading.
//!
//! Loads item pools from CSV (`item_id,a,b,c,category`, further columns kept
//! as item attributes) or TOML (`[[items]]` tables), and reports non-fatal
//! issues with a pool under a given configuration.

use std::path::Path;

use serde::Deserialize;

use crate::config::AssemblyConfig;
use crate::constraints::Comparison;
use crate::error::{AssemblyError, Result};
use crate::model::{Item, ItemPool};

/// Guessing parameters above this are flagged by [`validate_pool`].
const HIGH_GUESSING: f64 = 0.35;

/// Discrimination below this is flagged by [`validate_pool`].
const LOW_DISCRIMINATION: f64 = 0.2;

/// Difficulties further than this from the nearest ability level are flagged.
const DIFFICULTY_MARGIN: f64 = 3.0;

/// Header names read into [`CsvItem`]; every other column is an attribute.
const ITEM_COLUMNS: [&str; 6] = ["item_id", "id", "a", "b", "c", "category"];

/// The parameter columns of one CSV row, in any order.
#[derive(Debug, Deserialize)]
struct CsvItem {
    #[serde(alias = "id")]
    item_id: String,
    a: f64,
    b: f64,
    c: f64,
    category: u32,
}

/// Load an item pool, picking the format from the file extension.
pub fn load_item_pool(path: &Path) -> Result<ItemPool> {
    let content = std::fs::read_to_string(path).map_err(|source| AssemblyError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => parse_items_csv(&content),
        Some("toml") => parse_items_toml(&content),
        _ => Err(AssemblyError::Data(format!(
            "unsupported item bank format: {} (expected .csv or .toml)",
            path.display()
        ))),
    }
}

/// Parse CSV item bank content.
///
/// Non-empty cells of columns other than the item parameters become item
/// attributes under their header name.
pub fn parse_items_csv(content: &str) -> Result<ItemPool> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AssemblyError::Data(format!("header: {e}")))?
        .clone();
    let extra: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter(|(_, name)| !ITEM_COLUMNS.contains(name))
        .collect();

    let items = reader
        .records()
        .enumerate()
        .map(|(idx, record)| {
            // Header is line 1.
            let line = idx + 2;
            let record = record.map_err(|e| AssemblyError::Data(format!("row {line}: {e}")))?;
            let row: CsvItem = record
                .deserialize(Some(&headers))
                .map_err(|e| AssemblyError::Data(format!("row {line}: {e}")))?;

            let mut item = Item::new(row.item_id, row.a, row.b, row.c, row.category);
            for &(col, name) in &extra {
                if let Some(value) = record.get(col).filter(|v| !v.is_empty()) {
                    item = item.with_attribute(name, value);
                }
            }
            Ok(item)
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        items = items.len(),
        attributes = extra.len(),
        "parsed CSV item bank"
    );
    ItemPool::new(items)
}

/// Parse TOML item bank content.
pub fn parse_items_toml(content: &str) -> Result<ItemPool> {
    toml::from_str::<ItemPool>(content).map_err(|e| AssemblyError::Data(e.to_string()))
}

/// A warning from pool validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    /// The item ID (if applicable).
    pub item_id: Option<String>,
    pub message: String,
}

/// Flag pool properties that are legal but likely to cause poor or
/// infeasible assemblies.
pub fn validate_pool(pool: &ItemPool, config: &AssemblyConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for item in pool.items() {
        if item.a < LOW_DISCRIMINATION {
            warnings.push(ValidationWarning {
                item_id: Some(item.id.clone()),
                message: format!("low discrimination a = {}", item.a),
            });
        }
        if item.c > HIGH_GUESSING {
            warnings.push(ValidationWarning {
                item_id: Some(item.id.clone()),
                message: format!("high guessing parameter c = {}", item.c),
            });
        }
        let nearest = config
            .thetas
            .iter()
            .map(|t| (item.b - t).abs())
            .fold(f64::INFINITY, f64::min);
        if nearest.is_finite() && nearest > DIFFICULTY_MARGIN {
            warnings.push(ValidationWarning {
                item_id: Some(item.id.clone()),
                message: format!(
                    "difficulty b = {} is more than {DIFFICULTY_MARGIN} from every ability level",
                    item.b
                ),
            });
        }
    }

    let needed = config.num_forms * config.items_per_form;
    if needed > pool.len() {
        warnings.push(ValidationWarning {
            item_id: None,
            message: format!(
                "{} forms x {} items need {needed} items but the pool has {}; the model is infeasible",
                config.num_forms,
                config.items_per_form,
                pool.len()
            ),
        });
    }

    if config.content_minimums.len() == pool.num_categories() {
        for (idx, (&size, &min)) in pool
            .category_sizes()
            .iter()
            .zip(&config.content_minimums)
            .enumerate()
        {
            let required = config.num_forms * min as usize;
            if required > size {
                warnings.push(ValidationWarning {
                    item_id: None,
                    message: format!(
                        "category {} has {size} items but {} forms need at least {required}",
                        idx + 1,
                        config.num_forms
                    ),
                });
            }
        }

        let minimum_total: u32 = config.content_minimums.iter().sum();
        if minimum_total as usize > config.items_per_form {
            warnings.push(ValidationWarning {
                item_id: None,
                message: format!(
                    "content minimums add up to {minimum_total}, more than {} items per form",
                    config.items_per_form
                ),
            });
        }
    }

    for rule in &config.attribute_constraints {
        if rule.comparison == Comparison::LessEq {
            continue;
        }
        for (key, &limit) in &rule.values {
            let available = pool.attribute_members(&rule.columns, &rule.key_parts(key)).len();
            let required = config.num_forms * limit as usize;
            if required > available {
                warnings.push(ValidationWarning {
                    item_id: None,
                    message: format!(
                        "{} = {key} matches {available} items but {} forms need at least {required}",
                        rule.columns.join(","),
                        config.num_forms
                    ),
                });
            }
        }
    }

    warnings
}
