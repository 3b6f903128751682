//! The `ata validate` command.

use std::path::PathBuf;

use anyhow::Result;

use ata_core::parser::validate_pool;

use super::load_inputs;

pub fn execute(items: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let (pool, config) = load_inputs(&items, config_path.as_ref())?;
    config.validate()?;
    config.validate_content(pool.num_categories())?;
    config.validate_attributes(&pool)?;

    println!(
        "Item bank: {} ({} items, {} categories)",
        items.display(),
        pool.len(),
        pool.num_categories()
    );
    let sizes: Vec<String> = pool
        .category_sizes()
        .iter()
        .enumerate()
        .map(|(idx, size)| format!("{}: {size}", idx + 1))
        .collect();
    println!("  category sizes: {}", sizes.join(", "));
    let columns: std::collections::BTreeSet<&str> = pool
        .items()
        .iter()
        .flat_map(|item| item.attributes.keys().map(String::as_str))
        .collect();
    if !columns.is_empty() {
        println!(
            "  attribute columns: {}",
            columns.into_iter().collect::<Vec<_>>().join(", ")
        );
    }
    if !config.attribute_constraints.is_empty() {
        println!("  attribute constraints: {}", config.attribute_constraints.len());
    }

    let warnings = validate_pool(&pool, &config);
    for w in &warnings {
        let prefix = w
            .item_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Item bank valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
