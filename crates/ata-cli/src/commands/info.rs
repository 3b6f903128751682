//! The `ata info` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use ata_core::information::InformationMatrix;

use super::load_inputs;

pub fn execute(items: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let (pool, config) = load_inputs(&items, config_path.as_ref())?;
    config.validate()?;

    let levels = config.ability_levels();
    let matrix = InformationMatrix::compute(&pool, &levels, config.scaling_constant)?;

    let mut table = Table::new();
    let mut header = vec![
        "Item".to_string(),
        "a".to_string(),
        "b".to_string(),
        "c".to_string(),
        "Category".to_string(),
    ];
    header.extend(levels.iter().map(|l| format!("I({:+.2})", l.theta)));
    table.set_header(header);

    for (idx, item) in pool.items().iter().enumerate() {
        let mut row = vec![
            Cell::new(&item.id),
            Cell::new(format!("{:.3}", item.a)),
            Cell::new(format!("{:.3}", item.b)),
            Cell::new(format!("{:.3}", item.c)),
            Cell::new(item.category),
        ];
        if let Some(values) = matrix.row(idx) {
            row.extend(values.iter().map(|v| Cell::new(format!("{v:.4}"))));
        }
        table.add_row(row);
    }

    println!("{table}");
    let all: Vec<usize> = (0..pool.len()).collect();
    let totals: Vec<String> = (0..levels.len())
        .map(|k| format!("{:.3}", matrix.form_information(&all, k)))
        .collect();
    println!("Pool information (D = {}): {}", config.scaling_constant, totals.join(", "));

    Ok(())
}
