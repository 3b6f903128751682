//! The `ata export` command.

use std::path::PathBuf;

use anyhow::Result;

use ata_core::formulation::Formulation;
use ata_core::lp_format::write_lp_file;

use super::load_inputs;

pub fn execute(items: PathBuf, config_path: Option<PathBuf>, output: PathBuf) -> Result<()> {
    let (pool, config) = load_inputs(&items, config_path.as_ref())?;

    let (_, formulation) = Formulation::from_config(&pool, &config)?;
    write_lp_file(&formulation, &output)?;

    let stats = formulation.stats();
    println!(
        "Wrote {} ({} variables, {} constraints)",
        output.display(),
        stats.variables,
        stats.constraints
    );
    Ok(())
}
