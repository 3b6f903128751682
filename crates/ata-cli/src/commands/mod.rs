pub mod assemble;
pub mod export;
pub mod info;
pub mod init;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use ata_core::config::{load_config_from, AssemblyConfig};
use ata_core::model::ItemPool;
use ata_core::parser::load_item_pool;

/// Load the item bank and the configuration shared by every command.
pub(crate) fn load_inputs(
    items: &Path,
    config_path: Option<&PathBuf>,
) -> Result<(ItemPool, AssemblyConfig)> {
    let config = load_config_from(config_path.map(PathBuf::as_path))?;
    let pool = load_item_pool(items)
        .with_context(|| format!("failed to load item bank {}", items.display()))?;
    Ok((pool, config))
}
