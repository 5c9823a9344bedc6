//! Init, Config and Clear commands.

use anyhow::{Result, anyhow};
use std::path::PathBuf;

use crate::config::{CONFIG_DIR, Settings};
use crate::storage::SymbolIndex;

/// Run init command - create configuration file.
pub fn run_init(force: bool) -> Result<()> {
    let config_path = PathBuf::from(CONFIG_DIR).join("settings.toml");

    if config_path.exists() && !force {
        return Err(anyhow!(
            "Configuration file already exists at: {}\nUse --force to overwrite",
            config_path.display()
        ));
    }

    let path = Settings::init_config_file(force).map_err(|e| anyhow!("{e}"))?;
    println!("Created configuration file at: {}", path.display());
    println!("Edit this file to add projects and include roots.");
    Ok(())
}

/// Run config command - display current configuration.
pub fn run_config(config: &Settings) -> Result<()> {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Run clear command - empty the index and save it.
pub fn run_clear(config: &Settings) -> Result<()> {
    let index = SymbolIndex::open(config.resolved_index_path())?;
    let before = index.stats();
    index.clear();
    index.save()?;
    println!(
        "Cleared {} files ({} declarations)",
        before.file_count, before.declaration_count
    );
    Ok(())
}
