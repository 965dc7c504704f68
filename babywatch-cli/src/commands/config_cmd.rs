use std::path::Path;

use anyhow::Result;

use crate::config::CliConfig;

pub async fn show_config(path: Option<&Path>) -> Result<()> {
    let config = CliConfig::load(path)?;

    println!("# Effective configuration");
    println!();
    println!("{}", config.to_toml()?);

    Ok(())
}

pub async fn init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let config_file = CliConfig::resolve_path(path)?;

    if config_file.exists() && !force {
        println!(
            "Configuration file already exists at: {}",
            config_file.display()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    CliConfig::default().save(&config_file)?;

    println!("✓ Configuration initialized at: {}", config_file.display());

    Ok(())
}
