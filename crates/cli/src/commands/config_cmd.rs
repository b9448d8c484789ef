//! `chatmate config` — show or initialize configuration.

use chatmate_config::AppConfig;
use std::path::{Path, PathBuf};

pub fn run(
    config_path: Option<&Path>,
    init: bool,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::config_path);

    if init {
        let written = write_default(&path, force)?;
        println!("Wrote default configuration to {}", written.display());
        return Ok(());
    }

    let config = super::load_config(config_path)?;
    println!("# {}", path.display());
    if !path.exists() {
        println!("# (file not found, showing defaults)");
    }
    println!("{}", toml::to_string_pretty(&config.redacted())?);
    Ok(())
}

/// Write `AppConfig::default_toml()` to `path`, creating parent directories.
fn write_default(path: &Path, force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if path.exists() && !force {
        return Err(format!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        )
        .into());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(path.to_path_buf())
}
