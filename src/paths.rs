use std::path::PathBuf;

use anyhow::{Context, Result};

pub fn state_file_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("unable to resolve config directory")?;
    Ok(base.join("watchnext").join("config"))
}
