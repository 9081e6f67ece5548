//! Clean command - remove Scala class output and build state

use anyhow::{Context, Result};
use scalar_build::Builder;
use std::path::Path;

pub fn run(project_dir: &Path) -> Result<()> {
    let builder = Builder::new(project_dir).context("Failed to load project configuration")?;
    let removed = builder.clean().context("Failed to clean build artifacts")?;

    if removed.is_empty() {
        println!("Nothing to clean");
    }
    for path in removed {
        println!("Removed {}", path.display());
    }
    Ok(())
}
