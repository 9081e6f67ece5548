//! Idea command - print what an IDE needs to set up the Scala SDK

use anyhow::{Context, Result};
use scalar_build::Builder;
use std::path::Path;

pub fn run(project_dir: &Path, json: bool) -> Result<()> {
    let builder = Builder::new(project_dir).context("Failed to load project configuration")?;
    let metadata = builder
        .ide_metadata()
        .context("Failed to collect IDE metadata")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
        return Ok(());
    }

    println!("Scala SDK: {}", metadata.sdk_name);
    for source_set in &metadata.source_sets {
        let role = if source_set.is_test { "test" } else { "sources" };
        for dir in &source_set.source_dirs {
            println!("  {} ({}): {}", source_set.name, role, dir.display());
        }
    }
    Ok(())
}
