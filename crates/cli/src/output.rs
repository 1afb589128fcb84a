use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use ingredex_core::ExtractionResult;

/// Write the result as pretty JSON, replacing any existing file and creating
/// missing parent directories.
pub fn save_output(result: &ExtractionResult, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }
    let json = result
        .to_json_pretty()
        .context("Failed to serialize extraction result")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write output file {}", path.display()))?;
    tracing::info!("Result written to {}", path.display());
    Ok(())
}

pub fn write_summary(result: &ExtractionResult, out: &mut impl Write) -> io::Result<()> {
    if result.is_empty() {
        return writeln!(out, "No ingredients found.");
    }
    writeln!(out, "Extracted Ingredients:")?;
    for name in result.ingredients() {
        writeln!(out, " - {name}")?;
    }
    Ok(())
}
