use std::io::Write;

use anyhow::{Context, Result};

use crate::model::ScanResult;

/// Serializes the full result, including skipped layers and the report when present.
pub fn render_json(result: &ScanResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize scan result")
}

pub fn print_json(result: &ScanResult) -> Result<()> {
    let json = render_json(result)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    Ok(())
}
