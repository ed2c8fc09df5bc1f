//! `devopscli render -f <file>`: show a local Markdown file.

use std::path::Path;

use anyhow::{Context, Result};

pub fn handle_render(file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Error reading file: {}", file.display()))?;
    super::print_markdown(&content);
    Ok(())
}
