//! One-shot render command.

use std::path::PathBuf;

use anyhow::Result;
use issue_preview_render::{artifact_path, Renderer};

use crate::config::ConfigFile;

/// Render `file` to HTML without starting a server.
pub async fn run(file: PathBuf, output: Option<PathBuf>, config: ConfigFile) -> Result<()> {
    if !file.is_file() {
        anyhow::bail!("Issue form not found: {}", file.display());
    }

    let renderer = Renderer::new(&config.render.to_render_config())?;
    let output = output.unwrap_or_else(|| artifact_path(&file));

    let artifact = renderer.render_file(&file, &output)?;

    tracing::info!("Stylesheet: {}", artifact.stylesheet.display());

    Ok(())
}
