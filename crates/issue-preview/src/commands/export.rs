//! Offline export command.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use issue_preview_export::{ExportPipeline, ExportRequest};

use crate::config::ConfigFile;

#[derive(Args)]
pub struct ExportArgs {
    /// Saved preview page
    pub html: PathBuf,

    /// Issue form the page was rendered from (defaults to a .yml/.yaml
    /// file beside the page)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Output Markdown file (defaults to <source>.md)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Run the export pipeline on a saved page.
pub async fn run(args: ExportArgs, config: ConfigFile) -> Result<()> {
    let html = fs::read_to_string(&args.html)
        .with_context(|| format!("Failed to read {}", args.html.display()))?;

    let source = args.source.or_else(|| sibling_source(&args.html));
    if let Some(source) = &source {
        tracing::debug!("Numbering lists from {}", source.display());
    }

    let request = ExportRequest {
        html,
        source,
        output: args.output.or(config.export.output),
    };

    ExportPipeline::new().run(&request)?;

    Ok(())
}

/// The issue form a rendered page was most likely produced from.
fn sibling_source(html: &Path) -> Option<PathBuf> {
    ["yml", "yaml"]
        .iter()
        .map(|ext| html.with_extension(ext))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PAGE: &str =
        r#"<h1 id="export-title">Crash</h1><ol><li>A</li><li>B</li></ol><p id="hint-no-export">x</p>"#;

    fn args(html: PathBuf) -> ExportArgs {
        ExportArgs {
            html,
            source: None,
            output: None,
        }
    }

    #[tokio::test]
    async fn finds_source_beside_page() {
        let temp = tempdir().unwrap();
        let page = temp.path().join("bug.html");
        fs::write(&page, PAGE).unwrap();
        fs::write(
            temp.path().join("bug.yml"),
            "body:\n  - type: markdown\n    attributes:\n      value: \"3. A\\n4. B\"\n",
        )
        .unwrap();

        run(args(page), ConfigFile::default()).await.unwrap();

        let markdown = fs::read_to_string(temp.path().join("bug.md")).unwrap();
        assert!(markdown.starts_with("# Crash\n\n"));
        assert!(markdown.ends_with("3. A\n4. B\n"));
    }

    #[tokio::test]
    async fn explicit_output_without_source() {
        let temp = tempdir().unwrap();
        let page = temp.path().join("saved.html");
        let output = temp.path().join("out/issue.md");
        fs::write(&page, PAGE).unwrap();

        run(
            ExportArgs {
                output: Some(output.clone()),
                ..args(page)
            },
            ConfigFile::default(),
        )
        .await
        .unwrap();

        assert!(fs::read_to_string(&output).unwrap().contains("1. A\n1. B"));
    }

    #[tokio::test]
    async fn no_destination_is_an_error() {
        let temp = tempdir().unwrap();
        let page = temp.path().join("saved.html");
        fs::write(&page, PAGE).unwrap();

        assert!(run(args(page), ConfigFile::default()).await.is_err());
    }
}
