//! Export pipeline: HTML snapshot in, Markdown file out.

use std::fs;
use std::path::{Path, PathBuf};

use issue_preview_form::SourceDocument;
use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::convert::html_to_markdown;
use crate::escape::escape_inline;
use crate::format::{CommonMarkFormatter, MarkdownFormatter};
use crate::prune::{extract_title, prune_not_exported};
use crate::reconcile::reconcile_numbering;

/// A single export job.
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    /// HTML snapshot of the edited preview page
    pub html: String,

    /// Source document, used for list numbering and the default output path
    pub source: Option<PathBuf>,

    /// Explicit output path
    pub output: Option<PathBuf>,
}

/// Outcome of an export as reported to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ExportResult {
    pub fn saved(path: &Path) -> Self {
        Self {
            success: true,
            message: format!("Exported to {}", path.display()),
            path: Some(path.display().to_string()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            path: None,
        }
    }
}

impl From<&Result<PathBuf, ExportError>> for ExportResult {
    fn from(result: &Result<PathBuf, ExportError>) -> Self {
        match result {
            Ok(path) => Self::saved(path),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

/// Errors that can occur while exporting.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("No output path: pass an output file or a source document")]
    NoDestination,

    #[error("Failed to write {path}: {message}")]
    WriteError { path: String, message: String },
}

impl ExportError {
    /// Whether the failure lies with the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ExportError::NoDestination)
    }
}

/// Converts preview snapshots back into Markdown.
pub struct ExportPipeline {
    formatter: Box<dyn MarkdownFormatter>,
}

impl Default for ExportPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportPipeline {
    /// Pipeline using the built-in CommonMark formatter.
    pub fn new() -> Self {
        Self::with_formatter(CommonMarkFormatter)
    }

    pub fn with_formatter(formatter: impl MarkdownFormatter + 'static) -> Self {
        Self {
            formatter: Box::new(formatter),
        }
    }

    /// Convert a snapshot to Markdown, restoring `numbering` on ordered lists.
    pub fn to_markdown(&self, html: &str, numbering: &[u64]) -> String {
        let mut dom = Html::parse_document(html);

        let pruned = prune_not_exported(&mut dom);
        tracing::debug!("Pruned {} preview-only elements", pruned);

        let title = extract_title(&mut dom);
        let body = html_to_markdown(&dom);

        let markdown = match title {
            Some(title) => format!("# {}\n\n{}", escape_inline(&title), body),
            None => body,
        };

        let formatted = self.formatter.format(&markdown).unwrap_or_else(|e| {
            tracing::warn!(
                "{} formatter failed, exporting unformatted Markdown: {}",
                self.formatter.name(),
                e
            );
            markdown
        });

        reconcile_numbering(&formatted, numbering)
    }

    /// Run an export and write the Markdown file.
    pub fn run(&self, request: &ExportRequest) -> Result<PathBuf, ExportError> {
        let path = resolve_output_path(request.output.as_deref(), request.source.as_deref())
            .ok_or(ExportError::NoDestination)?;

        let numbering = match &request.source {
            Some(source) => source_numbering(source),
            None => Vec::new(),
        };

        let markdown = self.to_markdown(&request.html, &numbering);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
        }
        fs::write(&path, markdown).map_err(|e| write_error(&path, e))?;

        tracing::info!("Exported {}", path.display());

        Ok(path)
    }
}

/// Where an export is written.
///
/// An explicit output wins; otherwise `<stem>.md` beside the source.
pub fn resolve_output_path(output: Option<&Path>, source: Option<&Path>) -> Option<PathBuf> {
    output
        .map(Path::to_path_buf)
        .or_else(|| source.map(|s| s.with_extension("md")))
}

fn source_numbering(source: &Path) -> Vec<u64> {
    match SourceDocument::load(source) {
        Ok(doc) => doc.explicit_list_numbers(),
        Err(e) => {
            tracing::warn!("List numbers not restored: {}", e);
            Vec::new()
        }
    }
}

fn write_error(path: &Path, e: std::io::Error) -> ExportError {
    ExportError::WriteError {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}
