//! Issue preview renderer.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use issue_preview_form::{DocumentError, SourceDocument};

use crate::assets::{AssetPipeline, DEFAULT_STYLESHEET_NAME};
use crate::templates::TemplateEngine;

/// Configuration for the renderer.
#[derive(Debug, Clone, Default)]
pub struct RenderConfig {
    /// Custom page template (defaults to the built-in GitHub-like template)
    pub template: Option<PathBuf>,

    /// Custom stylesheet (defaults to the built-in stylesheet)
    pub stylesheet: Option<PathBuf>,

    /// Minify the stylesheet before writing it
    pub minify: bool,
}

/// A rendered page written to disk.
#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    /// Path of the HTML file
    pub path: PathBuf,

    /// Rendered HTML
    pub html: String,

    /// Path of the stylesheet written beside the HTML
    pub stylesheet: PathBuf,
}

/// Errors that can occur while rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Failed to load template: {0}")]
    TemplateError(String),

    #[error("Failed to load stylesheet: {0}")]
    StylesheetError(String),

    #[error("Failed to write {path}: {message}")]
    WriteError { path: String, message: String },
}

/// Renders issue forms to HTML files.
pub struct Renderer {
    templates: TemplateEngine,
    stylesheet_name: String,
    stylesheet: String,
}

impl Renderer {
    /// Create a renderer, loading any custom template and stylesheet.
    pub fn new(config: &RenderConfig) -> Result<Self, RenderError> {
        let templates = match &config.template {
            Some(path) => TemplateEngine::from_file(path)
                .map_err(|e| RenderError::TemplateError(format!("{}: {}", path.display(), e)))?,
            None => TemplateEngine::new(),
        };

        let (stylesheet_name, css) = match &config.stylesheet {
            Some(path) => {
                let css = fs::read_to_string(path).map_err(|e| {
                    RenderError::StylesheetError(format!("{}: {}", path.display(), e))
                })?;
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(DEFAULT_STYLESHEET_NAME)
                    .to_string();
                (name, css)
            }
            None => (
                DEFAULT_STYLESHEET_NAME.to_string(),
                AssetPipeline::generate_css(),
            ),
        };

        let stylesheet = if config.minify {
            AssetPipeline::minify_css(&css).unwrap_or_else(|e| {
                tracing::warn!("Keeping unminified stylesheet: {}", e);
                css
            })
        } else {
            css
        };

        Ok(Self {
            templates,
            stylesheet_name,
            stylesheet,
        })
    }

    /// File name the rendered page links its stylesheet by.
    pub fn stylesheet_name(&self) -> &str {
        &self.stylesheet_name
    }

    /// Render a parsed document to HTML.
    pub fn render(&self, doc: &SourceDocument) -> Result<String, RenderError> {
        self.templates
            .render_issue(doc, &self.stylesheet_name)
            .map_err(|e| RenderError::TemplateError(e.to_string()))
    }

    /// Parse `source`, render it, and write the page and its stylesheet.
    ///
    /// Nothing is written when the source fails to parse, so the previous
    /// artifact stays in place.
    pub fn render_file(&self, source: &Path, artifact: &Path) -> Result<RenderedArtifact, RenderError> {
        let doc = SourceDocument::load(source)?;
        let html = self.render(&doc)?;

        let dir = artifact.parent().unwrap_or(Path::new(""));
        let stylesheet = dir.join(&self.stylesheet_name);

        write_atomic(&stylesheet, &self.stylesheet).map_err(|e| write_error(&stylesheet, e))?;
        write_atomic(artifact, &html).map_err(|e| write_error(artifact, e))?;

        tracing::info!("Rendered {}", artifact.display());

        Ok(RenderedArtifact {
            path: artifact.to_path_buf(),
            html,
            stylesheet,
        })
    }
}

/// Where the rendered page for a source document lives.
///
/// `.github/ISSUE_TEMPLATE/bug.yml` -> `.github/ISSUE_TEMPLATE/bug.html`
pub fn artifact_path(source: &Path) -> PathBuf {
    source.with_extension("html")
}

/// Replace `path` with `contents` so readers never see a partial file.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;

    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    fs::write(&tmp, contents)?;

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    Ok(())
}

fn write_error(path: &Path, e: io::Error) -> RenderError {
    RenderError::WriteError {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}
