//! The refresh loop: re-render on change and bump the refresh token.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use issue_preview_render::{write_atomic, RenderError, RenderedArtifact, Renderer};

use crate::watcher::ChangeSource;

/// Where the refresh token for `source` is kept.
///
/// `forms/bug.yml` -> `<temp dir>/bug_reload.txt`
pub fn reload_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("issue");

    std::env::temp_dir().join(format!("{}_reload.txt", stem))
}

/// A strictly increasing token the preview page polls for.
#[derive(Debug)]
pub struct RefreshToken {
    path: PathBuf,
    last: u64,
}

impl RefreshToken {
    pub fn new(path: PathBuf) -> Self {
        Self { path, last: 0 }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last value written, 0 before the first bump.
    pub fn current(&self) -> u64 {
        self.last
    }

    /// Write a new token: the current time in milliseconds, or one more than
    /// the previous token if the clock has not moved past it.
    pub fn bump(&mut self) -> io::Result<u64> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let next = now.max(self.last + 1);

        write_atomic(&self.path, &next.to_string())?;
        self.last = next;

        Ok(next)
    }
}

/// Sole writer of the rendered page and its refresh token.
pub struct RefreshLoop {
    renderer: Renderer,
    source: PathBuf,
    artifact: PathBuf,
    token: RefreshToken,
    changes: Box<dyn ChangeSource>,
}

impl RefreshLoop {
    pub fn new(
        renderer: Renderer,
        source: PathBuf,
        artifact: PathBuf,
        token: RefreshToken,
        changes: Box<dyn ChangeSource>,
    ) -> Self {
        Self {
            renderer,
            source,
            artifact,
            token,
            changes,
        }
    }

    pub fn token(&self) -> &RefreshToken {
        &self.token
    }

    /// Render the page and bump the token.
    ///
    /// The token only moves when a new page was written.
    pub fn render_once(&mut self) -> Result<RenderedArtifact, RenderError> {
        let rendered = self.renderer.render_file(&self.source, &self.artifact)?;

        match self.token.bump() {
            Ok(token) => tracing::debug!("Refresh token is now {}", token),
            Err(e) => tracing::warn!(
                "Failed to write refresh token {}: {}",
                self.token.path().display(),
                e
            ),
        }

        Ok(rendered)
    }

    /// Re-render on every change until the change source closes.
    ///
    /// Render failures keep the previous page.
    pub async fn run(mut self) {
        loop {
            if let Err(e) = self.changes.changed().await {
                tracing::debug!("Refresh loop stopping: {}", e);
                break;
            }

            if let Err(e) = self.render_once() {
                tracing::warn!("Render failed, keeping the previous preview: {}", e);
            }
        }
    }
}
