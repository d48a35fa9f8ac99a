//! Live preview server for GitHub issue forms.
//!
//! Renders the form to HTML, re-renders it whenever the source changes and
//! bumps a refresh token the page polls, and accepts edited snapshots of the
//! page for export back to Markdown.

pub mod refresh;
pub mod server;
pub mod watcher;

pub use refresh::{reload_path, RefreshLoop, RefreshToken};
pub use server::{
    router, ArtifactGuard, ExportBody, PreviewContext, PreviewServer, PreviewServerConfig,
    ServerError,
};
pub use watcher::{ChangeSource, NotifyChangeSource, PollingChangeSource, WatchBackend, WatchError};
