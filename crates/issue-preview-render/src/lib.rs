//! HTML preview renderer for issue form definitions.
//!
//! Renders a parsed issue form into a page that mirrors GitHub's issue form
//! layout, with a stylesheet written beside it and a small client script that
//! polls for refreshes and posts edited snapshots back for export.

pub mod assets;
pub mod renderer;
pub mod templates;

pub use renderer::{
    artifact_path, write_atomic, RenderConfig, RenderError, RenderedArtifact, Renderer,
};
pub use templates::TemplateEngine;
