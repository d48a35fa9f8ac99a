//! Issue form document model.
//!
//! This crate parses GitHub-style issue form definitions (YAML), applies the
//! documented defaults, and attaches HTML renderings of the embedded Markdown
//! fragments alongside the raw text.

pub mod document;
pub mod markdown;

pub use document::{DocumentError, Field, FieldKind, SourceDocument};
pub use markdown::{explicit_list_numbers, render_markdown};
