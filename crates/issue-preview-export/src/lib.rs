//! Export pipeline for edited issue previews.
//!
//! Turns an HTML snapshot of the preview page back into Markdown: preview-only
//! elements are pruned, the title is lifted into a heading, the rest is
//! converted and pretty-printed, and the explicit ordered-list numbers of the
//! source document are restored.

mod escape;

pub mod convert;
pub mod format;
pub mod pipeline;
pub mod prune;
pub mod reconcile;

pub use convert::html_to_markdown;
pub use format::{CommonMarkFormatter, FormatError, MarkdownFormatter};
pub use pipeline::{resolve_output_path, ExportError, ExportPipeline, ExportRequest, ExportResult};
pub use prune::{extract_title, prune_not_exported, EXPORT_TITLE_ID, NOT_EXPORTED_SUFFIX};
pub use reconcile::reconcile_numbering;
