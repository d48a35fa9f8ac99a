//! Removal of preview-only elements from an HTML snapshot.

use scraper::{ElementRef, Html};

/// Id suffix marking an element as preview-only.
pub const NOT_EXPORTED_SUFFIX: &str = "-no-export";

/// Id of the element holding the issue title.
pub const EXPORT_TITLE_ID: &str = "export-title";

/// Tag kinds that may carry the not-exported marker.
const PRUNABLE_TAGS: &[&str] = &["div", "section", "p", "label", "button", "span"];

/// Detach every marked element together with its subtree.
///
/// Returns the number of marked elements found. Marked elements nested inside
/// another marked element are counted but leave with their ancestor.
pub fn prune_not_exported(html: &mut Html) -> usize {
    let marked: Vec<_> = html
        .tree
        .root()
        .descendants()
        .filter(|node| {
            node.value().as_element().is_some_and(|el| {
                PRUNABLE_TAGS.contains(&el.name())
                    && el.id().is_some_and(|id| id.ends_with(NOT_EXPORTED_SUFFIX))
            })
        })
        .map(|node| node.id())
        .collect();

    for id in &marked {
        if let Some(mut node) = html.tree.get_mut(*id) {
            node.detach();
        }
    }

    marked.len()
}

/// Take the title element out of the tree and return its text.
///
/// The element is removed even when its text is blank; a blank title is
/// reported as absent.
pub fn extract_title(html: &mut Html) -> Option<String> {
    let node_id = html
        .tree
        .root()
        .descendants()
        .find(|node| {
            node.value()
                .as_element()
                .is_some_and(|el| el.id() == Some(EXPORT_TITLE_ID))
        })?
        .id();

    let title = html
        .tree
        .get(node_id)
        .and_then(ElementRef::wrap)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default();

    if let Some(mut node) = html.tree.get_mut(node_id) {
        node.detach();
    }

    (!title.is_empty()).then_some(title)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
