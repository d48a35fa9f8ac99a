//! Markdown fragment helpers.

use std::sync::LazyLock;

use pulldown_cmark::{html, Options, Parser};
use regex::Regex;

/// An explicit ordered-list marker: integer, period, space.
static EXPLICIT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\.\s").expect("valid marker regex"));

/// Render a Markdown fragment to HTML.
pub fn render_markdown(content: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;

    let parser = Parser::new_ext(content, options);

    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);

    html_output
}

/// Collect the numbers of every explicitly numbered list line, in order.
///
/// Nesting is not tracked; an indented `1. ` counts like any other line.
pub fn explicit_list_numbers(text: &str) -> Vec<u64> {
    text.lines()
        .filter_map(|line| EXPLICIT_MARKER.captures(line))
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_ordered_list() {
        let html = render_markdown("1. A\n2. B");

        assert!(html.contains("<ol>"));
        assert!(html.contains("<li>A</li>"));
        assert!(html.contains("<li>B</li>"));
    }

    #[test]
    fn renders_task_list() {
        let html = render_markdown("- [x] done\n- [ ] todo");

        assert!(html.contains("checkbox"));
        assert!(html.contains("done"));
    }

    #[test]
    fn collects_numbers_in_document_order() {
        let text = "Intro\n\n1. Alpha\n2. Beta\n   1. Nested\n3. Gamma\n\n- bullet\n7. Seven";

        assert_eq!(explicit_list_numbers(text), vec![1, 2, 1, 3, 7]);
    }

    #[test]
    fn ignores_lookalike_lines() {
        let text = "1.5 is a number\n1.No space\nVersion 2. is out";

        assert!(explicit_list_numbers(text).is_empty());
    }
}
