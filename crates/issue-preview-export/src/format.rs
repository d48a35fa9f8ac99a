//! Markdown pretty-printing.

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd};
use pulldown_cmark_to_cmark::{cmark_with_options, Options as CmarkOptions};

use crate::escape::{escape_inline, escape_line_starts};

/// Normalizes Markdown text into a canonical layout.
pub trait MarkdownFormatter: Send + Sync {
    /// Formatter identifier used in log messages.
    fn name(&self) -> &'static str;

    /// Reformat `markdown`.
    fn format(&self, markdown: &str) -> Result<String, FormatError>;
}

/// Errors that can occur while formatting.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Failed to serialize Markdown: {0}")]
    Serialize(String),

    #[error("Unsupported Markdown construct: {0}")]
    Unsupported(String),
}

/// CommonMark pretty-printer: pulldown-cmark events re-serialized with
/// pulldown-cmark-to-cmark.
///
/// Output conventions: ATX headings, `-` bullets, `*` emphasis, every ordered
/// item written with the generic `1.` marker, blank lines between blocks, a
/// single trailing newline.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonMarkFormatter;

impl MarkdownFormatter for CommonMarkFormatter {
    fn name(&self) -> &'static str {
        "commonmark"
    }

    fn format(&self, markdown: &str) -> Result<String, FormatError> {
        let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
        let events = normalize(Parser::new_ext(markdown, options));

        let cmark_options = CmarkOptions {
            list_token: '-',
            emphasis_token: '*',
            ordered_list_token: '.',
            increment_ordered_list_bullets: false,
            code_block_token_count: fence_length(&events),
            ..CmarkOptions::default()
        };

        let mut out = String::with_capacity(markdown.len());
        cmark_with_options(events.iter(), &mut out, cmark_options)
            .map_err(|err| FormatError::Serialize(err.to_string()))?;

        let out = out.trim_end();
        Ok(if out.is_empty() {
            String::new()
        } else {
            format!("{}\n", out)
        })
    }
}

/// Rewrite the event stream before serialization.
///
/// Ordered lists restart at 1 so every marker comes out as the generic `1.`.
/// Text is escaped here and handed over verbatim, so characters that were
/// literal in the input stay literal in the output.
fn normalize<'a>(events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::new();
    let mut in_code_block = false;
    let mut line_start = false;

    for event in merge_text(events) {
        let event = match event {
            Event::Start(Tag::List(Some(_))) => Event::Start(Tag::List(Some(1))),
            Event::Start(Tag::CodeBlock(kind)) => {
                in_code_block = true;
                Event::Start(Tag::CodeBlock(kind))
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                Event::End(TagEnd::CodeBlock)
            }
            Event::Text(text) if !in_code_block => {
                let escaped = escape_inline(&text);
                let escaped = if line_start {
                    escape_line_starts(&escaped)
                } else {
                    escaped
                };
                Event::InlineHtml(CowStr::from(escaped))
            }
            other => other,
        };

        line_start = matches!(
            event,
            Event::Start(Tag::Paragraph)
                | Event::Start(Tag::Item)
                | Event::Start(Tag::Heading { .. })
                | Event::SoftBreak
                | Event::HardBreak
        );

        out.push(event);
    }

    out
}

/// Join adjacent text events; the parser splits text at every backslash
/// escape and delimiter run.
fn merge_text<'a>(events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut out: Vec<Event<'a>> = Vec::new();

    for event in events {
        if let Event::Text(text) = &event {
            if let Some(Event::Text(previous)) = out.last_mut() {
                *previous = CowStr::from([&**previous, &**text].concat());
                continue;
            }
        }
        out.push(event);
    }

    out
}

/// Backtick fence long enough for every code block in the document.
fn fence_length(events: &[Event<'_>]) -> usize {
    let mut in_code_block = false;
    let mut longest_run = 0;

    for event in events {
        match event {
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            Event::Text(text) if in_code_block => {
                let run = text
                    .split(|c: char| c != '`')
                    .map(str::len)
                    .max()
                    .unwrap_or(0);
                longest_run = longest_run.max(run);
            }
            _ => {}
        }
    }

    (longest_run + 1).max(3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use issue_preview_form::render_markdown;
    use pretty_assertions::assert_eq;

    fn format(markdown: &str) -> String {
        CommonMarkFormatter.format(markdown).unwrap()
    }

    /// Formatting must never change what the Markdown renders to.
    fn assert_renders_same(markdown: &str) {
        let formatted = format(markdown);
        assert_eq!(
            render_markdown(&formatted),
            render_markdown(markdown),
            "formatted as {:?}",
            formatted
        );
    }

    #[test]
    fn normalizes_ordered_markers() {
        let formatted = format("1. Alpha\n2. Beta\n3. Gamma\n");

        assert!(formatted.contains("1. Alpha\n1. Beta\n1. Gamma"));
    }

    #[test]
    fn restarts_lists_that_start_elsewhere() {
        let formatted = format("4. Four\n5. Five\n");

        assert!(formatted.contains("1. Four\n1. Five"));
        assert!(!formatted.contains("4."));
    }

    #[test]
    fn nested_items_use_generic_markers() {
        let formatted = format("1. A\n   1. x\n   2. y\n2. B\n");
        let markers = formatted
            .lines()
            .filter(|line| line.trim_start().starts_with("1. "))
            .count();

        assert_eq!(markers, 4);
        assert!(formatted.lines().any(|line| line.starts_with(' ') && line.ends_with("1. y")));
    }

    #[test]
    fn uses_dash_bullets_and_atx_headings() {
        let formatted = format("Title\n=====\n\n* one\n* two\n");

        assert!(formatted.starts_with("# Title\n"));
        assert!(formatted.contains("- one\n- two"));
    }

    #[test]
    fn keeps_emphasis_next_to_words() {
        let formatted = format("*foo*bar and x*y*\n");

        assert_eq!(
            render_markdown(&formatted),
            "<p><em>foo</em>bar and x<em>y</em></p>\n"
        );
    }

    #[test]
    fn literal_delimiters_stay_literal() {
        assert_renders_same("\\*WIP\\* fix \\<b> and \\_x\\_\n");
        assert_renders_same("\\&copy; is not an entity\n");
        assert_renders_same("1\\. not a list\n\n\\# not a heading\n");
    }

    #[test]
    fn preserves_rendering_of_common_markup() {
        assert_renders_same("Some __bold__, _it_, `code`, ~~gone~~ and [link](https://x.dev \"T\").\n");
        assert_renders_same("```rust\nfn main() {}\n```\n\n> quoted\n>\n> twice\n");
        assert_renders_same("- [x] done\n- [ ] todo\n\nline\\\nbreak\n");
    }

    #[test]
    fn fences_wrap_code_containing_backticks() {
        assert_renders_same("````\nuse ``` here\n````\n");
    }

    #[test]
    fn is_idempotent_on_its_own_output() {
        let once = format("# T\n\n1. a\n2. b\n\n> q\n\n```\ncode\n```\n");
        assert_eq!(format(&once), once);
    }

    #[test]
    fn empty_input_formats_to_empty_output() {
        assert_eq!(format(""), "");
    }
}
