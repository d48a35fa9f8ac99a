//! HTML to Markdown conversion.
//!
//! The converter walks the parsed tree rather than pattern-matching markup, so
//! arbitrarily nested lists and containers come out with the right structure.
//! Headings are always ATX style. Form controls are read the way GitHub turns
//! a submitted issue form into an issue body: the entered value, or
//! `_No response_` when nothing was entered.

use scraper::node::Element;
use scraper::{ElementRef, Html, Node};

use crate::escape::{escape_inline, escape_line_starts};

/// Placeholder for a form control left empty.
pub const NO_RESPONSE: &str = "_No response_";

/// Elements whose content never reaches the Markdown.
const SKIPPED: &[&str] = &[
    "script", "style", "template", "head", "noscript", "option", "datalist",
];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "header", "footer", "nav", "aside", "form",
    "fieldset", "details", "summary", "figure", "figcaption", "h1", "h2", "h3", "h4", "h5", "h6",
    "ul", "ol", "pre", "blockquote", "hr", "table", "thead", "tbody", "tfoot", "tr", "dl", "dt",
    "dd", "textarea", "select",
];

/// Input types that carry no user content.
const IGNORED_INPUTS: &[&str] = &["hidden", "submit", "button", "reset", "image", "file"];

/// Convert a parsed document to Markdown.
///
/// Only the `<body>` is converted. The result ends with a single newline, or
/// is empty when the body has no content.
pub fn html_to_markdown(html: &Html) -> String {
    let root = html.root_element();
    let body = root
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "body")
        .unwrap_or(root);

    let markdown = blocks(body, false);
    if markdown.is_empty() {
        markdown
    } else {
        markdown + "\n"
    }
}

/// Convert the children of `el` to a sequence of Markdown blocks.
fn blocks(el: ElementRef<'_>, tight: bool) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut inline = String::new();

    for child in el.children() {
        match child.value() {
            Node::Text(text) => push_text(&mut inline, text),
            Node::Element(element) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };

                if SKIPPED.contains(&element.name()) {
                    continue;
                }

                if is_block(element) {
                    flush_paragraph(&mut out, &mut inline);
                    if let Some(block) = block(child_el) {
                        if !block.trim().is_empty() {
                            out.push(block);
                        }
                    }
                } else {
                    push_inline(&mut inline, &inline_markdown(child_el));
                }
            }
            _ => {}
        }
    }

    flush_paragraph(&mut out, &mut inline);

    out.join(if tight { "\n" } else { "\n\n" })
}

fn is_block(el: &Element) -> bool {
    match el.name() {
        "input" => !matches!(el.attr("type"), Some("checkbox") | Some("radio")),
        name => BLOCK_TAGS.contains(&name),
    }
}

/// Convert a single block-level element.
fn block(el: ElementRef<'_>) -> Option<String> {
    let element = el.value();

    match element.name() {
        name @ ("h1" | "h2" | "h3" | "h4" | "h5" | "h6") => {
            let level = name[1..].parse::<usize>().unwrap_or(1);
            // A heading is one line; line breaks inside it become spaces.
            let inline = collapse(&inline_children(el).replace("\\\n", " "));
            let text = finish_inline(&inline);
            (!text.is_empty()).then(|| format!("{} {}", "#".repeat(level), text))
        }
        "ul" => Some(list(el, None)),
        "ol" => {
            let start = element
                .attr("start")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(1);
            Some(list(el, Some(start)))
        }
        "pre" => Some(code_block(el)),
        "blockquote" => {
            let inner = blocks(el, false);
            Some(
                inner
                    .lines()
                    .map(|line| {
                        if line.is_empty() {
                            ">".to_string()
                        } else {
                            format!("> {}", line)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        }
        "hr" => Some("---".to_string()),
        "textarea" => Some(textarea(el)),
        "select" => Some(select(el)),
        "input" => input(element),
        "tr" => {
            let cells = finish_inline(&inline_children(el));
            Some(cells)
        }
        _ => Some(blocks(el, false)),
    }
}

/// Convert a list. `start` is `Some` for ordered lists.
fn list(el: ElementRef<'_>, start: Option<u64>) -> String {
    let items: Vec<ElementRef<'_>> = el
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "li")
        .collect();

    let loose = items.iter().any(|item| has_paragraph(*item));

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let marker = match start {
                Some(n) => format!("{}. ", n + i as u64),
                None => "- ".to_string(),
            };
            indent_item(&marker, &blocks(*item, !has_paragraph(*item)))
        })
        .collect::<Vec<_>>()
        .join(if loose { "\n\n" } else { "\n" })
}

fn has_paragraph(item: ElementRef<'_>) -> bool {
    item.children()
        .filter_map(ElementRef::wrap)
        .any(|child| child.value().name() == "p")
}

/// Prefix the first line with `marker` and indent the rest to match.
fn indent_item(marker: &str, body: &str) -> String {
    if body.is_empty() {
        return marker.trim_end().to_string();
    }

    let pad = " ".repeat(marker.len());
    body.lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("{}{}", marker, line)
            } else if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn code_block(el: ElementRef<'_>) -> String {
    let language = el
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "code")
        .and_then(|code| {
            code.value()
                .classes()
                .find_map(|class| class.strip_prefix("language-"))
                .map(str::to_string)
        })
        .unwrap_or_default();

    let text: String = el.text().collect();
    fenced(&language, text.strip_suffix('\n').unwrap_or(&text))
}

fn fenced(language: &str, text: &str) -> String {
    let fence = if text.contains("```") { "~~~" } else { "```" };
    format!("{fence}{language}\n{text}\n{fence}")
}

fn textarea(el: ElementRef<'_>) -> String {
    let text: String = el.text().collect();
    let text = text.trim_end();

    if text.trim().is_empty() {
        return NO_RESPONSE.to_string();
    }

    match el.value().attr("data-render") {
        Some(language) => fenced(language.trim(), text),
        None => text.to_string(),
    }
}

fn select(el: ElementRef<'_>) -> String {
    let chosen: Vec<String> = el
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|option| {
            let option = option.value();
            option.name() == "option"
                && option.attr("selected").is_some()
                && option.attr("value").map_or(true, |v| !v.is_empty())
        })
        .map(|option| collapse(&option.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect();

    if chosen.is_empty() {
        NO_RESPONSE.to_string()
    } else {
        escape_line_starts(&escape_inline(&chosen.join(", ")))
    }
}

fn input(element: &Element) -> Option<String> {
    let kind = element.attr("type").unwrap_or("text");
    if IGNORED_INPUTS.contains(&kind) {
        return None;
    }

    let value = element.attr("value").map(str::trim).unwrap_or("");
    if value.is_empty() {
        Some(NO_RESPONSE.to_string())
    } else {
        Some(escape_line_starts(&escape_inline(value)))
    }
}

/// Convert an inline element.
fn inline_markdown(el: ElementRef<'_>) -> String {
    let element = el.value();

    match element.name() {
        "strong" | "b" => wrap(&inline_children(el), "**"),
        "em" | "i" => wrap(&inline_children(el), "*"),
        "del" | "s" | "strike" => wrap(&inline_children(el), "~~"),
        "code" | "kbd" => code_span(&el.text().collect::<String>()),
        "br" => "\\\n".to_string(),
        "a" => {
            let text = inline_children(el);
            match element.attr("href") {
                Some(href) if !href.is_empty() => format!("[{}]({})", text.trim(), href),
                _ => text,
            }
        }
        "img" => format!(
            "![{}]({})",
            escape_inline(element.attr("alt").unwrap_or("")),
            element.attr("src").unwrap_or("")
        ),
        "input" => match element.attr("checked") {
            Some(_) => "[x] ".to_string(),
            None => "[ ] ".to_string(),
        },
        "td" | "th" => format!("{} ", inline_children(el).trim()),
        _ => inline_children(el),
    }
}

/// Concatenate the inline content of `el`'s children.
///
/// Block-level descendants of inline elements are flattened into text.
fn inline_children(el: ElementRef<'_>) -> String {
    let mut out = String::new();

    for child in el.children() {
        match child.value() {
            Node::Text(text) => push_text(&mut out, text),
            Node::Element(element) if !SKIPPED.contains(&element.name()) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    push_inline(&mut out, &inline_markdown(child_el));
                }
            }
            _ => {}
        }
    }

    out
}

/// Append text with HTML whitespace collapsing and Markdown escaping.
fn push_text(buf: &mut String, text: &str) {
    let mut pending_space = false;

    for word_or_space in split_keep_whitespace(text) {
        if word_or_space.trim().is_empty() {
            pending_space = true;
            continue;
        }
        if pending_space && !buf.is_empty() && !buf.ends_with([' ', '\n']) {
            buf.push(' ');
        }
        pending_space = false;
        buf.push_str(&escape_inline(word_or_space));
    }

    if pending_space && !buf.is_empty() && !buf.ends_with([' ', '\n']) {
        buf.push(' ');
    }
}

fn split_keep_whitespace(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_space = None;

    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        if in_space.is_some_and(|s| s != space) {
            parts.push(&text[start..i]);
            start = i;
        }
        in_space = Some(space);
    }
    if start < text.len() {
        parts.push(&text[start..]);
    }

    parts
}

/// Append already-converted inline Markdown without doubling spaces.
fn push_inline(buf: &mut String, markdown: &str) {
    if buf.is_empty() || buf.ends_with([' ', '\n']) {
        buf.push_str(markdown.trim_start_matches(' '));
    } else {
        buf.push_str(markdown);
    }
}

/// Wrap inline content in a delimiter, keeping edge spaces outside it.
fn wrap(content: &str, delimiter: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return if content.is_empty() { String::new() } else { " ".to_string() };
    }

    let lead = if content.starts_with(' ') { " " } else { "" };
    let trail = if content.ends_with(' ') { " " } else { "" };
    format!("{lead}{delimiter}{trimmed}{delimiter}{trail}")
}

fn code_span(code: &str) -> String {
    if code.contains('`') {
        format!("`` {} ``", code)
    } else {
        format!("`{}`", code)
    }
}

fn flush_paragraph(out: &mut Vec<String>, inline: &mut String) {
    let paragraph = finish_inline(inline);
    if !paragraph.is_empty() {
        out.push(paragraph);
    }
    inline.clear();
}

/// Trim a run of inline Markdown and guard its line starts.
fn finish_inline(inline: &str) -> String {
    // Trailing hard breaks have nothing to break before.
    let mut text = inline.trim_start();
    loop {
        let trimmed = text.trim_end_matches(' ');
        match trimmed.strip_suffix("\\\n") {
            Some(rest) => text = rest,
            None => {
                text = trimmed.trim_end();
                break;
            }
        }
    }

    escape_line_starts(text)
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
