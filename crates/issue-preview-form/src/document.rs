//! Issue form document parsing.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

use crate::markdown::{explicit_list_numbers, render_markdown};

/// Attribute key holding the HTML rendering of a markdown field's value.
pub const VALUE_HTML_KEY: &str = "valueHtml";

/// Attribute key holding the HTML rendering of a field description.
pub const DESCRIPTION_HTML_KEY: &str = "descriptionHtml";

/// A parsed issue form definition.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SourceDocument {
    /// Template name shown in the template chooser
    #[serde(default)]
    pub name: String,

    /// Template description shown in the template chooser
    #[serde(default)]
    pub description: String,

    /// Default issue title
    #[serde(default, deserialize_with = "scalar_string")]
    pub title: String,

    /// Form fields, in display order
    #[serde(default)]
    pub body: Vec<Field>,

    #[serde(default, deserialize_with = "string_or_seq")]
    pub assignees: Vec<String>,

    #[serde(default, deserialize_with = "string_or_seq")]
    pub labels: Vec<String>,

    #[serde(default, deserialize_with = "string_or_seq")]
    pub projects: Vec<String>,

    #[serde(default, deserialize_with = "scalar_string")]
    pub milestone: String,

    /// HTML rendering of `description`
    #[serde(skip_deserializing)]
    pub description_html: String,
}

/// A single form field.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Field {
    #[serde(rename = "type")]
    pub kind: FieldKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,

    #[serde(default)]
    pub validations: BTreeMap<String, Value>,
}

/// Kind of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Markdown,
    Input,
    Textarea,
    Dropdown,
    Checkboxes,
    #[serde(other)]
    Unknown,
}

impl Field {
    /// Get a string attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Whether the field's `value` is Markdown that ends up in the exported body.
    fn exports_markdown(&self) -> bool {
        matches!(self.kind, FieldKind::Markdown | FieldKind::Textarea)
    }
}

/// Errors that can occur when loading a document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("Invalid issue form YAML: {0}")]
    InvalidYaml(String),

    #[error("Issue form must be a mapping at the top level")]
    NotAMapping,
}

impl SourceDocument {
    /// Parse a document and attach the derived HTML renderings.
    pub fn parse(source: &str) -> Result<Self, DocumentError> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }

        let raw: Value =
            serde_yaml::from_str(source).map_err(|e| DocumentError::InvalidYaml(e.to_string()))?;

        match raw {
            Value::Mapping(_) => {}
            Value::Null => return Ok(Self::default()),
            _ => return Err(DocumentError::NotAMapping),
        }

        let mut doc: SourceDocument =
            serde_yaml::from_value(raw).map_err(|e| DocumentError::InvalidYaml(e.to_string()))?;

        doc.attach_rendered_markdown();

        Ok(doc)
    }

    /// Read and parse a document from disk.
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let content = fs::read_to_string(path).map_err(|e| DocumentError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Self::parse(&content)
    }

    /// Explicit ordered-list numbers in the raw text of exported fields.
    ///
    /// Only markdown blocks and textareas contribute; descriptions are
    /// preview-only and never reach the export.
    pub fn explicit_list_numbers(&self) -> Vec<u64> {
        self.body
            .iter()
            .filter(|field| field.exports_markdown())
            .filter_map(|field| field.attribute("value"))
            .flat_map(explicit_list_numbers)
            .collect()
    }

    fn attach_rendered_markdown(&mut self) {
        if !self.description.is_empty() {
            self.description_html = render_markdown(&self.description);
        }

        for field in &mut self.body {
            let mut derived = Vec::new();

            if field.kind == FieldKind::Markdown {
                if let Some(value) = field.attribute("value") {
                    derived.push((VALUE_HTML_KEY, render_markdown(value)));
                }
            }

            if let Some(description) = field.attribute("description") {
                derived.push((DESCRIPTION_HTML_KEY, render_markdown(description)));
            }

            for (key, html) in derived {
                field.attributes.insert(key.to_string(), Value::String(html));
            }
        }
    }
}

/// Accept either a YAML sequence or a comma-separated scalar.
fn string_or_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
    })
}

/// Accept any YAML scalar and keep its textual form.
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(de::Error::custom("expected a scalar value")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BUG_REPORT: &str = r#"
name: Bug Report
description: File a **bug** report
title: "[Bug]: "
labels: ["bug", "triage"]
assignees:
  - octocat
body:
  - type: markdown
    attributes:
      value: |
        Thanks for taking the time!

        1. Search first
        2. Then report
  - type: input
    id: contact
    attributes:
      label: Contact Details
      description: How can we get in touch with *you*?
      placeholder: ex. email@example.com
    validations:
      required: false
  - type: textarea
    id: steps
    attributes:
      label: Steps
      value: |
        1. Open
        2. Click
  - type: dropdown
    id: version
    attributes:
      label: Version
      options:
        - 1.0.2 (Default)
        - 1.0.3 (Edge)
"#;

    #[test]
    fn parses_issue_form() {
        let doc = SourceDocument::parse(BUG_REPORT).unwrap();

        assert_eq!(doc.name, "Bug Report");
        assert_eq!(doc.title, "[Bug]: ");
        assert_eq!(doc.labels, vec!["bug", "triage"]);
        assert_eq!(doc.assignees, vec!["octocat"]);
        assert_eq!(doc.body.len(), 4);
        assert_eq!(doc.body[0].kind, FieldKind::Markdown);
        assert_eq!(doc.body[1].id.as_deref(), Some("contact"));
        assert_eq!(doc.body[3].kind, FieldKind::Dropdown);
    }

    #[test]
    fn applies_defaults_for_missing_fields() {
        let doc = SourceDocument::parse("name: Minimal\nbody: []\n").unwrap();

        assert!(doc.assignees.is_empty());
        assert!(doc.labels.is_empty());
        assert!(doc.projects.is_empty());
        assert_eq!(doc.milestone, "");
        assert_eq!(doc.title, "");
    }

    #[test]
    fn empty_source_is_default_document() {
        assert_eq!(SourceDocument::parse("").unwrap(), SourceDocument::default());
        assert_eq!(SourceDocument::parse("~\n").unwrap(), SourceDocument::default());
    }

    #[test]
    fn attaches_html_without_replacing_raw_text() {
        let doc = SourceDocument::parse(BUG_REPORT).unwrap();

        let markdown = &doc.body[0];
        assert!(markdown.attribute("value").unwrap().contains("1. Search first"));
        assert!(markdown.attribute(VALUE_HTML_KEY).unwrap().contains("<ol>"));

        let input = &doc.body[1];
        assert_eq!(
            input.attribute("description"),
            Some("How can we get in touch with *you*?")
        );
        assert!(input
            .attribute(DESCRIPTION_HTML_KEY)
            .unwrap()
            .contains("<em>you</em>"));
        assert!(input.attribute(VALUE_HTML_KEY).is_none());

        assert!(doc.description_html.contains("<strong>bug</strong>"));
    }

    #[test]
    fn accepts_comma_separated_labels_and_numeric_milestone() {
        let doc = SourceDocument::parse("labels: bug, help wanted\nmilestone: 3\n").unwrap();

        assert_eq!(doc.labels, vec!["bug", "help wanted"]);
        assert_eq!(doc.milestone, "3");
    }

    #[test]
    fn keeps_unknown_field_types() {
        let doc = SourceDocument::parse("body:\n  - type: signature\n").unwrap();

        assert_eq!(doc.body[0].kind, FieldKind::Unknown);
    }

    #[test]
    fn collects_numbers_from_exported_fields() {
        let doc = SourceDocument::parse(BUG_REPORT).unwrap();

        assert_eq!(doc.explicit_list_numbers(), vec![1, 2, 1, 2]);
    }

    #[test]
    fn rejects_invalid_yaml() {
        let result = SourceDocument::parse("title: [unclosed\n");

        assert!(matches!(result, Err(DocumentError::InvalidYaml(_))));
    }

    #[test]
    fn rejects_non_mapping_documents() {
        let result = SourceDocument::parse("- just\n- a list\n");

        assert!(matches!(result, Err(DocumentError::NotAMapping)));
    }

    #[test]
    fn loads_from_disk() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("form.yml");
        std::fs::write(&path, "title: From disk\n").unwrap();

        let doc = SourceDocument::load(&path).unwrap();
        assert_eq!(doc.title, "From disk");

        let missing = SourceDocument::load(&temp.path().join("missing.yml"));
        assert!(matches!(missing, Err(DocumentError::Read { .. })));
    }
}
