//! Template engine for rendering the issue preview page.

use std::path::Path;

use minijinja::{context, path_loader, Environment};

use issue_preview_form::SourceDocument;

use crate::assets::AssetPipeline;

const DEFAULT_TEMPLATE_NAME: &str = "issue.html";

/// Template engine using minijinja.
pub struct TemplateEngine {
    env: Environment<'static>,
    template: String,
}

impl TemplateEngine {
    /// Create a new template engine with the built-in issue template.
    pub fn new() -> Self {
        let mut env = Environment::new();

        env.add_template_owned(DEFAULT_TEMPLATE_NAME.to_string(), ISSUE_TEMPLATE.to_string())
            .expect("Failed to add issue template");

        Self {
            env,
            template: DEFAULT_TEMPLATE_NAME.to_string(),
        }
    }

    /// Create a template engine that renders a template file from disk.
    ///
    /// Sibling files are reachable through `{% include %}` and `{% extends %}`.
    pub fn from_file(path: &Path) -> Result<Self, minijinja::Error> {
        let dir = path.parent().unwrap_or(Path::new("."));
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_TEMPLATE_NAME)
            .to_string();

        let mut env = Environment::new();
        env.set_loader(path_loader(dir));

        // Fail now rather than on the first render.
        env.get_template(&name)?;

        Ok(Self {
            env,
            template: name,
        })
    }

    /// Render an issue form.
    pub fn render_issue(
        &self,
        doc: &SourceDocument,
        stylesheet: &str,
    ) -> Result<String, minijinja::Error> {
        let tmpl = self.env.get_template(&self.template)?;

        tmpl.render(context! {
            css => stylesheet,
            client_script => AssetPipeline::client_script(),
            name => &doc.name,
            description => &doc.description,
            description_html => &doc.description_html,
            title => &doc.title,
            body => &doc.body,
            assignees => &doc.assignees,
            labels => &doc.labels,
            projects => &doc.projects,
            milestone => &doc.milestone,
        })
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

// Elements whose id ends in `-no-export` are preview chrome and get pruned on
// export; `export-title` carries the issue title.
const ISSUE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{ name or title or "Issue preview" }}</title>
  <link rel="stylesheet" href="{{ css }}">
</head>
<body>
  <div class="layout">
    <section class="template-header" id="template-header-no-export">
      {% if name %}<h2 class="template-name">{{ name }}</h2>{% endif %}
      {% if description_html %}<div class="template-description">{{ description_html | safe }}</div>{% endif %}
    </section>

    <div class="issue">
      <div class="field field-title">
        <label class="field-label" id="title-label-no-export">Add a title</label>
        <h1 class="issue-title" id="export-title" contenteditable="true">{{ title }}</h1>
      </div>

      {% for field in body %}
      {% set attrs = field.attributes %}
      {% if field.type == "markdown" %}
      <div class="field field-markdown markdown-body" contenteditable="true">
        {{ attrs.valueHtml | safe }}
      </div>
      {% elif field.type in ["input", "textarea", "dropdown", "checkboxes"] %}
      <div class="field field-{{ field.type }}"{% if field.id %} data-field-id="{{ field.id }}"{% endif %}>
        <h3 class="field-label">{{ attrs.label }}{% if field.validations.required %}<span class="required" id="field-{{ loop.index }}-required-no-export"> *</span>{% endif %}</h3>
        {% if attrs.descriptionHtml %}
        <div class="field-description" id="field-{{ loop.index }}-description-no-export">{{ attrs.descriptionHtml | safe }}</div>
        {% endif %}
        {% if field.type == "input" %}
        <input type="text" class="form-control" value="{{ attrs.value or "" }}" placeholder="{{ attrs.placeholder or "" }}">
        {% elif field.type == "textarea" %}
        <textarea class="form-control" placeholder="{{ attrs.placeholder or "" }}"{% if attrs.render %} data-render="{{ attrs.render }}"{% endif %}>{{ attrs.value or "" }}</textarea>
        {% elif field.type == "dropdown" %}
        <select class="form-select"{% if attrs.multiple %} multiple{% endif %}>
          <option value="">Selections: None</option>
          {% for option in attrs.options %}
          <option value="{{ option }}"{% if attrs.default is defined and loop.index0 == attrs.default %} selected{% endif %}>{{ option }}</option>
          {% endfor %}
        </select>
        {% else %}
        <ul class="checkbox-list">
          {% for option in attrs.options %}
          <li><input type="checkbox"{% if option.required %} required{% endif %}> {{ option.label }}</li>
          {% endfor %}
        </ul>
        {% endif %}
      </div>
      {% endif %}
      {% endfor %}
    </div>

    <div class="sidebar" id="sidebar-no-export">
      <div class="sidebar-section">
        <span class="sidebar-heading">Assignees</span>
        {% for assignee in assignees %}<span class="sidebar-item">{{ assignee }}</span>{% else %}No one assigned{% endfor %}
      </div>
      <div class="sidebar-section">
        <span class="sidebar-heading">Labels</span>
        {% for label in labels %}<span class="issue-label">{{ label }}</span>{% else %}None yet{% endfor %}
      </div>
      <div class="sidebar-section">
        <span class="sidebar-heading">Projects</span>
        {% for project in projects %}<span class="sidebar-item">{{ project }}</span>{% else %}None yet{% endfor %}
      </div>
      <div class="sidebar-section">
        <span class="sidebar-heading">Milestone</span>
        {% if milestone %}<span class="sidebar-item">{{ milestone }}</span>{% else %}No milestone{% endif %}
      </div>
    </div>

    <div class="toolbar" id="toolbar-no-export">
      <button type="button" class="export-button" id="export-button-no-export">Export Markdown</button>
      <span class="export-status" id="export-status-no-export"></span>
    </div>
  </div>
  <script>{{ client_script | safe }}</script>
</body>
</html>"##;
