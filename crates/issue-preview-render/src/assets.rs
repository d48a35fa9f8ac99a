//! Stylesheet and client script for the preview page.

/// File name of the built-in stylesheet.
pub const DEFAULT_STYLESHEET_NAME: &str = "issue-preview.css";

/// Asset pipeline utilities.
pub struct AssetPipeline;

impl AssetPipeline {
    /// Generate the built-in stylesheet.
    pub fn generate_css() -> String {
        DEFAULT_CSS.to_string()
    }

    /// Client script inlined into every rendered page.
    pub fn client_script() -> &'static str {
        CLIENT_JS
    }

    /// Minify CSS using lightningcss.
    pub fn minify_css(css: &str) -> Result<String, String> {
        use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

        let stylesheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| format!("CSS parse error: {}", e))?;

        let minified = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..Default::default()
            })
            .map_err(|e| format!("CSS minify error: {}", e))?;

        Ok(minified.code)
    }
}

// Colors follow GitHub's light theme (Primer primitives).
const DEFAULT_CSS: &str = r#"/* issue-preview - GitHub issue form look */

:root {
  --fg-default: #1f2328;
  --fg-muted: #656d76;
  --border-default: #d0d7de;
  --border-muted: #d8dee4;
  --canvas-default: #ffffff;
  --canvas-subtle: #f6f8fa;
  --accent-fg: #0969da;
  --danger-fg: #d1242f;
  --success-bg: #1f883d;
  --radius: 6px;
}

* {
  box-sizing: border-box;
}

body {
  margin: 0;
  font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", "Noto Sans", Helvetica, Arial, sans-serif;
  font-size: 14px;
  line-height: 1.5;
  color: var(--fg-default);
  background: var(--canvas-default);
}

.layout {
  display: grid;
  grid-template-columns: minmax(0, 1fr) 256px;
  gap: 24px;
  max-width: 1012px;
  margin: 32px auto;
  padding: 0 16px;
}

/* Template header */
.template-header {
  grid-column: 1 / -1;
  padding: 16px;
  border: 1px solid var(--border-default);
  border-radius: var(--radius);
  background: var(--canvas-subtle);
}

.template-name {
  margin: 0 0 4px;
  font-size: 16px;
}

.template-description {
  color: var(--fg-muted);
}

/* Issue form */
.issue {
  border: 1px solid var(--border-default);
  border-radius: var(--radius);
  padding: 16px;
}

.field {
  margin-bottom: 24px;
}

.field-label {
  display: block;
  margin: 0 0 6px;
  font-size: 14px;
  font-weight: 600;
}

.required {
  color: var(--danger-fg);
}

.field-description {
  margin-bottom: 8px;
  font-size: 12px;
  color: var(--fg-muted);
}

.field-description p {
  margin: 0;
}

.issue-title {
  margin: 0;
  padding: 5px 12px;
  font-size: 16px;
  font-weight: 400;
  min-height: 32px;
  border: 1px solid var(--border-default);
  border-radius: var(--radius);
  background: var(--canvas-subtle);
}

.form-control,
.form-select {
  width: 100%;
  padding: 5px 12px;
  font: inherit;
  color: inherit;
  border: 1px solid var(--border-default);
  border-radius: var(--radius);
  background: var(--canvas-subtle);
}

textarea.form-control {
  min-height: 120px;
  resize: vertical;
  font-family: ui-monospace, SFMono-Regular, "SF Mono", Menlo, Consolas, monospace;
}

.checkbox-list {
  list-style: none;
  margin: 0;
  padding: 0;
}

.checkbox-list li {
  margin-bottom: 4px;
}

/* Markdown blocks */
.markdown-body {
  outline: none;
}

.markdown-body h1,
.markdown-body h2 {
  padding-bottom: 0.3em;
  border-bottom: 1px solid var(--border-muted);
}

.markdown-body code {
  padding: 0.2em 0.4em;
  font-size: 85%;
  border-radius: var(--radius);
  background: var(--canvas-subtle);
}

.markdown-body pre {
  padding: 16px;
  overflow: auto;
  border-radius: var(--radius);
  background: var(--canvas-subtle);
}

.markdown-body a {
  color: var(--accent-fg);
}

/* Sidebar */
.sidebar-section {
  padding: 16px 0;
  border-bottom: 1px solid var(--border-muted);
  color: var(--fg-muted);
}

.sidebar-heading {
  display: block;
  margin-bottom: 8px;
  font-size: 12px;
  font-weight: 600;
  color: var(--fg-muted);
}

.sidebar-item {
  display: block;
  color: var(--fg-default);
}

.issue-label {
  display: inline-block;
  margin: 0 4px 4px 0;
  padding: 0 7px;
  font-size: 12px;
  font-weight: 500;
  line-height: 18px;
  border: 1px solid var(--border-default);
  border-radius: 2em;
}

/* Toolbar */
.toolbar {
  grid-column: 1 / -1;
  display: flex;
  align-items: center;
  gap: 12px;
}

.export-button {
  padding: 5px 16px;
  font: inherit;
  font-weight: 500;
  color: #ffffff;
  border: 1px solid rgba(31, 35, 40, 0.15);
  border-radius: var(--radius);
  background: var(--success-bg);
  cursor: pointer;
}

.export-status {
  color: var(--fg-muted);
}
"#;

const CLIENT_JS: &str = r#"
(function() {
  'use strict';

  var lastToken = null;

  function poll() {
    fetch('/reload.txt?t=' + Date.now(), { cache: 'no-store' })
      .then(function(res) { return res.ok ? res.text() : null; })
      .then(function(token) {
        if (token === null) {
          return;
        }
        if (lastToken !== null && token !== lastToken) {
          location.reload();
          return;
        }
        lastToken = token;
      })
      .catch(function() {});
  }

  // Copy live form state into attributes so outerHTML carries the edits.
  function syncFormState(root) {
    root.querySelectorAll('input').forEach(function(el) {
      if (el.type === 'checkbox') {
        if (el.checked) {
          el.setAttribute('checked', '');
        } else {
          el.removeAttribute('checked');
        }
      } else {
        el.setAttribute('value', el.value);
      }
    });
    root.querySelectorAll('textarea').forEach(function(el) {
      el.textContent = el.value;
    });
    root.querySelectorAll('select option').forEach(function(el) {
      if (el.selected) {
        el.setAttribute('selected', '');
      } else {
        el.removeAttribute('selected');
      }
    });
  }

  function exportMarkdown() {
    var status = document.getElementById('export-status-no-export');
    syncFormState(document);

    fetch('/export', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify({ html: document.documentElement.outerHTML })
    })
      .then(function(res) { return res.json(); })
      .then(function(result) {
        status.textContent = result.success
          ? 'Exported to ' + result.path
          : 'Export failed: ' + result.message;
      })
      .catch(function(e) {
        status.textContent = 'Export failed: ' + e;
      });
  }

  var button = document.getElementById('export-button-no-export');
  if (button) {
    button.addEventListener('click', exportMarkdown);
  }

  poll();
  setInterval(poll, 1000);
})();
"#;
