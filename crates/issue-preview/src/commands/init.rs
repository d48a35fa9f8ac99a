//! Create a sample issue form and config file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::DEFAULT_CONFIG_FILE;

const SAMPLE_FORM: &str = "issue_template.yml";

/// Run the init command in `dir`.
pub async fn run(dir: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing issue-preview...");

    write_unless_present(&dir.join(SAMPLE_FORM), DEFAULT_FORM, yes)?;
    write_unless_present(&dir.join(DEFAULT_CONFIG_FILE), DEFAULT_CONFIG, yes)?;

    tracing::info!("Run 'issue-preview preview {}' to start previewing.", SAMPLE_FORM);

    Ok(())
}

fn write_unless_present(path: &Path, contents: &str, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        tracing::warn!("{} already exists. Use --yes to overwrite.", path.display());
        return Ok(());
    }

    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Created {}", path.display());

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# issue-preview configuration

[server]
host = "127.0.0.1"
port = 8000
# Open the preview in a browser on start
open = true
# browser = "firefox"

[render]
# Custom template and stylesheet
# template = "form.html"
# stylesheet = "form.css"
minify = false

[watch]
# "poll" or "notify"
backend = "poll"
interval_ms = 1000

[export]
# Defaults to <form>.md beside the form
# output = "issue.md"
"#;

const DEFAULT_FORM: &str = r#"name: Bug report
description: File a bug report
title: "[Bug]: "
labels: ["bug", "triage"]
assignees:
  - octocat
body:
  - type: markdown
    attributes:
      value: |
        Thanks for taking the time to fill out this bug report!

        Before you start:

        1. Search the existing issues.
        2. Update to the latest release.
  - type: input
    id: contact
    attributes:
      label: Contact details
      description: How can we get in touch with you if we need more info?
      placeholder: ex. email@example.com
    validations:
      required: false
  - type: textarea
    id: what-happened
    attributes:
      label: What happened?
      description: Also tell us, what did you expect to happen?
      placeholder: Tell us what you see!
      value: "A bug happened!"
    validations:
      required: true
  - type: dropdown
    id: version
    attributes:
      label: Version
      description: What version of our software are you running?
      options:
        - 1.0.2 (Default)
        - 1.0.3 (Edge)
      default: 0
    validations:
      required: true
  - type: textarea
    id: logs
    attributes:
      label: Relevant log output
      description: Please copy and paste any relevant log output.
      render: shell
  - type: checkboxes
    id: terms
    attributes:
      label: Code of Conduct
      description: By submitting this issue, you agree to follow our Code of Conduct.
      options:
        - label: I agree to follow this project's Code of Conduct
          required: true
"#;
