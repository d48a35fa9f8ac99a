//! Configuration file (issue-preview.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use issue_preview_render::RenderConfig;
use issue_preview_server::WatchBackend;
use serde::Deserialize;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "issue-preview.toml";

#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub watch: WatchSettings,
    #[serde(default)]
    pub export: ExportSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_open")]
    pub open: bool,
    pub browser: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            open: default_open(),
            browser: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RenderSettings {
    /// Custom page template
    pub template: Option<PathBuf>,
    /// Custom stylesheet
    pub stylesheet: Option<PathBuf>,
    #[serde(default)]
    pub minify: bool,
}

impl RenderSettings {
    pub fn to_render_config(&self) -> RenderConfig {
        RenderConfig {
            template: self.template.clone(),
            stylesheet: self.stylesheet.clone(),
            minify: self.minify,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WatchSettings {
    #[serde(default)]
    pub backend: WatchBackend,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            backend: WatchBackend::default(),
            interval_ms: default_interval_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ExportSettings {
    pub output: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_open() -> bool {
    true
}
fn default_interval_ms() -> u64 {
    1000
}

/// Load configuration.
///
/// A missing default config file yields the defaults; an explicitly named
/// file must exist. A malformed file is always an error.
pub fn load_config(explicit: Option<&Path>) -> Result<ConfigFile> {
    let path = explicit.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));

    if !path.exists() {
        if explicit.is_some() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = parse_config(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    tracing::info!("Loaded config from {}", path.display());

    Ok(config)
}

fn parse_config(content: &str) -> Result<ConfigFile> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse_config("").unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert!(config.server.open);
        assert_eq!(config.watch.backend, WatchBackend::Poll);
        assert_eq!(config.watch.interval_ms, 1000);
        assert!(config.export.output.is_none());
    }

    #[test]
    fn reads_every_section() {
        let config = parse_config(
            r#"
[server]
port = 9000
open = false
browser = "firefox"

[render]
template = "form.html"
minify = true

[watch]
backend = "notify"
interval_ms = 250

[export]
output = "issue.md"
"#,
        )
        .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert!(!config.server.open);
        assert_eq!(config.server.browser.as_deref(), Some("firefox"));
        assert_eq!(config.render.template, Some(PathBuf::from("form.html")));
        assert!(config.render.to_render_config().minify);
        assert_eq!(config.watch.backend, WatchBackend::Notify);
        assert_eq!(config.watch.interval_ms, 250);
        assert_eq!(config.export.output, Some(PathBuf::from("issue.md")));
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(parse_config("[watch]\nbackend = \"inotify\"\n").is_err());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("issue-preview.toml");
        fs::write(&path, "[server\nport = ").unwrap();

        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let temp = tempdir().unwrap();

        assert!(load_config(Some(&temp.path().join("nope.toml"))).is_err());
    }
}
