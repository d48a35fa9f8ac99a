//! Change detection for the source document.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};

/// How long notify bursts are drained before a change is reported.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Errors that can occur while watching.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Failed to watch {path}: {message}")]
    Watch { path: String, message: String },

    #[error("Change source closed")]
    Closed,
}

/// A source of "the document may have changed" signals.
#[async_trait]
pub trait ChangeSource: Send {
    /// Wait until the document changes.
    ///
    /// Several changes that happen while nobody is waiting are reported once.
    async fn changed(&mut self) -> Result<(), WatchError>;
}

/// Which change source to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchBackend {
    /// Compare the modification time at a fixed interval
    #[default]
    Poll,

    /// Filesystem notifications
    Notify,
}

impl WatchBackend {
    /// Build a change source for `path`. `interval` applies to polling.
    pub fn change_source(
        self,
        path: &Path,
        interval: Duration,
    ) -> Result<Box<dyn ChangeSource>, WatchError> {
        Ok(match self {
            WatchBackend::Poll => Box::new(PollingChangeSource::new(path, interval)),
            WatchBackend::Notify => Box::new(NotifyChangeSource::new(path)?),
        })
    }
}

impl FromStr for WatchBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "poll" => Ok(WatchBackend::Poll),
            "notify" => Ok(WatchBackend::Notify),
            other => Err(format!("unknown watch backend '{}' (expected poll or notify)", other)),
        }
    }
}

/// Polls the modification time of a single file.
pub struct PollingChangeSource {
    path: PathBuf,
    interval: Interval,
    last_modified: Option<SystemTime>,
}

impl PollingChangeSource {
    /// Start polling. The current modification time counts as seen.
    pub fn new(path: &Path, every: Duration) -> Self {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            path: path.to_path_buf(),
            interval,
            last_modified: modified(path),
        }
    }
}

#[async_trait]
impl ChangeSource for PollingChangeSource {
    async fn changed(&mut self) -> Result<(), WatchError> {
        loop {
            self.interval.tick().await;

            let current = match tokio::fs::metadata(&self.path).await {
                Ok(meta) => meta.modified().ok(),
                Err(e) => {
                    // Editors often replace the file; try again next tick.
                    tracing::debug!("Skipping poll of {}: {}", self.path.display(), e);
                    continue;
                }
            };

            if current.is_some() && current != self.last_modified {
                tracing::debug!("Detected change in {}", self.path.display());
                self.last_modified = current;
                return Ok(());
            }
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Filesystem-notification change source.
///
/// Watches the parent directory rather than the file itself so that editors
/// which save by renaming a new file into place keep being tracked.
pub struct NotifyChangeSource {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<()>,
}

impl NotifyChangeSource {
    pub fn new(path: &Path) -> Result<Self, WatchError> {
        let watch_error = |e: notify::Error| WatchError::Watch {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        let file_name: OsString = path
            .file_name()
            .map(OsString::from)
            .ok_or_else(|| WatchError::Watch {
                path: path.display().to_string(),
                message: "path has no file name".to_string(),
            })?;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, rx) = mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            let Ok(event) = res else {
                return;
            };
            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                return;
            }
            if event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(file_name.as_os_str()))
            {
                // A full channel already holds a pending change.
                let _ = tx.try_send(());
            }
        })
        .map_err(watch_error)?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(watch_error)?;

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }
}

#[async_trait]
impl ChangeSource for NotifyChangeSource {
    async fn changed(&mut self) -> Result<(), WatchError> {
        self.rx.recv().await.ok_or(WatchError::Closed)?;

        // Collapse the burst a single save produces.
        while let Ok(Some(())) = tokio::time::timeout(DEBOUNCE, self.rx.recv()).await {}

        tracing::debug!("Detected change via filesystem notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const TIMEOUT: Duration = Duration::from_secs(3);

    #[test]
    fn parses_backend_names() {
        assert_eq!("poll".parse::<WatchBackend>(), Ok(WatchBackend::Poll));
        assert_eq!("notify".parse::<WatchBackend>(), Ok(WatchBackend::Notify));
        assert!("inotify".parse::<WatchBackend>().is_err());
    }

    #[tokio::test]
    async fn polling_reports_modification() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("form.yml");
        fs::write(&path, "name: one").unwrap();

        let mut source = PollingChangeSource::new(&path, Duration::from_millis(20));

        // Make sure the new mtime differs even on coarse filesystems.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        fs::write(&path, "name: two").unwrap();

        let result = tokio::time::timeout(TIMEOUT, source.changed()).await;
        assert!(matches!(result, Ok(Ok(()))), "timeout waiting for poll");
    }

    #[tokio::test]
    async fn polling_is_quiet_without_changes() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("form.yml");
        fs::write(&path, "name: one").unwrap();

        let mut source = PollingChangeSource::new(&path, Duration::from_millis(20));

        let result = tokio::time::timeout(Duration::from_millis(200), source.changed()).await;
        assert!(result.is_err(), "unchanged file should not be reported");
    }

    #[tokio::test]
    async fn polling_survives_missing_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("form.yml");

        let mut source = PollingChangeSource::new(&path, Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(60)).await;
        fs::write(&path, "name: back").unwrap();

        let result = tokio::time::timeout(TIMEOUT, source.changed()).await;
        assert!(matches!(result, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn notify_reports_writes_to_the_document() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("form.yml");
        fs::write(&path, "name: one").unwrap();

        let mut source = NotifyChangeSource::new(&path).unwrap();

        // Give inotify time to set up
        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&path, "name: two").unwrap();

        let result = tokio::time::timeout(TIMEOUT, source.changed()).await;
        assert!(matches!(result, Ok(Ok(()))), "timeout waiting for notify");
    }

    #[tokio::test]
    async fn notify_ignores_sibling_files() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("form.yml");
        fs::write(&path, "name: one").unwrap();

        let mut source = NotifyChangeSource::new(&path).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(temp.path().join("form.html"), "<p>rendered</p>").unwrap();

        let result = tokio::time::timeout(Duration::from_millis(500), source.changed()).await;
        assert!(result.is_err(), "sibling writes should not count");
    }
}
