//! File watcher for index metadata.
//!
//! Stands in for a control plane: watches the index metadata file and emits
//! an event through a tokio watch channel whenever it changes. The parent
//! directory is watched so that editors which replace the file on save are
//! still seen. Rapid changes are coalesced by the debouncer.

use notify_debouncer_mini::{DebouncedEventKind, new_debouncer};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// How often the background task checks whether the handle was dropped.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Event emitted when the watched metadata file changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataChangeEvent {
    /// The metadata file was written, created or replaced
    Changed(PathBuf),
    /// Watcher encountered an error
    Error(String),
}

impl MetadataChangeEvent {
    /// Returns true if this event should trigger a settings update.
    pub fn requires_reload(&self) -> bool {
        matches!(self, MetadataChangeEvent::Changed(_))
    }
}

/// Configuration for the file watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Debounce duration for coalescing rapid changes.
    pub debounce_duration: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(500),
        }
    }
}

/// Handle to a running metadata watcher.
pub struct MetadataWatcherHandle {
    /// Receiver for change events.
    pub events: watch::Receiver<Option<MetadataChangeEvent>>,
    /// Background task; it exits once `events` and every clone are dropped.
    task: tokio::task::JoinHandle<()>,
}

impl MetadataWatcherHandle {
    /// Wait for the next change event. Returns `None` once the watcher stops.
    pub async fn wait_for_change(&mut self) -> Option<MetadataChangeEvent> {
        // Skip the initial None value
        loop {
            if self.events.changed().await.is_err() {
                return None;
            }
            let event = self.events.borrow_and_update().clone();
            if event.is_some() {
                return event;
            }
        }
    }

    /// Stop watching and wait for the background task to finish.
    pub async fn stop(self) {
        drop(self.events);
        if let Err(e) = self.task.await {
            error!("Metadata watcher task failed: {}", e);
        }
    }
}

/// Start watching `path` for changes.
///
/// The watcher runs until the returned handle is dropped.
///
/// # Example
/// ```ignore
/// let mut handle = start_metadata_watcher(&path, WatcherConfig::default())?;
/// while let Some(event) = handle.wait_for_change().await {
///     if event.requires_reload() {
///         let metadata = IndexMetadata::load(&path)?;
///         settings.apply_update(metadata)?;
///     }
/// }
/// ```
pub fn start_metadata_watcher(
    path: &Path,
    config: WatcherConfig,
) -> Result<MetadataWatcherHandle, notify::Error> {
    let (event_tx, event_rx) = watch::channel(None);
    let (notify_tx, notify_rx) = mpsc::channel();

    let mut debouncer = new_debouncer(config.debounce_duration, notify_tx)?;

    let target = path.to_path_buf();
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    info!("Watching index metadata: {}", target.display());
    debouncer
        .watcher()
        .watch(&dir, notify::RecursiveMode::NonRecursive)?;

    let task_handle = tokio::task::spawn_blocking(move || {
        // Keep the debouncer alive
        let _debouncer = debouncer;
        process_notify_events(notify_rx, event_tx, &target);
    });

    Ok(MetadataWatcherHandle {
        events: event_rx,
        task: task_handle,
    })
}

fn process_notify_events(
    rx: mpsc::Receiver<Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>>,
    tx: watch::Sender<Option<MetadataChangeEvent>>,
    target: &Path,
) {
    loop {
        match rx.recv_timeout(SHUTDOWN_POLL_INTERVAL) {
            Ok(Ok(events)) => {
                if let Some(event) = classify_events(&events, target) {
                    debug!("Index metadata change detected: {:?}", event);
                    if tx.send(Some(event)).is_err() {
                        info!("Metadata watcher receiver dropped, stopping");
                        return;
                    }
                }
            }
            Ok(Err(e)) => {
                error!("File watcher error: {}", e);
                let _ = tx.send(Some(MetadataChangeEvent::Error(e.to_string())));
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if tx.is_closed() {
                    info!("Metadata watcher handle dropped, stopping");
                    return;
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                info!("Metadata watcher channel closed, stopping");
                return;
            }
        }
    }
}

/// Collapse a debounced batch into at most one event for `target`.
fn classify_events(
    events: &[notify_debouncer_mini::DebouncedEvent],
    target: &Path,
) -> Option<MetadataChangeEvent> {
    let changed = events
        .iter()
        .filter(|e| {
            matches!(
                e.kind,
                DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
            )
        })
        .map(|e| e.path.as_path());
    classify_paths(changed, target)
}

fn classify_paths<'a>(
    paths: impl IntoIterator<Item = &'a Path>,
    target: &Path,
) -> Option<MetadataChangeEvent> {
    paths
        .into_iter()
        .find(|p| is_target(p, target))
        .map(|_| MetadataChangeEvent::Changed(target.to_path_buf()))
}

/// Events carry absolute paths while the target may be relative, so compare
/// file names and fall back to full paths only when both are absolute.
fn is_target(path: &Path, target: &Path) -> bool {
    if path.is_absolute() && target.is_absolute() {
        return path == target;
    }
    path.file_name().is_some() && path.file_name() == target.file_name()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_paths_are_reported_once() {
        let target = PathBuf::from("/etc/index/logs.yaml");
        let paths = [Path::new("/etc/index/logs.yaml"), Path::new("/etc/index/logs.yaml")];
        assert_eq!(
            classify_paths(paths, &target),
            Some(MetadataChangeEvent::Changed(target.clone()))
        );
    }

    #[test]
    fn test_other_files_are_ignored() {
        let target = PathBuf::from("/etc/index/logs.yaml");
        let paths = [Path::new("/etc/index/metrics.yaml"), Path::new("/etc/index/.logs.yaml.swp")];
        assert_eq!(classify_paths(paths, &target), None);
    }

    #[test]
    fn test_relative_target_matches_by_file_name() {
        assert!(is_target(Path::new("/work/logs.yaml"), Path::new("logs.yaml")));
        assert!(!is_target(Path::new("/work/other.yaml"), Path::new("logs.yaml")));
    }

    #[test]
    fn test_loop_stops_when_handle_is_dropped() {
        let (notify_tx, notify_rx) = mpsc::channel();
        let (event_tx, event_rx) = watch::channel(None);
        drop(event_rx);

        let (done_tx, done_rx) = mpsc::channel();
        std::thread::spawn(move || {
            process_notify_events(notify_rx, event_tx, Path::new("/etc/index/logs.yaml"));
            let _ = done_tx.send(());
        });

        // The notify side stays open, as it does while the debouncer lives.
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
        drop(notify_tx);
    }

    #[tokio::test]
    async fn test_stop_ends_watcher_task() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs.yaml");
        std::fs::write(&path, "index: logs\n").unwrap();

        let handle = start_metadata_watcher(&path, WatcherConfig::default()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle.stop())
            .await
            .expect("watcher task did not stop");
    }

    #[test]
    fn test_event_requires_reload() {
        assert!(MetadataChangeEvent::Changed(PathBuf::new()).requires_reload());
        assert!(!MetadataChangeEvent::Error("test".to_string()).requires_reload());
    }
}
