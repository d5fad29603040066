//! # Configuration Hot Reload
//!
//! Watches the acquisition configuration file and emits reload events.
//!
//! The parent directory is watched rather than the file itself so that the
//! file may be deleted, recreated or atomically replaced without losing the
//! watch.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Configuration reload event.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigReloadEvent {
    /// The watch is established
    Ready,

    /// Configuration file content may have changed
    Changed(PathBuf),

    /// Configuration file was removed or renamed away
    Removed(PathBuf),

    /// Configuration file was created
    Created(PathBuf),

    /// The watch itself failed
    Error { path: PathBuf, error: String },
}

/// Errors establishing a configuration watch.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Configuration path has no file name: {0}")]
    NoFileName(String),

    #[error("Configuration directory not found: {0}")]
    DirectoryNotFound(String),
}

/// Watch a configuration file for changes and emit reload events.
///
/// ## Usage
/// ```rust,no_run
/// use config::{ConfigReloadEvent, watch_config};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut rx = watch_config(std::path::Path::new("tags.csv")).await?;
///     while let Some(event) = rx.recv().await {
///         if let ConfigReloadEvent::Changed(path) = event {
///             println!("Config changed: {}", path.display());
///         }
///     }
///     Ok(())
/// }
/// ```
///
/// The file does not need to exist yet; its directory does. The watch stops
/// when the receiver is dropped.
pub async fn watch_config(
    config_path: &Path,
) -> Result<mpsc::Receiver<ConfigReloadEvent>, WatchError> {
    let config_path = config_path.to_path_buf();
    let file_name = config_path
        .file_name()
        .map(OsString::from)
        .ok_or_else(|| WatchError::NoFileName(config_path.display().to_string()))?;
    let directory = match config_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !directory.is_dir() {
        return Err(WatchError::DirectoryNotFound(
            directory.display().to_string(),
        ));
    }

    let (tx, rx) = mpsc::channel(100);

    tokio::spawn(async move {
        let (event_tx, mut event_rx) = mpsc::channel(100);
        let mut watcher = match RecommendedWatcher::new(
            move |res| {
                let _ = event_tx.blocking_send(res);
            },
            notify::Config::default(),
        ) {
            Ok(w) => w,
            Err(e) => {
                let error_msg = format!("Failed to create file watcher: {}", e);
                error!("{}", error_msg);
                let _ = tx
                    .send(ConfigReloadEvent::Error {
                        path: config_path,
                        error: error_msg,
                    })
                    .await;
                return;
            }
        };

        if let Err(e) = watcher.watch(&directory, RecursiveMode::NonRecursive) {
            let error_msg = format!("Failed to watch configuration directory: {}", e);
            error!("{}", error_msg);
            let _ = tx
                .send(ConfigReloadEvent::Error {
                    path: config_path,
                    error: error_msg,
                })
                .await;
            return;
        }

        info!(path = %config_path.display(), "Watching configuration file");

        if tx.send(ConfigReloadEvent::Ready).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                _ = tx.closed() => {
                    debug!(path = %config_path.display(), "Receiver dropped, stopping watcher");
                    break;
                }
                event_result = event_rx.recv() => {
                    let Some(event_result) = event_result else {
                        break;
                    };

                    match event_result {
                        Ok(event) => {
                            let Some(reload_event) = classify(&event, &file_name, &config_path) else {
                                continue;
                            };
                            if let Err(e) = tx.send(reload_event).await {
                                error!("Failed to send config reload event: {}", e);
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Watch error: {}", e);
                        }
                    }
                }
            }
        }
    });

    Ok(rx)
}

/// Map a raw filesystem event on the watched directory to a reload event for
/// the configuration file, ignoring events on sibling files.
fn classify(event: &Event, file_name: &OsString, config_path: &Path) -> Option<ConfigReloadEvent> {
    let touches_config = event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name.as_os_str()));
    if !touches_config {
        return None;
    }

    let path = config_path.to_path_buf();
    match event.kind {
        EventKind::Create(_) => {
            info!(path = %path.display(), "Configuration file created");
            Some(ConfigReloadEvent::Created(path))
        }
        EventKind::Remove(_) => {
            warn!(path = %path.display(), "Configuration file removed");
            Some(ConfigReloadEvent::Removed(path))
        }
        EventKind::Modify(_) => {
            if config_path.exists() {
                debug!(path = %path.display(), "Configuration file updated");
                Some(ConfigReloadEvent::Changed(path))
            } else {
                warn!(path = %path.display(), "Configuration file moved away");
                Some(ConfigReloadEvent::Removed(path))
            }
        }
        _ => {
            debug!("Ignoring event: {:?}", event.kind);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use std::fs;
    use tokio::time::Duration;

    async fn next_event(rx: &mut mpsc::Receiver<ConfigReloadEvent>) -> ConfigReloadEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("Timeout waiting for event")
            .expect("No event received")
    }

    #[test]
    fn test_classify_ignores_sibling_files() {
        let config_path = PathBuf::from("/etc/tagbridge/tags.csv");
        let file_name = OsString::from("tags.csv");
        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/etc/tagbridge/other.csv"));
        assert_eq!(classify(&event, &file_name, &config_path), None);
    }

    #[test]
    fn test_classify_create_and_remove() {
        let config_path = PathBuf::from("/etc/tagbridge/tags.csv");
        let file_name = OsString::from("tags.csv");

        let created = Event::new(EventKind::Create(CreateKind::File))
            .add_path(config_path.clone());
        assert_eq!(
            classify(&created, &file_name, &config_path),
            Some(ConfigReloadEvent::Created(config_path.clone()))
        );

        let removed = Event::new(EventKind::Remove(RemoveKind::File))
            .add_path(config_path.clone());
        assert_eq!(
            classify(&removed, &file_name, &config_path),
            Some(ConfigReloadEvent::Removed(config_path.clone()))
        );
    }

    #[test]
    fn test_classify_modify_of_missing_file_is_removal() {
        let config_path = PathBuf::from("/nonexistent/tagbridge/tags.csv");
        let file_name = OsString::from("tags.csv");
        let event = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(config_path.clone());
        assert_eq!(
            classify(&event, &file_name, &config_path),
            Some(ConfigReloadEvent::Removed(config_path))
        );
    }

    #[tokio::test]
    async fn test_watch_config_reports_change() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("tags.csv");
        fs::write(&config_path, "initial").unwrap();

        let mut rx = watch_config(&config_path).await.unwrap();
        assert_eq!(next_event(&mut rx).await, ConfigReloadEvent::Ready);

        fs::write(&config_path, "updated").unwrap();

        match next_event(&mut rx).await {
            ConfigReloadEvent::Changed(path) | ConfigReloadEvent::Created(path) => {
                assert_eq!(path, config_path);
            }
            other => panic!("Expected Changed event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_watch_config_file_may_be_absent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("later.csv");

        let mut rx = watch_config(&config_path).await.unwrap();
        assert_eq!(next_event(&mut rx).await, ConfigReloadEvent::Ready);

        fs::write(&config_path, "created").unwrap();
        match next_event(&mut rx).await {
            ConfigReloadEvent::Created(path) | ConfigReloadEvent::Changed(path) => {
                assert_eq!(path, config_path);
            }
            other => panic!("Expected Created event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_watch_config_removed_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("tags.csv");
        fs::write(&config_path, "initial").unwrap();

        let mut rx = watch_config(&config_path).await.unwrap();
        assert_eq!(next_event(&mut rx).await, ConfigReloadEvent::Ready);

        fs::remove_file(&config_path).unwrap();

        loop {
            match next_event(&mut rx).await {
                ConfigReloadEvent::Removed(path) => {
                    assert_eq!(path, config_path);
                    break;
                }
                ConfigReloadEvent::Changed(_) => continue,
                other => panic!("Expected Removed event, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_watch_config_missing_directory() {
        let result = watch_config(Path::new("/nonexistent/dir/tags.csv")).await;
        assert!(matches!(result, Err(WatchError::DirectoryNotFound(_))));
    }
}
