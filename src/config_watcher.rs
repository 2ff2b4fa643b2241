//! Config file hot-reload
//!
//! Watches the configuration file and applies changes to the running
//! session, so the effect table can be tuned against a live device without
//! restarting.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::session::{lock_session, SharedTriggerSession};
use crate::transport::TriggerTransport;

/// Wait for editors to finish writing before reloading (milliseconds)
const RELOAD_DEBOUNCE_MS: u64 = 100;

/// Running config watcher
///
/// Dropping it stops watching.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl ConfigWatcher {
    /// Start watching `path` and apply reloads to `session`
    ///
    /// The parent directory is watched so that editors replacing the file
    /// are picked up. Must be called from within a tokio runtime.
    pub fn spawn<T>(path: PathBuf, session: SharedTriggerSession<T>) -> Result<Self, notify::Error>
    where
        T: TriggerTransport + Send + 'static,
    {
        let dir = path
            .parent()
            .filter(|p| p.is_dir())
            .map(Path::to_path_buf)
            .ok_or_else(|| notify::Error::generic("config directory does not exist"))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| notify::Error::generic("config path has no file name"))?;

        // Capacity 1: a pending reload already covers later events
        let (tx, mut rx) = mpsc::channel::<()>(1);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if is_config_event(&event, &file_name) {
                    let _ = tx.try_send(());
                }
            }
            Err(e) => tracing::debug!(error = %e, "Config watch error"),
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), "Watching configuration for changes");

        let task = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                tokio::time::sleep(Duration::from_millis(RELOAD_DEBOUNCE_MS)).await;
                while rx.try_recv().is_ok() {}

                reload_into(&path, &session);
            }
        });

        Ok(Self {
            _watcher: watcher,
            task,
        })
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn is_config_event(event: &Event, file_name: &OsString) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

/// Reload the config file and apply it to the session
///
/// Returns true if the new config was applied. A file that fails to load
/// leaves the session on its previous settings.
pub fn reload_into<T: TriggerTransport>(path: &Path, session: &SharedTriggerSession<T>) -> bool {
    match Config::load(path) {
        Ok(config) => {
            lock_session(session).update_from_config(&config);
            tracing::info!(
                path = %path.display(),
                enabled = config.triggers.enabled,
                weapon_types = config.effects.entries.len(),
                "Configuration reloaded"
            );
            true
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to reload config, keeping previous settings"
            );
            false
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
