//! Filesystem watcher that turns debounced writes into save events.
//!
//! For hosts without an editor save hook. Events arrive on the debouncer's
//! thread and are forwarded to the tracker on the given tokio runtime.

use crate::error::TrackerError;
use crate::tracker::{ChangeTracker, SaveOutcome};
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind, Debouncer};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

const DEBOUNCE: Duration = Duration::from_millis(200);

/// Watches a directory tree. Dropping it stops watching.
pub struct SaveWatcher {
    root: PathBuf,
    _debouncer: Debouncer<notify::RecommendedWatcher>,
}

impl SaveWatcher {
    pub fn start(
        tracker: Arc<ChangeTracker>,
        root: &Path,
        runtime: Handle,
    ) -> Result<Self, TrackerError> {
        let root = root.to_path_buf();
        let root_for_log = root.display().to_string();

        let mut debouncer = new_debouncer(
            DEBOUNCE,
            move |result: Result<Vec<DebouncedEvent>, notify::Error>| match result {
                Ok(events) => {
                    for path in saved_paths(events) {
                        if !tracker.is_tracked_path(&path) {
                            continue;
                        }
                        let tracker = Arc::clone(&tracker);
                        runtime.spawn(async move {
                            match tracker.on_file_saved(&path).await {
                                Ok(SaveOutcome::Updated { changes }) => log::debug!(
                                    "[watcher] {} now has {changes} pending change(s)",
                                    path.display()
                                ),
                                Ok(_) => {}
                                Err(e) => {
                                    log::warn!("[watcher] Save of {} failed: {e}", path.display())
                                }
                            }
                        });
                    }
                }
                Err(e) => log::warn!("[watcher] Error in {root_for_log}: {e:?}"),
            },
        )
        .map_err(|e| TrackerError::watch(format!("Failed to create watcher: {e}")))?;

        debouncer
            .watcher()
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| TrackerError::watch(format!("Failed to watch {}: {e}", root.display())))?;

        log::info!("[watcher] Started file watcher for {}", root.display());
        Ok(Self {
            root,
            _debouncer: debouncer,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for SaveWatcher {
    fn drop(&mut self) {
        log::info!("[watcher] Stopped file watcher for {}", self.root.display());
    }
}

/// Existing, non-noise files touched by a batch, deduplicated and sorted.
fn saved_paths(events: Vec<DebouncedEvent>) -> BTreeSet<PathBuf> {
    events
        .into_iter()
        .filter(|event| event.kind == DebouncedEventKind::Any)
        .filter(|event| !should_ignore_path(&event.path.to_string_lossy()))
        .filter(|event| event.path.is_file())
        .map(|event| event.path)
        .collect()
}

/// Directories whose churn is never a user save.
fn should_ignore_path(path_str: &str) -> bool {
    const NOISY: [&str; 10] = [
        "/.git/",
        "/node_modules/",
        "/.venv/",
        "/__pycache__/",
        "/target/debug/",
        "/target/release/",
        "/.next/",
        "/dist/",
        "/build/",
        "/.cache/",
    ];
    let normalized = path_str.replace('\\', "/");
    NOISY.iter().any(|p| normalized.contains(p))
}
