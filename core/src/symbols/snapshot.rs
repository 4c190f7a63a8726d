//! Per-file symbol snapshots.
//!
//! Each tracked file keeps two snapshots: the open-time baseline, captured
//! once when the file is first observed, and the most recent successful
//! parse-on-save, stamped with the instant it was taken. The save stamp
//! drives debouncing: a file whose last parse is younger than the
//! staleness window is not re-parsed.

use super::{Symbol, SymbolSnapshot};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Minimum interval between two re-parses of the same file.
pub const DEFAULT_STALENESS_WINDOW: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone)]
struct SavedSnapshot {
    snapshot: Arc<SymbolSnapshot>,
    saved_at: Instant,
    generation: u64,
}

#[derive(Debug, Default)]
struct FileSnapshots {
    open: Option<Arc<SymbolSnapshot>>,
    last_saved: Option<SavedSnapshot>,
    /// Logical clock value of the last write, for LRU eviction.
    last_touched: u64,
}

/// Holds open-time and last-saved snapshots for every observed file.
///
/// Keys are normalized path strings (see [`crate::paths::normalize_path`]).
#[derive(Debug)]
pub struct SnapshotStore {
    files: HashMap<String, FileSnapshots>,
    staleness_window: Duration,
    capacity: Option<usize>,
    clock: u64,
    saves: u64,
}

impl SnapshotStore {
    /// Create an empty store. `capacity` bounds the number of tracked files;
    /// `None` keeps every file for the lifetime of the store.
    pub fn new(staleness_window: Duration, capacity: Option<usize>) -> Self {
        Self {
            files: HashMap::new(),
            staleness_window,
            capacity,
            clock: 0,
            saves: 0,
        }
    }

    pub fn staleness_window(&self) -> Duration {
        self.staleness_window
    }

    fn touch(&mut self, file_path: &str) -> &mut FileSnapshots {
        self.clock += 1;
        let clock = self.clock;
        let entry = self.files.entry(file_path.to_owned()).or_default();
        entry.last_touched = clock;
        entry
    }

    /// Record the open-time baseline for a file.
    ///
    /// Returns `false` without touching anything if a baseline already exists.
    pub fn record_open(&mut self, file_path: &str, symbols: Vec<Symbol>) -> bool {
        if self.has_baseline(file_path) {
            return false;
        }
        self.touch(file_path).open = Some(Arc::new(SymbolSnapshot::new(symbols)));
        true
    }

    pub fn has_baseline(&self, file_path: &str) -> bool {
        self.files
            .get(file_path)
            .is_some_and(|entry| entry.open.is_some())
    }

    pub fn open_baseline(&self, file_path: &str) -> Option<Arc<SymbolSnapshot>> {
        self.files.get(file_path)?.open.clone()
    }

    pub fn last_saved(&self, file_path: &str) -> Option<(Arc<SymbolSnapshot>, Instant)> {
        let saved = self.files.get(file_path)?.last_saved.as_ref()?;
        Some((Arc::clone(&saved.snapshot), saved.saved_at))
    }

    /// Overwrite the last-saved snapshot for a file. Returns the new save
    /// generation, unique across the store.
    pub fn put_last_saved(
        &mut self,
        file_path: &str,
        symbols: Vec<Symbol>,
        saved_at: Instant,
    ) -> u64 {
        self.saves += 1;
        let generation = self.saves;
        self.touch(file_path).last_saved = Some(SavedSnapshot {
            snapshot: Arc::new(SymbolSnapshot::new(symbols)),
            saved_at,
            generation,
        });
        generation
    }

    /// Generation of the file's last-saved snapshot. Changes on every
    /// `put_last_saved`, so a caller holding an older value knows the
    /// snapshot was replaced in the meantime.
    pub fn saved_generation(&self, file_path: &str) -> Option<u64> {
        Some(self.files.get(file_path)?.last_saved.as_ref()?.generation)
    }

    /// True if the file has never been parsed on save, or its last parse
    /// is older than the staleness window. A zero window is always stale.
    pub fn is_stale(&self, file_path: &str, now: Instant) -> bool {
        if self.staleness_window.is_zero() {
            return true;
        }
        match self.files.get(file_path).and_then(|e| e.last_saved.as_ref()) {
            Some(saved) => now.saturating_duration_since(saved.saved_at) > self.staleness_window,
            None => true,
        }
    }

    /// Drop everything known about a file.
    pub fn forget(&mut self, file_path: &str) -> bool {
        self.files.remove(file_path).is_some()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Evict least-recently-written files until the store fits its capacity.
    ///
    /// Files in `pinned` are never evicted, so the store may stay over
    /// capacity when every remaining file is pinned. Returns evicted paths.
    pub fn enforce_capacity(&mut self, pinned: &HashSet<String>) -> Vec<String> {
        let Some(capacity) = self.capacity else {
            return Vec::new();
        };
        if self.files.len() <= capacity {
            return Vec::new();
        }

        let mut candidates: Vec<(u64, String)> = self
            .files
            .iter()
            .filter(|(path, _)| !pinned.contains(*path))
            .map(|(path, entry)| (entry.last_touched, path.clone()))
            .collect();
        candidates.sort();

        let excess = self.files.len() - capacity;
        let mut evicted = Vec::new();
        for (_, path) in candidates.into_iter().take(excess) {
            self.files.remove(&path);
            log::debug!("[snapshot] Evicted {path}");
            evicted.push(path);
        }
        evicted
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(DEFAULT_STALENESS_WINDOW, None)
    }
}
