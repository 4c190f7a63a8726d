//! The change tracker: the single entry point the editor integration talks to.
//!
//! # Locking
//!
//! The snapshot store and the ledger each sit behind their own mutex. When
//! both are needed, take the store first, then the ledger. No lock is held
//! across an `.await`, an indexer call, or patch rendering.

use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::ledger::ChangeLedger;
use crate::paths::normalize_path;
use crate::plan::assemble_plan;
use crate::sources::{GitPatchRenderer, IndexerError, IndexerRegistry, PatchRenderer};
use crate::symbols::diff::{diff_snapshots, now_millis};
use crate::symbols::files::plan_file_groups;
use crate::symbols::snapshot::SnapshotStore;
use crate::symbols::{Symbol, SymbolChange, SymbolSnapshot};
use futures::future::join_all;
use glob::Pattern;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;
use tokio::sync::Semaphore;

/// Whether the tracker accepts work yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerState {
    Uninitialized,
    Ready,
}

/// Everything a tracker is built from.
pub struct TrackerContext {
    pub config: TrackerConfig,
    pub indexers: IndexerRegistry,
    pub renderer: Arc<dyn PatchRenderer>,
}

impl TrackerContext {
    /// Context with the default git-backed patch renderer.
    pub fn new(config: TrackerConfig, indexers: IndexerRegistry) -> Self {
        Self {
            config,
            indexers,
            renderer: Arc::new(GitPatchRenderer::new()),
        }
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn PatchRenderer>) -> Self {
        self.renderer = renderer;
        self
    }
}

/// What a save event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SaveOutcome {
    /// Re-parsed and diffed; the ledger entry now holds `changes` changes.
    Updated { changes: usize },
    /// Parsed too recently; nothing was done.
    Debounced,
    /// No indexer for the file's extension.
    Unsupported,
    /// The indexer failed or timed out; cached state was kept.
    ParseFailed,
    /// Parsed, but the file has no open-time baseline to diff against.
    NoBaseline,
    /// Matches an ignored path pattern.
    Ignored,
}

enum Parsed {
    Symbols(Vec<Symbol>),
    Unsupported,
    Failed(String),
}

pub struct ChangeTracker {
    config: TrackerConfig,
    indexers: IndexerRegistry,
    renderer: Arc<dyn PatchRenderer>,
    ignored: Vec<Pattern>,
    working_directory: PathBuf,
    state: RwLock<TrackerState>,
    store: Mutex<SnapshotStore>,
    ledger: Mutex<ChangeLedger>,
}

impl ChangeTracker {
    /// Build an uninitialized tracker. Call [`mark_ready`](Self::mark_ready)
    /// before using it.
    pub fn new(ctx: TrackerContext) -> Result<Self, TrackerError> {
        let TrackerContext {
            config,
            indexers,
            renderer,
        } = ctx;
        config.validate()?;

        let cwd = std::env::current_dir()?;
        let working_directory = PathBuf::from(normalize_path(&config.working_directory, &cwd));
        let store = SnapshotStore::new(config.staleness_window(), config.max_tracked_files);

        Ok(Self {
            ignored: config.ignore_patterns(),
            config,
            indexers,
            renderer,
            working_directory,
            state: RwLock::new(TrackerState::Uninitialized),
            store: Mutex::new(store),
            ledger: Mutex::new(ChangeLedger::new()),
        })
    }

    pub fn state(&self) -> TrackerState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mark_ready(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = TrackerState::Ready;
        log::info!("[tracker] Ready in {}", self.working_directory.display());
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    fn ensure_ready(&self) -> Result<(), TrackerError> {
        match self.state() {
            TrackerState::Ready => Ok(()),
            TrackerState::Uninitialized => Err(TrackerError::NotReady),
        }
    }

    fn store(&self) -> MutexGuard<'_, SnapshotStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ledger(&self) -> MutexGuard<'_, ChangeLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The ledger key for a path.
    pub fn key_for(&self, path: &Path) -> String {
        normalize_path(path, &self.working_directory)
    }

    fn is_ignored(&self, key: &str) -> bool {
        let relative = Path::new(key)
            .strip_prefix(&self.working_directory)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .ok();
        self.ignored.iter().any(|pattern| {
            pattern.matches(key) || relative.as_deref().is_some_and(|rel| pattern.matches(rel))
        })
    }

    /// True if the path is not ignored and an indexer exists for it.
    pub fn is_tracked_path(&self, path: &Path) -> bool {
        let key = self.key_for(path);
        !self.is_ignored(&key) && self.indexers.supports(&key)
    }

    /// Record the open-time baseline for a file.
    ///
    /// Returns `false` if the file is ignored or already has a baseline; the
    /// first baseline is kept for the whole session.
    pub fn on_file_opened(&self, path: &Path, symbols: Vec<Symbol>) -> Result<bool, TrackerError> {
        self.ensure_ready()?;
        let key = self.key_for(path);
        if self.is_ignored(&key) {
            return Ok(false);
        }
        let recorded = self.store().record_open(&key, symbols);
        if recorded {
            log::debug!("[tracker] Baseline recorded for {key}");
            self.enforce_capacity();
        }
        Ok(recorded)
    }

    /// Parse a file through its indexer and record the result as its
    /// open-time baseline.
    pub async fn track_file(&self, path: &Path) -> Result<bool, TrackerError> {
        self.ensure_ready()?;
        let key = self.key_for(path);
        if self.is_ignored(&key) || self.store().has_baseline(&key) {
            return Ok(false);
        }
        match self.parse(&key, false).await {
            Parsed::Symbols(symbols) => {
                let recorded = self.store().record_open(&key, symbols);
                if recorded {
                    self.enforce_capacity();
                }
                Ok(recorded)
            }
            Parsed::Unsupported => Ok(false),
            Parsed::Failed(message) => Err(TrackerError::index(key, message)),
        }
    }

    /// Handle a save: re-parse (unless debounced), diff against the
    /// open-time baseline, and replace the file's ledger entry.
    pub async fn on_file_saved(&self, path: &Path) -> Result<SaveOutcome, TrackerError> {
        self.ensure_ready()?;
        let key = self.key_for(path);
        if self.is_ignored(&key) {
            return Ok(SaveOutcome::Ignored);
        }
        if !self.indexers.supports(&key) {
            log::debug!("[tracker] No indexer for {key}, skipping");
            return Ok(SaveOutcome::Unsupported);
        }

        let now = Instant::now();
        if !self.store().is_stale(&key, now) {
            log::debug!("[tracker] Debounced save of {key}");
            return Ok(SaveOutcome::Debounced);
        }

        if !self.store().has_baseline(&key) {
            log::warn!("[tracker] {key} was saved but never opened; no baseline to diff against");
            return Ok(SaveOutcome::NoBaseline);
        }

        let symbols = match self.parse(&key, true).await {
            Parsed::Symbols(symbols) => symbols,
            Parsed::Unsupported => return Ok(SaveOutcome::Unsupported),
            Parsed::Failed(message) => {
                log::warn!("[tracker] Parse failed for {key}, keeping cached snapshot: {message}");
                return Ok(SaveOutcome::ParseFailed);
            }
        };

        let (baseline, current, generation) = {
            let mut store = self.store();
            // The file may have been forgotten or evicted while parsing.
            let Some(baseline) = store.open_baseline(&key) else {
                log::warn!("[tracker] {key} lost its baseline while parsing");
                return Ok(SaveOutcome::NoBaseline);
            };
            let generation = store.put_last_saved(&key, symbols, now);
            let Some((current, _)) = store.last_saved(&key) else {
                return Ok(SaveOutcome::ParseFailed);
            };
            (baseline, current, generation)
        };

        let Some(changes) = self.diff_file(&key, baseline, current).await else {
            return Ok(SaveOutcome::ParseFailed);
        };
        let count = changes.len();
        {
            let store = self.store();
            if store.saved_generation(&key) == Some(generation) {
                self.ledger().replace(&key, changes);
            } else {
                log::debug!("[tracker] A newer save of {key} landed first, dropping this diff");
            }
        }
        self.enforce_capacity();
        Ok(SaveOutcome::Updated { changes: count })
    }

    /// Re-diff every pending file against its open-time baseline, then
    /// cluster, order, and label the result.
    ///
    /// Files that fail to parse, lost their indexer, or have no baseline are
    /// logged and left out; they never fail the whole plan. A save that
    /// lands while the plan is parsing wins: its snapshot is used instead of
    /// the plan's own parse, and its ledger entry is never overwritten with
    /// an older diff.
    pub async fn build_change_plan(&self) -> Result<Vec<SymbolChange>, TrackerError> {
        self.ensure_ready()?;
        let files = self.ledger().pending_files();
        let stamped: Vec<(String, Option<u64>)> = {
            let store = self.store();
            files
                .into_iter()
                .map(|file| {
                    let generation = store.saved_generation(&file);
                    (file, generation)
                })
                .collect()
        };
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_parses));

        let parses = stamped.into_iter().map(|(file, generation)| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await.ok();
                let parsed = self.parse(&file, true).await;
                (file, generation, parsed)
            }
        });
        let results = join_all(parses).await;

        let mut refreshed: Vec<(String, u64)> = Vec::new();
        let mut all_changes = Vec::new();
        for (file, seen_generation, parsed) in results {
            let (baseline, current, generation) = {
                let mut store = self.store();
                let Some(baseline) = store.open_baseline(&file) else {
                    log::warn!("[tracker] {file} has no open-time baseline, left out of plan");
                    continue;
                };
                let latest = store.saved_generation(&file);
                let generation = match (parsed, latest) {
                    (_, Some(latest)) if Some(latest) != seen_generation => {
                        log::debug!("[tracker] {file} was saved during planning, using that save");
                        latest
                    }
                    (Parsed::Symbols(symbols), _) => {
                        store.put_last_saved(&file, symbols, Instant::now())
                    }
                    (Parsed::Unsupported, _) => {
                        log::debug!("[tracker] No indexer for {file}, left out of plan");
                        continue;
                    }
                    (Parsed::Failed(message), _) => {
                        log::warn!("[tracker] Parse failed for {file}, left out of plan: {message}");
                        continue;
                    }
                };
                let Some((current, _)) = store.last_saved(&file) else {
                    continue;
                };
                (baseline, current, generation)
            };

            if let Some(changes) = self.diff_file(&file, baseline, current).await {
                all_changes.extend(changes);
                refreshed.push((file, generation));
            }
        }

        let plan = assemble_plan(all_changes);

        {
            let store = self.store();
            let mut ledger = self.ledger();
            for (file, generation) in &refreshed {
                if store.saved_generation(file) != Some(*generation) {
                    log::debug!("[tracker] {file} was saved during planning, keeping its entry");
                    continue;
                }
                let changes: Vec<SymbolChange> = plan
                    .iter()
                    .filter(|c| &c.file_path == file)
                    .cloned()
                    .collect();
                ledger.replace(file, changes);
            }
        }

        log::info!(
            "[tracker] Planned {} changes across {} files",
            plan.len(),
            refreshed.len()
        );
        Ok(plan)
    }

    /// Which files would be committed together for `changes`.
    pub fn plan_file_groups(&self, changes: &[SymbolChange]) -> Vec<Vec<String>> {
        plan_file_groups(changes)
    }

    /// The ledger entry for a file.
    pub fn changes_for(&self, path: &Path) -> Result<Vec<SymbolChange>, TrackerError> {
        self.ensure_ready()?;
        let key = self.key_for(path);
        Ok(self.ledger().get(&key).map(<[_]>::to_vec).unwrap_or_default())
    }

    /// Files with pending changes, sorted.
    pub fn pending_files(&self) -> Result<Vec<String>, TrackerError> {
        self.ensure_ready()?;
        Ok(self.ledger().pending_files())
    }

    /// Drop a file's snapshots and ledger entry.
    pub fn forget_file(&self, path: &Path) -> Result<bool, TrackerError> {
        self.ensure_ready()?;
        let key = self.key_for(path);
        let mut store = self.store();
        let had_snapshots = store.forget(&key);
        let had_changes = self.ledger().remove(&key).is_some();
        Ok(had_snapshots || had_changes)
    }

    async fn parse(&self, key: &str, force_refresh: bool) -> Parsed {
        let Some(indexer) = self.indexers.for_path(key) else {
            return Parsed::Unsupported;
        };
        let path = PathBuf::from(key);
        let working_directory = self.working_directory.clone();
        let task = tokio::task::spawn_blocking(move || {
            indexer.parse_file(&path, &working_directory, force_refresh)
        });

        let timeout = self.config.parse_timeout();
        match tokio::time::timeout(timeout, task).await {
            Err(_) => Parsed::Failed(format!("timed out after {}ms", timeout.as_millis())),
            Ok(Err(e)) => Parsed::Failed(format!("Task join error: {e}")),
            Ok(Ok(Err(IndexerError::Unsupported { .. }))) => Parsed::Unsupported,
            Ok(Ok(Err(e))) => Parsed::Failed(e.to_string()),
            Ok(Ok(Ok(symbols))) => Parsed::Symbols(symbols),
        }
    }

    /// Diff on a blocking thread; patch rendering may shell out.
    async fn diff_file(
        &self,
        key: &str,
        baseline: Arc<SymbolSnapshot>,
        current: Arc<SymbolSnapshot>,
    ) -> Option<Vec<SymbolChange>> {
        let renderer = Arc::clone(&self.renderer);
        let file = key.to_owned();
        let timestamp = now_millis();
        let task = tokio::task::spawn_blocking(move || {
            diff_snapshots(&file, &baseline, &current, renderer.as_ref(), timestamp)
        });
        match task.await {
            Ok(changes) => Some(changes),
            Err(e) => {
                log::warn!("[tracker] Diff failed for {key}: {e}");
                None
            }
        }
    }

    fn enforce_capacity(&self) {
        let mut store = self.store();
        let pinned = self.ledger().pending_set();
        let evicted = store.enforce_capacity(&pinned);
        if !evicted.is_empty() {
            log::debug!("[tracker] Evicted {} file snapshot(s)", evicted.len());
        }
    }
}
