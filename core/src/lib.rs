//! Changeplan library - symbol-level change tracking and commit planning.
//!
//! This crate provides:
//! - Open/save snapshots and symbol diffs (`symbols`)
//! - The per-file change ledger (`ledger`)
//! - Clustering, ordering, and labeling of changes (`plan`)
//! - Indexer and patch-renderer seams (`sources`)
//! - The tracker tying them together (`tracker`)
//!
//! Feature flags:
//! - `watch`: Filesystem watcher that feeds saves to the tracker

// Core modules (always compiled)
pub mod config;
pub mod error;
pub mod ledger;
pub mod paths;
pub mod plan;
pub mod sources;
pub mod symbols;
pub mod tracker;

// Save-event watcher (feature-gated)
#[cfg(feature = "watch")]
pub mod watch;

// Re-export commonly used types
pub use config::TrackerConfig;
pub use error::TrackerError;
pub use ledger::ChangeLedger;
pub use plan::assemble_plan;
pub use sources::{GitPatchRenderer, IndexerError, IndexerRegistry, PatchRenderer, SymbolIndexer};
pub use symbols::files::plan_file_groups;
pub use symbols::{ChangeKind, Dependency, DependencyEdge, Symbol, SymbolChange, SymbolSnapshot};
pub use tracker::{ChangeTracker, SaveOutcome, TrackerContext, TrackerState};
#[cfg(feature = "watch")]
pub use watch::SaveWatcher;
