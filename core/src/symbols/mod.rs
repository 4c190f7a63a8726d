//! Symbol data model and the symbol-level change machinery.
//!
//! Symbols are produced by an external [`SymbolIndexer`](crate::sources::SymbolIndexer);
//! this crate never mutates them, it only snapshots, compares, and links them.

pub mod diff;
pub mod files;
pub mod graph;
pub mod snapshot;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named reference from one symbol to another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyEdge {
    /// Name of the symbol being depended on.
    pub target: String,
}

/// One declared dependency of a symbol, as reported by the indexer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dependency {
    pub edges: Vec<DependencyEdge>,
}

/// A named, located unit of source code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    /// Unique within its file.
    pub name: String,
    pub file_path: String,
    pub working_directory: String,
    pub code: String,
    pub start_line: u32,
    pub end_line: u32,
    pub display_name: String,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl Symbol {
    /// Names of every symbol this one depends on, across all dependency records.
    pub fn dependency_targets(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .flat_map(|dep| dep.edges.iter().map(|edge| edge.target.as_str()))
    }
}

/// Immutable name → symbol mapping for one file at one instant.
///
/// Keeps the indexer's ordering so that everything derived from a snapshot
/// is deterministic.
#[derive(Debug, Clone, Default)]
pub struct SymbolSnapshot {
    symbols: Vec<Symbol>,
    by_name: HashMap<String, usize>,
}

impl SymbolSnapshot {
    /// Build a snapshot. If the indexer reports the same name twice, the
    /// first occurrence wins.
    pub fn new(symbols: Vec<Symbol>) -> Self {
        let mut kept = Vec::with_capacity(symbols.len());
        let mut by_name = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            if by_name.contains_key(&symbol.name) {
                log::debug!(
                    "[snapshot] Duplicate symbol {} in {}, keeping first",
                    symbol.name,
                    symbol.file_path
                );
                continue;
            }
            by_name.insert(symbol.name.clone(), kept.len());
            kept.push(symbol);
        }
        Self {
            symbols: kept,
            by_name,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.by_name.get(name).map(|&i| &self.symbols[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Symbols in indexer order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Whether a symbol was added, removed, or modified.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// The atomic unit of output: one symbol that changed in one file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SymbolChange {
    pub name: String,
    /// Normalized path of the owning file (the ledger key).
    pub file_path: String,
    /// Latest known symbol data; the baseline symbol for removals.
    pub symbol: Symbol,
    pub kind: ChangeKind,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Full code for additions, empty for removals, a unified diff for modifications.
    pub patch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
}
