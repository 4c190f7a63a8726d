//! Symbol-level diff between two snapshots of the same file.
//!
//! Symbols are matched by name only. A rename therefore shows up as a
//! removal plus an addition.

use super::{ChangeKind, Symbol, SymbolChange, SymbolSnapshot};
use crate::sources::PatchRenderer;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Diff `previous` against `current` for one file.
///
/// Emits, in order: additions and modifications in `current`'s order, then
/// removals in `previous`'s order. Symbols whose code is byte-identical are
/// not reported.
pub fn diff_snapshots(
    file_path: &str,
    previous: &SymbolSnapshot,
    current: &SymbolSnapshot,
    renderer: &dyn PatchRenderer,
    timestamp: u64,
) -> Vec<SymbolChange> {
    let mut changes = Vec::new();

    for symbol in current.iter() {
        match previous.get(&symbol.name) {
            None => changes.push(make_change(
                file_path,
                symbol,
                ChangeKind::Added,
                symbol.code.clone(),
                timestamp,
            )),
            Some(old) if old.code != symbol.code => {
                let patch = renderer.unified_diff(&symbol.name, &old.code, &symbol.code);
                changes.push(make_change(
                    file_path,
                    symbol,
                    ChangeKind::Modified,
                    patch,
                    timestamp,
                ));
            }
            Some(_) => {}
        }
    }

    for symbol in previous.iter() {
        if !current.contains(&symbol.name) {
            changes.push(make_change(
                file_path,
                symbol,
                ChangeKind::Removed,
                String::new(),
                timestamp,
            ));
        }
    }

    changes
}

fn make_change(
    file_path: &str,
    symbol: &Symbol,
    kind: ChangeKind,
    patch: String,
    timestamp: u64,
) -> SymbolChange {
    SymbolChange {
        name: symbol.name.clone(),
        file_path: file_path.to_owned(),
        symbol: symbol.clone(),
        kind,
        timestamp,
        patch,
        component_id: None,
        commit_id: None,
    }
}
