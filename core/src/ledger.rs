//! The Change Ledger: file path → most recent symbol changes for that file.

use crate::symbols::SymbolChange;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default, Clone)]
pub struct ChangeLedger {
    entries: HashMap<String, Vec<SymbolChange>>,
}

impl ChangeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry for a file. An empty list clears it, so a file whose
    /// edits were reverted stops counting as pending.
    pub fn replace(&mut self, file_path: &str, changes: Vec<SymbolChange>) {
        if changes.is_empty() {
            self.entries.remove(file_path);
        } else {
            self.entries.insert(file_path.to_owned(), changes);
        }
    }

    pub fn get(&self, file_path: &str) -> Option<&[SymbolChange]> {
        self.entries.get(file_path).map(Vec::as_slice)
    }

    pub fn remove(&mut self, file_path: &str) -> Option<Vec<SymbolChange>> {
        self.entries.remove(file_path)
    }

    pub fn contains(&self, file_path: &str) -> bool {
        self.entries.contains_key(file_path)
    }

    /// Files with pending changes, sorted.
    pub fn pending_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.entries.keys().cloned().collect();
        files.sort();
        files
    }

    pub fn pending_set(&self) -> HashSet<String> {
        self.entries.keys().cloned().collect()
    }

    /// Every change, grouped by file in sorted path order.
    pub fn all_changes(&self) -> Vec<SymbolChange> {
        self.pending_files()
            .iter()
            .flat_map(|file| self.entries[file].iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::tests::sym;
    use crate::symbols::ChangeKind;

    fn change(file: &str, name: &str) -> SymbolChange {
        SymbolChange {
            name: name.to_owned(),
            file_path: file.to_owned(),
            symbol: sym(file, name, "", &[]),
            kind: ChangeKind::Modified,
            timestamp: 0,
            patch: String::new(),
            component_id: None,
            commit_id: None,
        }
    }

    #[test]
    fn replace_with_empty_clears_entry() {
        let mut ledger = ChangeLedger::new();
        ledger.replace("a.rs", vec![change("a.rs", "a")]);
        assert!(ledger.contains("a.rs"));

        ledger.replace("a.rs", vec![]);
        assert!(!ledger.contains("a.rs"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn all_changes_in_sorted_file_order() {
        let mut ledger = ChangeLedger::new();
        ledger.replace("b.rs", vec![change("b.rs", "b1"), change("b.rs", "b2")]);
        ledger.replace("a.rs", vec![change("a.rs", "a1")]);

        let names: Vec<String> = ledger.all_changes().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["a1", "b1", "b2"]);
        assert_eq!(ledger.pending_files(), vec!["a.rs", "b.rs"]);
        assert_eq!(ledger.len(), 2);
    }
}
