//! Per-extension lookup of symbol indexers.

use super::traits::SymbolIndexer;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Maps lowercase file extensions (without the dot) to indexers.
#[derive(Default, Clone)]
pub struct IndexerRegistry {
    by_extension: HashMap<String, Arc<dyn SymbolIndexer>>,
}

impl IndexerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `indexer` for every extension in `extensions`, replacing any
    /// indexer previously registered for them.
    pub fn register(&mut self, extensions: &[&str], indexer: Arc<dyn SymbolIndexer>) {
        for ext in extensions {
            let ext = ext.trim_start_matches('.').to_lowercase();
            self.by_extension.insert(ext, Arc::clone(&indexer));
        }
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, extensions: &[&str], indexer: Arc<dyn SymbolIndexer>) -> Self {
        self.register(extensions, indexer);
        self
    }

    /// Find the indexer for a file, by extension.
    pub fn for_path(&self, file_path: &str) -> Option<Arc<dyn SymbolIndexer>> {
        let ext = extension_of(file_path)?;
        self.by_extension.get(&ext).map(Arc::clone)
    }

    pub fn supports(&self, file_path: &str) -> bool {
        self.for_path(file_path).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.by_extension.is_empty()
    }
}

impl fmt::Debug for IndexerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut exts: Vec<&str> = self.by_extension.keys().map(String::as_str).collect();
        exts.sort_unstable();
        f.debug_struct("IndexerRegistry")
            .field("extensions", &exts)
            .finish()
    }
}

/// Lowercase extension of a path, if it has one.
pub fn extension_of(file_path: &str) -> Option<String> {
    Path::new(file_path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}
