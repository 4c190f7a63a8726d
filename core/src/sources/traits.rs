use crate::symbols::Symbol;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("No indexer for extension: {extension}")]
    Unsupported { extension: String },
    #[error("Indexer failed: {0}")]
    Failed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexerError {
    /// Create a Failed error
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Turns a file's text into symbols with dependency edges.
///
/// Implementations are language specific and registered per file extension
/// in an [`IndexerRegistry`](super::IndexerRegistry). They are called from a
/// blocking thread, may be called repeatedly for the same file, and must not
/// assume any ordering between calls.
pub trait SymbolIndexer: Send + Sync {
    /// Parse `path` and return every symbol defined in it.
    ///
    /// `force_refresh` asks the indexer to bypass any cache of its own.
    fn parse_file(
        &self,
        path: &Path,
        working_directory: &Path,
        force_refresh: bool,
    ) -> Result<Vec<Symbol>, IndexerError>;
}

/// Renders the human-readable patch for a modified symbol. Pure.
pub trait PatchRenderer: Send + Sync {
    fn unified_diff(&self, symbol_name: &str, old_code: &str, new_code: &str) -> String;
}

impl<F> PatchRenderer for F
where
    F: Fn(&str, &str, &str) -> String + Send + Sync,
{
    fn unified_diff(&self, symbol_name: &str, old_code: &str, new_code: &str) -> String {
        self(symbol_name, old_code, new_code)
    }
}
