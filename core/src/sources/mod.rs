//! Collaborators consumed by the tracker: symbol indexers and patch rendering.

pub mod git_patch;
pub mod registry;
pub mod traits;

pub use git_patch::GitPatchRenderer;
pub use registry::IndexerRegistry;
pub use traits::{IndexerError, PatchRenderer, SymbolIndexer};
