//! Canonical path strings used as keys for snapshots and the ledger.
//!
//! Two spellings of the same file must map to one key, otherwise the
//! tracker silently keeps duplicate entries for it.

use std::path::{Component, Path, PathBuf};

/// Normalize a file path into the string key used throughout the tracker.
///
/// Relative paths are resolved against `working_directory`. The result is
/// canonicalized when the file exists (resolving symlinks); otherwise `.`
/// and `..` components are folded lexically. Separators are always `/`.
pub fn normalize_path(path: &Path, working_directory: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_directory.join(path)
    };
    let resolved = absolute
        .canonicalize()
        .unwrap_or_else(|_| lexical_clean(&absolute));
    resolved.to_string_lossy().replace('\\', "/")
}

/// Fold `.` and `..` without touching the filesystem.
fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_files_are_cleaned_lexically() {
        let wd = Path::new("/nonexistent/work");
        assert_eq!(
            normalize_path(Path::new("src/./a/../lib.rs"), wd),
            "/nonexistent/work/src/lib.rs"
        );
        assert_eq!(
            normalize_path(Path::new("/nonexistent/work/src/lib.rs"), Path::new("/")),
            "/nonexistent/work/src/lib.rs"
        );
    }

    #[test]
    fn test_existing_spellings_share_a_key() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("src")).unwrap();
        std::fs::write(tmp.path().join("src/lib.rs"), "").unwrap();

        let direct = normalize_path(Path::new("src/lib.rs"), tmp.path());
        let dotted = normalize_path(Path::new("./src/../src/lib.rs"), tmp.path());
        let absolute = normalize_path(&tmp.path().join("src/lib.rs"), Path::new("/"));
        assert_eq!(direct, dotted);
        assert_eq!(direct, absolute);
    }
}
