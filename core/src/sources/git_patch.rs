//! Patch rendering through `git diff --no-index`.
//!
//! The crate does not implement a diff algorithm. Both versions of a symbol
//! are written to a scratch directory and git produces the hunks; only the
//! file headers are rewritten so the patch names the symbol.

use super::traits::PatchRenderer;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Default [`PatchRenderer`] backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct GitPatchRenderer {
    git: PathBuf,
    context_lines: u32,
}

impl GitPatchRenderer {
    pub fn new() -> Self {
        Self {
            git: PathBuf::from("git"),
            context_lines: 3,
        }
    }

    /// Use a specific git executable.
    #[must_use]
    pub fn with_git(mut self, git: impl Into<PathBuf>) -> Self {
        self.git = git.into();
        self
    }

    #[must_use]
    pub fn with_context_lines(mut self, context_lines: u32) -> Self {
        self.context_lines = context_lines;
        self
    }

    /// Check whether the configured git executable can be run.
    pub fn is_available(&self) -> bool {
        Command::new(&self.git)
            .arg("--version")
            .output()
            .is_ok_and(|out| out.status.success())
    }

    fn run_git_diff(&self, old_code: &str, new_code: &str) -> io::Result<String> {
        let scratch = TempDir::new()?;
        write_with_newline(&scratch.path().join("old"), old_code)?;
        write_with_newline(&scratch.path().join("new"), new_code)?;

        let unified = format!("-U{}", self.context_lines);
        let output = Command::new(&self.git)
            .args([
                "diff",
                "--no-index",
                "--no-color",
                "--no-ext-diff",
                &unified,
                "--",
                "old",
                "new",
            ])
            .current_dir(scratch.path())
            .output()?;

        // --no-index exits 1 when the files differ
        match output.status.code() {
            Some(0 | 1) => Ok(String::from_utf8_lossy(&output.stdout).to_string()),
            _ => Err(io::Error::other(
                String::from_utf8_lossy(&output.stderr).to_string(),
            )),
        }
    }
}

impl Default for GitPatchRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchRenderer for GitPatchRenderer {
    fn unified_diff(&self, symbol_name: &str, old_code: &str, new_code: &str) -> String {
        if old_code == new_code {
            return String::new();
        }
        match self.run_git_diff(old_code, new_code) {
            Ok(raw) => relabel_headers(&raw, symbol_name),
            Err(e) => {
                log::warn!("[git_patch] git diff failed for {symbol_name}, using full replacement: {e}");
                replacement_patch(symbol_name, old_code, new_code)
            }
        }
    }
}

fn write_with_newline(path: &Path, code: &str) -> io::Result<()> {
    if code.is_empty() || code.ends_with('\n') {
        fs::write(path, code)
    } else {
        fs::write(path, format!("{code}\n"))
    }
}

/// Replace git's scratch-file headers with `a/<symbol>` / `b/<symbol>`.
fn relabel_headers(raw: &str, symbol_name: &str) -> String {
    let first_hunk = if raw.starts_with("@@") {
        Some(0)
    } else {
        raw.find("\n@@").map(|i| i + 1)
    };
    let Some(first_hunk) = first_hunk else {
        return String::new();
    };
    format!(
        "--- a/{symbol_name}\n+++ b/{symbol_name}\n{}",
        &raw[first_hunk..]
    )
}

/// A single hunk removing every old line and adding every new line.
pub fn replacement_patch(symbol_name: &str, old_code: &str, new_code: &str) -> String {
    let old_lines: Vec<&str> = old_code.lines().collect();
    let new_lines: Vec<&str> = new_code.lines().collect();

    let mut patch = format!(
        "--- a/{symbol_name}\n+++ b/{symbol_name}\n@@ -{} +{} @@\n",
        hunk_range(old_lines.len()),
        hunk_range(new_lines.len())
    );
    for line in old_lines {
        patch.push('-');
        patch.push_str(line);
        patch.push('\n');
    }
    for line in new_lines {
        patch.push('+');
        patch.push_str(line);
        patch.push('\n');
    }
    patch
}

fn hunk_range(count: usize) -> String {
    match count {
        0 => "0,0".to_owned(),
        1 => "1".to_owned(),
        n => format!("1,{n}"),
    }
}
