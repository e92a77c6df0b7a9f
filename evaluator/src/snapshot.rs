//! Read-only view of a candidate repository tree.
//!
//! All detectors and scorers go through [`Snapshot`] so that file reads are
//! bounded and cache/virtual-environment directories are pruned consistently.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Directory names never descended into by content scans.
const PRUNED_DIRS: &[&str] = &["venv", ".venv", "__pycache__", "node_modules", "env"];

/// Max characters read from any single file during content checks.
pub const CONTENT_READ_CAP: usize = 50_000;

/// A materialized repository tree on disk.
///
/// The snapshot never mutates the tree; detectors built on it are pure
/// functions of the on-disk state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    root: PathBuf,
}

impl Snapshot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a repo-relative path onto the snapshot root.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Read a repo-relative file, capped at `cap` characters.
    pub fn read_capped(&self, rel: &str, cap: usize) -> String {
        read_file_capped(&self.path(rel), cap)
    }

    /// All regular files with the given extension under `base`, recursively.
    ///
    /// Hidden and cache/virtual-environment directories are pruned. Results
    /// are sorted for deterministic iteration order.
    pub fn files_with_extension(&self, base: &Path, ext: &str) -> Vec<PathBuf> {
        if !base.is_dir() {
            return Vec::new();
        }
        let mut files: Vec<PathBuf> = WalkDir::new(base)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_pruned_name(&entry.file_name().to_string_lossy()))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(ext))
            })
            .collect();
        files.sort();
        files
    }

    /// Python files under `base`, recursively, pruned and sorted.
    pub fn python_files(&self, base: &Path) -> Vec<PathBuf> {
        self.files_with_extension(base, "py")
    }

    /// Python files directly at the repository root (non-recursive).
    pub fn root_python_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = match fs::read_dir(&self.root) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("py"))
                .collect(),
            Err(_) => Vec::new(),
        };
        files.sort();
        files
    }

    /// Top-level directories, excluding hidden and cache/virtual-environment names.
    pub fn top_level_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = match fs::read_dir(&self.root) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .filter(|path| {
                    path.file_name()
                        .map(|name| !is_pruned_name(&name.to_string_lossy()))
                        .unwrap_or(false)
                })
                .collect(),
            Err(_) => Vec::new(),
        };
        dirs.sort();
        dirs
    }
}

/// Read a file as lossy UTF-8, capped at `cap` characters.
///
/// Missing or unreadable files read as empty so that presence detectors can
/// treat "no content" and "no file" identically.
pub fn read_file_capped(path: &Path, cap: usize) -> String {
    if !path.is_file() {
        return String::new();
    }
    match fs::read(path) {
        Ok(bytes) => truncate_chars(&String::from_utf8_lossy(&bytes), cap),
        Err(_) => String::new(),
    }
}

/// Truncate to at most `cap` characters on a char boundary.
pub fn truncate_chars(text: &str, cap: usize) -> String {
    if text.chars().count() <= cap {
        return text.to_string();
    }
    text.chars().take(cap).collect()
}

fn is_pruned_name(name: &str) -> bool {
    name.starts_with('.') || PRUNED_DIRS.contains(&name)
}
