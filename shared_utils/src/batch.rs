//! Batch Processing Module
//!
//! File collection for batch runs and the per-run success/failure counters.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const HEIF_EXTENSIONS: &[&str] = &["heic", "heif"];

/// Collect regular files under `dir` whose extension is in `extensions` (case-insensitive).
///
/// Non-recursive mode only looks at direct children. Symlinks are followed in both modes.
/// Unreadable entries, including dangling links, are skipped.
/// The result is sorted so repeated runs see the same order.
pub fn collect_files(dir: &Path, extensions: &[&str], recursive: bool) -> Vec<PathBuf> {
    let walker = WalkDir::new(dir).follow_links(true);
    let walker = if recursive {
        walker
    } else {
        walker.max_depth(1)
    };

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| crate::common_utils::has_extension(e.path(), extensions))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub warnings: usize,
    pub errors: Vec<(PathBuf, String)>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            warnings: 0,
            errors: Vec::new(),
        }
    }

    pub fn success(&mut self) {
        self.total += 1;
        self.succeeded += 1;
    }

    /// A success that finished with `count` degraded steps (metadata, cleanup).
    pub fn success_with_warnings(&mut self, count: usize) {
        self.success();
        self.warnings += count;
    }

    pub fn fail(&mut self, path: PathBuf, error: String) {
        self.total += 1;
        self.failed += 1;
        self.errors.push((path, error));
    }

    pub fn skip(&mut self) {
        self.total += 1;
        self.skipped += 1;
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.succeeded as f64 / self.total as f64) * 100.0
        }
    }
}

impl Default for BatchResult {
    fn default() -> Self {
        Self::new()
    }
}
