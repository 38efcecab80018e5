//! File name normalization
//!
//! NFKD-decompose the file stem and keep only ASCII, so `Café.HEIC` becomes `Cafe.HEIC`.
//! Collisions with existing files get a `_renamed_<n>` suffix. Runs sequentially, before
//! any conversion starts.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use unicode_normalization::UnicodeNormalization;

/// Stem used when nothing ASCII survives normalization.
const FALLBACK_STEM: &str = "untitled";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeOutcome {
    Unchanged(PathBuf),
    Renamed { from: PathBuf, to: PathBuf },
    RenameFailed { path: PathBuf, error: String },
}

impl NormalizeOutcome {
    /// The path later stages should use.
    pub fn into_path(self) -> PathBuf {
        match self {
            NormalizeOutcome::Unchanged(path) => path,
            NormalizeOutcome::Renamed { to, .. } => to,
            NormalizeOutcome::RenameFailed { path, .. } => path,
        }
    }
}

fn ascii_stem(stem: &str) -> String {
    let ascii: String = stem
        .nfkd()
        .filter(|c| c.is_ascii() && !matches!(c, '/' | '\\' | '\0'))
        .collect();
    if ascii.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        ascii
    }
}

fn with_stem(path: &Path, stem: &str) -> PathBuf {
    let mut name = OsString::from(stem);
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}

/// ASCII-only sibling of `path` with the same extension. Pure; does not look at disk.
pub fn normalized_candidate(path: &Path) -> PathBuf {
    let Some(stem) = path.file_stem() else {
        return path.to_path_buf();
    };
    let stem = stem.to_string_lossy();
    with_stem(path, &ascii_stem(&stem))
}

fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// First free name among `candidate`, `stem_renamed_1.ext`, `stem_renamed_2.ext`, ...
fn first_free_name(candidate: &Path) -> PathBuf {
    if !occupied(candidate) {
        return candidate.to_path_buf();
    }
    let stem = candidate
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut counter = 1u32;
    loop {
        let next = with_stem(candidate, &format!("{}_renamed_{}", stem, counter));
        if !occupied(&next) {
            return next;
        }
        counter += 1;
    }
}

/// Rename `path` to its normalized name. Never overwrites an existing file.
pub fn normalize_file(path: &Path) -> NormalizeOutcome {
    let candidate = normalized_candidate(path);
    if candidate == path {
        return NormalizeOutcome::Unchanged(path.to_path_buf());
    }

    let target = first_free_name(&candidate);
    match fs::rename(path, &target) {
        Ok(()) => {
            info!(
                "Renamed {} -> {}",
                path.display(),
                target.display()
            );
            NormalizeOutcome::Renamed {
                from: path.to_path_buf(),
                to: target,
            }
        }
        Err(e) => {
            error!(
                "Failed to rename {} to {}: {}. Continuing with the original name.",
                path.display(),
                target.display(),
                e
            );
            NormalizeOutcome::RenameFailed {
                path: path.to_path_buf(),
                error: e.to_string(),
            }
        }
    }
}

/// Normalize every file in order. Returns the paths to convert, same length and order.
pub fn normalize_all(files: &[PathBuf]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|path| normalize_file(path).into_path())
        .collect()
}
