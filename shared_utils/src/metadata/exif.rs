//! ExifTool wrapper for EXIF reads and writes
//!
//! - Cached exiftool availability check (once per process)
//! - Reads go through `exiftool -j -n` so values come back as plain JSON numbers/strings
//! - Writes use `-overwrite_original`, so no `_original` backup is left next to the output

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::OnceLock;
use thiserror::Error;

/// Cached exiftool availability (checked once per process)
static EXIFTOOL_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Check if exiftool is available (cached)
pub fn is_exiftool_available() -> bool {
    *EXIFTOOL_AVAILABLE.get_or_init(|| which::which("exiftool").is_ok())
}

#[derive(Error, Debug)]
pub enum ExifToolError {
    #[error("exiftool not found in PATH")]
    NotInstalled,

    #[error("no EXIF metadata found")]
    NoMetadata,

    /// exiftool could not open the file (missing, permissions, undecodable name).
    #[error("failed to open the data source: {0}")]
    Unreadable(String),

    #[error("exiftool failed: {0}")]
    Failed(String),

    #[error("failed to run exiftool: {0}")]
    Io(#[from] std::io::Error),
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

fn is_open_failure(stderr: &str) -> bool {
    stderr.contains("File not found")
        || stderr.contains("Error opening file")
        || stderr.contains("Error reading file")
        || stderr.contains("can't be read")
}

/// exiftool has no `--` terminator; keep a leading `-` from being read as an option.
fn path_arg(path: &Path) -> PathBuf {
    if path.as_os_str().to_string_lossy().starts_with('-') {
        Path::new(".").join(path)
    } else {
        path.to_path_buf()
    }
}

/// Parse `exiftool -j` stdout into the tag map of the first (only) file.
pub fn parse_json_output(stdout: &str) -> Result<Map<String, Value>, ExifToolError> {
    let mut entries: Vec<Map<String, Value>> = serde_json::from_str(stdout)
        .map_err(|e| ExifToolError::Failed(format!("unparseable JSON output: {}", e)))?;
    if entries.is_empty() {
        return Err(ExifToolError::NoMetadata);
    }
    let mut tags = entries.swap_remove(0);
    tags.remove("SourceFile");
    if tags.is_empty() {
        return Err(ExifToolError::NoMetadata);
    }
    Ok(tags)
}

/// Read the named EXIF tags (`Orientation`, `Make`, ..., or `all`) from `path`.
///
/// Tags absent from the file are absent from the map. A file without any of the
/// requested tags yields [`ExifToolError::NoMetadata`].
pub fn read_exif_tags(path: &Path, tag_names: &[&str]) -> Result<Map<String, Value>, ExifToolError> {
    if !is_exiftool_available() {
        return Err(ExifToolError::NotInstalled);
    }

    let mut cmd = Command::new("exiftool");
    cmd.arg("-j").arg("-n").arg("-q");
    for name in tag_names {
        cmd.arg(format!("-EXIF:{}", name));
    }
    let output = cmd.arg(path_arg(path)).output()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() || stdout.trim().is_empty() {
        let stderr = stderr_text(&output);
        if is_open_failure(&stderr) {
            return Err(ExifToolError::Unreadable(stderr));
        }
        if stdout.trim().is_empty() {
            return Err(ExifToolError::Failed(stderr));
        }
    }

    parse_json_output(&stdout)
}

/// Write `Tag=value` assignments into the EXIF block of `path` in place.
pub fn write_exif_tags(path: &Path, assignments: &[(String, String)]) -> Result<(), ExifToolError> {
    if !is_exiftool_available() {
        return Err(ExifToolError::NotInstalled);
    }
    if assignments.is_empty() {
        return Ok(());
    }

    let mut cmd = Command::new("exiftool");
    cmd.arg("-overwrite_original").arg("-q").arg("-m").arg("-n");
    for (name, value) in assignments {
        cmd.arg(format!("-EXIF:{}={}", name, value));
    }
    let output = cmd.arg(path_arg(path)).output()?;

    if !output.status.success() {
        let stderr = stderr_text(&output);
        // Don't fail on minor warnings
        if !stderr.contains("Warning") || stderr.contains("Error") {
            if is_open_failure(&stderr) {
                return Err(ExifToolError::Unreadable(stderr));
            }
            return Err(ExifToolError::Failed(stderr));
        }
    }

    Ok(())
}
