//! Common Utilities Module
//!
//! 通用工具函数集合：扩展名判断、目录创建。

use anyhow::{Context, Result};
use std::io;
use std::path::Path;

// ═══════════════════════════════════════════════════════════════
// 文件操作工具 (File Operations)
// ═══════════════════════════════════════════════════════════════

/// 安全地获取文件扩展名（小写）
///
/// # Examples
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::get_extension_lowercase;
///
/// assert_eq!(get_extension_lowercase(Path::new("IMG_0001.HEIC")), "heic");
/// assert_eq!(get_extension_lowercase(Path::new("noext")), "");
/// ```
pub fn get_extension_lowercase(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// 检查文件扩展名是否在给定列表中（不区分大小写）
///
/// # Examples
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::has_extension;
///
/// let extensions = &["heic", "heif"];
/// assert!(has_extension(Path::new("photo.HEIC"), extensions));
/// assert!(has_extension(Path::new("photo.Heif"), extensions));
/// assert!(!has_extension(Path::new("photo.jpg"), extensions));
/// ```
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    let ext = get_extension_lowercase(path);
    extensions.contains(&ext.as_str())
}

/// Create `dir` and its parents. An existing directory is success, including the case
/// where another thread creates it between our check and our `mkdir`.
pub fn create_dir_idempotent(dir: &Path) -> io::Result<()> {
    match std::fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}

/// 安全地创建目录（包括父目录），错误包含目录路径上下文。
pub fn ensure_dir_exists(dir: &Path) -> Result<()> {
    create_dir_idempotent(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
}
