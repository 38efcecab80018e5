//! Input discovery and output placement

use crate::errors::ResolveError;
use shared_utils::batch::{collect_files, HEIF_EXTENSIONS};
use shared_utils::common_utils::create_dir_idempotent;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// One HEIF/HEIC input.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceFile(PathBuf);

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SourceFile(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn into_path(self) -> PathBuf {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub preserve_structure: bool,
}

/// A source with its resolved destination. `index` is 1-based within `total`.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub source: SourceFile,
    pub output_dir: PathBuf,
    pub output_path: PathBuf,
    pub index: usize,
    pub total: usize,
}

/// `.heic` / `.heif` files (any case) under `root`, sorted by path.
pub fn discover_sources(root: &Path, recursive: bool) -> Result<Vec<SourceFile>, ResolveError> {
    if !root.is_dir() {
        return Err(ResolveError::NotADirectory(root.to_path_buf()));
    }
    Ok(collect_files(root, HEIF_EXTENSIONS, recursive)
        .into_iter()
        .map(SourceFile::new)
        .collect())
}

/// Mirror the source's parent (relative to `input_root`) under `output_root` when
/// preserving structure; the flat output root otherwise.
pub fn output_dir_for(
    source: &Path,
    input_root: &Path,
    output_root: &Path,
    preserve_structure: bool,
) -> PathBuf {
    if preserve_structure {
        if let Some(relative) = source
            .parent()
            .and_then(|parent| parent.strip_prefix(input_root).ok())
        {
            return output_root.join(relative);
        }
    }
    output_root.to_path_buf()
}

/// `<output_dir>/<source stem>.jpg`
pub fn output_path_for(source: &Path, output_dir: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(Path::new)
        .unwrap_or_else(|| Path::new("untitled"));
    output_dir.join(name.with_extension("jpg"))
}

pub fn ensure_output_dir(dir: &Path) -> Result<(), ResolveError> {
    create_dir_idempotent(dir).map_err(|source| ResolveError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Resolve destinations and pre-create every distinct output directory, one at a time.
/// A directory that cannot be created is logged; its jobs fail later on their own.
pub fn plan_jobs(sources: Vec<SourceFile>, layout: &OutputLayout) -> Vec<ConversionJob> {
    let total = sources.len();
    let jobs: Vec<ConversionJob> = sources
        .into_iter()
        .enumerate()
        .map(|(i, source)| {
            let output_dir = output_dir_for(
                source.path(),
                &layout.input_root,
                &layout.output_root,
                layout.preserve_structure,
            );
            let output_path = output_path_for(source.path(), &output_dir);
            ConversionJob {
                source,
                output_dir,
                output_path,
                index: i + 1,
                total,
            }
        })
        .collect();

    let dirs: BTreeSet<&Path> = jobs.iter().map(|job| job.output_dir.as_path()).collect();
    for dir in dirs {
        if dir.is_dir() {
            continue;
        }
        match ensure_output_dir(dir) {
            Ok(()) => info!("Created directory: {}", dir.display()),
            Err(e) => error!("{}", e),
        }
    }

    jobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    fn tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("a.heic"));
        touch(&root.join("B.HEIC"));
        touch(&root.join("c.HeIf"));
        touch(&root.join("d.jpg"));
        touch(&root.join("notes.txt"));
        touch(&root.join("sub/e.heic"));
        touch(&root.join("sub/deeper/f.heif"));
        temp
    }

    fn names(sources: &[SourceFile], root: &Path) -> Vec<String> {
        sources
            .iter()
            .map(|s| {
                s.path()
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_discover_non_recursive() {
        let temp = tree();
        let sources = discover_sources(temp.path(), false).unwrap();
        assert_eq!(names(&sources, temp.path()), vec!["B.HEIC", "a.heic", "c.HeIf"]);
    }

    #[test]
    fn test_discover_recursive() {
        let temp = tree();
        let sources = discover_sources(temp.path(), true).unwrap();
        assert_eq!(
            names(&sources, temp.path()),
            vec![
                "B.HEIC",
                "a.heic",
                "c.HeIf",
                "sub/deeper/f.heif",
                "sub/e.heic"
            ]
        );
    }

    #[test]
    fn test_discover_missing_or_file_root() {
        let temp = tree();
        assert!(matches!(
            discover_sources(&temp.path().join("nope"), true),
            Err(ResolveError::NotADirectory(_))
        ));
        assert!(matches!(
            discover_sources(&temp.path().join("a.heic"), false),
            Err(ResolveError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_output_dir_flat_and_mirrored() {
        let input = Path::new("/in");
        let output = Path::new("/out");
        let source = Path::new("/in/2024/trip/IMG_1.HEIC");

        assert_eq!(output_dir_for(source, input, output, false), output);
        assert_eq!(
            output_dir_for(source, input, output, true),
            Path::new("/out/2024/trip")
        );
        // Direct child maps to the output root itself.
        assert_eq!(
            output_dir_for(Path::new("/in/IMG_2.heic"), input, output, true),
            output
        );
        // Outside the input root: nothing to mirror.
        assert_eq!(
            output_dir_for(Path::new("/elsewhere/x.heic"), input, output, true),
            output
        );
    }

    #[test]
    fn test_output_path_replaces_extension() {
        let dir = Path::new("/out");
        assert_eq!(
            output_path_for(Path::new("/in/IMG_1.HEIC"), dir),
            Path::new("/out/IMG_1.jpg")
        );
        assert_eq!(
            output_path_for(Path::new("/in/holiday.v2.heif"), dir),
            Path::new("/out/holiday.v2.jpg")
        );
    }

    #[test]
    fn test_ensure_output_dir_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("x/y/z");
        ensure_output_dir(&dir).unwrap();
        ensure_output_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_ensure_output_dir_concurrent() {
        let temp = TempDir::new().unwrap();
        let dir = Arc::new(temp.path().join("race/a/b"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let dir = Arc::clone(&dir);
                thread::spawn(move || ensure_output_dir(&dir).is_ok())
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
        assert!(dir.is_dir());
    }

    #[test]
    fn test_ensure_output_dir_over_file_fails() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("occupied");
        touch(&file);
        assert!(matches!(
            ensure_output_dir(&file),
            Err(ResolveError::CreateDir { .. })
        ));
    }

    #[test]
    fn test_plan_jobs_preserving_structure() {
        let temp = tree();
        let out = temp.path().join("converted");
        let sources = discover_sources(temp.path(), true).unwrap();
        let layout = OutputLayout {
            input_root: temp.path().to_path_buf(),
            output_root: out.clone(),
            preserve_structure: true,
        };

        let jobs = plan_jobs(sources, &layout);
        assert_eq!(jobs.len(), 5);
        assert_eq!(jobs[0].index, 1);
        assert!(jobs.iter().all(|j| j.total == 5));
        assert_eq!(jobs[4].index, 5);

        let deeper = jobs
            .iter()
            .find(|j| j.source.path().ends_with("f.heif"))
            .unwrap();
        assert_eq!(deeper.output_dir, out.join("sub/deeper"));
        assert_eq!(deeper.output_path, out.join("sub/deeper/f.jpg"));

        assert!(out.is_dir());
        assert!(out.join("sub").is_dir());
        assert!(out.join("sub/deeper").is_dir());
    }

    #[test]
    fn test_plan_jobs_flat() {
        let temp = tree();
        let out = temp.path().join("flat");
        let sources = discover_sources(temp.path(), true).unwrap();
        let layout = OutputLayout {
            input_root: temp.path().to_path_buf(),
            output_root: out.clone(),
            preserve_structure: false,
        };

        let jobs = plan_jobs(sources, &layout);
        assert!(jobs.iter().all(|j| j.output_dir == out));
        assert!(out.is_dir());
        assert!(!out.join("sub").exists());
    }
}
