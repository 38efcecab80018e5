use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal problems with the run configuration; reported before any file is touched.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("The --preserve-structure argument can only be used with -r or --recursive.")]
    PreserveStructureWithoutRecursive,

    #[error("Quality must be between 1 and 100 (got {0}).")]
    QualityOutOfRange(i64),

    #[error("Worker count must be at least 1 (got {0}).")]
    InvalidWorkerCount(usize),

    #[error("{0}")]
    DangerousDirectory(String),

    #[error("--delete requires exiftool in PATH; without it the originals' EXIF metadata would be lost.")]
    DeleteWithoutMetadataWriter,
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("The specified directory does not exist: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to decode {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },

    #[error("Invalid pixel buffer: {0}")]
    InvalidBuffer(String),

    #[error("Failed to encode JPEG: {0}")]
    Encode(String),
}

impl CodecError {
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => CodecError::NotFound(path),
            io::ErrorKind::PermissionDenied => CodecError::PermissionDenied(path),
            _ => CodecError::Io { path, source },
        }
    }

    pub fn decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        CodecError::Decode {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("no EXIF metadata found")]
    NoMetadata,

    /// The source could not be opened by the metadata reader, typically because of
    /// characters in its name.
    #[error("failed to open the data source: {0}")]
    UnreadableSource(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
