use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Decode,
    Encode,
    Io,
    /// Panic or otherwise unclassified error inside one invocation.
    Unexpected,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Decode => "decode",
            FailureKind::Encode => "encode",
            FailureKind::Io => "io",
            FailureKind::Unexpected => "unexpected",
        };
        f.write_str(s)
    }
}

/// Degraded but non-fatal steps of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    MissingIccProfile,
    NoExifMetadata,
    UnreadableExifSource(String),
    ExifReadFailed(String),
    MetadataWriteFailed(String),
    DeleteFailed(String),
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::MissingIccProfile => write!(f, "no ICC profile"),
            PipelineWarning::NoExifMetadata => write!(f, "no EXIF metadata"),
            PipelineWarning::UnreadableExifSource(e) => write!(f, "EXIF source unreadable: {}", e),
            PipelineWarning::ExifReadFailed(e) => write!(f, "EXIF read failed: {}", e),
            PipelineWarning::MetadataWriteFailed(e) => write!(f, "EXIF write failed: {}", e),
            PipelineWarning::DeleteFailed(e) => write!(f, "original not deleted: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSuccess {
    pub output: PathBuf,
    pub warnings: Vec<PipelineWarning>,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub icc_embedded: bool,
    pub exif_written: bool,
    pub original_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Success(ConversionSuccess),
    Skipped(String),
    Failed { kind: FailureKind, message: String },
}

impl ConversionOutcome {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        ConversionOutcome::Failed {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Success(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ConversionOutcome::Failed { .. })
    }
}

/// Outcome paired with the source it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub outcome: ConversionOutcome,
}
