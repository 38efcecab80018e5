//! HEIC/HEIF → JPEG batch conversion
//!
//! Per-file pipeline: decode (libheif) → ICC profile → EXIF orientation → RGB → JPEG 4:4:4 →
//! EXIF write-back (exiftool) → optional delete of the original. The scheduler runs the
//! pipeline over a fixed job list on a bounded rayon pool.

pub mod codec;
pub mod config;
pub mod errors;
pub mod exif_record;
pub mod metadata;
pub mod normalize;
pub mod outcome;
pub mod pipeline;
pub mod resolver;
pub mod scheduler;

pub use codec::{encode_jpeg, CodecAdapter, DecodedImage, LibheifCodec, PixelMode};
pub use config::{ConvertConfig, JpegQuality, ValidatedConfig, WorkerCount};
pub use errors::{CodecError, ConfigError, MetadataError, ResolveError, ScheduleError};
pub use exif_record::{ExifRecord, ExifTag, ExifValue, Orientation};
pub use metadata::{ExifToolMetadata, MetadataAdapter};
pub use normalize::{normalize_all, normalize_file, normalized_candidate, NormalizeOutcome};
pub use outcome::{ConversionOutcome, ConversionSuccess, FailureKind, FileOutcome, PipelineWarning};
pub use pipeline::{ConversionPipeline, PipelineOptions};
pub use resolver::{discover_sources, plan_jobs, ConversionJob, OutputLayout, SourceFile};
pub use scheduler::{BatchReport, BatchScheduler, CancelFlag};
