//! Run configuration
//!
//! `ConvertConfig` is the raw user input; `validate()` turns it into a `ValidatedConfig`
//! or a fatal `ConfigError`. Nothing on disk is touched until validation has passed.

use crate::errors::ConfigError;
use crate::pipeline::PipelineOptions;
use crate::resolver::OutputLayout;
use shared_utils::check_dangerous_directory;
use std::fmt;
use std::path::PathBuf;

/// JPEG quality, always within 1..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JpegQuality(u8);

impl JpegQuality {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 100;
    pub const DEFAULT: JpegQuality = JpegQuality(95);

    pub fn new(value: i64) -> Result<Self, ConfigError> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(JpegQuality(value as u8))
        } else {
            Err(ConfigError::QualityOutOfRange(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_default(self) -> bool {
        self == Self::DEFAULT
    }
}

impl Default for JpegQuality {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for JpegQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of concurrent pipeline invocations, at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerCount(usize);

impl WorkerCount {
    pub const DEFAULT: WorkerCount = WorkerCount(4);

    pub fn new(value: usize) -> Result<Self, ConfigError> {
        if value == 0 {
            Err(ConfigError::InvalidWorkerCount(value))
        } else {
            Ok(WorkerCount(value))
        }
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for WorkerCount {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub recursive: bool,
    pub quality: i64,
    pub delete_original: bool,
    pub preserve_structure: bool,
    pub workers: usize,
    pub show_progress: bool,
    pub normalize_names: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            recursive: false,
            quality: JpegQuality::DEFAULT.get() as i64,
            delete_original: false,
            preserve_structure: false,
            workers: WorkerCount::DEFAULT.get(),
            show_progress: false,
            normalize_names: false,
        }
    }
}

impl ConvertConfig {
    /// Checks run in a fixed order: flag combination, quality, workers, then the
    /// protected-directory guard (only when originals would be deleted).
    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        if self.preserve_structure && !self.recursive {
            return Err(ConfigError::PreserveStructureWithoutRecursive);
        }
        let quality = JpegQuality::new(self.quality)?;
        let workers = WorkerCount::new(self.workers)?;
        if self.delete_original {
            check_dangerous_directory(&self.input_dir).map_err(ConfigError::DangerousDirectory)?;
        }

        Ok(ValidatedConfig {
            input_dir: self.input_dir,
            output_dir: self.output_dir,
            recursive: self.recursive,
            quality,
            delete_original: self.delete_original,
            preserve_structure: self.preserve_structure,
            workers,
            show_progress: self.show_progress,
            normalize_names: self.normalize_names,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub recursive: bool,
    pub quality: JpegQuality,
    pub delete_original: bool,
    pub preserve_structure: bool,
    pub workers: WorkerCount,
    pub show_progress: bool,
    pub normalize_names: bool,
}

impl ValidatedConfig {
    pub fn layout(&self) -> OutputLayout {
        OutputLayout {
            input_root: self.input_dir.clone(),
            output_root: self.output_dir.clone(),
            preserve_structure: self.preserve_structure,
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            quality: self.quality,
            delete_original: self.delete_original,
        }
    }

    /// Originals may only be deleted when their EXIF can be carried to the JPEG.
    pub fn check_metadata_writer(&self, writer_available: bool) -> Result<(), ConfigError> {
        if self.delete_original && !writer_available {
            return Err(ConfigError::DeleteWithoutMetadataWriter);
        }
        Ok(())
    }
}

/// Only `y` / `Y` confirms.
pub fn is_confirmed(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}
