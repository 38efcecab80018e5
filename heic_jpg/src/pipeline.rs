//! Per-file conversion pipeline
//!
//! decode → ICC → EXIF orientation → RGB → JPEG (atomic write) → EXIF write-back →
//! optional delete. Only decode, encode and the JPEG write can fail a file; metadata and
//! cleanup problems are recorded as warnings on the success.

use crate::codec::{apply_orientation, CodecAdapter};
use crate::config::JpegQuality;
use crate::errors::MetadataError;
use crate::exif_record::{ExifRecord, Orientation};
use crate::metadata::MetadataAdapter;
use crate::outcome::{ConversionOutcome, ConversionSuccess, FailureKind, PipelineWarning};
use crate::resolver::{ensure_output_dir, ConversionJob};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub quality: JpegQuality,
    pub delete_original: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            quality: JpegQuality::DEFAULT,
            delete_original: false,
        }
    }
}

/// Stateless apart from borrowed adapters; one instance is shared by all workers.
pub struct ConversionPipeline<'a> {
    codec: &'a dyn CodecAdapter,
    metadata: &'a dyn MetadataAdapter,
    options: PipelineOptions,
}

impl<'a> ConversionPipeline<'a> {
    pub fn new(
        codec: &'a dyn CodecAdapter,
        metadata: &'a dyn MetadataAdapter,
        options: PipelineOptions,
    ) -> Self {
        Self {
            codec,
            metadata,
            options,
        }
    }

    pub fn run(&self, job: &ConversionJob) -> ConversionOutcome {
        let source = job.source.path();
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.display().to_string());
        info!(
            "Converting {} to JPEG with quality={}",
            source.display(),
            self.options.quality
        );

        // 1. decode
        let decoded = match self.codec.decode(source) {
            Ok(decoded) => decoded,
            Err(e) => {
                error!("Failed to convert {}: {}", file_name, e);
                return ConversionOutcome::failed(FailureKind::Decode, e.to_string());
            }
        };
        let input_bytes = fs::metadata(source).map(|m| m.len()).unwrap_or(0);
        let mut warnings = Vec::new();

        // 2. ICC profile
        let (image, icc_profile) = match decoded.into_dynamic() {
            Ok(parts) => parts,
            Err(e) => {
                error!("Failed to convert {}: {}", file_name, e);
                return ConversionOutcome::failed(FailureKind::Decode, e.to_string());
            }
        };
        if icc_profile.is_some() {
            info!("ICC profile extracted and applied to {}", file_name);
        } else {
            warn!("No ICC profile found in {}", file_name);
            warnings.push(PipelineWarning::MissingIccProfile);
        }

        // 3. EXIF + orientation
        let mut record = self.read_exif(source, &file_name, &mut warnings);
        let orientation = record.orientation();
        if orientation != Orientation::Normal {
            debug!(
                "Applying EXIF orientation {} to {}",
                orientation.exif_value(),
                file_name
            );
        }
        let image = apply_orientation(image, orientation);
        record.reset_orientation();

        // 4. three-channel color
        let rgb = image.into_rgb8();

        // 5. encode + atomic write
        let jpeg = match self
            .codec
            .encode(&rgb, self.options.quality, icc_profile.as_deref())
        {
            Ok(jpeg) => jpeg,
            Err(e) => {
                error!("Failed to save JPEG file: {}. Error: {}", job.output_path.display(), e);
                return ConversionOutcome::failed(FailureKind::Encode, e.to_string());
            }
        };
        if let Err(e) = ensure_output_dir(&job.output_dir) {
            error!("Failed to save JPEG file: {}. Error: {}", job.output_path.display(), e);
            return ConversionOutcome::failed(FailureKind::Io, e.to_string());
        }
        if let Err(e) = write_atomically(&job.output_path, &jpeg) {
            error!("Failed to save JPEG file: {}. Error: {}", job.output_path.display(), e);
            return ConversionOutcome::failed(
                FailureKind::Io,
                format!("failed to write {}: {}", job.output_path.display(), e),
            );
        }

        // 6. EXIF write-back
        let exif_written = match self.metadata.write_tags(&job.output_path, &record) {
            Ok(()) => {
                info!(
                    "EXIF metadata successfully written to {}",
                    job.output_path.display()
                );
                true
            }
            Err(e) => {
                warn!(
                    "Failed to write EXIF metadata to {}: {}",
                    job.output_path.display(),
                    e
                );
                warnings.push(PipelineWarning::MetadataWriteFailed(e.to_string()));
                false
            }
        };
        let output_bytes = fs::metadata(&job.output_path)
            .map(|m| m.len())
            .unwrap_or(jpeg.len() as u64);
        info!(
            "Successfully converted {} to JPEG: {}",
            source.display(),
            job.output_path.display()
        );

        // 7. delete original, kept when its EXIF did not reach the JPEG
        let mut original_deleted = false;
        if self.options.delete_original && !exif_written {
            warn!(
                "Keeping original HEIF file {}: EXIF metadata was not written to the JPEG",
                source.display()
            );
            warnings.push(PipelineWarning::DeleteFailed(
                "EXIF metadata was not written to the JPEG".to_string(),
            ));
        } else if self.options.delete_original {
            match fs::remove_file(source) {
                Ok(()) => {
                    info!("Deleted original HEIF file: {}", source.display());
                    original_deleted = true;
                }
                Err(e) => {
                    warn!(
                        "Failed to delete original HEIF file: {}. Error: {}",
                        source.display(),
                        e
                    );
                    warnings.push(PipelineWarning::DeleteFailed(e.to_string()));
                }
            }
        }

        ConversionOutcome::Success(ConversionSuccess {
            output: job.output_path.clone(),
            warnings,
            input_bytes,
            output_bytes,
            icc_embedded: icc_profile.is_some(),
            exif_written,
            original_deleted,
        })
    }

    /// Any failure yields an empty record; only the log level and warning differ.
    fn read_exif(
        &self,
        source: &Path,
        file_name: &str,
        warnings: &mut Vec<PipelineWarning>,
    ) -> ExifRecord {
        match self.metadata.read_tags(source) {
            Ok(record) => record,
            Err(MetadataError::NoMetadata) => {
                warn!("No EXIF metadata found in {}", file_name);
                warnings.push(PipelineWarning::NoExifMetadata);
                ExifRecord::new()
            }
            Err(MetadataError::UnreadableSource(msg)) => {
                error!(
                    "Error reading EXIF metadata from {}: The file name contains special characters. Please rename the file and try again.",
                    file_name
                );
                warnings.push(PipelineWarning::UnreadableExifSource(msg));
                ExifRecord::new()
            }
            Err(MetadataError::Other(msg)) => {
                warn!("Error reading EXIF metadata from {}: {}", file_name, msg);
                warnings.push(PipelineWarning::ExifReadFailed(msg));
                ExifRecord::new()
            }
        }
    }
}

/// Write via a temp file in the destination directory, then rename over `path`.
fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(".heic-to-jpg-").suffix(".part");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o644));
    }

    let mut tmp = builder.tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
