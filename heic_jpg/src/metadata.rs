//! Metadata adapter
//!
//! EXIF is read from the HEIC and written onto the JPEG through exiftool
//! (`shared_utils::metadata`). Everything here is best effort from the pipeline's view.

use crate::errors::MetadataError;
use crate::exif_record::ExifRecord;
use shared_utils::metadata::{read_exif_tags, write_exif_tags, ExifToolError};
use std::path::Path;

pub trait MetadataAdapter: Send + Sync {
    /// Reads every EXIF tag of `path`. Fails with `NoMetadata` when the file carries no
    /// EXIF and with `UnreadableSource` when the file cannot be opened by the reader.
    fn read_tags(&self, path: &Path) -> Result<ExifRecord, MetadataError>;

    fn write_tags(&self, path: &Path, record: &ExifRecord) -> Result<(), MetadataError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ExifToolMetadata;

impl From<ExifToolError> for MetadataError {
    fn from(err: ExifToolError) -> Self {
        match err {
            ExifToolError::NoMetadata => MetadataError::NoMetadata,
            ExifToolError::Unreadable(msg) => MetadataError::UnreadableSource(msg),
            other => MetadataError::Other(other.to_string()),
        }
    }
}

impl MetadataAdapter for ExifToolMetadata {
    fn read_tags(&self, path: &Path) -> Result<ExifRecord, MetadataError> {
        if path.to_str().is_none() {
            return Err(MetadataError::UnreadableSource(format!(
                "file name is not valid UTF-8: {}",
                path.display()
            )));
        }

        let tags = read_exif_tags(path, &["all"])?;
        let record = ExifRecord::from_exiftool_json(&tags);
        if record.is_empty() {
            return Err(MetadataError::NoMetadata);
        }
        Ok(record)
    }

    fn write_tags(&self, path: &Path, record: &ExifRecord) -> Result<(), MetadataError> {
        write_exif_tags(path, &record.to_exiftool_assignments())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_jpeg, tests::sample_rgb};
    use crate::config::JpegQuality;
    use crate::exif_record::{ExifTag, ExifValue, Orientation};
    use serde_json::json;
    use shared_utils::metadata::is_exiftool_available;
    use tempfile::TempDir;

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            MetadataError::from(ExifToolError::NoMetadata),
            MetadataError::NoMetadata
        );
        assert_eq!(
            MetadataError::from(ExifToolError::Unreadable("Error opening file".into())),
            MetadataError::UnreadableSource("Error opening file".into())
        );
        assert!(matches!(
            MetadataError::from(ExifToolError::NotInstalled),
            MetadataError::Other(_)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_is_unreadable_source() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new(OsStr::from_bytes(b"/tmp/caf\xe9.heic"));
        let err = ExifToolMetadata.read_tags(path).unwrap_err();
        assert!(matches!(err, MetadataError::UnreadableSource(_)));
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        if !is_exiftool_available() {
            eprintln!("ExifTool not available, skipping test");
            return;
        }
        let temp = TempDir::new().unwrap();
        let jpg = temp.path().join("out.jpg");
        let bytes = encode_jpeg(&sample_rgb(), JpegQuality::DEFAULT, None).unwrap();
        std::fs::write(&jpg, bytes).unwrap();

        let mut record = ExifRecord::new();
        record.insert(ExifTag::Make, ExifValue::Text("Apple".into()));
        record.insert(ExifTag::Orientation, ExifValue::Integer(6));
        record.reset_orientation();
        ExifToolMetadata.write_tags(&jpg, &record).unwrap();

        let back = ExifToolMetadata.read_tags(&jpg).unwrap();
        assert_eq!(back.orientation(), Orientation::Normal);
        assert_eq!(back.get(ExifTag::Orientation), Some(&ExifValue::Integer(1)));
        assert_eq!(back.get(ExifTag::Make), Some(&ExifValue::Text("Apple".into())));
    }

    #[test]
    fn test_tags_outside_known_set_survive_roundtrip() {
        if !is_exiftool_available() {
            eprintln!("ExifTool not available, skipping test");
            return;
        }
        let temp = TempDir::new().unwrap();
        let jpg = temp.path().join("out.jpg");
        let bytes = encode_jpeg(&sample_rgb(), JpegQuality::DEFAULT, None).unwrap();
        std::fs::write(&jpg, bytes).unwrap();

        let source = json!({ "Orientation": 6, "ColorSpace": 1, "SubSecTimeDigitized": "512" });
        let mut record = ExifRecord::from_exiftool_json(source.as_object().unwrap());
        record.reset_orientation();
        ExifToolMetadata.write_tags(&jpg, &record).unwrap();

        let back = ExifToolMetadata.read_tags(&jpg).unwrap();
        assert_eq!(back.orientation(), Orientation::Normal);
        assert_eq!(back.passthrough("ColorSpace"), Some("1"));
        assert_eq!(back.passthrough("SubSecTimeDigitized"), Some("512"));
    }

    #[test]
    fn test_read_jpeg_without_exif_is_no_metadata() {
        if !is_exiftool_available() {
            eprintln!("ExifTool not available, skipping test");
            return;
        }
        let temp = TempDir::new().unwrap();
        let jpg = temp.path().join("plain.jpg");
        let bytes = encode_jpeg(&sample_rgb(), JpegQuality::DEFAULT, None).unwrap();
        std::fs::write(&jpg, bytes).unwrap();

        assert_eq!(
            ExifToolMetadata.read_tags(&jpg).unwrap_err(),
            MetadataError::NoMetadata
        );
    }
}
