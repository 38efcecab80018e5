//! Metadata Module
//!
//! Internal (EXIF) metadata via ExifTool. The converter decides what to copy; this layer
//! only moves tag maps in and out of files.

mod exif;

pub use exif::{
    is_exiftool_available, parse_json_output, read_exif_tags, write_exif_tags, ExifToolError,
};
