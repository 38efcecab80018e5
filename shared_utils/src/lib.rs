//! Shared Utilities for the heic_jpg tools
//!
//! - Batch file collection and result counting
//! - Summary reporting
//! - Logging (tracing) and the progress bar it cooperates with
//! - Safety checks (dangerous directory detection)
//! - ExifTool plumbing for EXIF reads/writes

pub mod batch;
pub mod common_utils;
pub mod logging;
pub mod metadata;
pub mod report;
pub mod safety;
pub mod unified_progress;

pub use batch::*;
pub use report::*;
pub use safety::*;
pub use unified_progress::UnifiedProgressBar;
