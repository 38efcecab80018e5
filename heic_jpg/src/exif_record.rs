//! EXIF record model
//!
//! A closed set of well-known tags, each with a fixed value kind, plus a pass-through
//! bucket for every other EXIF tag the source carries. Values travel through exiftool in
//! numeric (`-n`) form.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Text,
    Rational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExifTag {
    Orientation,
    Make,
    Model,
    Software,
    Artist,
    Copyright,
    ImageDescription,
    ModifyDate,
    DateTimeOriginal,
    CreateDate,
    OffsetTime,
    OffsetTimeOriginal,
    OffsetTimeDigitized,
    SubSecTimeOriginal,
    ExposureTime,
    FNumber,
    Iso,
    ExposureProgram,
    ExposureCompensation,
    MeteringMode,
    Flash,
    FocalLength,
    FocalLengthIn35mmFormat,
    WhiteBalance,
    LensMake,
    LensModel,
    GpsLatitudeRef,
    GpsLatitude,
    GpsLongitudeRef,
    GpsLongitude,
    GpsAltitudeRef,
    GpsAltitude,
}

impl ExifTag {
    pub const ALL: &'static [ExifTag] = &[
        ExifTag::Orientation,
        ExifTag::Make,
        ExifTag::Model,
        ExifTag::Software,
        ExifTag::Artist,
        ExifTag::Copyright,
        ExifTag::ImageDescription,
        ExifTag::ModifyDate,
        ExifTag::DateTimeOriginal,
        ExifTag::CreateDate,
        ExifTag::OffsetTime,
        ExifTag::OffsetTimeOriginal,
        ExifTag::OffsetTimeDigitized,
        ExifTag::SubSecTimeOriginal,
        ExifTag::ExposureTime,
        ExifTag::FNumber,
        ExifTag::Iso,
        ExifTag::ExposureProgram,
        ExifTag::ExposureCompensation,
        ExifTag::MeteringMode,
        ExifTag::Flash,
        ExifTag::FocalLength,
        ExifTag::FocalLengthIn35mmFormat,
        ExifTag::WhiteBalance,
        ExifTag::LensMake,
        ExifTag::LensModel,
        ExifTag::GpsLatitudeRef,
        ExifTag::GpsLatitude,
        ExifTag::GpsLongitudeRef,
        ExifTag::GpsLongitude,
        ExifTag::GpsAltitudeRef,
        ExifTag::GpsAltitude,
    ];

    /// Tag name as exiftool spells it in the EXIF group.
    pub fn exiftool_name(self) -> &'static str {
        match self {
            ExifTag::Orientation => "Orientation",
            ExifTag::Make => "Make",
            ExifTag::Model => "Model",
            ExifTag::Software => "Software",
            ExifTag::Artist => "Artist",
            ExifTag::Copyright => "Copyright",
            ExifTag::ImageDescription => "ImageDescription",
            ExifTag::ModifyDate => "ModifyDate",
            ExifTag::DateTimeOriginal => "DateTimeOriginal",
            ExifTag::CreateDate => "CreateDate",
            ExifTag::OffsetTime => "OffsetTime",
            ExifTag::OffsetTimeOriginal => "OffsetTimeOriginal",
            ExifTag::OffsetTimeDigitized => "OffsetTimeDigitized",
            ExifTag::SubSecTimeOriginal => "SubSecTimeOriginal",
            ExifTag::ExposureTime => "ExposureTime",
            ExifTag::FNumber => "FNumber",
            ExifTag::Iso => "ISO",
            ExifTag::ExposureProgram => "ExposureProgram",
            ExifTag::ExposureCompensation => "ExposureCompensation",
            ExifTag::MeteringMode => "MeteringMode",
            ExifTag::Flash => "Flash",
            ExifTag::FocalLength => "FocalLength",
            ExifTag::FocalLengthIn35mmFormat => "FocalLengthIn35mmFormat",
            ExifTag::WhiteBalance => "WhiteBalance",
            ExifTag::LensMake => "LensMake",
            ExifTag::LensModel => "LensModel",
            ExifTag::GpsLatitudeRef => "GPSLatitudeRef",
            ExifTag::GpsLatitude => "GPSLatitude",
            ExifTag::GpsLongitudeRef => "GPSLongitudeRef",
            ExifTag::GpsLongitude => "GPSLongitude",
            ExifTag::GpsAltitudeRef => "GPSAltitudeRef",
            ExifTag::GpsAltitude => "GPSAltitude",
        }
    }

    pub fn from_exiftool_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|tag| tag.exiftool_name() == name)
    }

    pub fn kind(self) -> ValueKind {
        match self {
            ExifTag::Orientation
            | ExifTag::Iso
            | ExifTag::ExposureProgram
            | ExifTag::MeteringMode
            | ExifTag::Flash
            | ExifTag::FocalLengthIn35mmFormat
            | ExifTag::WhiteBalance
            | ExifTag::GpsAltitudeRef => ValueKind::Integer,
            ExifTag::ExposureTime
            | ExifTag::FNumber
            | ExifTag::ExposureCompensation
            | ExifTag::FocalLength
            | ExifTag::GpsLatitude
            | ExifTag::GpsLongitude
            | ExifTag::GpsAltitude => ValueKind::Rational,
            _ => ValueKind::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExifValue {
    Integer(i64),
    Text(String),
    Rational(f64),
}

impl ExifValue {
    /// Coerce an exiftool JSON value into `kind`. exiftool prints numeric-looking strings
    /// as JSON numbers, so text tags accept numbers and numeric tags accept strings.
    pub fn from_json(kind: ValueKind, value: &Value) -> Option<Self> {
        match kind {
            ValueKind::Integer => match value {
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().map(|f| f.round() as i64))
                    .map(ExifValue::Integer),
                Value::String(s) => s.trim().parse().ok().map(ExifValue::Integer),
                _ => None,
            },
            ValueKind::Rational => match value {
                Value::Number(n) => n.as_f64().map(ExifValue::Rational),
                Value::String(s) => s.trim().parse().ok().map(ExifValue::Rational),
                _ => None,
            },
            ValueKind::Text => match value {
                Value::String(s) => Some(ExifValue::Text(s.clone())),
                Value::Number(n) => Some(ExifValue::Text(n.to_string())),
                Value::Bool(b) => Some(ExifValue::Text(b.to_string())),
                _ => None,
            },
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ExifValue::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ExifValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExifValue::Integer(v) => write!(f, "{}", v),
            ExifValue::Text(s) => write!(f, "{}", s),
            ExifValue::Rational(v) => write!(f, "{}", v),
        }
    }
}

/// EXIF orientation (tag 0x0112), values 1..=8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Normal = 1,
    FlipHorizontal = 2,
    Rotate180 = 3,
    FlipVertical = 4,
    Transpose = 5,
    Rotate90 = 6,
    Transverse = 7,
    Rotate270 = 8,
}

impl Orientation {
    pub fn from_exif(value: i64) -> Option<Self> {
        match value {
            1 => Some(Orientation::Normal),
            2 => Some(Orientation::FlipHorizontal),
            3 => Some(Orientation::Rotate180),
            4 => Some(Orientation::FlipVertical),
            5 => Some(Orientation::Transpose),
            6 => Some(Orientation::Rotate90),
            7 => Some(Orientation::Transverse),
            8 => Some(Orientation::Rotate270),
            _ => None,
        }
    }

    pub fn exif_value(self) -> i64 {
        self as i64
    }
}

/// Tags that describe the HEIC's own encoding or layout. They are wrong for the JPEG
/// (new pixel dimensions, no embedded thumbnail) and are never carried over.
const NOT_CARRIED: &[&str] = &[
    "ExifImageWidth",
    "ExifImageHeight",
    "ImageWidth",
    "ImageHeight",
    "Compression",
    "ThumbnailImage",
    "ThumbnailOffset",
    "ThumbnailLength",
    "StripOffsets",
    "StripByteCounts",
    "RowsPerStrip",
    "TileOffsets",
    "TileByteCounts",
    "PhotometricInterpretation",
    "BitsPerSample",
    "SamplesPerPixel",
    "PlanarConfiguration",
    "YCbCrSubSampling",
    "YCbCrPositioning",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifRecord {
    tags: BTreeMap<ExifTag, ExifValue>,
    /// Any other EXIF tag, keyed by exiftool name, value in exiftool's `-n` text form.
    passthrough: BTreeMap<String, String>,
}

impl ExifRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from one file's `exiftool -j -n -EXIF:all` object.
    ///
    /// Known tags whose value does not fit their kind are dropped. Other tags are kept
    /// verbatim unless they are binary blobs, structured values or layout tags.
    pub fn from_exiftool_json(tags: &Map<String, Value>) -> Self {
        let mut record = Self::new();
        for (name, value) in tags {
            match ExifTag::from_exiftool_name(name) {
                Some(tag) => {
                    if let Some(value) = ExifValue::from_json(tag.kind(), value) {
                        record.insert(tag, value);
                    }
                }
                None => {
                    if let Some(text) = passthrough_text(name, value) {
                        record.passthrough.insert(name.clone(), text);
                    }
                }
            }
        }
        record
    }

    pub fn insert(&mut self, tag: ExifTag, value: ExifValue) -> Option<ExifValue> {
        self.tags.insert(tag, value)
    }

    pub fn get(&self, tag: ExifTag) -> Option<&ExifValue> {
        self.tags.get(&tag)
    }

    /// Value of a tag outside the well-known set.
    pub fn passthrough(&self, name: &str) -> Option<&str> {
        self.passthrough.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len() + self.passthrough.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.passthrough.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ExifTag, &ExifValue)> {
        self.tags.iter().map(|(tag, value)| (*tag, value))
    }

    /// Missing or out-of-range values read as `Normal`.
    pub fn orientation(&self) -> Orientation {
        self.get(ExifTag::Orientation)
            .and_then(ExifValue::as_i64)
            .and_then(Orientation::from_exif)
            .unwrap_or_default()
    }

    /// Pixels are rotated before encoding, so the written tag is always 1.
    pub fn reset_orientation(&mut self) {
        self.insert(
            ExifTag::Orientation,
            ExifValue::Integer(Orientation::Normal.exif_value()),
        );
    }

    /// `(Tag, value)` pairs for `exiftool -n -EXIF:Tag=value`, well-known tags first.
    pub fn to_exiftool_assignments(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(tag, value)| (tag.exiftool_name().to_string(), value.to_string()))
            .chain(
                self.passthrough
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone())),
            )
            .collect()
    }
}

fn passthrough_text(name: &str, value: &Value) -> Option<String> {
    if NOT_CARRIED.contains(&name) {
        return None;
    }
    match value {
        // exiftool prints "(Binary data N bytes, use -b option to extract)" for blobs
        Value::String(s) if s.starts_with("(Binary data") => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
