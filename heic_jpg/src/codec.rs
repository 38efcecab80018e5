//! Codec adapter
//!
//! HEIF decoding goes through libheif-rs, JPEG encoding through the `image` crate's baseline
//! encoder. `image` writes every component with 1x1 sampling factors, which is 4:4:4.

use crate::config::JpegQuality;
use crate::errors::CodecError;
use crate::exif_record::Orientation;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, GrayImage, ImageEncoder, RgbImage, RgbaImage};
use libheif_rs::{ColorSpace, DecodingOptions, HeifContext, LibHeif, RgbChroma};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelMode {
    Rgb8,
    Rgba8,
    Luma8,
}

impl PixelMode {
    pub fn channels(self) -> usize {
        match self {
            PixelMode::Rgb8 => 3,
            PixelMode::Rgba8 => 4,
            PixelMode::Luma8 => 1,
        }
    }
}

/// Raw decoder output: rows of `stride` bytes, of which the first `width * channels` are
/// pixel data.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    mode: PixelMode,
    width: u32,
    height: u32,
    stride: usize,
    pixels: Vec<u8>,
    icc_profile: Option<Vec<u8>>,
}

impl DecodedImage {
    pub fn new(
        mode: PixelMode,
        width: u32,
        height: u32,
        stride: usize,
        pixels: Vec<u8>,
        icc_profile: Option<Vec<u8>>,
    ) -> Result<Self, CodecError> {
        if width == 0 || height == 0 {
            return Err(CodecError::InvalidBuffer(format!(
                "empty image {}x{}",
                width, height
            )));
        }
        let row_bytes = width as usize * mode.channels();
        if stride < row_bytes {
            return Err(CodecError::InvalidBuffer(format!(
                "stride {} shorter than row of {} bytes",
                stride, row_bytes
            )));
        }
        let needed = stride * (height as usize - 1) + row_bytes;
        if pixels.len() < needed {
            return Err(CodecError::InvalidBuffer(format!(
                "buffer holds {} bytes, {}x{} {:?} needs {}",
                pixels.len(),
                width,
                height,
                mode,
                needed
            )));
        }
        Ok(Self {
            mode,
            width,
            height,
            stride,
            pixels,
            icc_profile: icc_profile.filter(|icc| !icc.is_empty()),
        })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn icc_profile(&self) -> Option<&[u8]> {
        self.icc_profile.as_deref()
    }

    /// Drop the row padding and hand the pixels to `image`, detaching the ICC profile.
    pub fn into_dynamic(self) -> Result<(DynamicImage, Option<Vec<u8>>), CodecError> {
        let row_bytes = self.width as usize * self.mode.channels();
        let packed = if self.stride == row_bytes {
            let mut pixels = self.pixels;
            pixels.truncate(row_bytes * self.height as usize);
            pixels
        } else {
            let mut packed = Vec::with_capacity(row_bytes * self.height as usize);
            for row in self.pixels.chunks(self.stride).take(self.height as usize) {
                packed.extend_from_slice(&row[..row_bytes]);
            }
            packed
        };

        let mismatch = || CodecError::InvalidBuffer("pixel buffer size mismatch".to_string());
        let image = match self.mode {
            PixelMode::Rgb8 => RgbImage::from_raw(self.width, self.height, packed)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(mismatch)?,
            PixelMode::Rgba8 => RgbaImage::from_raw(self.width, self.height, packed)
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(mismatch)?,
            PixelMode::Luma8 => GrayImage::from_raw(self.width, self.height, packed)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(mismatch)?,
        };
        Ok((image, self.icc_profile))
    }
}

pub trait CodecAdapter: Send + Sync {
    fn decode(&self, path: &Path) -> Result<DecodedImage, CodecError>;

    fn encode(
        &self,
        rgb: &RgbImage,
        quality: JpegQuality,
        icc_profile: Option<&[u8]>,
    ) -> Result<Vec<u8>, CodecError>;
}

/// libheif decoder + `image` JPEG encoder.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibheifCodec;

impl CodecAdapter for LibheifCodec {
    fn decode(&self, path: &Path) -> Result<DecodedImage, CodecError> {
        // Reading the bytes ourselves keeps not-found/permission errors distinct and
        // works for names that are not valid UTF-8.
        let bytes = fs::read(path).map_err(|e| CodecError::from_io(path, e))?;

        let lib_heif = LibHeif::new();
        let ctx = HeifContext::read_from_bytes(&bytes)
            .map_err(|e| CodecError::decode(path, format!("failed to read HEIF container: {}", e)))?;
        let handle = ctx
            .primary_image_handle()
            .map_err(|e| CodecError::decode(path, format!("failed to get primary image: {}", e)))?;

        let icc_profile = handle.color_profile_raw().map(|profile| profile.data);
        let (chroma, mode) = if handle.has_alpha_channel() {
            (RgbChroma::Rgba, PixelMode::Rgba8)
        } else {
            (RgbChroma::Rgb, PixelMode::Rgb8)
        };

        // Container rotation/mirroring is left to the EXIF orientation step so it is
        // applied exactly once. This also skips `clap` cropping and `irot`/`imir`: a file
        // that stores its rotation only in the container comes out unrotated, and a
        // cropped image keeps its coded padding.
        let mut options = DecodingOptions::new();
        if let Some(options) = options.as_mut() {
            options.set_ignore_transformations(true);
        }

        let image = lib_heif
            .decode(&handle, ColorSpace::Rgb(chroma), options)
            .map_err(|e| CodecError::decode(path, format!("failed to decode image: {}", e)))?;

        let planes = image.planes();
        let plane = planes
            .interleaved
            .ok_or_else(|| CodecError::decode(path, "no interleaved RGB plane"))?;

        DecodedImage::new(
            mode,
            plane.width,
            plane.height,
            plane.stride,
            plane.data.to_vec(),
            icc_profile,
        )
    }

    fn encode(
        &self,
        rgb: &RgbImage,
        quality: JpegQuality,
        icc_profile: Option<&[u8]>,
    ) -> Result<Vec<u8>, CodecError> {
        encode_jpeg(rgb, quality, icc_profile)
    }
}

/// Baseline JPEG, 4:4:4, with the ICC profile in APP2 when given.
pub fn encode_jpeg(
    rgb: &RgbImage,
    quality: JpegQuality,
    icc_profile: Option<&[u8]>,
) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.get());
    if let Some(icc) = icc_profile {
        encoder
            .set_icc_profile(icc.to_vec())
            .map_err(|e| CodecError::Encode(format!("cannot embed ICC profile: {}", e)))?;
    }
    encoder
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Rotate/flip so that the pixels display correctly with orientation 1.
pub fn apply_orientation(image: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => image,
        Orientation::FlipHorizontal => image.fliph(),
        Orientation::Rotate180 => image.rotate180(),
        Orientation::FlipVertical => image.flipv(),
        Orientation::Transpose => image.rotate90().fliph(),
        Orientation::Rotate90 => image.rotate90(),
        Orientation::Transverse => image.rotate270().fliph(),
        Orientation::Rotate270 => image.rotate270(),
    }
}
