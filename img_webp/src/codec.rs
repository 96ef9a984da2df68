//! Decode/encode boundary
//!
//! Workers only see [`ImageCodec`]; the production implementation decodes with
//! the `image` crate and encodes with libwebp. Tests inject fakes.

use crate::job::ConversionOptions;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("{0}")]
    Decode(String),

    #[error("{0}")]
    Encode(String),
}

/// A decoded source image plus the format it was detected as.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
}

/// Settings handed to the encoder after the lossless override is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeSettings {
    pub quality: f32,
    pub lossless: bool,
}

/// Lossless override: PNG sources and an explicit `lossless` option both force
/// lossless encoding; otherwise the quality value passes through unchanged.
pub fn encode_settings(options: &ConversionOptions, source_format: ImageFormat) -> EncodeSettings {
    EncodeSettings {
        quality: f32::from(options.quality),
        lossless: options.lossless || source_format == ImageFormat::Png,
    }
}

pub trait ImageCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, CodecError>;

    fn encode(&self, image: &DecodedImage, settings: EncodeSettings) -> Result<Vec<u8>, CodecError>;
}

/// PNG/JPEG/GIF in, WebP out.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebpCodec;

impl ImageCodec for WebpCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, CodecError> {
        let format = image::guess_format(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;
        let image = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| CodecError::Decode(e.to_string()))?;
        Ok(DecodedImage { image, format })
    }

    fn encode(&self, image: &DecodedImage, settings: EncodeSettings) -> Result<Vec<u8>, CodecError> {
        let rgba = image.image.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(CodecError::Encode(format!("empty image {}x{}", width, height)));
        }

        let encoder = webp::Encoder::from_rgba(rgba.as_raw(), width, height);
        let memory = encoder
            .encode_simple(settings.lossless, settings.quality)
            .map_err(|e| CodecError::Encode(format!("libwebp: {:?}", e)))?;
        Ok(memory.to_vec())
    }
}
