//! Frame decode, timestamp watermark and JPEG re-encode.
//!
//! The codec is a pure transform: raw image bytes plus a wall-clock
//! instant in, timestamped JPEG bytes out. It holds no shared state and
//! touches neither the live slot nor the archive.

mod overlay;

use bytes::Bytes;
use chrono::{DateTime, TimeZone};
use image::codecs::jpeg::JpegEncoder;
use overlay::LabelStyle;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

/// Format of the watermark drawn onto every frame.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors that can occur while transcoding a frame.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode JPEG: {0}")]
    Encode(#[source] image::ImageError),
}

/// Codec settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self { jpeg_quality: 95 }
    }
}

/// Decodes incoming frames, stamps them and re-encodes to JPEG.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    quality: u8,
    style: LabelStyle,
}

impl FrameCodec {
    /// Creates a codec with the given JPEG quality (clamped to 1-100).
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            style: LabelStyle::default(),
        }
    }

    pub fn from_config(config: &CodecConfig) -> Self {
        Self::new(config.jpeg_quality)
    }

    #[inline]
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Transcodes `raw` into a JPEG carrying `stamp` as a visible label.
    ///
    /// JPEG, PNG and BMP inputs are accepted. Anything else, including
    /// truncated or empty buffers, fails with [`CodecError::Decode`].
    pub fn encode<Z>(&self, raw: &[u8], stamp: &DateTime<Z>) -> Result<Bytes, CodecError>
    where
        Z: TimeZone,
        Z::Offset: Display,
    {
        let mut frame = image::load_from_memory(raw)
            .map_err(CodecError::Decode)?
            .to_rgb8();

        let label = stamp.format(TIMESTAMP_FORMAT).to_string();
        overlay::draw_label(&mut frame, &label, &self.style);

        let mut jpeg = Vec::with_capacity(raw.len());
        JpegEncoder::new_with_quality(&mut jpeg, self.quality)
            .encode_image(&frame)
            .map_err(CodecError::Encode)?;

        tracing::trace!(
            width = frame.width(),
            height = frame.height(),
            input_bytes = raw.len(),
            output_bytes = jpeg.len(),
            "Transcoded frame"
        );

        Ok(Bytes::from(jpeg))
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::from_config(&CodecConfig::default())
    }
}

/// Encodes `frame` as PNG. Used to build test inputs.
#[cfg(test)]
pub(crate) fn png_bytes(frame: &image::RgbImage) -> Vec<u8> {
    let mut out = std::io::Cursor::new(Vec::new());
    frame
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}
