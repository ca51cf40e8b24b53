// SPDX-License-Identifier: GPL-3.0-only

//! JPEG encoding of processed stills

use crate::errors::{CameraError, CameraResult};
use image::RgbImage;
use tracing::debug;

/// File extension written by [`PhotoEncoder`]
pub const JPEG_EXTENSION: &str = "jpg";

/// Encoding quality settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingQuality {
    /// Low quality (high compression)
    Low,
    /// Medium quality (balanced)
    Medium,
    /// High quality (low compression)
    High,
    /// Maximum quality
    Maximum,
    /// Explicit quality, clamped to 1-100
    Custom(u8),
}

impl EncodingQuality {
    /// Get JPEG quality value (1-100)
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            EncodingQuality::Low => 60,
            EncodingQuality::Medium => 80,
            EncodingQuality::High => 92,
            EncodingQuality::Maximum => 100,
            EncodingQuality::Custom(q) => (*q).clamp(1, 100),
        }
    }
}

impl From<u8> for EncodingQuality {
    fn from(quality: u8) -> Self {
        match quality {
            100.. => EncodingQuality::Maximum,
            q => EncodingQuality::Custom(q),
        }
    }
}

/// JPEG encoder for stills
#[derive(Debug, Clone, Copy)]
pub struct PhotoEncoder {
    quality: EncodingQuality,
}

impl PhotoEncoder {
    /// Create an encoder with maximum quality
    pub fn new() -> Self {
        Self {
            quality: EncodingQuality::Maximum,
        }
    }

    pub fn with_quality(quality: EncodingQuality) -> Self {
        Self { quality }
    }

    pub fn quality(&self) -> EncodingQuality {
        self.quality
    }

    /// Encode an RGB image as JPEG
    pub fn encode_jpeg(&self, image: &RgbImage) -> CameraResult<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);

        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
            &mut cursor,
            self.quality.jpeg_quality(),
        );

        encoder
            .encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| CameraError::Persistence(format!("JPEG encoding failed: {}", e)))?;

        debug!(
            width = image.width(),
            height = image.height(),
            size = buffer.len(),
            "JPEG encoded"
        );
        Ok(buffer)
    }
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jpeg_quality_values() {
        assert_eq!(EncodingQuality::Low.jpeg_quality(), 60);
        assert_eq!(EncodingQuality::Medium.jpeg_quality(), 80);
        assert_eq!(EncodingQuality::High.jpeg_quality(), 92);
        assert_eq!(EncodingQuality::Maximum.jpeg_quality(), 100);
        assert_eq!(EncodingQuality::Custom(0).jpeg_quality(), 1);
        assert_eq!(EncodingQuality::from(100), EncodingQuality::Maximum);
        assert_eq!(EncodingQuality::from(75).jpeg_quality(), 75);
    }

    #[test]
    fn test_encode_produces_jpeg() {
        let image = RgbImage::from_pixel(16, 8, image::Rgb([200, 10, 10]));
        let data = PhotoEncoder::new().encode_jpeg(&image).unwrap();
        // SOI marker
        assert_eq!(&data[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }
}
