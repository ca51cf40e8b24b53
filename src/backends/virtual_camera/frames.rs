// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic JPEG frames for the virtual camera

use crate::backends::camera::{BackendError, BackendResult, CameraFacing, SizeCandidate};
use crate::pipelines::photo::{EncodingQuality, PhotoEncoder};
use image::{Rgb, RgbImage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Encoded test pattern per (facing, size)
#[derive(Debug, Default)]
pub struct FrameCache {
    frames: Mutex<HashMap<(CameraFacing, SizeCandidate), Arc<[u8]>>>,
}

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// JPEG bytes of the test pattern, encoded once per size
    pub fn jpeg(&self, facing: CameraFacing, size: SizeCandidate) -> BackendResult<Arc<[u8]>> {
        let mut frames = self.frames.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(data) = frames.get(&(facing, size)) {
            return Ok(Arc::clone(data));
        }

        let pattern = test_pattern(facing, size);
        let data = PhotoEncoder::with_quality(EncodingQuality::Medium)
            .encode_jpeg(&pattern)
            .map_err(|e| BackendError::Other(e.to_string()))?;
        debug!(camera = %facing, size = %size, bytes = data.len(), "Encoded virtual frame");

        let data: Arc<[u8]> = Arc::from(data);
        frames.insert((facing, size), Arc::clone(&data));
        Ok(data)
    }
}

/// Horizontal gradient with a marker in the top-left quadrant
///
/// The marker makes mirroring and rotation visible in stored stills.
pub fn test_pattern(facing: CameraFacing, size: SizeCandidate) -> RgbImage {
    let (width, height) = (size.width.max(1), size.height.max(1));
    let tint = if facing.is_front() { 180 } else { 40 };
    RgbImage::from_fn(width, height, |x, y| {
        if x < width / 4 && y < height / 4 {
            Rgb([255, 255, 255])
        } else {
            let shade = (x * 255 / width) as u8;
            Rgb([shade, tint, 255 - shade])
        }
    })
}
