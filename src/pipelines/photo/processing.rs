// SPDX-License-Identifier: MPL-2.0

//! Decoding and orientation of captured stills
//!
//! The sensor delivers landscape JPEGs. Before storing, a still is cropped to the
//! aspect of the portrait preview viewport and turned upright. Front camera
//! stills are mirrored so they match what the preview showed.

use crate::backends::camera::{CameraFacing, SizeCandidate};
use crate::errors::{CameraError, CameraResult};
use image::{RgbImage, imageops};
use tracing::debug;

/// Decode the compressed frame bytes
pub fn decode_frame(data: &[u8]) -> CameraResult<RgbImage> {
    let decoded = image::load_from_memory(data)
        .map_err(|e| CameraError::Decode(format!("Invalid JPEG frame: {}", e)))?;
    Ok(decoded.to_rgb8())
}

/// Horizontal window `(x, width)` of a landscape frame that matches the viewport
///
/// The crop keeps the full frame height; its width is `height * viewport.height /
/// viewport.width`, centred, and never wider than the frame.
pub fn crop_window(frame_width: u32, frame_height: u32, viewport: SizeCandidate) -> (u32, u32) {
    let matched = frame_height as u64 * viewport.height as u64 / viewport.width.max(1) as u64;
    let matched = (matched.min(u32::MAX as u64) as u32).clamp(1, frame_width.max(1));
    let x = frame_width.saturating_sub(matched) / 2;
    (x, matched)
}

/// Crop to the viewport aspect, mirror (front camera) and rotate 90° clockwise
pub fn configure_image(
    image: &RgbImage,
    viewport: SizeCandidate,
    facing: CameraFacing,
) -> CameraResult<RgbImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(CameraError::Decode("Empty frame".to_string()));
    }

    let (x, width) = crop_window(image.width(), image.height(), viewport);
    let cropped = imageops::crop_imm(image, x, 0, width, image.height()).to_image();

    let oriented = if facing.is_front() {
        imageops::rotate90(&imageops::flip_horizontal(&cropped))
    } else {
        imageops::rotate90(&cropped)
    };

    debug!(
        source = %format!("{}x{}", image.width(), image.height()),
        crop_x = x,
        crop_width = width,
        result = %format!("{}x{}", oriented.width(), oriented.height()),
        "Still configured"
    );
    Ok(oriented)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_crop_window_matches_portrait_viewport() {
        // 9:16 viewport on a 16:9 frame keeps everything
        assert_eq!(crop_window(1920, 1080, SizeCandidate::new(1080, 1920)), (0, 1920));
        // 3:4 viewport keeps the centre 1440 columns
        assert_eq!(crop_window(1920, 1080, SizeCandidate::new(1080, 1440)), (240, 1440));
        // A viewport wider than the frame is clamped to the frame
        assert_eq!(crop_window(640, 480, SizeCandidate::new(100, 1000)), (0, 640));
    }

    #[test]
    fn test_configure_rotates_upright() {
        let image = RgbImage::new(40, 20);
        let out = configure_image(&image, SizeCandidate::new(20, 40), CameraFacing::Back).unwrap();
        assert_eq!((out.width(), out.height()), (20, 40));
    }

    #[test]
    fn test_front_camera_is_mirrored() {
        let mut image = RgbImage::new(4, 2);
        // Mark the top-left pixel
        image.put_pixel(0, 0, Rgb([255, 0, 0]));

        // Back: rotate90 moves (0,0) to the top-right corner
        let back = configure_image(&image, SizeCandidate::new(2, 4), CameraFacing::Back).unwrap();
        assert_eq!(back.get_pixel(1, 0), &Rgb([255, 0, 0]));

        // Front: mirrored first, so the mark ends up bottom-right
        let front = configure_image(&image, SizeCandidate::new(2, 4), CameraFacing::Front).unwrap();
        assert_eq!(front.get_pixel(1, 3), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_frame(&[0, 1, 2, 3]),
            Err(CameraError::Decode(_))
        ));
    }
}
