// SPDX-License-Identifier: GPL-3.0-only

//! Face boxes in preview coordinates
//!
//! Detected faces are reported in sensor space. The overlay draws them on a
//! preview texture that is rotated 90° from the sensor and, on the front camera,
//! mirrored.

use crate::backends::camera::{CameraFacing, Rect, SizeCandidate};
use crate::constants::focus::{BACK_FACE_SCALE, FRONT_FACE_SCALE};
use serde::{Deserialize, Serialize};

/// Rectangle on the preview texture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl PreviewRect {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.left + self.right) / 2.0, (self.top + self.bottom) / 2.0)
    }
}

/// Everything needed to map sensor rectangles onto the preview
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayGeometry {
    pub facing: CameraFacing,
    /// Sensor pixel array
    pub sensor: SizeCandidate,
    pub texture_width: u32,
    pub texture_height: u32,
    /// Device held in landscape
    pub landscape: bool,
}

/// Map a face's sensor bounds onto the preview texture
pub fn face_bounds_to_preview(bounds: &Rect, geometry: &OverlayGeometry) -> PreviewRect {
    let sensor_w = geometry.sensor.width.max(1) as f32;
    let sensor_h = geometry.sensor.height.max(1) as f32;
    let tex_w = geometry.texture_width as f32;
    let tex_h = geometry.texture_height as f32;
    let face_cx = bounds.center_x() as f32;
    let face_cy = bounds.center_y() as f32;

    let (preview_x, preview_y, scale) = if geometry.facing.is_front() {
        let center_y = (1.0 - face_cx / sensor_w) * tex_h;
        let center_x = (1.0 - face_cy / sensor_h) * tex_w;
        (center_x, center_y, FRONT_FACE_SCALE)
    } else {
        let center_y = face_cx * tex_h / sensor_w;
        let center_x = (1.0 - face_cy / sensor_h) * tex_w;
        let plus_x = uncalibrated_back_camera_x_correction(
            center_x,
            geometry.texture_width,
            geometry.sensor.height,
        );
        (center_x + plus_x, center_y, BACK_FACE_SCALE)
    };

    let (width_face, height_face) = if geometry.landscape {
        (
            bounds.height() as f32 * tex_w / sensor_h * scale,
            bounds.width() as f32 * tex_h / sensor_w * scale,
        )
    } else {
        (
            bounds.width() as f32 * tex_h / sensor_w * scale,
            bounds.height() as f32 * tex_w / sensor_h * scale,
        )
    };

    PreviewRect {
        left: preview_x - height_face / 2.0,
        top: preview_y - width_face / 2.0,
        right: preview_x + height_face / 2.0,
        bottom: preview_y + width_face / 2.0,
    }
}

/// Horizontal offset applied to back-camera face boxes
///
/// Empirical: the touch mapping inverts cleanly but the face boxes land off
/// centre on the back camera without this term. It is not derived from the
/// optics and needs recalibration against real hardware. The offset is truncated
/// to whole pixels.
pub fn uncalibrated_back_camera_x_correction(
    center_x: f32,
    texture_width: u32,
    sensor_height: u32,
) -> f32 {
    let half_width = (texture_width / 2) as f32;
    let offset = (center_x - half_width) * (texture_width as f32 / sensor_height.max(1) as f32);
    offset.trunc()
}
