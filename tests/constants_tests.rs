// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use freehand_camera::constants::{camera_ids, focus, sizes, timing};
use freehand_camera::CameraFacing;

#[test]
fn test_camera_ids_match_facing() {
    assert_eq!(CameraFacing::Back.camera_id(), camera_ids::BACK);
    assert_eq!(CameraFacing::Front.camera_id(), camera_ids::FRONT);
}

#[test]
fn test_still_cap_is_sixteen_by_nine() {
    let (x, y) = sizes::PREFERRED_RATIO;
    assert_eq!(sizes::MAX_IMAGE_WIDTH * y, sizes::MAX_IMAGE_HEIGHT * x);
}

#[test]
fn test_metering_weight_below_device_max() {
    let config = freehand_camera::Config::default();
    assert!(config.focus.metering_weight < focus::METERING_WEIGHT_MAX);
}

#[test]
fn test_cancel_sentinel_is_negative() {
    assert_eq!(timing::COUNTDOWN_CANCELLED_MS, -1);
}
