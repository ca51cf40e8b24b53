// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants
//!
//! These are the default policy values. Everything that may need device-specific
//! tuning is copied into [`crate::config::Config`] and read from there at runtime.

use std::time::Duration;

/// Logical camera ids
pub mod camera_ids {
    /// Back-facing logical camera
    pub const BACK: &str = "0";

    /// Front-facing logical camera
    pub const FRONT: &str = "1";
}

/// Capture scheduling constants
pub mod timing {
    use super::Duration;

    /// Delay between two still requests in burst mode
    pub const BURST_INTERVAL: Duration = Duration::from_millis(100);

    /// Countdown tick before a free-hand burst starts
    pub const COUNTDOWN_TICK: Duration = Duration::from_millis(1000);

    /// Idle time after a touch before focus returns to detected faces
    pub const TOUCH_FOCUS_REVERT: Duration = Duration::from_millis(4000);

    /// Remaining-time value reported when a free-hand countdown is cancelled
    pub const COUNTDOWN_CANCELLED_MS: i64 = -1;
}

/// Resolution negotiation constants
pub mod sizes {
    /// Largest still width preferred for 16:9 output
    pub const MAX_IMAGE_WIDTH: u32 = 1920;

    /// Largest still height preferred for 16:9 output
    pub const MAX_IMAGE_HEIGHT: u32 = 1080;

    /// Preferred still aspect ratio
    pub const PREFERRED_RATIO: (u32, u32) = (16, 9);

    /// Fallback still aspect ratio
    pub const FALLBACK_RATIO: (u32, u32) = (4, 3);
}

/// Focus and metering constants
pub mod focus {
    /// A detected face must move further than this (sensor px, either axis) to refocus
    pub const FACE_MOVE_THRESHOLD: i32 = 50;

    /// Half the side of the square metered around a touch point (sensor px)
    pub const TOUCH_HALF_SIZE: i32 = 100;

    /// Maximum metering weight accepted by the device
    pub const METERING_WEIGHT_MAX: u32 = 1000;

    /// Face box scale on the back camera overlay
    pub const BACK_FACE_SCALE: f32 = 1.3;

    /// Face box scale on the front camera overlay
    pub const FRONT_FACE_SCALE: f32 = 1.0;
}

/// Image pipeline constants
pub mod pipeline {
    /// Maximum number of images the reader buffers before the producer stalls
    pub const IMAGE_READER_DEPTH: usize = 2;

    /// JPEG quality used by the storage collaborator
    pub const JPEG_QUALITY: u8 = 100;
}

/// Storage constants
pub mod storage {
    /// Prefix of generated image names (`<prefix>-<epochMillis>`)
    pub const NAME_PREFIX: &str = "Freehand";

    /// Folder created below the user's pictures directory
    pub const MEDIA_FOLDER: &str = "Freehand";
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
