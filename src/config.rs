// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Policy constants from [`crate::constants`] are the defaults. A JSON file can
//! override any subset of them; missing fields keep their default value.

use crate::constants;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Name of the config directory below the platform config dir
const CONFIG_DIR_NAME: &str = "freehand-camera";

/// Name of the config file
const CONFIG_FILE_NAME: &str = "config.json";

/// Timing of scheduled capture work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureTiming {
    /// Delay between burst requests
    pub burst_interval_ms: u64,
    /// Countdown tick of the free-hand burst
    pub countdown_tick_ms: u64,
    /// Touch focus reverts to face focus after this idle time
    pub touch_focus_revert_ms: u64,
}

impl CaptureTiming {
    pub fn burst_interval(&self) -> Duration {
        Duration::from_millis(self.burst_interval_ms)
    }

    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }

    pub fn touch_focus_revert(&self) -> Duration {
        Duration::from_millis(self.touch_focus_revert_ms)
    }
}

impl Default for CaptureTiming {
    fn default() -> Self {
        Self {
            burst_interval_ms: constants::timing::BURST_INTERVAL.as_millis() as u64,
            countdown_tick_ms: constants::timing::COUNTDOWN_TICK.as_millis() as u64,
            touch_focus_revert_ms: constants::timing::TOUCH_FOCUS_REVERT.as_millis() as u64,
        }
    }
}

/// Focus hysteresis and metering tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusTuning {
    /// Face centre movement (sensor px) that triggers a refocus
    pub face_move_threshold: i32,
    /// Half side of the square metered around a touch (sensor px)
    pub touch_half_size: i32,
    /// Weight given to every metering region
    pub metering_weight: u32,
}

impl Default for FocusTuning {
    fn default() -> Self {
        Self {
            face_move_threshold: constants::focus::FACE_MOVE_THRESHOLD,
            touch_half_size: constants::focus::TOUCH_HALF_SIZE,
            metering_weight: constants::focus::METERING_WEIGHT_MAX - 1,
        }
    }
}

/// Where and how captured images are stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Output directory; `None` means `<Pictures>/Freehand`
    pub photo_dir: Option<PathBuf>,
    /// Prefix of generated file names
    pub name_prefix: String,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl StorageSettings {
    /// Resolve the output directory
    pub fn resolved_photo_dir(&self) -> PathBuf {
        if let Some(dir) = &self.photo_dir {
            return dir.clone();
        }
        dirs::picture_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(constants::storage::MEDIA_FOLDER)
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            photo_dir: None,
            name_prefix: constants::storage::NAME_PREFIX.to_string(),
            jpeg_quality: constants::pipeline::JPEG_QUALITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scheduled capture timing
    pub timing: CaptureTiming,
    /// Focus tuning
    pub focus: FocusTuning,
    /// Largest preferred 16:9 still width
    pub max_image_width: u32,
    /// Largest preferred 16:9 still height
    pub max_image_height: u32,
    /// Image reader buffer depth
    pub image_reader_depth: usize,
    /// Storage settings
    pub storage: StorageSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timing: CaptureTiming::default(),
            focus: FocusTuning::default(),
            max_image_width: constants::sizes::MAX_IMAGE_WIDTH,
            max_image_height: constants::sizes::MAX_IMAGE_HEIGHT,
            image_reader_depth: constants::pipeline::IMAGE_READER_DEPTH,
            storage: StorageSettings::default(),
        }
    }
}

impl Config {
    /// Default config file location (`<config dir>/freehand-camera/config.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Load the given file, or the default location; a missing file yields defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        Self::load(&path)
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Area cap for the preferred still size
    pub fn max_image_area(&self) -> u64 {
        self.max_image_width as u64 * self.max_image_height as u64
    }
}
