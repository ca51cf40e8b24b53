// SPDX-License-Identifier: MPL-2.0

//! Storage of captured stills

use crate::errors::{CameraError, CameraResult};
use crate::pipelines::photo::encoding::{JPEG_EXTENSION, PhotoEncoder};
use image::RgbImage;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where processed stills go
///
/// `save` runs on a blocking worker thread and may take as long as it needs.
pub trait ImageStore: Send + Sync {
    /// Persist `image` under `name` (no extension); returns where it ended up
    fn save(&self, image: &RgbImage, name: &str) -> CameraResult<PathBuf>;
}

/// Generated image name: `<prefix>-<epoch millis>`
pub fn generate_name(prefix: &str) -> String {
    format!("{}-{}", prefix, chrono::Utc::now().timestamp_millis())
}

/// Writes JPEG files into a directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
    encoder: PhotoEncoder,
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>, encoder: PhotoEncoder) -> Self {
        Self {
            dir: dir.into(),
            encoder,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a still named `name` is written to
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, JPEG_EXTENSION))
    }
}

impl ImageStore for DirectoryStore {
    fn save(&self, image: &RgbImage, name: &str) -> CameraResult<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            CameraError::Persistence(format!("Cannot create {}: {}", self.dir.display(), e))
        })?;

        let data = self.encoder.encode_jpeg(image)?;
        let path = self.path_for(name);
        // Names only have millisecond resolution; never overwrite an earlier still
        let mut file = std::fs::File::create_new(&path).map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => {
                CameraError::Persistence(format!("{} already exists", path.display()))
            }
            _ => CameraError::Persistence(format!("Failed to save photo: {}", e)),
        })?;
        file.write_all(&data)
            .map_err(|e| CameraError::Persistence(format!("Failed to save photo: {}", e)))?;

        info!(path = %path.display(), size = data.len(), "Photo saved");
        Ok(path)
    }
}

/// Newest JPEG in `dir`, by modification time
pub fn latest_photo(dir: &Path) -> Option<PathBuf> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .ok()?
        .flatten()
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(JPEG_EXTENSION))
                .unwrap_or(false)
        })
        .collect();

    // Newest first
    entries.sort_by_key(|e| {
        e.metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .map(std::cmp::Reverse)
    });

    let latest = entries.first().map(|e| e.path());
    debug!(path = ?latest, "Latest photo");
    latest
}
