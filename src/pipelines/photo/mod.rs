// SPDX-License-Identifier: MPL-2.0

//! Still image pipeline
//!
//! ```text
//! ImageReader → acquire → decode → crop/orient → ImageStore
//!                  ↓
//!       preview keeps running
//! ```
//!
//! # Pipeline Stages
//!
//! 1. **Acquire**: newest frame from the image reader (on the session context)
//! 2. **Decode**: JPEG bytes to RGB (blocking worker)
//! 3. **Configure**: crop to the viewport aspect, mirror front stills, rotate upright
//! 4. **Persist**: hand the image to the [`ImageStore`]
//!
//! The raw frame is closed as soon as it is decoded, and on every error path.
//! Admission (one frame in flight) is handled by the caller.

pub mod capture;
pub mod encoding;
pub mod processing;

pub use capture::acquire_frame;
pub use encoding::{EncodingQuality, PhotoEncoder};
pub use processing::{configure_image, decode_frame};

use crate::backends::camera::{CameraFacing, RawFrame, SizeCandidate};
use crate::errors::{CameraError, CameraResult};
use crate::storage::{ImageStore, generate_name};
use image::RgbImage;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// A still that went through the pipeline and was stored
#[derive(Debug, Clone)]
pub struct CapturedPhoto {
    /// Generated name (`<prefix>-<epoch millis>`)
    pub name: String,
    /// Location reported by the store
    pub path: PathBuf,
    pub image: Arc<RgbImage>,
}

impl CapturedPhoto {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[cfg(test)]
    pub(crate) fn for_tests(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: PathBuf::from(format!("/tmp/{}.jpg", name)),
            image: Arc::new(RgbImage::new(1, 1)),
        }
    }
}

/// How a frame should be oriented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameJob {
    /// Portrait viewport the still is cropped to
    pub viewport: SizeCandidate,
    pub facing: CameraFacing,
}

/// Decode, orient and persist stills
#[derive(Clone)]
pub struct ImagePipeline {
    store: Arc<dyn ImageStore>,
    name_prefix: String,
}

impl ImagePipeline {
    pub fn new(store: Arc<dyn ImageStore>, name_prefix: impl Into<String>) -> Self {
        Self {
            store,
            name_prefix: name_prefix.into(),
        }
    }

    /// Run the blocking stages on the current thread
    pub fn process(&self, frame: RawFrame, job: FrameJob) -> CameraResult<CapturedPhoto> {
        let decoded = decode_frame(&frame.data);
        // The reader slot is free as soon as the bytes are decoded
        frame.close();
        let decoded = decoded?;

        let image = configure_image(&decoded, job.viewport, job.facing)?;
        let name = generate_name(&self.name_prefix);
        let path = self.store.save(&image, &name)?;

        debug!(name = %name, width = image.width(), height = image.height(), "Still processed");
        Ok(CapturedPhoto {
            name,
            path,
            image: Arc::new(image),
        })
    }

    /// Run the blocking stages on the runtime's blocking pool
    pub async fn process_async(
        &self,
        frame: RawFrame,
        job: FrameJob,
    ) -> CameraResult<CapturedPhoto> {
        info!(
            width = frame.width,
            height = frame.height,
            facing = %job.facing,
            "Processing still"
        );
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.process(frame, job))
            .await
            .map_err(|e| CameraError::Decode(format!("Processing task error: {}", e)))?
    }
}

impl std::fmt::Debug for ImagePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePipeline")
            .field("name_prefix", &self.name_prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DirectoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RejectingStore;

    impl ImageStore for RejectingStore {
        fn save(&self, _image: &RgbImage, _name: &str) -> CameraResult<PathBuf> {
            Err(CameraError::Persistence("disk full".into()))
        }
    }

    fn jpeg_frame(width: u32, height: u32, released: &Arc<AtomicUsize>) -> RawFrame {
        let image = RgbImage::from_pixel(width, height, image::Rgb([10, 200, 30]));
        let data = PhotoEncoder::new().encode_jpeg(&image).unwrap();
        let counter = Arc::clone(released);
        RawFrame::new(
            width,
            height,
            Arc::from(data),
            Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        )
    }

    const JOB: FrameJob = FrameJob {
        viewport: SizeCandidate::new(9, 16),
        facing: CameraFacing::Back,
    };

    #[test]
    fn test_process_stores_upright_still() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DirectoryStore::new(dir.path(), PhotoEncoder::new()));
        let pipeline = ImagePipeline::new(store, "Freehand");
        let released = Arc::new(AtomicUsize::new(0));

        let photo = pipeline.process(jpeg_frame(64, 36, &released), JOB).unwrap();
        assert_eq!((photo.width(), photo.height()), (36, 64));
        assert!(photo.name.starts_with("Freehand-"));
        assert!(photo.path.exists());
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_persistence_failure_still_closes_frame() {
        let pipeline = ImagePipeline::new(Arc::new(RejectingStore), "Freehand");
        let released = Arc::new(AtomicUsize::new(0));

        let result = pipeline.process(jpeg_frame(16, 9, &released), JOB);
        assert!(matches!(result, Err(CameraError::Persistence(_))));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_corrupt_frame_is_decode_error() {
        let pipeline = ImagePipeline::new(Arc::new(RejectingStore), "Freehand");
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let frame = RawFrame::new(
            4,
            4,
            Arc::from(vec![0u8; 16]),
            Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        );

        assert!(matches!(
            pipeline.process(frame, JOB),
            Err(CameraError::Decode(_))
        ));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_process_async_uses_blocking_pool() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DirectoryStore::new(dir.path(), PhotoEncoder::new()));
        let pipeline = ImagePipeline::new(store, "Async");
        let released = Arc::new(AtomicUsize::new(0));

        let photo = pipeline
            .process_async(jpeg_frame(32, 18, &released), JOB)
            .await
            .unwrap();
        assert!(photo.name.starts_with("Async-"));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
