// SPDX-License-Identifier: MPL-2.0

//! Frame acquisition from the image reader

use crate::backends::camera::{ImageReader, RawFrame};
use crate::errors::{CameraError, CameraResult};
use tracing::{debug, warn};

/// Take the newest frame from the reader
///
/// Older queued frames are dropped by the reader. Any reader error becomes a
/// [`CameraError::FrameAcquisition`].
pub fn acquire_frame(reader: &mut dyn ImageReader) -> CameraResult<RawFrame> {
    match reader.acquire_latest_image() {
        Ok(frame) => {
            debug!(
                width = frame.width,
                height = frame.height,
                bytes = frame.data.len(),
                "Frame acquired from image reader"
            );
            Ok(frame)
        }
        Err(e) => {
            warn!(error = %e, "Image reader did not hand out a frame");
            Err(CameraError::FrameAcquisition(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{BackendError, BackendResult, SizeCandidate};
    use std::sync::Arc;

    struct OneShotReader {
        frame: Option<RawFrame>,
    }

    impl ImageReader for OneShotReader {
        fn size(&self) -> SizeCandidate {
            SizeCandidate::new(4, 4)
        }

        fn acquire_latest_image(&mut self) -> BackendResult<RawFrame> {
            self.frame.take().ok_or(BackendError::NoImageAvailable)
        }

        fn close(&mut self) {}
    }

    #[test]
    fn test_acquire_then_empty() {
        let mut reader = OneShotReader {
            frame: Some(RawFrame::new(4, 4, Arc::from(vec![1u8, 2, 3]), None)),
        };
        let frame = acquire_frame(&mut reader).unwrap();
        assert_eq!(frame.data.len(), 3);

        assert!(matches!(
            acquire_frame(&mut reader),
            Err(CameraError::FrameAcquisition(_))
        ));
    }
}
