// SPDX-License-Identifier: MPL-2.0

//! Camera device service abstraction
//!
//! The core never talks to hardware directly. It drives a [`CameraService`]
//! through four narrow traits and receives asynchronous notifications as
//! [`DeviceEvent`] messages.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   CameraSession     │  ← UI-side handle (commands in, events out)
//! └──────────┬──────────┘
//!            │ SessionCommand
//!            ▼
//! ┌─────────────────────┐
//! │ BackgroundContext   │  ← one thread per open session
//! │   SessionCore       │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ CameraService trait │  ← device, session, image reader
//! └─────────────────────┘
//! ```

pub mod executor;
pub mod manager;
pub mod sizes;
pub mod types;

pub use manager::{CameraSession, SessionEvent, SessionState};
pub use sizes::{AspectRatio, SizeCandidate, SizeMap, SizeRequest};
pub use types::*;

/// Entry point of a device service
pub trait CameraService: Send + Sync {
    /// Ids of every logical camera
    fn camera_ids(&self) -> Vec<String>;

    /// Static characteristics of a camera
    fn characteristics(&self, camera_id: &str) -> BackendResult<CameraCharacteristics>;

    /// Start opening a camera
    ///
    /// Returns once the request is accepted. The outcome arrives on `events` as
    /// [`DeviceEvent::Opened`] or [`DeviceEvent::Error`].
    fn open_device(&self, camera_id: &str, events: DeviceEventSink) -> BackendResult<()>;
}

/// An open camera device
pub trait CameraDevice: Send {
    fn id(&self) -> &str;

    /// Create the JPEG image reader
    ///
    /// At most `max_images` frames can be held at once; further stills stall
    /// until a frame is closed.
    fn create_image_reader(
        &mut self,
        size: SizeCandidate,
        max_images: usize,
    ) -> BackendResult<Box<dyn ImageReader>>;

    /// Start configuring a capture session on the given outputs
    ///
    /// The outcome arrives as [`DeviceEvent::SessionConfigured`] or
    /// [`DeviceEvent::SessionConfigureFailed`].
    fn create_capture_session(
        &mut self,
        preview_size: SizeCandidate,
        outputs: &[OutputTarget],
    ) -> BackendResult<()>;

    /// Close the device; no events are delivered afterwards
    fn close(&mut self);
}

/// A configured capture session
pub trait CaptureSession: Send {
    fn set_repeating_request(&mut self, request: &CaptureRequest) -> BackendResult<()>;

    fn stop_repeating(&mut self) -> BackendResult<()>;

    /// Submit a single request; completion arrives as [`DeviceEvent::CaptureCompleted`]
    fn capture(&mut self, request: &CaptureRequest) -> BackendResult<()>;

    fn close(&mut self);
}

/// Queue of compressed frames written by still requests
pub trait ImageReader: Send {
    fn size(&self) -> SizeCandidate;

    /// Newest queued frame; older queued frames are dropped
    fn acquire_latest_image(&mut self) -> BackendResult<RawFrame>;

    fn close(&mut self);
}
