// SPDX-License-Identifier: MPL-2.0

//! Freehand Camera - capture core of a hands-free phone camera
//!
//! This library drives a camera device through a preview session and takes
//! pictures on demand: one at a time, as a fixed-interval burst, or as a
//! "free-hand" burst that counts down before taking a set number of pictures.
//! Metering follows detected faces, or a tapped point for a few seconds.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Device service traits, session lifecycle and a virtual camera
//! - [`capture`]: Capture mode state machine and listener events
//! - [`focus`]: Touch and face metering, face overlay geometry
//! - [`pipelines`]: Still decoding, orientation and persistence
//! - [`storage`]: Image store and naming
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let service = Arc::new(VirtualCameraService::new());
//! let store = Arc::new(DirectoryStore::new(dir, PhotoEncoder::new()));
//! let (mut session, events) = CameraSession::new(service, Config::default(), store);
//! session.open_camera(CameraFacing::Back)?;
//! let outcome = session.capture()?.recv()?;
//! ```

pub mod backends;
pub mod capture;
pub mod config;
pub mod constants;
pub mod errors;
pub mod focus;
pub mod pipelines;
pub mod storage;

// Re-export commonly used types
pub use backends::camera::{CameraFacing, CameraSession, SessionEvent, SessionState};
pub use backends::virtual_camera::VirtualCameraService;
pub use capture::{CaptureEvent, FreeHandPlan, ModeCapture};
pub use config::Config;
pub use errors::{CameraError, CameraResult};
pub use focus::ModeFocus;
pub use storage::{DirectoryStore, ImageStore};
