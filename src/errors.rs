// SPDX-License-Identifier: MPL-2.0

//! Error types for the camera core
//!
//! The taxonomy follows how far an error is allowed to travel:
//!
//! - [`CameraError::DeviceAccess`] is fatal to the current session (it is closed)
//! - [`CameraError::FrameAcquisition`], [`CameraError::Decode`] and
//!   [`CameraError::Persistence`] are per-frame and end up in a `captureFailed` callback
//! - [`CameraError::FocusApplication`] is logged and swallowed

use std::fmt;

/// Result type alias using CameraError
pub type CameraResult<T> = Result<T, CameraError>;

/// Main camera core error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// Open/configure/capture failure reported by the device service
    DeviceAccess(String),
    /// The image reader could not hand out a frame
    FrameAcquisition(String),
    /// Metering regions could not be applied to the preview session
    FocusApplication(String),
    /// The compressed frame could not be decoded or cropped
    Decode(String),
    /// The storage collaborator rejected the image
    Persistence(String),
    /// Size negotiation failed
    Negotiation(NegotiationError),
    /// The session is not open (or was closed while the request was queued)
    SessionClosed,
}

/// Size negotiation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationError {
    /// The device reported an empty size list
    NoSupportedSizes,
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Config file could not be read or written
    Io(String),
    /// Config file is not valid JSON for [`crate::config::Config`]
    Parse(String),
}

impl CameraError {
    /// Whether the error ends the current session
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, CameraError::DeviceAccess(_))
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::DeviceAccess(msg) => write!(f, "Device access failed: {}", msg),
            CameraError::FrameAcquisition(msg) => write!(f, "Frame acquisition failed: {}", msg),
            CameraError::FocusApplication(msg) => write!(f, "Focus application failed: {}", msg),
            CameraError::Decode(msg) => write!(f, "Decoding failed: {}", msg),
            CameraError::Persistence(msg) => write!(f, "Saving image failed: {}", msg),
            CameraError::Negotiation(e) => write!(f, "Size negotiation failed: {}", e),
            CameraError::SessionClosed => write!(f, "Camera session is closed"),
        }
    }
}

impl fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationError::NoSupportedSizes => write!(f, "No supported sizes"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl std::error::Error for CameraError {}
impl std::error::Error for NegotiationError {}
impl std::error::Error for ConfigError {}

impl From<NegotiationError> for CameraError {
    fn from(err: NegotiationError) -> Self {
        CameraError::Negotiation(err)
    }
}

impl From<crate::backends::camera::BackendError> for CameraError {
    fn from(err: crate::backends::camera::BackendError) -> Self {
        CameraError::DeviceAccess(err.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
