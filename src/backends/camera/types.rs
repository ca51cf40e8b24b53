// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for the camera device service

use super::sizes::SizeCandidate;
use super::{CameraDevice, CaptureSession};
use crate::focus::FocusRegion;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Logical camera unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    #[default]
    Back,
    Front,
}

impl CameraFacing {
    /// Device service id of this unit
    pub fn camera_id(&self) -> &'static str {
        match self {
            CameraFacing::Back => crate::constants::camera_ids::BACK,
            CameraFacing::Front => crate::constants::camera_ids::FRONT,
        }
    }

    pub fn from_camera_id(id: &str) -> Option<Self> {
        match id {
            crate::constants::camera_ids::BACK => Some(CameraFacing::Back),
            crate::constants::camera_ids::FRONT => Some(CameraFacing::Front),
            _ => None,
        }
    }

    /// The other unit
    pub fn opposite(&self) -> Self {
        match self {
            CameraFacing::Back => CameraFacing::Front,
            CameraFacing::Front => CameraFacing::Back,
        }
    }

    pub fn is_front(&self) -> bool {
        matches!(self, CameraFacing::Front)
    }
}

impl std::fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraFacing::Back => write!(f, "back"),
            CameraFacing::Front => write!(f, "front"),
        }
    }
}

impl std::str::FromStr for CameraFacing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "back" | "0" => Ok(CameraFacing::Back),
            "front" | "1" => Ok(CameraFacing::Front),
            other => Err(format!("Unknown camera: {}", other)),
        }
    }
}

/// Sensor mounting rotation relative to the device's natural orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SensorRotation {
    /// No rotation (sensor is oriented correctly)
    #[default]
    None,
    /// 90 degrees clockwise
    Rotate90,
    /// 180 degrees (upside down)
    Rotate180,
    /// 270 degrees clockwise (90 degrees counter-clockwise)
    Rotate270,
}

impl SensorRotation {
    /// Create rotation from an integer degree value (normalised to 0-360).
    pub fn from_degrees_int(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => SensorRotation::Rotate90,
            180 => SensorRotation::Rotate180,
            270 => SensorRotation::Rotate270,
            _ => SensorRotation::None,
        }
    }

    /// Get the rotation in degrees
    pub fn degrees(&self) -> u32 {
        match self {
            SensorRotation::None => 0,
            SensorRotation::Rotate90 => 90,
            SensorRotation::Rotate180 => 180,
            SensorRotation::Rotate270 => 270,
        }
    }

    /// Check if rotation swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, SensorRotation::Rotate90 | SensorRotation::Rotate270)
    }
}

impl std::fmt::Display for SensorRotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Axis-aligned rectangle in integer pixel coordinates (right/bottom exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn center_x(&self) -> i32 {
        (self.left + self.right) / 2
    }

    pub fn center_y(&self) -> i32 {
        (self.top + self.bottom) / 2
    }

    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    /// Clamp every edge into `[0, width] x [0, height]`
    pub fn clamped(&self, width: i32, height: i32) -> Self {
        Self {
            left: self.left.clamp(0, width),
            top: self.top.clamp(0, height),
            right: self.right.clamp(0, width),
            bottom: self.bottom.clamp(0, height),
        }
    }
}

/// Face reported by the preview face detector, in sensor coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    pub bounds: Rect,
    /// Detector confidence (1-100)
    pub score: u8,
}

impl Face {
    pub fn new(bounds: Rect, score: u8) -> Self {
        Self { bounds, score }
    }
}

/// Static description of a camera unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraCharacteristics {
    pub facing: CameraFacing,
    /// Active pixel array (sensor coordinate space)
    pub pixel_array: SizeCandidate,
    pub sensor_orientation: SensorRotation,
    /// Maximum number of AE metering regions (0 = unsupported)
    pub max_regions_ae: u32,
    /// Maximum number of AF metering regions (0 = unsupported)
    pub max_regions_af: u32,
    /// Sizes the preview surface can be configured with
    pub preview_sizes: Vec<SizeCandidate>,
    /// Sizes of the JPEG output
    pub jpeg_sizes: Vec<SizeCandidate>,
}

/// Request template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestTemplate {
    Preview,
    StillCapture,
}

/// Output surfaces a request writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputTarget {
    /// Preview surface owned by the UI
    Preview,
    /// JPEG image reader
    ImageReader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlMode {
    #[default]
    Auto,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AfMode {
    #[default]
    ContinuousPicture,
    /// Single sweep started by [`AfTrigger::Start`]
    Auto,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AfTrigger {
    #[default]
    Idle,
    Start,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaceDetectMode {
    #[default]
    Off,
    Simple,
}

/// Marker carried by a request and echoed back in its capture result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestTag {
    /// Part of a focus retarget; its completion re-arms the preview
    Focus,
}

/// A capture request as submitted to a [`CaptureSession`]
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub template: RequestTemplate,
    pub targets: Vec<OutputTarget>,
    pub control_mode: ControlMode,
    pub af_mode: AfMode,
    pub af_trigger: AfTrigger,
    pub af_regions: Vec<FocusRegion>,
    pub ae_regions: Vec<FocusRegion>,
    pub face_detect: FaceDetectMode,
    pub tag: Option<RequestTag>,
}

impl CaptureRequest {
    /// Repeating preview request: auto control, simple face detection
    pub fn preview() -> Self {
        Self {
            template: RequestTemplate::Preview,
            targets: vec![OutputTarget::Preview],
            control_mode: ControlMode::Auto,
            af_mode: AfMode::ContinuousPicture,
            af_trigger: AfTrigger::Idle,
            af_regions: Vec::new(),
            ae_regions: Vec::new(),
            face_detect: FaceDetectMode::Simple,
            tag: None,
        }
    }

    /// Still request writing to the image reader
    pub fn still() -> Self {
        Self {
            template: RequestTemplate::StillCapture,
            targets: vec![OutputTarget::ImageReader],
            face_detect: FaceDetectMode::Off,
            ..Self::preview()
        }
    }

    pub fn with_tag(mut self, tag: Option<RequestTag>) -> Self {
        self.tag = tag;
        self
    }
}

/// Metadata of a completed request
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureResult {
    pub template: RequestTemplate,
    pub tag: Option<RequestTag>,
    /// Detected faces; empty when detection is off or found nothing
    pub faces: Vec<Face>,
}

/// Hook run when a frame's buffer is handed back to the reader
pub type ReleaseHook = Box<dyn FnOnce() + Send>;

/// A compressed frame acquired from an [`super::ImageReader`]
///
/// The reader slot is freed exactly once, either by [`RawFrame::close`] or on drop.
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    /// JPEG bytes
    pub data: Arc<[u8]>,
    pub captured_at: Instant,
    release: Option<ReleaseHook>,
}

impl RawFrame {
    pub fn new(width: u32, height: u32, data: Arc<[u8]>, release: Option<ReleaseHook>) -> Self {
        Self {
            width,
            height,
            data,
            captured_at: Instant::now(),
            release,
        }
    }

    /// Hand the buffer back to the reader
    pub fn close(mut self) {
        self.release_buffer();
    }

    fn release_buffer(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for RawFrame {
    fn drop(&mut self) {
        self.release_buffer();
    }
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .field("open", &self.release.is_some())
            .finish()
    }
}

/// Asynchronous notification from the device service
pub enum DeviceEvent {
    Opened(Box<dyn CameraDevice>),
    Disconnected,
    Error(BackendError),
    SessionConfigured(Box<dyn CaptureSession>),
    SessionConfigureFailed(BackendError),
    CaptureCompleted(CaptureResult),
    /// A new image is waiting in the image reader
    ImageAvailable,
}

impl std::fmt::Debug for DeviceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceEvent::Opened(device) => write!(f, "Opened({})", device.id()),
            DeviceEvent::Disconnected => write!(f, "Disconnected"),
            DeviceEvent::Error(e) => write!(f, "Error({})", e),
            DeviceEvent::SessionConfigured(_) => write!(f, "SessionConfigured"),
            DeviceEvent::SessionConfigureFailed(e) => write!(f, "SessionConfigureFailed({})", e),
            DeviceEvent::CaptureCompleted(result) => write!(f, "CaptureCompleted({:?})", result),
            DeviceEvent::ImageAvailable => write!(f, "ImageAvailable"),
        }
    }
}

/// Where a device delivers its [`DeviceEvent`]s
#[derive(Clone)]
pub struct DeviceEventSink(Arc<dyn Fn(DeviceEvent) + Send + Sync>);

impl DeviceEventSink {
    pub fn new(deliver: impl Fn(DeviceEvent) + Send + Sync + 'static) -> Self {
        Self(Arc::new(deliver))
    }

    pub fn send(&self, event: DeviceEvent) {
        (self.0)(event)
    }
}

impl std::fmt::Debug for DeviceEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DeviceEventSink")
    }
}

/// Device service errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// No camera with this id
    DeviceNotFound(String),
    /// The camera is already opened by someone else
    Busy(String),
    /// The camera was disconnected
    Disconnected(String),
    /// Call made on a closed device, session or reader
    InvalidState(String),
    /// The image reader has no image to hand out
    NoImageAvailable,
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::Busy(msg) => write!(f, "Camera in use: {}", msg),
            BackendError::Disconnected(msg) => write!(f, "Camera disconnected: {}", msg),
            BackendError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            BackendError::NoImageAvailable => write!(f, "No image available"),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

/// Result type for device service operations
pub type BackendResult<T> = Result<T, BackendError>;
