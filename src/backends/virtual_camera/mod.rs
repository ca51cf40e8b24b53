// SPDX-License-Identifier: GPL-3.0-only

//! In-process camera service
//!
//! Emulates a phone with a back camera ("0") and a front camera ("1"). The
//! repeating preview request produces one capture result per frame interval,
//! carrying whatever faces are currently scripted. Still requests put a JPEG
//! test pattern into the image reader.
//!
//! # Architecture
//!
//! ```text
//! open_device ──► VirtualDevice ──► image reader (bounded queue)
//!                       │
//!                       ▼
//!              VirtualCaptureSession
//!                 │            │
//!         repeating request   still request
//!                 ▼            ▼
//!           PreviewLoop     FrameCache (JPEG)
//!                 │            │
//!                 └──► DeviceEventSink
//! ```
//!
//! Every open, close and submitted request is recorded in a log so behaviour
//! can be checked from outside, and failures can be injected with
//! [`VirtualFaults`].

mod device;
mod frames;
mod preview_loop;

pub use frames::{FrameCache, test_pattern};
pub use preview_loop::PreviewLoop;

use crate::backends::camera::{
    BackendError, BackendResult, CameraCharacteristics, CameraFacing, CameraService,
    CaptureRequest, DeviceEvent, DeviceEventSink, Face, SensorRotation, SizeCandidate,
};
use device::VirtualDevice;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default time between two preview results
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Something the virtual device did
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceLogEntry {
    Opened(String),
    Closed(String),
    Repeating(CaptureRequest),
    StoppedRepeating,
    Submitted(CaptureRequest),
}

/// Failures the virtual device should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VirtualFaults {
    /// Report a device error instead of opening
    pub fail_open: bool,
    /// Fail capture session configuration
    pub fail_configure: bool,
    /// Reject still requests
    pub fail_still: bool,
    /// Deliver undecodable still frames
    pub corrupt_frames: bool,
}

pub(crate) struct Shared {
    cameras: Vec<CameraCharacteristics>,
    open_ids: Mutex<HashSet<String>>,
    log: Mutex<Vec<DeviceLogEntry>>,
    faces: Mutex<Vec<Face>>,
    faults: Mutex<VirtualFaults>,
    frames: FrameCache,
}

impl Shared {
    fn record(&self, entry: DeviceLogEntry) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    fn release_id(&self, id: &str) {
        self.open_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    fn faces(&self) -> Vec<Face> {
        self.faces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn faults(&self) -> VirtualFaults {
        *self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Camera service backed by synthetic devices
#[derive(Clone)]
pub struct VirtualCameraService {
    shared: Arc<Shared>,
    frame_interval: Duration,
}

impl VirtualCameraService {
    /// Back and front camera with typical phone characteristics
    pub fn new() -> Self {
        Self::with_cameras(vec![
            default_characteristics(CameraFacing::Back),
            default_characteristics(CameraFacing::Front),
        ])
    }

    pub fn with_cameras(cameras: Vec<CameraCharacteristics>) -> Self {
        Self {
            shared: Arc::new(Shared {
                cameras,
                open_ids: Mutex::new(HashSet::new()),
                log: Mutex::new(Vec::new()),
                faces: Mutex::new(Vec::new()),
                faults: Mutex::new(VirtualFaults::default()),
                frames: FrameCache::new(),
            }),
            frame_interval: DEFAULT_FRAME_INTERVAL,
        }
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Faces reported by every following preview result
    pub fn set_faces(&self, faces: Vec<Face>) {
        *self.shared.faces.lock().unwrap_or_else(PoisonError::into_inner) = faces;
    }

    pub fn set_faults(&self, faults: VirtualFaults) {
        *self.shared.faults.lock().unwrap_or_else(PoisonError::into_inner) = faults;
    }

    /// Everything recorded so far
    pub fn log(&self) -> Vec<DeviceLogEntry> {
        self.shared
            .log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Opened/closed entries only
    pub fn lifecycle_log(&self) -> Vec<DeviceLogEntry> {
        self.log()
            .into_iter()
            .filter(|entry| {
                matches!(entry, DeviceLogEntry::Opened(_) | DeviceLogEntry::Closed(_))
            })
            .collect()
    }

    /// Ids currently open
    pub fn open_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .shared
            .open_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    fn find(&self, camera_id: &str) -> BackendResult<&CameraCharacteristics> {
        self.shared
            .cameras
            .iter()
            .find(|c| c.facing.camera_id() == camera_id)
            .ok_or_else(|| BackendError::DeviceNotFound(camera_id.to_string()))
    }
}

impl Default for VirtualCameraService {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraService for VirtualCameraService {
    fn camera_ids(&self) -> Vec<String> {
        self.shared
            .cameras
            .iter()
            .map(|c| c.facing.camera_id().to_string())
            .collect()
    }

    fn characteristics(&self, camera_id: &str) -> BackendResult<CameraCharacteristics> {
        self.find(camera_id).cloned()
    }

    fn open_device(&self, camera_id: &str, events: DeviceEventSink) -> BackendResult<()> {
        let characteristics = self.find(camera_id)?.clone();

        if self.shared.faults().fail_open {
            warn!(id = camera_id, "Injected device open failure");
            events.send(DeviceEvent::Error(BackendError::Other(
                "Camera device error".into(),
            )));
            return Ok(());
        }

        {
            let mut open = self
                .shared
                .open_ids
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !open.insert(camera_id.to_string()) {
                return Err(BackendError::Busy(camera_id.to_string()));
            }
        }
        self.shared
            .record(DeviceLogEntry::Opened(camera_id.to_string()));
        info!(id = camera_id, facing = %characteristics.facing, "Virtual camera opened");

        let device = VirtualDevice::new(
            camera_id,
            characteristics,
            Arc::clone(&self.shared),
            events.clone(),
            self.frame_interval,
        );
        debug!(id = camera_id, "Delivering opened device");
        events.send(DeviceEvent::Opened(Box::new(device)));
        Ok(())
    }
}

/// Characteristics the virtual phone reports for a facing
pub fn default_characteristics(facing: CameraFacing) -> CameraCharacteristics {
    let sizes = |list: &[(u32, u32)]| {
        list.iter()
            .map(|&(w, h)| SizeCandidate::new(w, h))
            .collect::<Vec<_>>()
    };
    match facing {
        CameraFacing::Back => CameraCharacteristics {
            facing,
            pixel_array: SizeCandidate::new(4032, 3024),
            sensor_orientation: SensorRotation::Rotate90,
            max_regions_ae: 1,
            max_regions_af: 1,
            preview_sizes: sizes(&[(1920, 1080), (1440, 1080), (1280, 720), (640, 480)]),
            jpeg_sizes: sizes(&[(4032, 3024), (3840, 2160), (1920, 1080), (1280, 720)]),
        },
        CameraFacing::Front => CameraCharacteristics {
            facing,
            pixel_array: SizeCandidate::new(3264, 2448),
            sensor_orientation: SensorRotation::Rotate270,
            max_regions_ae: 1,
            max_regions_af: 0,
            preview_sizes: sizes(&[(1280, 720), (960, 720), (640, 480)]),
            jpeg_sizes: sizes(&[(3264, 2448), (1920, 1080), (1280, 720)]),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn channel_sink() -> (DeviceEventSink, mpsc::Receiver<DeviceEvent>) {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let sink = DeviceEventSink::new(move |event| {
            let _ = tx.lock().unwrap().send(event);
        });
        (sink, rx)
    }

    #[test]
    fn test_two_cameras() {
        let service = VirtualCameraService::new();
        assert_eq!(service.camera_ids(), vec!["0", "1"]);
        assert_eq!(
            service.characteristics("1").unwrap().facing,
            CameraFacing::Front
        );
        assert!(matches!(
            service.characteristics("7"),
            Err(BackendError::DeviceNotFound(_))
        ));
    }

    #[test]
    fn test_open_is_exclusive_until_close() {
        let service = VirtualCameraService::new();
        let (sink, rx) = channel_sink();

        service.open_device("0", sink.clone()).unwrap();
        assert!(matches!(
            service.open_device("0", sink.clone()),
            Err(BackendError::Busy(_))
        ));

        let Ok(DeviceEvent::Opened(mut device)) = rx.recv() else {
            panic!("expected opened device");
        };
        device.close();
        assert!(service.open_ids().is_empty());
        assert_eq!(
            service.lifecycle_log(),
            vec![
                DeviceLogEntry::Opened("0".into()),
                DeviceLogEntry::Closed("0".into())
            ]
        );
    }

    #[test]
    fn test_injected_open_failure() {
        let service = VirtualCameraService::new();
        service.set_faults(VirtualFaults {
            fail_open: true,
            ..Default::default()
        });
        let (sink, rx) = channel_sink();
        service.open_device("1", sink).unwrap();
        assert!(matches!(rx.recv(), Ok(DeviceEvent::Error(_))));
        assert!(service.open_ids().is_empty());
    }
}
