// SPDX-License-Identifier: GPL-3.0-only

//! Virtual device, capture session and image reader

use super::preview_loop::PreviewLoop;
use super::{DeviceLogEntry, Shared};
use crate::backends::camera::executor::LoopAction;
use crate::backends::camera::{
    BackendError, BackendResult, CameraCharacteristics, CameraDevice, CaptureRequest,
    CaptureResult, CaptureSession, DeviceEvent, DeviceEventSink, FaceDetectMode, ImageReader,
    OutputTarget, RawFrame, RequestTemplate, SizeCandidate,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

pub(super) struct VirtualDevice {
    id: String,
    characteristics: CameraCharacteristics,
    shared: Arc<Shared>,
    events: DeviceEventSink,
    frame_interval: Duration,
    reader: Option<Arc<ReaderQueue>>,
    closed: bool,
}

impl VirtualDevice {
    pub(super) fn new(
        id: &str,
        characteristics: CameraCharacteristics,
        shared: Arc<Shared>,
        events: DeviceEventSink,
        frame_interval: Duration,
    ) -> Self {
        Self {
            id: id.to_string(),
            characteristics,
            shared,
            events,
            frame_interval,
            reader: None,
            closed: false,
        }
    }
}

impl CameraDevice for VirtualDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn create_image_reader(
        &mut self,
        size: SizeCandidate,
        max_images: usize,
    ) -> BackendResult<Box<dyn ImageReader>> {
        if self.closed {
            return Err(BackendError::InvalidState("Device closed".into()));
        }
        let queue = Arc::new(ReaderQueue::new(size, max_images.max(1)));
        self.reader = Some(Arc::clone(&queue));
        debug!(id = %self.id, size = %size, max_images, "Image reader created");
        Ok(Box::new(VirtualImageReader { queue }))
    }

    fn create_capture_session(
        &mut self,
        preview_size: SizeCandidate,
        outputs: &[OutputTarget],
    ) -> BackendResult<()> {
        if self.closed {
            return Err(BackendError::InvalidState("Device closed".into()));
        }
        if outputs.contains(&OutputTarget::ImageReader) && self.reader.is_none() {
            return Err(BackendError::InvalidState(
                "Image reader output requested before the reader exists".into(),
            ));
        }

        if self.shared.faults().fail_configure {
            warn!(id = %self.id, "Injected session configuration failure");
            self.events.send(DeviceEvent::SessionConfigureFailed(BackendError::Other(
                "Session configuration failed".into(),
            )));
            return Ok(());
        }

        let session = VirtualCaptureSession {
            id: self.id.clone(),
            characteristics: self.characteristics.clone(),
            shared: Arc::clone(&self.shared),
            events: self.events.clone(),
            frame_interval: self.frame_interval,
            reader: self.reader.clone(),
            repeating: Arc::new(Mutex::new(None)),
            preview: None,
            closed: false,
        };
        info!(id = %self.id, preview = %preview_size, "Capture session configured");
        self.events
            .send(DeviceEvent::SessionConfigured(Box::new(session)));
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.shared.release_id(&self.id);
        self.shared.record(DeviceLogEntry::Closed(self.id.clone()));
        info!(id = %self.id, "Virtual camera closed");
    }
}

impl Drop for VirtualDevice {
    fn drop(&mut self) {
        self.close();
    }
}

type SharedRequest = Arc<Mutex<Option<CaptureRequest>>>;

struct VirtualCaptureSession {
    id: String,
    characteristics: CameraCharacteristics,
    shared: Arc<Shared>,
    events: DeviceEventSink,
    frame_interval: Duration,
    reader: Option<Arc<ReaderQueue>>,
    repeating: SharedRequest,
    preview: Option<PreviewLoop>,
    closed: bool,
}

impl VirtualCaptureSession {
    fn ensure_open(&self) -> BackendResult<()> {
        if self.closed {
            Err(BackendError::InvalidState("Capture session closed".into()))
        } else {
            Ok(())
        }
    }

    fn start_preview(&mut self) {
        if self.preview.is_some() {
            return;
        }
        let repeating = Arc::clone(&self.repeating);
        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();
        let name = format!("virtual-preview-{}", self.id);

        self.preview = Some(PreviewLoop::start(&name, self.frame_interval, move || {
            let request = repeating
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(request) = request {
                let faces = if request.face_detect == FaceDetectMode::Simple {
                    shared.faces()
                } else {
                    Vec::new()
                };
                events.send(DeviceEvent::CaptureCompleted(CaptureResult {
                    template: request.template,
                    tag: request.tag,
                    faces,
                }));
            }
            LoopAction::Continue
        }));
    }

    fn capture_still(&self) -> BackendResult<()> {
        if self.shared.faults().fail_still {
            return Err(BackendError::Other("Still capture rejected".into()));
        }
        let reader = self
            .reader
            .as_ref()
            .ok_or_else(|| BackendError::InvalidState("No image reader output".into()))?;

        let data: Arc<[u8]> = if self.shared.faults().corrupt_frames {
            Arc::from(vec![0u8; 64])
        } else {
            self.shared
                .frames
                .jpeg(self.characteristics.facing, reader.size)?
        };
        reader.push(data);
        self.events.send(DeviceEvent::ImageAvailable);
        Ok(())
    }
}

impl CaptureSession for VirtualCaptureSession {
    fn set_repeating_request(&mut self, request: &CaptureRequest) -> BackendResult<()> {
        self.ensure_open()?;
        self.shared
            .record(DeviceLogEntry::Repeating(request.clone()));
        *self.repeating.lock().unwrap_or_else(PoisonError::into_inner) = Some(request.clone());
        self.start_preview();
        Ok(())
    }

    fn stop_repeating(&mut self) -> BackendResult<()> {
        self.ensure_open()?;
        self.shared.record(DeviceLogEntry::StoppedRepeating);
        *self.repeating.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    fn capture(&mut self, request: &CaptureRequest) -> BackendResult<()> {
        self.ensure_open()?;
        self.shared.record(DeviceLogEntry::Submitted(request.clone()));
        match request.template {
            RequestTemplate::StillCapture => self.capture_still(),
            RequestTemplate::Preview => {
                self.events.send(DeviceEvent::CaptureCompleted(CaptureResult {
                    template: request.template,
                    tag: request.tag,
                    faces: Vec::new(),
                }));
                Ok(())
            }
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        *self.repeating.lock().unwrap_or_else(PoisonError::into_inner) = None;
        if let Some(mut preview) = self.preview.take() {
            preview.stop();
        }
        debug!(id = %self.id, "Capture session closed");
    }
}

impl Drop for VirtualCaptureSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Frames waiting in a reader plus the count handed out
struct ReaderQueue {
    size: SizeCandidate,
    max_images: usize,
    frames: Mutex<VecDeque<Arc<[u8]>>>,
    acquired: Arc<AtomicUsize>,
    closed: AtomicBool,
}

impl ReaderQueue {
    fn new(size: SizeCandidate, max_images: usize) -> Self {
        Self {
            size,
            max_images,
            frames: Mutex::new(VecDeque::new()),
            acquired: Arc::new(AtomicUsize::new(0)),
            closed: AtomicBool::new(false),
        }
    }

    fn push(&self, data: Arc<[u8]>) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let mut frames = self.frames.lock().unwrap_or_else(PoisonError::into_inner);
        frames.push_back(data);
        while frames.len() > self.max_images {
            frames.pop_front();
        }
    }
}

struct VirtualImageReader {
    queue: Arc<ReaderQueue>,
}

impl ImageReader for VirtualImageReader {
    fn size(&self) -> SizeCandidate {
        self.queue.size
    }

    fn acquire_latest_image(&mut self) -> BackendResult<RawFrame> {
        let queue = &self.queue;
        if queue.closed.load(Ordering::SeqCst) {
            return Err(BackendError::InvalidState("Image reader closed".into()));
        }
        if queue.acquired.load(Ordering::SeqCst) >= queue.max_images {
            return Err(BackendError::Other(format!(
                "{} images already acquired",
                queue.max_images
            )));
        }

        let data = {
            let mut frames = queue.frames.lock().unwrap_or_else(PoisonError::into_inner);
            let latest = frames.pop_back();
            frames.clear();
            latest
        }
        .ok_or(BackendError::NoImageAvailable)?;

        queue.acquired.fetch_add(1, Ordering::SeqCst);
        let acquired = Arc::clone(&queue.acquired);
        Ok(RawFrame::new(
            queue.size.width,
            queue.size.height,
            data,
            Some(Box::new(move || {
                acquired.fetch_sub(1, Ordering::SeqCst);
            })),
        ))
    }

    fn close(&mut self) {
        self.queue.closed.store(true, Ordering::SeqCst);
        self.queue
            .frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
