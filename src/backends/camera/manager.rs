// SPDX-License-Identifier: MPL-2.0

//! Camera session lifecycle
//!
//! [`CameraSession`] is the handle the UI holds. Opening a camera starts a
//! [`BackgroundContext`] running a [`SessionCore`]; every later call is posted to
//! that context as a [`SessionCommand`]. Closing stops the context and joins its
//! thread, so once `close_camera` returns the device is released and no event of
//! the old session can arrive any more.
//!
//! ```text
//! Closed ──open_camera──► Opening ──Opened + SessionConfigured──► Previewing
//!    ▲                       │                                       │
//!    └──── close_camera / device error ◄─────────────────────────────┘
//! ```

use super::executor::{BackgroundContext, CommandSender, ContextTask, LoopAction, TimerQueue};
use super::sizes::{self, SizeCandidate, SizeRequest};
use super::{
    BackendResult, CameraCharacteristics, CameraDevice, CameraFacing, CameraService,
    CaptureRequest, CaptureResult, CaptureSession, DeviceEvent, DeviceEventSink, Face,
    ImageReader, OutputTarget, RequestTag, RequestTemplate,
};
use crate::capture::{
    CaptureEvent, CaptureListener, CaptureModeController, FreeHandPlan, ModeCapture, ModeEffect,
    TimerKey,
};
use crate::config::Config;
use crate::errors::{CameraError, CameraResult};
use crate::focus::{
    FocusController, FocusPlan, FocusRegion, MeteringSupport, ModeFocus, OverlayGeometry, PreviewRect,
    apply_region, face_bounds_to_preview, is_landscape,
};
use crate::pipelines::photo::{CapturedPhoto, FrameJob, ImagePipeline, acquire_frame};
use crate::storage::ImageStore;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use tracing::{debug, error, info, warn};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Closed,
    /// Device open requested, preview not running yet
    Opening,
    /// Repeating preview request active
    Previewing,
}

/// Notifications for the UI
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Aspect the preview surface should be laid out with (portrait for rotated sensors)
    PreviewAspect { width: u32, height: u32 },
    StateChanged(SessionState),
    /// Face boxes in preview coordinates, after a refocus on faces
    FacesDetected(Vec<PreviewRect>),
    /// The detector lost every face; the overlay should fade out
    FacesLost,
    /// The session was torn down by a device failure
    Error(CameraError),
}

/// Sizes chosen for a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedSizes {
    pub preview: SizeCandidate,
    pub image: SizeCandidate,
    /// Preview size as laid out on screen
    pub preview_aspect: SizeCandidate,
}

/// Pick the preview and still sizes for a camera
pub fn negotiate_sizes(
    characteristics: &CameraCharacteristics,
    config: &Config,
) -> CameraResult<NegotiatedSizes> {
    let cap = SizeCandidate::new(config.max_image_width, config.max_image_height);
    let image = sizes::negotiate(
        &characteristics.preview_sizes,
        &characteristics.jpeg_sizes,
        SizeRequest::Image,
        cap,
    )?;
    let preview = sizes::negotiate(
        &characteristics.preview_sizes,
        &characteristics.jpeg_sizes,
        SizeRequest::Preview,
        cap,
    )?;

    let preview_aspect = if characteristics.sensor_orientation.swaps_dimensions() {
        preview.transposed()
    } else {
        preview
    };

    Ok(NegotiatedSizes {
        preview,
        image,
        preview_aspect,
    })
}

/// Messages processed by the session's background context
pub enum SessionCommand {
    Open,
    Device(DeviceEvent),
    FocusAt {
        x: f32,
        y: f32,
        view_width: u32,
        view_height: u32,
    },
    SetViewport(SizeCandidate),
    Orientation(i32),
    OverlayFaded(bool),
    Capture(CaptureListener),
    StartBurst(CaptureListener),
    StopBurst,
    StartFreeHand {
        plan: FreeHandPlan,
        listener: CaptureListener,
    },
    StopFreeHand,
    FrameProcessed(CameraResult<CapturedPhoto>),
}

type SharedState = Arc<Mutex<SessionState>>;

/// UI-side handle of the camera
pub struct CameraSession {
    service: Arc<dyn CameraService>,
    config: Config,
    store: Arc<dyn ImageStore>,
    events: mpsc::Sender<SessionEvent>,
    state: SharedState,
    facing: Option<CameraFacing>,
    context: Option<BackgroundContext<SessionCommand>>,
}

impl CameraSession {
    /// Create a closed session; events for the UI arrive on the returned receiver
    pub fn new(
        service: Arc<dyn CameraService>,
        config: Config,
        store: Arc<dyn ImageStore>,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (events, receiver) = mpsc::channel();
        let session = Self {
            service,
            config,
            store,
            events,
            state: Arc::new(Mutex::new(SessionState::Closed)),
            facing: None,
            context: None,
        };
        (session, receiver)
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Facing of the open (or opening) camera
    pub fn facing(&self) -> Option<CameraFacing> {
        self.facing
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open a camera and start its preview
    ///
    /// Returns once the background context runs; the outcome is reported through
    /// [`SessionEvent`]s. A camera that is already open is closed first.
    pub fn open_camera(&mut self, facing: CameraFacing) -> CameraResult<()> {
        if self.context.is_some() {
            self.close_camera();
        }

        info!(camera = %facing, id = facing.camera_id(), "Opening camera");
        set_state(&self.state, SessionState::Opening);

        let service = Arc::clone(&self.service);
        let config = self.config.clone();
        let pipeline = ImagePipeline::new(
            Arc::clone(&self.store),
            self.config.storage.name_prefix.clone(),
        );
        let events = self.events.clone();
        let state = Arc::clone(&self.state);

        let context = BackgroundContext::start(&format!("camera-{}", facing), move |sender| {
            SessionCore::new(facing, service, config, pipeline, events, state, sender)
        });
        let context = match context {
            Ok(context) => context,
            Err(e) => {
                set_state(&self.state, SessionState::Closed);
                return Err(e);
            }
        };

        context.send(SessionCommand::Open);
        self.context = Some(context);
        self.facing = Some(facing);
        Ok(())
    }

    /// Close the current camera and open the other one
    pub fn switch_camera(&mut self) -> CameraResult<()> {
        let next = self.facing.unwrap_or_default().opposite();
        info!(camera = %next, "Switching camera");
        self.close_camera();
        self.open_camera(next)
    }

    /// Release the device and join the background context
    pub fn close_camera(&mut self) {
        if let Some(mut context) = self.context.take() {
            info!(camera = ?self.facing, "Closing camera");
            context.stop();
        }
        self.facing = None;
        set_state(&self.state, SessionState::Closed);
    }

    /// Tap on the preview at `(x, y)` of a `view_width` x `view_height` view
    pub fn focus_at_point(
        &self,
        x: f32,
        y: f32,
        view_width: u32,
        view_height: u32,
    ) -> CameraResult<()> {
        self.post(SessionCommand::FocusAt {
            x,
            y,
            view_width,
            view_height,
        })
    }

    /// Size of the on-screen preview (stills are cropped to its aspect)
    pub fn set_viewport(&self, width: u32, height: u32) -> CameraResult<()> {
        self.post(SessionCommand::SetViewport(SizeCandidate::new(width, height)))
    }

    /// Device orientation sensor reading in degrees
    pub fn on_orientation_changed(&self, degrees: i32) -> CameraResult<()> {
        self.post(SessionCommand::Orientation(degrees))
    }

    /// The face overlay finished (or reverted) fading out
    pub fn set_overlay_faded(&self, faded: bool) -> CameraResult<()> {
        self.post(SessionCommand::OverlayFaded(faded))
    }

    /// Take one picture
    pub fn capture(&self) -> CameraResult<mpsc::Receiver<CaptureEvent>> {
        let (listener, receiver) = mpsc::channel();
        self.post(SessionCommand::Capture(listener))?;
        Ok(receiver)
    }

    /// Take pictures every burst interval until [`Self::stop_burst`]
    pub fn capture_burst(&self) -> CameraResult<mpsc::Receiver<CaptureEvent>> {
        let (listener, receiver) = mpsc::channel();
        self.post(SessionCommand::StartBurst(listener))?;
        Ok(receiver)
    }

    pub fn stop_burst(&self) -> CameraResult<()> {
        self.post(SessionCommand::StopBurst)
    }

    /// Count down, then take `plan.amount` pictures `plan.distance` apart
    pub fn capture_free_hand(
        &self,
        plan: FreeHandPlan,
    ) -> CameraResult<mpsc::Receiver<CaptureEvent>> {
        let (listener, receiver) = mpsc::channel();
        self.post(SessionCommand::StartFreeHand { plan, listener })?;
        Ok(receiver)
    }

    pub fn stop_free_hand(&self) -> CameraResult<()> {
        self.post(SessionCommand::StopFreeHand)
    }

    fn post(&self, command: SessionCommand) -> CameraResult<()> {
        match &self.context {
            Some(context) if context.send(command) => Ok(()),
            _ => Err(CameraError::SessionClosed),
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.close_camera();
    }
}

fn set_state(state: &SharedState, value: SessionState) {
    *state.lock().unwrap_or_else(PoisonError::into_inner) = value;
}

/// Session state owned by the background context
pub struct SessionCore {
    facing: CameraFacing,
    service: Arc<dyn CameraService>,
    config: Config,
    sender: CommandSender<SessionCommand>,
    events: mpsc::Sender<SessionEvent>,
    state: SharedState,

    characteristics: Option<CameraCharacteristics>,
    sizes: Option<NegotiatedSizes>,
    device: Option<Box<dyn CameraDevice>>,
    session: Option<Box<dyn CaptureSession>>,
    reader: Option<Box<dyn ImageReader>>,
    preview_request: CaptureRequest,

    focus: FocusController,
    metering: MeteringSupport,
    /// Focus-tagged requests still to complete before the preview is re-armed
    focus_outstanding: u32,
    focus_steady: Option<CaptureRequest>,

    capture: CaptureModeController,
    listener: Option<CaptureListener>,
    pipeline: ImagePipeline,

    viewport: Option<SizeCandidate>,
    landscape: bool,
    overlay_faded: bool,
    listening: bool,
}

impl SessionCore {
    fn new(
        facing: CameraFacing,
        service: Arc<dyn CameraService>,
        config: Config,
        pipeline: ImagePipeline,
        events: mpsc::Sender<SessionEvent>,
        state: SharedState,
        sender: CommandSender<SessionCommand>,
    ) -> Self {
        Self {
            facing,
            service,
            focus: FocusController::new(config.focus.clone()),
            capture: CaptureModeController::new(config.timing.clone()),
            config,
            sender,
            events,
            state,
            characteristics: None,
            sizes: None,
            device: None,
            session: None,
            reader: None,
            preview_request: CaptureRequest::preview(),
            metering: MeteringSupport::default(),
            focus_outstanding: 0,
            focus_steady: None,
            listener: None,
            pipeline,
            viewport: None,
            landscape: false,
            overlay_faded: true,
            listening: false,
        }
    }

    fn emit(&self, event: SessionEvent) {
        // The UI may have gone away; nothing else to do then
        let _ = self.events.send(event);
    }

    fn set_state(&self, value: SessionState) {
        set_state(&self.state, value);
        self.emit(SessionEvent::StateChanged(value));
    }

    /// Tear everything down and report a fatal error
    fn fail(&mut self, error: CameraError) -> LoopAction {
        error!(camera = %self.facing, error = %error, "Camera session failed");
        self.teardown();
        self.emit(SessionEvent::Error(error));
        LoopAction::Stop
    }

    fn teardown(&mut self) {
        self.listening = false;
        self.capture.reset();
        self.listener = None;
        self.focus.reset();
        self.focus_outstanding = 0;
        self.focus_steady = None;

        if let Some(mut session) = self.session.take() {
            session.close();
        }
        if let Some(mut device) = self.device.take() {
            device.close();
        }
        if let Some(mut reader) = self.reader.take() {
            reader.close();
        }
        if *self.state.lock().unwrap_or_else(PoisonError::into_inner) != SessionState::Closed {
            self.set_state(SessionState::Closed);
        }
        debug!(camera = %self.facing, "Camera resources released");
    }

    fn open(&mut self) -> LoopAction {
        let camera_id = self.facing.camera_id();
        let characteristics = match self.service.characteristics(camera_id) {
            Ok(c) => c,
            Err(e) => return self.fail(e.into()),
        };
        let sizes = match negotiate_sizes(&characteristics, &self.config) {
            Ok(s) => s,
            Err(e) => return self.fail(e),
        };

        info!(
            camera = %self.facing,
            preview = %sizes.preview,
            image = %sizes.image,
            rotation = %characteristics.sensor_orientation,
            "Sizes negotiated"
        );

        self.emit(SessionEvent::PreviewAspect {
            width: sizes.preview_aspect.width,
            height: sizes.preview_aspect.height,
        });

        self.metering = MeteringSupport::from(&characteristics);
        self.characteristics = Some(characteristics);
        self.sizes = Some(sizes);
        self.listening = true;

        let sender = self.sender.clone();
        let sink = DeviceEventSink::new(move |event| {
            sender.send(SessionCommand::Device(event));
        });
        if let Err(e) = self.service.open_device(camera_id, sink) {
            return self.fail(e.into());
        }
        LoopAction::Continue
    }

    fn on_device_event(
        &mut self,
        event: DeviceEvent,
        timers: &mut TimerQueue<TimerKey>,
    ) -> LoopAction {
        match event {
            DeviceEvent::Opened(device) => self.on_opened(device),
            DeviceEvent::SessionConfigured(session) => self.on_configured(session),
            DeviceEvent::SessionConfigureFailed(e) => self.fail(e.into()),
            DeviceEvent::Disconnected => {
                self.fail(CameraError::DeviceAccess("Camera disconnected".to_string()))
            }
            DeviceEvent::Error(e) => self.fail(e.into()),
            DeviceEvent::CaptureCompleted(result) => {
                self.on_capture_completed(result);
                LoopAction::Continue
            }
            DeviceEvent::ImageAvailable => {
                self.on_frame_available(timers);
                LoopAction::Continue
            }
        }
    }

    fn on_opened(&mut self, mut device: Box<dyn CameraDevice>) -> LoopAction {
        let Some(sizes) = self.sizes else {
            device.close();
            return LoopAction::Continue;
        };
        info!(camera = %self.facing, id = device.id(), "Camera opened");

        let reader = device.create_image_reader(sizes.image, self.config.image_reader_depth);
        self.device = Some(device);
        match reader {
            Ok(reader) => self.reader = Some(reader),
            Err(e) => return self.fail(e.into()),
        }

        self.preview_request = CaptureRequest::preview();
        let outputs = [OutputTarget::Preview, OutputTarget::ImageReader];
        let configured = match self.device.as_mut() {
            Some(device) => device.create_capture_session(sizes.preview, &outputs),
            None => return LoopAction::Continue,
        };
        if let Err(e) = configured {
            return self.fail(e.into());
        }
        LoopAction::Continue
    }

    fn on_configured(&mut self, mut session: Box<dyn CaptureSession>) -> LoopAction {
        if self.device.is_none() {
            session.close();
            return LoopAction::Continue;
        }
        if let Err(e) = session.set_repeating_request(&self.preview_request) {
            session.close();
            return self.fail(e.into());
        }
        self.session = Some(session);
        info!(camera = %self.facing, "Preview running");
        self.set_state(SessionState::Previewing);
        LoopAction::Continue
    }

    fn on_capture_completed(&mut self, result: CaptureResult) {
        if result.template != RequestTemplate::Preview {
            return;
        }

        if result.tag == Some(RequestTag::Focus) && self.focus_outstanding > 0 {
            self.focus_outstanding -= 1;
            if self.focus_outstanding == 0 {
                self.settle_focus();
            }
            return;
        }

        if self.listening && self.focus.mode() == ModeFocus::AutoFocusToFaces {
            self.on_faces(&result.faces);
        }
    }

    fn settle_focus(&mut self) {
        let Some(steady) = self.focus_steady.take() else {
            return;
        };
        self.preview_request = steady;
        if let Some(session) = self.session.as_mut()
            && let Err(e) = session.set_repeating_request(&self.preview_request)
        {
            warn!(error = %CameraError::FocusApplication(e.to_string()), "Preview not re-armed");
        }
        debug!("Focus settled");
    }

    fn on_faces(&mut self, faces: &[Face]) {
        if faces.is_empty() {
            if !self.overlay_faded {
                self.overlay_faded = true;
                self.emit(SessionEvent::FacesLost);
            }
            return;
        }

        let Some(regions) = self.focus.on_faces_detected(faces, self.overlay_faded) else {
            return;
        };
        self.apply_focus(&regions);

        if let Some(geometry) = self.overlay_geometry() {
            let rects = faces
                .iter()
                .map(|face| face_bounds_to_preview(&face.bounds, &geometry))
                .collect();
            self.overlay_faded = false;
            self.emit(SessionEvent::FacesDetected(rects));
        }
    }

    fn overlay_geometry(&self) -> Option<OverlayGeometry> {
        let characteristics = self.characteristics.as_ref()?;
        let viewport = self.viewport()?;
        Some(OverlayGeometry {
            facing: self.facing,
            sensor: characteristics.pixel_array,
            texture_width: viewport.width,
            texture_height: viewport.height,
            landscape: self.landscape,
        })
    }

    /// On-screen preview size; the laid-out preview aspect until the UI tells otherwise
    fn viewport(&self) -> Option<SizeCandidate> {
        self.viewport.or(self.sizes.map(|sizes| sizes.preview_aspect))
    }

    fn focus_at(
        &mut self,
        x: f32,
        y: f32,
        view_width: u32,
        view_height: u32,
        timers: &mut TimerQueue<TimerKey>,
    ) {
        let Some(sensor) = self.characteristics.as_ref().map(|c| c.pixel_array) else {
            return;
        };
        let region = self
            .focus
            .focus_at_point(x, y, view_width, view_height, sensor);
        self.apply_focus(&[region]);
        timers.schedule(TimerKey::FocusRevert, self.config.timing.touch_focus_revert());
    }

    /// Retarget metering; failures are logged and the preview keeps running
    fn apply_focus(&mut self, regions: &[FocusRegion]) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let plan = apply_region(regions, &self.preview_request, self.metering);

        match submit_focus(session.as_mut(), &plan) {
            Ok(()) => {
                self.focus_outstanding = 2;
                self.focus_steady = Some(plan.steady);
            }
            Err(e) => {
                warn!(error = %CameraError::FocusApplication(e.to_string()), "Focus not applied");
                self.focus_outstanding = 0;
                self.focus_steady = None;
                if let Err(e) = session.set_repeating_request(&self.preview_request) {
                    warn!(error = %e, "Preview not restarted after focus failure");
                }
            }
        }
    }

    fn on_frame_available(&mut self, timers: &mut TimerQueue<TimerKey>) {
        let Some(reader) = self.reader.as_mut() else {
            return;
        };

        let frame = match acquire_frame(reader.as_mut()) {
            Ok(frame) => frame,
            Err(e) => {
                let effects = self.capture.on_frame_failed(e);
                self.apply_effects(effects, timers);
                return;
            }
        };

        if !self.capture.wants_frame() {
            debug!(mode = ?self.capture.mode(), "Dropping unwanted frame");
            frame.close();
            let effects = self.capture.on_frame_discarded();
            self.apply_effects(effects, timers);
            return;
        }

        let Some(viewport) = self.viewport() else {
            frame.close();
            let effects = self.capture.on_frame_discarded();
            self.apply_effects(effects, timers);
            return;
        };

        let job = FrameJob {
            viewport,
            facing: self.facing,
        };
        let pipeline = self.pipeline.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let result = pipeline.process_async(frame, job).await;
            // Discarded if the session closed meanwhile
            sender.send(SessionCommand::FrameProcessed(result));
        });
    }

    fn on_frame_processed(
        &mut self,
        result: CameraResult<CapturedPhoto>,
        timers: &mut TimerQueue<TimerKey>,
    ) {
        let effects = match result {
            Ok(photo) => self.capture.on_frame_saved(photo),
            Err(e) => {
                warn!(error = %e, "Still lost");
                self.capture.on_frame_failed(e)
            }
        };
        self.apply_effects(effects, timers);
    }

    /// Install the listener of a new request after stopping the running mode
    fn begin_request(&mut self, listener: CaptureListener, timers: &mut TimerQueue<TimerKey>) {
        let effects = self.capture.stop_active();
        self.apply_effects(effects, timers);
        self.listener = Some(listener);
    }

    fn apply_effects(&mut self, effects: Vec<ModeEffect>, timers: &mut TimerQueue<TimerKey>) {
        let mut queue: VecDeque<ModeEffect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                ModeEffect::IssueStill => {
                    if let Err(e) = self.issue_still() {
                        warn!(error = %e, "Still request not submitted");
                        queue.extend(self.capture.on_frame_failed(e));
                    }
                }
                ModeEffect::Schedule { key, after } => timers.schedule(key, after),
                ModeEffect::Cancel(key) => {
                    timers.cancel(key);
                }
                ModeEffect::Emit(event) => {
                    if let Some(listener) = &self.listener
                        && listener.send(event).is_err()
                    {
                        debug!("Capture listener gone");
                        self.listener = None;
                    }
                }
                ModeEffect::DropListener => self.listener = None,
            }
        }
    }

    fn issue_still(&mut self) -> CameraResult<()> {
        let session = self.session.as_mut().ok_or(CameraError::SessionClosed)?;
        session
            .capture(&CaptureRequest::still())
            .map_err(|e| CameraError::FrameAcquisition(e.to_string()))?;
        debug!(mode = ?self.capture.mode(), "Still request submitted");
        Ok(())
    }
}

fn submit_focus(session: &mut dyn CaptureSession, plan: &FocusPlan) -> BackendResult<()> {
    session.stop_repeating()?;
    session.capture(&plan.cancel)?;
    session.capture(&plan.trigger)?;
    Ok(())
}

impl ContextTask for SessionCore {
    type Command = SessionCommand;
    type Timer = TimerKey;

    fn on_command(
        &mut self,
        command: SessionCommand,
        timers: &mut TimerQueue<TimerKey>,
    ) -> LoopAction {
        match command {
            SessionCommand::Open => return self.open(),
            SessionCommand::Device(event) => return self.on_device_event(event, timers),
            SessionCommand::FocusAt {
                x,
                y,
                view_width,
                view_height,
            } => self.focus_at(x, y, view_width, view_height, timers),
            SessionCommand::SetViewport(size) => self.viewport = Some(size),
            SessionCommand::Orientation(degrees) => {
                if self.listening {
                    self.landscape = is_landscape(degrees);
                }
            }
            SessionCommand::OverlayFaded(faded) => self.overlay_faded = faded,
            SessionCommand::Capture(listener) => {
                self.begin_request(listener, timers);
                let effects = self.capture.capture();
                self.apply_effects(effects, timers);
            }
            SessionCommand::StartBurst(listener) => {
                self.begin_request(listener, timers);
                let effects = self.capture.start_burst();
                self.apply_effects(effects, timers);
            }
            SessionCommand::StopBurst => {
                if self.capture.mode() == ModeCapture::Burst {
                    let effects = self.capture.stop_burst();
                    self.apply_effects(effects, timers);
                }
            }
            SessionCommand::StartFreeHand { plan, listener } => {
                self.begin_request(listener, timers);
                let effects = self.capture.start_free_hand(plan);
                self.apply_effects(effects, timers);
            }
            SessionCommand::StopFreeHand => {
                if self.capture.mode() == ModeCapture::BurstFreeHand {
                    let effects = self.capture.stop_free_hand();
                    self.apply_effects(effects, timers);
                }
            }
            SessionCommand::FrameProcessed(result) => self.on_frame_processed(result, timers),
        }
        LoopAction::Continue
    }

    fn on_timer(&mut self, key: TimerKey, timers: &mut TimerQueue<TimerKey>) -> LoopAction {
        match key {
            TimerKey::FocusRevert => self.focus.revert_to_faces(),
            TimerKey::CaptureTick | TimerKey::Countdown => {
                let effects = self.capture.on_timer(key);
                self.apply_effects(effects, timers);
            }
        }
        LoopAction::Continue
    }

    fn on_stop(&mut self) {
        self.teardown();
        info!(camera = %self.facing, "Camera closed");
    }
}
