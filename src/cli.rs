// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras and their negotiated sizes
//! - Taking a single photo
//! - Running a burst until Ctrl+C or a time limit
//! - Running a free-hand burst with countdown

use freehand_camera::backends::camera::manager::negotiate_sizes;
use freehand_camera::backends::camera::{CameraFacing, CameraService, SessionEvent, SessionState};
use freehand_camera::capture::{CaptureCallbacks, CaptureEvent, FreeHandPlan};
use freehand_camera::pipelines::photo::{CapturedPhoto, PhotoEncoder};
use freehand_camera::storage::latest_photo;
use freehand_camera::{
    CameraError, CameraSession, Config, DirectoryStore, ImageStore, VirtualCameraService,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Session, its event receiver and the output directory
type OpenedSession = (CameraSession, mpsc::Receiver<SessionEvent>, PathBuf);

/// Time allowed for the preview to come up
const OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Load the config file given on the command line, or the default one
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    Ok(Config::load_or_default(path)?)
}

/// List all available cameras
pub fn list_cameras(config: &Config) -> CliResult {
    let service = VirtualCameraService::new();
    let ids = service.camera_ids();

    if ids.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for id in ids {
        let characteristics = service.characteristics(&id)?;
        println!(
            "  [{}] {} (sensor {}, rotated {})",
            id,
            characteristics.facing,
            characteristics.pixel_array,
            characteristics.sensor_orientation
        );
        match negotiate_sizes(&characteristics, config) {
            Ok(sizes) => println!("      Preview: {}  Still: {}", sizes.preview, sizes.image),
            Err(e) => println!("      No usable size: {}", e),
        }
        println!();
    }

    Ok(())
}

/// Show every size a camera offers
pub fn show_sizes(facing: CameraFacing, config: &Config) -> CliResult {
    let service = VirtualCameraService::new();
    let characteristics = service.characteristics(facing.camera_id())?;

    let join = |sizes: &[freehand_camera::backends::camera::SizeCandidate]| {
        sizes
            .iter()
            .map(|s| format!("{} ({})", s, s.aspect_ratio()))
            .collect::<Vec<_>>()
            .join(", ")
    };

    println!("Camera: {}", facing);
    println!("Preview sizes: {}", join(&characteristics.preview_sizes));
    println!("JPEG sizes:    {}", join(&characteristics.jpeg_sizes));

    let sizes = negotiate_sizes(&characteristics, config)?;
    println!();
    println!("Selected still:   {}", sizes.image);
    println!("Selected preview: {}", sizes.preview);
    println!("Preview layout:   {}", sizes.preview_aspect);
    Ok(())
}

/// Take a single photo
pub fn take_photo(facing: CameraFacing, output: Option<PathBuf>, config: Config) -> CliResult {
    let (mut session, events, _) = open_session(facing, output, config)?;

    println!("Capturing...");
    let outcome = session.capture()?;
    let mut printer = Printer::default();
    if let Ok(event) = outcome.recv_timeout(OPEN_TIMEOUT) {
        event.dispatch(&mut printer);
    }
    drain_session_events(&events);
    session.close_camera();

    if printer.saved == 0 {
        return Err(printer.failure.unwrap_or_else(|| "No photo taken".into()).into());
    }
    Ok(())
}

/// Take pictures every burst interval until Ctrl+C or `duration`
pub fn run_burst(
    facing: CameraFacing,
    duration: u64,
    output: Option<PathBuf>,
    config: Config,
) -> CliResult {
    let (mut session, events, dir) = open_session(facing, output, config)?;

    println!("Burst running... (press Ctrl+C to stop early)");
    let stop_flag = install_ctrlc()?;
    let outcome = session.capture_burst()?;

    let mut printer = Printer::default();
    let start = Instant::now();
    let target = Duration::from_secs(duration);
    while start.elapsed() < target {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Stopping early...");
            break;
        }
        pump(&outcome, &mut printer, Duration::from_millis(100));
    }

    session.stop_burst()?;
    pump(&outcome, &mut printer, Duration::ZERO);
    drain_session_events(&events);
    session.close_camera();

    println!("Burst finished: {} photos", printer.saved);
    if let Some(latest) = latest_photo(&dir) {
        println!("Latest: {}", latest.display());
    }
    Ok(())
}

/// Count down, then take `amount` pictures `distance_ms` apart
pub fn run_free_hand(
    facing: CameraFacing,
    plan: FreeHandPlan,
    output: Option<PathBuf>,
    config: Config,
) -> CliResult {
    let (mut session, events, _) = open_session(facing, output, config)?;

    println!(
        "Free-hand: {} photos, {} ms apart, after {} ms (press Ctrl+C to cancel)",
        plan.amount,
        plan.distance.as_millis(),
        plan.delay.as_millis()
    );
    let stop_flag = install_ctrlc()?;
    let outcome = session.capture_free_hand(plan)?;

    let mut printer = Printer::default();
    let mut cancelled = false;
    while !printer.finished {
        if stop_flag.load(Ordering::SeqCst) && !cancelled {
            println!();
            println!("Cancelling...");
            session.stop_free_hand()?;
            cancelled = true;
        }
        match outcome.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => event.dispatch(&mut printer),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            // Listener dropped: the burst was stopped
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    drain_session_events(&events);
    session.close_camera();
    println!("Free-hand finished: {} photos", printer.saved);
    Ok(())
}

fn open_session(
    facing: CameraFacing,
    output: Option<PathBuf>,
    mut config: Config,
) -> Result<OpenedSession, Box<dyn std::error::Error>> {
    if let Some(dir) = output {
        config.storage.photo_dir = Some(dir);
    }
    let dir = config.storage.resolved_photo_dir();
    let store: Arc<dyn ImageStore> = Arc::new(DirectoryStore::new(
        dir.clone(),
        PhotoEncoder::with_quality(config.storage.jpeg_quality.into()),
    ));
    println!("Output: {}", dir.display());

    let service = Arc::new(VirtualCameraService::new());
    let (mut session, events) = CameraSession::new(service, config, store);
    session.open_camera(facing)?;
    println!("Using camera: {}", facing);

    wait_for_preview(&events)?;
    Ok((session, events, dir))
}

fn wait_for_preview(events: &mpsc::Receiver<SessionEvent>) -> Result<(), CameraError> {
    let deadline = Instant::now() + OPEN_TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(remaining) {
            Ok(SessionEvent::StateChanged(SessionState::Previewing)) => return Ok(()),
            Ok(SessionEvent::Error(e)) => return Err(e),
            Ok(SessionEvent::PreviewAspect { width, height }) => {
                println!("Preview: {}x{}", width, height);
            }
            Ok(_) => {}
            Err(_) => {
                return Err(CameraError::DeviceAccess(
                    "Preview did not start in time".into(),
                ));
            }
        }
    }
}

fn drain_session_events(events: &mpsc::Receiver<SessionEvent>) {
    for event in events.try_iter() {
        if let SessionEvent::Error(e) = event {
            eprintln!("Camera error: {}", e);
        }
    }
}

fn pump(outcome: &mpsc::Receiver<CaptureEvent>, printer: &mut Printer, wait: Duration) {
    match outcome.recv_timeout(wait) {
        Ok(event) => event.dispatch(printer),
        Err(_) => return,
    }
    for event in outcome.try_iter() {
        event.dispatch(printer);
    }
}

fn install_ctrlc() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;
    Ok(stop_flag)
}

/// Prints listener callbacks to stdout
#[derive(Default)]
struct Printer {
    saved: u32,
    finished: bool,
    failure: Option<String>,
}

impl CaptureCallbacks for Printer {
    fn capture_succeeded(&mut self, photo: CapturedPhoto) {
        self.saved += 1;
        println!(
            "Photo saved: {} ({}x{})",
            photo.path.display(),
            photo.width(),
            photo.height()
        );
    }

    fn capture_burst_succeeded(&mut self, photo: Option<CapturedPhoto>, session_finished: bool) {
        self.finished = session_finished;
        if let Some(photo) = photo {
            self.saved += 1;
            println!("[{}] {}", self.saved, photo.path.display());
        }
    }

    fn countdown_free_hand(&mut self, remaining_ms: i64, ended: bool) {
        if remaining_ms < 0 {
            self.finished = true;
            println!("Countdown cancelled");
        } else if ended {
            println!("Go!");
        } else {
            println!("{}...", remaining_ms / 1000);
        }
    }

    fn capture_failed(&mut self, error: CameraError) {
        eprintln!("Capture failed: {}", error);
        if error.is_session_fatal() {
            self.finished = true;
        }
        self.failure = Some(error.to_string());
    }
}
