// SPDX-License-Identifier: GPL-3.0-only

//! Picture acquisition modes
//!
//! [`CaptureModeController`] is a plain state machine. It never touches the
//! device or a clock: the session feeds it commands, timer firings and frame
//! outcomes, and carries out the [`ModeEffect`]s it returns.
//!
//! ```text
//!            capture()             frame outcome
//!   Idle ───────────────► Capture ───────────────► Idle
//!     │ start_burst()
//!     ├────────────────► Burst ── tick every burst_interval ──┐
//!     │                    ▲──────────────────────────────────┘
//!     │ start_free_hand()
//!     └────────────────► BurstFreeHand: countdown, then `amount` ticks
//!                          every `distance`, Idle after the last save
//! ```

pub mod admission;
pub mod events;

pub use admission::AdmissionToken;
pub use events::{CaptureCallbacks, CaptureEvent, CaptureListener};

use crate::config::CaptureTiming;
use crate::constants::timing::COUNTDOWN_CANCELLED_MS;
use crate::errors::CameraError;
use crate::pipelines::photo::CapturedPhoto;
use std::time::Duration;
use tracing::{debug, info};

/// Acquisition mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeCapture {
    #[default]
    Idle,
    /// Single shot
    Capture,
    /// Fixed-interval burst until stopped
    Burst,
    /// Countdown, then a fixed number of frames
    BurstFreeHand,
}

impl ModeCapture {
    pub fn is_burst(&self) -> bool {
        matches!(self, ModeCapture::Burst | ModeCapture::BurstFreeHand)
    }
}

/// Keys of the session's timers; scheduling a key again replaces it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKey {
    /// Next burst / free-hand still
    CaptureTick,
    /// Next free-hand countdown step
    Countdown,
    /// Touch focus hold expired
    FocusRevert,
}

/// Work the session carries out on behalf of the controller
#[derive(Debug, Clone)]
pub enum ModeEffect {
    /// Submit one still request (the token is already held)
    IssueStill,
    Schedule { key: TimerKey, after: Duration },
    Cancel(TimerKey),
    /// Deliver to the current listener
    Emit(CaptureEvent),
    /// Forget the current listener
    DropListener,
}

/// Parameters of a free-hand burst
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeHandPlan {
    /// Number of frames to take
    pub amount: u32,
    /// Time between two frames
    pub distance: Duration,
    /// Countdown before the first frame
    pub delay: Duration,
}

/// Progress of the running free-hand burst
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeHandProgress {
    pub plan: FreeHandPlan,
    /// Still requests issued so far; never decreases and never exceeds `amount`
    pub tasks_issued: u32,
    pub images_saved: u32,
    /// Frames saved or lost; the burst ends when this reaches `amount`
    pub frames_done: u32,
    countdown_elapsed: Duration,
    counting_down: bool,
}

impl FreeHandProgress {
    fn new(plan: FreeHandPlan) -> Self {
        Self {
            plan,
            tasks_issued: 0,
            images_saved: 0,
            frames_done: 0,
            countdown_elapsed: Duration::ZERO,
            counting_down: true,
        }
    }

    pub fn is_counting_down(&self) -> bool {
        self.counting_down
    }
}

/// IDLE / CAPTURE / BURST / BURST_FREE_HAND state machine
#[derive(Debug)]
pub struct CaptureModeController {
    mode: ModeCapture,
    timing: CaptureTiming,
    token: AdmissionToken,
    /// A tick found the token held; issue as soon as it is released
    pending_still: bool,
    free_hand: Option<FreeHandProgress>,
}

impl CaptureModeController {
    pub fn new(timing: CaptureTiming) -> Self {
        Self {
            mode: ModeCapture::Idle,
            timing,
            token: AdmissionToken::new(),
            pending_still: false,
            free_hand: None,
        }
    }

    pub fn mode(&self) -> ModeCapture {
        self.mode
    }

    pub fn token(&self) -> &AdmissionToken {
        &self.token
    }

    pub fn free_hand_progress(&self) -> Option<&FreeHandProgress> {
        self.free_hand.as_ref()
    }

    /// Whether an arriving frame should be processed
    ///
    /// Frames are unwanted while idle and once every frame of a free-hand
    /// burst has been saved or lost.
    pub fn wants_frame(&self) -> bool {
        match self.mode {
            ModeCapture::Idle => false,
            ModeCapture::BurstFreeHand => self
                .free_hand
                .map(|p| p.frames_done < p.plan.amount)
                .unwrap_or(false),
            ModeCapture::Capture | ModeCapture::Burst => true,
        }
    }

    /// Stop whatever burst is running before a new request takes over
    pub fn stop_active(&mut self) -> Vec<ModeEffect> {
        match self.mode {
            ModeCapture::BurstFreeHand => self.stop_free_hand(),
            ModeCapture::Burst => self.stop_burst(),
            ModeCapture::Idle | ModeCapture::Capture => Vec::new(),
        }
    }

    /// Take a single picture
    pub fn capture(&mut self) -> Vec<ModeEffect> {
        let mut effects = self.enter(ModeCapture::Capture);
        if self.token.try_acquire() {
            effects.push(ModeEffect::IssueStill);
        } else {
            self.pending_still = true;
        }
        effects
    }

    /// Start a fixed-interval burst
    pub fn start_burst(&mut self) -> Vec<ModeEffect> {
        let mut effects = self.enter(ModeCapture::Burst);
        info!(interval_ms = self.timing.burst_interval_ms, "Burst started");
        effects.extend(self.burst_tick());
        effects
    }

    /// Stop a burst: back to idle, token released, listener dropped
    pub fn stop_burst(&mut self) -> Vec<ModeEffect> {
        if self.mode.is_burst() {
            info!(mode = ?self.mode, "Burst stopped");
        }
        self.mode = ModeCapture::Idle;
        self.token.release();
        self.pending_still = false;
        vec![ModeEffect::Cancel(TimerKey::CaptureTick), ModeEffect::DropListener]
    }

    /// Start a free-hand burst; a running one is stopped first
    pub fn start_free_hand(&mut self, plan: FreeHandPlan) -> Vec<ModeEffect> {
        let mut effects = Vec::new();
        if self.mode == ModeCapture::BurstFreeHand {
            effects.extend(self.stop_free_hand());
        }
        effects.extend(self.enter(ModeCapture::BurstFreeHand));
        self.free_hand = Some(FreeHandProgress::new(plan));
        info!(
            amount = plan.amount,
            distance_ms = plan.distance.as_millis() as u64,
            delay_ms = plan.delay.as_millis() as u64,
            "Free-hand burst started"
        );
        effects.extend(self.countdown_step());
        effects
    }

    /// Cancel a free-hand burst; the listener sees the cancel sentinel first
    pub fn stop_free_hand(&mut self) -> Vec<ModeEffect> {
        let mut effects = vec![
            ModeEffect::Cancel(TimerKey::Countdown),
            ModeEffect::Emit(CaptureEvent::Countdown {
                remaining_ms: COUNTDOWN_CANCELLED_MS,
                ended: true,
            }),
        ];
        effects.extend(self.stop_burst());
        effects
    }

    /// A timer owned by the controller fired
    pub fn on_timer(&mut self, key: TimerKey) -> Vec<ModeEffect> {
        match (key, self.mode) {
            (TimerKey::CaptureTick, ModeCapture::Burst) => self.burst_tick(),
            (TimerKey::CaptureTick, ModeCapture::BurstFreeHand) => self.free_hand_tick(),
            (TimerKey::Countdown, ModeCapture::BurstFreeHand) => self.countdown_step(),
            // Stale tick of a mode that already ended
            _ => Vec::new(),
        }
    }

    /// A frame was processed and stored
    pub fn on_frame_saved(&mut self, photo: CapturedPhoto) -> Vec<ModeEffect> {
        self.token.release();
        let mut effects = Vec::new();
        match self.mode {
            ModeCapture::Capture => {
                self.mode = ModeCapture::Idle;
                effects.push(ModeEffect::Emit(CaptureEvent::Succeeded(photo)));
            }
            ModeCapture::Burst => {
                effects.push(ModeEffect::Emit(CaptureEvent::BurstSucceeded {
                    photo: Some(photo),
                    session_finished: false,
                }));
            }
            ModeCapture::BurstFreeHand => {
                if let Some(progress) = self.free_hand.as_mut() {
                    progress.images_saved += 1;
                }
                effects.extend(self.free_hand_frame_done(Some(photo)));
            }
            ModeCapture::Idle => {}
        }
        effects.extend(self.admit_pending());
        effects
    }

    /// A frame could not be acquired, decoded or stored
    pub fn on_frame_failed(&mut self, error: CameraError) -> Vec<ModeEffect> {
        self.token.release();
        if self.mode == ModeCapture::Capture {
            self.mode = ModeCapture::Idle;
        }
        let mut effects = vec![ModeEffect::Emit(CaptureEvent::Failed(error))];
        if self.mode == ModeCapture::BurstFreeHand {
            effects.extend(self.free_hand_frame_done(None));
        }
        effects.extend(self.admit_pending());
        effects
    }

    /// Count a finished free-hand frame and end the burst after the last one
    ///
    /// A saved frame is always reported; a lost last frame is reported without
    /// an image so the listener still learns the burst is over.
    fn free_hand_frame_done(&mut self, photo: Option<CapturedPhoto>) -> Vec<ModeEffect> {
        let finished = match self.free_hand.as_mut() {
            Some(progress) => {
                progress.frames_done += 1;
                progress.frames_done >= progress.plan.amount
            }
            None => true,
        };
        let mut effects = Vec::new();
        if photo.is_some() || finished {
            effects.push(ModeEffect::Emit(CaptureEvent::BurstSucceeded {
                photo,
                session_finished: finished,
            }));
        }
        if finished {
            info!("Free-hand burst finished");
            self.mode = ModeCapture::Idle;
            self.pending_still = false;
            effects.push(ModeEffect::Cancel(TimerKey::CaptureTick));
        }
        effects
    }

    /// A frame arrived that nobody wanted; it has been closed
    pub fn on_frame_discarded(&mut self) -> Vec<ModeEffect> {
        self.token.release();
        self.admit_pending()
    }

    /// Session closed: forget everything
    pub fn reset(&mut self) {
        self.mode = ModeCapture::Idle;
        self.token.release();
        self.pending_still = false;
        self.free_hand = None;
    }

    /// Switch modes, releasing a held token and stopping the old mode's timers
    fn enter(&mut self, mode: ModeCapture) -> Vec<ModeEffect> {
        debug!(from = ?self.mode, to = ?mode, "Capture mode change");
        self.token.release();
        self.pending_still = false;
        self.mode = mode;
        if mode != ModeCapture::BurstFreeHand {
            self.free_hand = None;
        }
        vec![
            ModeEffect::Cancel(TimerKey::CaptureTick),
            ModeEffect::Cancel(TimerKey::Countdown),
        ]
    }

    fn burst_tick(&mut self) -> Vec<ModeEffect> {
        if self.token.try_acquire() {
            vec![
                ModeEffect::IssueStill,
                ModeEffect::Schedule {
                    key: TimerKey::CaptureTick,
                    after: self.timing.burst_interval(),
                },
            ]
        } else {
            self.pending_still = true;
            Vec::new()
        }
    }

    fn free_hand_tick(&mut self) -> Vec<ModeEffect> {
        let Some(progress) = self.free_hand.as_mut() else {
            return Vec::new();
        };
        if progress.counting_down || progress.tasks_issued >= progress.plan.amount {
            return Vec::new();
        }

        progress.tasks_issued += 1;
        debug!(
            issued = progress.tasks_issued,
            amount = progress.plan.amount,
            "Free-hand tick"
        );

        if self.token.try_acquire() {
            self.after_free_hand_issue()
        } else {
            self.pending_still = true;
            Vec::new()
        }
    }

    fn after_free_hand_issue(&self) -> Vec<ModeEffect> {
        let mut effects = vec![ModeEffect::IssueStill];
        if let Some(progress) = self.free_hand
            && progress.tasks_issued < progress.plan.amount
        {
            effects.push(ModeEffect::Schedule {
                key: TimerKey::CaptureTick,
                after: progress.plan.distance,
            });
        }
        effects
    }

    fn countdown_step(&mut self) -> Vec<ModeEffect> {
        let tick = self.timing.countdown_tick();
        let Some(progress) = self.free_hand.as_mut() else {
            return Vec::new();
        };
        if !progress.counting_down {
            return Vec::new();
        }

        if progress.countdown_elapsed < progress.plan.delay {
            let remaining = progress.plan.delay - progress.countdown_elapsed;
            progress.countdown_elapsed += tick;
            return vec![
                ModeEffect::Emit(CaptureEvent::Countdown {
                    remaining_ms: remaining.as_millis() as i64,
                    ended: false,
                }),
                ModeEffect::Schedule {
                    key: TimerKey::Countdown,
                    after: tick,
                },
            ];
        }

        progress.counting_down = false;
        let mut effects = vec![ModeEffect::Emit(CaptureEvent::Countdown {
            remaining_ms: tick.as_millis() as i64,
            ended: true,
        })];
        effects.extend(self.free_hand_tick());
        effects
    }

    /// Issue the still a tick had to hold back
    fn admit_pending(&mut self) -> Vec<ModeEffect> {
        if !self.pending_still {
            return Vec::new();
        }
        if self.mode == ModeCapture::Idle || !self.token.try_acquire() {
            return Vec::new();
        }
        self.pending_still = false;

        match self.mode {
            ModeCapture::Capture => vec![ModeEffect::IssueStill],
            ModeCapture::Burst => vec![
                ModeEffect::IssueStill,
                ModeEffect::Schedule {
                    key: TimerKey::CaptureTick,
                    after: self.timing.burst_interval(),
                },
            ],
            ModeCapture::BurstFreeHand => self.after_free_hand_issue(),
            ModeCapture::Idle => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> CaptureModeController {
        CaptureModeController::new(CaptureTiming::default())
    }

    fn photo() -> CapturedPhoto {
        CapturedPhoto::for_tests("Freehand-0")
    }

    fn issues(effects: &[ModeEffect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, ModeEffect::IssueStill))
            .count()
    }

    fn countdowns(effects: &[ModeEffect]) -> Vec<(i64, bool)> {
        effects
            .iter()
            .filter_map(|e| match e {
                ModeEffect::Emit(CaptureEvent::Countdown {
                    remaining_ms,
                    ended,
                }) => Some((*remaining_ms, *ended)),
                _ => None,
            })
            .collect()
    }

    fn plan(amount: u32, delay_ms: u64) -> FreeHandPlan {
        FreeHandPlan {
            amount,
            distance: Duration::from_millis(300),
            delay: Duration::from_millis(delay_ms),
        }
    }

    #[test]
    fn test_single_capture_returns_to_idle() {
        let mut ctrl = controller();
        let effects = ctrl.capture();
        assert_eq!(issues(&effects), 1);
        assert!(ctrl.token().is_held());
        assert_eq!(ctrl.mode(), ModeCapture::Capture);

        let effects = ctrl.on_frame_saved(photo());
        assert!(matches!(
            effects.as_slice(),
            [ModeEffect::Emit(CaptureEvent::Succeeded(_))]
        ));
        assert_eq!(ctrl.mode(), ModeCapture::Idle);
        assert!(!ctrl.token().is_held());
        assert!(!ctrl.wants_frame());
    }

    #[test]
    fn test_reentering_capture_releases_held_token() {
        let mut ctrl = controller();
        ctrl.capture();
        assert!(ctrl.token().is_held());
        // Frame never arrived; a second request must not be locked out
        assert_eq!(issues(&ctrl.capture()), 1);
        assert_eq!(issues(&ctrl.start_burst()), 1);
    }

    #[test]
    fn test_burst_tick_waits_for_token() {
        let mut ctrl = controller();
        let effects = ctrl.start_burst();
        assert_eq!(issues(&effects), 1);
        assert!(effects.iter().any(|e| matches!(
            e,
            ModeEffect::Schedule { key: TimerKey::CaptureTick, after } if *after == Duration::from_millis(100)
        )));

        // Frame still in flight: the tick holds back
        let effects = ctrl.on_timer(TimerKey::CaptureTick);
        assert_eq!(issues(&effects), 0);

        // Released: the held-back still goes out and the cadence resumes
        let effects = ctrl.on_frame_saved(photo());
        assert_eq!(issues(&effects), 1);
        assert!(matches!(
            effects[0],
            ModeEffect::Emit(CaptureEvent::BurstSucceeded {
                session_finished: false,
                ..
            })
        ));
        assert!(ctrl.token().is_held());
    }

    #[test]
    fn test_stop_burst_goes_idle() {
        let mut ctrl = controller();
        ctrl.start_burst();
        let effects = ctrl.stop_burst();
        assert_eq!(ctrl.mode(), ModeCapture::Idle);
        assert!(!ctrl.token().is_held());
        assert!(effects.iter().any(|e| matches!(e, ModeEffect::DropListener)));
        assert!(
            effects
                .iter()
                .any(|e| matches!(e, ModeEffect::Cancel(TimerKey::CaptureTick)))
        );
        assert!(ctrl.on_timer(TimerKey::CaptureTick).is_empty());
    }

    #[test]
    fn test_countdown_sequence() {
        let mut ctrl = controller();
        let mut seen = countdowns(&ctrl.start_free_hand(plan(3, 5000)));
        for _ in 0..5 {
            seen.extend(countdowns(&ctrl.on_timer(TimerKey::Countdown)));
        }
        assert_eq!(
            seen,
            vec![
                (5000, false),
                (4000, false),
                (3000, false),
                (2000, false),
                (1000, false),
                (1000, true),
            ]
        );
        // First frame goes out with the final tick
        assert_eq!(ctrl.free_hand_progress().unwrap().tasks_issued, 1);
    }

    #[test]
    fn test_free_hand_never_exceeds_amount() {
        let mut ctrl = controller();
        let effects = ctrl.start_free_hand(plan(3, 0));
        assert_eq!(countdowns(&effects), vec![(1000, true)]);
        let mut issued = issues(&effects);
        let mut last = 0;

        for _ in 0..10 {
            issued += issues(&ctrl.on_timer(TimerKey::CaptureTick));
            if ctrl.wants_frame() {
                issued += issues(&ctrl.on_frame_saved(photo()));
            }
            let now = ctrl.free_hand_progress().map(|p| p.tasks_issued).unwrap_or(3);
            assert!(now >= last);
            last = now;
        }

        assert_eq!(issued, 3);
        assert_eq!(ctrl.mode(), ModeCapture::Idle);
        assert!(!ctrl.wants_frame());
    }

    #[test]
    fn test_free_hand_reports_finish_on_last_frame() {
        let mut ctrl = controller();
        ctrl.start_free_hand(plan(2, 0));
        let first = ctrl.on_frame_saved(photo());
        assert!(matches!(
            first[0],
            ModeEffect::Emit(CaptureEvent::BurstSucceeded {
                session_finished: false,
                ..
            })
        ));
        ctrl.on_timer(TimerKey::CaptureTick);
        let last = ctrl.on_frame_saved(photo());
        assert!(matches!(
            last[0],
            ModeEffect::Emit(CaptureEvent::BurstSucceeded {
                session_finished: true,
                ..
            })
        ));
        assert_eq!(ctrl.mode(), ModeCapture::Idle);
    }

    #[test]
    fn test_free_hand_finishes_when_a_frame_is_lost() {
        let mut ctrl = controller();
        ctrl.start_free_hand(plan(2, 0));
        let effects = ctrl.on_frame_failed(CameraError::FrameAcquisition("empty".into()));
        assert!(matches!(
            effects.as_slice(),
            [ModeEffect::Emit(CaptureEvent::Failed(_))]
        ));
        assert_eq!(ctrl.mode(), ModeCapture::BurstFreeHand);
        assert!(ctrl.wants_frame());

        assert_eq!(issues(&ctrl.on_timer(TimerKey::CaptureTick)), 1);
        let last = ctrl.on_frame_saved(photo());
        assert!(matches!(
            last[0],
            ModeEffect::Emit(CaptureEvent::BurstSucceeded {
                photo: Some(_),
                session_finished: true,
            })
        ));
        assert_eq!(ctrl.mode(), ModeCapture::Idle);
        let progress = ctrl.free_hand_progress().unwrap();
        assert_eq!((progress.images_saved, progress.frames_done), (1, 2));
        assert!(ctrl.on_timer(TimerKey::CaptureTick).is_empty());
    }

    #[test]
    fn test_free_hand_lost_last_frame_still_finishes() {
        let mut ctrl = controller();
        ctrl.start_free_hand(plan(1, 0));
        let effects = ctrl.on_frame_failed(CameraError::Decode("truncated".into()));
        assert!(matches!(
            effects.as_slice(),
            [
                ModeEffect::Emit(CaptureEvent::Failed(CameraError::Decode(_))),
                ModeEffect::Emit(CaptureEvent::BurstSucceeded {
                    photo: None,
                    session_finished: true,
                }),
                ModeEffect::Cancel(TimerKey::CaptureTick),
            ]
        ));
        assert_eq!(ctrl.mode(), ModeCapture::Idle);
        assert!(!ctrl.wants_frame());
    }

    #[test]
    fn test_stop_free_hand_emits_cancel_sentinel() {
        let mut ctrl = controller();
        ctrl.start_free_hand(plan(5, 3000));
        let effects = ctrl.stop_free_hand();
        assert_eq!(countdowns(&effects), vec![(-1, true)]);
        assert!(matches!(effects.last(), Some(ModeEffect::DropListener)));
        assert_eq!(ctrl.mode(), ModeCapture::Idle);
        assert!(ctrl.on_timer(TimerKey::Countdown).is_empty());
    }

    #[test]
    fn test_restarting_free_hand_stops_previous() {
        let mut ctrl = controller();
        ctrl.start_free_hand(plan(5, 3000));
        let effects = ctrl.start_free_hand(plan(2, 2000));
        assert_eq!(countdowns(&effects), vec![(-1, true), (2000, false)]);
        let progress = ctrl.free_hand_progress().unwrap();
        assert_eq!(progress.plan.amount, 2);
        assert_eq!(progress.tasks_issued, 0);
    }

    #[test]
    fn test_failure_releases_token() {
        let mut ctrl = controller();
        ctrl.start_burst();
        let effects = ctrl.on_frame_failed(CameraError::FrameAcquisition("empty".into()));
        assert!(matches!(
            effects.as_slice(),
            [ModeEffect::Emit(CaptureEvent::Failed(CameraError::FrameAcquisition(_)))]
        ));
        assert!(!ctrl.token().is_held());
        assert_eq!(ctrl.mode(), ModeCapture::Burst);
    }

    #[test]
    fn test_discarded_frame_only_frees_token() {
        let mut ctrl = controller();
        ctrl.capture();
        ctrl.stop_active();
        ctrl.reset();
        assert!(ctrl.on_frame_discarded().is_empty());
        assert!(!ctrl.token().is_held());
    }
}
