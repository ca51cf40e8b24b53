// SPDX-License-Identifier: GPL-3.0-only

//! Capture outcomes delivered to the UI

use crate::errors::CameraError;
use crate::pipelines::photo::CapturedPhoto;
use std::sync::mpsc;

/// Listener of one capture request; replaced on each new request, dropped on stop
pub type CaptureListener = mpsc::Sender<CaptureEvent>;

/// Outcome of a capture request
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// Single shot saved
    Succeeded(CapturedPhoto),
    /// One frame of a burst saved; `session_finished` on the last free-hand frame
    ///
    /// `photo` is `None` only when the last free-hand frame was lost.
    BurstSucceeded {
        photo: Option<CapturedPhoto>,
        session_finished: bool,
    },
    /// Free-hand countdown progress
    ///
    /// `remaining_ms` counts down by the tick while `ended` is false. The final
    /// tick reports `ended` with the tick length; cancellation reports `-1`.
    Countdown { remaining_ms: i64, ended: bool },
    /// Frame lost
    Failed(CameraError),
}

impl CaptureEvent {
    /// Route the event to the matching callback
    pub fn dispatch<C: CaptureCallbacks + ?Sized>(self, callbacks: &mut C) {
        match self {
            CaptureEvent::Succeeded(photo) => callbacks.capture_succeeded(photo),
            CaptureEvent::BurstSucceeded {
                photo,
                session_finished,
            } => callbacks.capture_burst_succeeded(photo, session_finished),
            CaptureEvent::Countdown {
                remaining_ms,
                ended,
            } => callbacks.countdown_free_hand(remaining_ms, ended),
            CaptureEvent::Failed(error) => callbacks.capture_failed(error),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CaptureEvent::Failed(_))
    }
}

/// Callback form of [`CaptureEvent`]
pub trait CaptureCallbacks {
    fn capture_succeeded(&mut self, photo: CapturedPhoto);

    fn capture_burst_succeeded(&mut self, photo: Option<CapturedPhoto>, session_finished: bool);

    fn countdown_free_hand(&mut self, _remaining_ms: i64, _ended: bool) {}

    fn capture_failed(&mut self, error: CameraError);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl CaptureCallbacks for Recorder {
        fn capture_succeeded(&mut self, photo: CapturedPhoto) {
            self.calls.push(format!("succeeded {}", photo.name));
        }

        fn capture_burst_succeeded(
            &mut self,
            photo: Option<CapturedPhoto>,
            session_finished: bool,
        ) {
            let name = photo.map(|p| p.name).unwrap_or_else(|| "-".into());
            self.calls.push(format!("burst {} {}", name, session_finished));
        }

        fn countdown_free_hand(&mut self, remaining_ms: i64, ended: bool) {
            self.calls.push(format!("countdown {} {}", remaining_ms, ended));
        }

        fn capture_failed(&mut self, error: CameraError) {
            self.calls.push(format!("failed {}", error));
        }
    }

    #[test]
    fn test_dispatch_routes_each_variant() {
        let mut recorder = Recorder::default();
        let photo = CapturedPhoto::for_tests("Freehand-1");

        CaptureEvent::Succeeded(photo.clone()).dispatch(&mut recorder);
        CaptureEvent::BurstSucceeded {
            photo: Some(photo),
            session_finished: false,
        }
        .dispatch(&mut recorder);
        CaptureEvent::BurstSucceeded {
            photo: None,
            session_finished: true,
        }
        .dispatch(&mut recorder);
        CaptureEvent::Countdown {
            remaining_ms: -1,
            ended: true,
        }
        .dispatch(&mut recorder);
        CaptureEvent::Failed(CameraError::SessionClosed).dispatch(&mut recorder);

        assert_eq!(
            recorder.calls,
            vec![
                "succeeded Freehand-1",
                "burst Freehand-1 false",
                "burst - true",
                "countdown -1 true",
                "failed Camera session is closed",
            ]
        );
    }
}
