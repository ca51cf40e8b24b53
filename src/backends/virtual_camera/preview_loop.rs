// SPDX-License-Identifier: GPL-3.0-only
//! Frame-rate thread driving the virtual repeating request
//!
//! Real devices deliver one capture result per preview frame. The virtual device
//! imitates that with a thread calling a closure once per frame interval until
//! the closure or the owner stops it.

use crate::backends::camera::executor::LoopAction;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Controller for a preview loop running in a separate thread
pub struct PreviewLoop {
    /// Thread handle for joining
    thread_handle: Option<JoinHandle<()>>,
    /// Signal to stop the loop
    stop_signal: Arc<AtomicBool>,
    /// Name for logging
    name: String,
}

impl PreviewLoop {
    /// Start calling `frame_fn` every `interval`
    ///
    /// The first call happens one interval after start.
    pub fn start<F>(name: &str, interval: Duration, mut frame_fn: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();

        info!(name = %name, interval_ms = interval.as_millis() as u64, "Starting preview loop");

        let thread_handle = thread::spawn(move || {
            debug!(name = %name_clone, "Preview loop thread started");

            loop {
                thread::sleep(interval);

                // Check stop signal first
                if stop_signal_clone.load(Ordering::SeqCst) {
                    debug!(name = %name_clone, "Stop signal received");
                    break;
                }

                if frame_fn() == LoopAction::Stop {
                    debug!(name = %name_clone, "Loop requested stop");
                    break;
                }
            }

            info!(name = %name_clone, "Preview loop thread exiting");
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop (non-blocking)
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting preview loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.request_stop();
        if let Some(handle) = self.thread_handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Preview loop thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Preview loop thread finished");
            }
        }
    }
}

impl Drop for PreviewLoop {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "PreviewLoop dropped, stopping loop");
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_loop_stops_itself() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut preview = PreviewLoop::start("test-preview", Duration::from_millis(1), move || {
            let count = counter_clone.fetch_add(1, Ordering::SeqCst);
            if count >= 4 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        });

        while preview.is_running() {
            thread::sleep(Duration::from_millis(5));
        }
        preview.stop();
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_stop_signal() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut preview = PreviewLoop::start("test-preview", Duration::from_millis(5), move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            LoopAction::Continue
        });

        thread::sleep(Duration::from_millis(50));
        preview.stop();
        let seen = counter.load(Ordering::SeqCst);
        assert!(seen > 0);

        thread::sleep(Duration::from_millis(20));
        assert_eq!(counter.load(Ordering::SeqCst), seen);
    }
}
