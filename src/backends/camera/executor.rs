// SPDX-License-Identifier: GPL-3.0-only
//! Background context of an open camera session
//!
//! Each open session owns one OS thread running a current-thread tokio runtime.
//! All device calls, timer ticks and state changes of the session happen on
//! that thread, one at a time. CPU-heavy jobs go to the runtime's blocking pool
//! and report back by sending a command, so the state is never shared.
//!
//! Stopping drains the context: the loop exits, [`ContextTask::on_stop`] runs,
//! the runtime is dropped (which waits for blocking jobs) and the thread is
//! joined. Results sent after that point are discarded.

use crate::errors::{CameraError, CameraResult};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Returned by the task handlers to keep the loop running or end it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Keyed one-shot timers
///
/// Scheduling a key that is already pending replaces its deadline; cancelling a
/// key removes it. A fired key is removed before its handler runs.
#[derive(Debug, Clone)]
pub struct TimerQueue<K> {
    deadlines: BTreeMap<K, Instant>,
}

impl<K: Ord + Copy + Debug> TimerQueue<K> {
    pub fn new() -> Self {
        Self {
            deadlines: BTreeMap::new(),
        }
    }

    pub fn schedule(&mut self, key: K, after: Duration) {
        self.schedule_at(key, Instant::now() + after);
    }

    pub fn schedule_at(&mut self, key: K, deadline: Instant) {
        self.deadlines.insert(key, deadline);
    }

    /// Remove a pending key; returns whether it was pending
    pub fn cancel(&mut self, key: K) -> bool {
        self.deadlines.remove(&key).is_some()
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Earliest deadline
    pub fn next_deadline(&self) -> Option<(K, Instant)> {
        self.deadlines
            .iter()
            .min_by_key(|(key, deadline)| (**deadline, **key))
            .map(|(key, deadline)| (*key, *deadline))
    }

    /// Remove and return the earliest key whose deadline is not after `now`
    pub fn pop_expired(&mut self, now: Instant) -> Option<K> {
        let (key, deadline) = self.next_deadline()?;
        if deadline <= now {
            self.deadlines.remove(&key);
            Some(key)
        } else {
            None
        }
    }
}

impl<K: Ord + Copy + Debug> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// State machine driven by a [`BackgroundContext`]
pub trait ContextTask: Send + 'static {
    type Command: Send + 'static;
    type Timer: Ord + Copy + Debug + Send + 'static;

    fn on_command(
        &mut self,
        command: Self::Command,
        timers: &mut TimerQueue<Self::Timer>,
    ) -> LoopAction;

    fn on_timer(&mut self, key: Self::Timer, timers: &mut TimerQueue<Self::Timer>) -> LoopAction;

    /// Runs on the context thread after the loop exited
    fn on_stop(&mut self) {}
}

enum Envelope<C> {
    Command(C),
    Quit,
}

/// Cloneable handle for posting commands to a context
pub struct CommandSender<C> {
    tx: mpsc::UnboundedSender<Envelope<C>>,
}

impl<C> CommandSender<C> {
    /// Post a command; `false` once the context has stopped
    pub fn send(&self, command: C) -> bool {
        self.tx.send(Envelope::Command(command)).is_ok()
    }
}

impl<C> Clone for CommandSender<C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<C> std::fmt::Debug for CommandSender<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSender")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Dedicated thread with a current-thread runtime driving one [`ContextTask`]
pub struct BackgroundContext<C> {
    sender: mpsc::UnboundedSender<Envelope<C>>,
    /// Thread handle for joining
    thread_handle: Option<JoinHandle<()>>,
    /// Name for logging
    name: String,
}

impl<C: Send + 'static> BackgroundContext<C> {
    /// Start the context
    ///
    /// `init` runs on the new thread inside the runtime and receives a sender
    /// back into the context, so the task can post results of its own jobs.
    pub fn start<T, I>(name: &str, init: I) -> CameraResult<Self>
    where
        T: ContextTask<Command = C>,
        I: FnOnce(CommandSender<C>) -> T + Send + 'static,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .thread_name(format!("{}-worker", name))
            .build()
            .map_err(|e| CameraError::DeviceAccess(format!("Cannot start runtime: {}", e)))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let task_sender = CommandSender { tx: tx.clone() };
        let name_clone = name.to_string();

        info!(name = %name, "Starting background context");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!(name = %name_clone, "Background context thread started");
                runtime.block_on(async {
                    let task = init(task_sender);
                    run_loop(task, rx, &name_clone).await;
                });
                // Waits for blocking jobs still in flight
                drop(runtime);
                info!(name = %name_clone, "Background context thread exiting");
            })
            .map_err(|e| CameraError::DeviceAccess(format!("Cannot spawn thread: {}", e)))?;

        Ok(Self {
            sender: tx,
            thread_handle: Some(thread_handle),
            name: name.to_string(),
        })
    }

    /// Post a command; `false` once the context has stopped
    pub fn send(&self, command: C) -> bool {
        self.sender.send(Envelope::Command(command)).is_ok()
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Ask the loop to stop after the commands already queued (non-blocking)
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting background context stop");
        let _ = self.sender.send(Envelope::Quit);
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending the stop request
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if handle.thread().id() == thread::current().id() {
                warn!(name = %self.name, "Background context cannot join itself");
                return;
            }
            debug!(name = %self.name, "Waiting for background context to finish");
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Background context thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Background context finished");
            }
        }
    }
}

impl<C> Drop for BackgroundContext<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            debug!(name = %self.name, "BackgroundContext dropped, stopping loop");
            let _ = self.sender.send(Envelope::Quit);
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

async fn run_loop<T: ContextTask>(
    mut task: T,
    mut rx: mpsc::UnboundedReceiver<Envelope<T::Command>>,
    name: &str,
) {
    let mut timers = TimerQueue::<T::Timer>::new();

    loop {
        let next = timers.next_deadline().map(|(_, deadline)| deadline);

        let action = tokio::select! {
            biased;
            envelope = rx.recv() => match envelope {
                Some(Envelope::Command(command)) => task.on_command(command, &mut timers),
                Some(Envelope::Quit) | None => {
                    debug!(name = %name, "Stop signal received");
                    LoopAction::Stop
                }
            },
            _ = sleep_until(next) => match timers.pop_expired(Instant::now()) {
                Some(key) => task.on_timer(key, &mut timers),
                None => LoopAction::Continue,
            },
        };

        if action == LoopAction::Stop {
            break;
        }
    }

    rx.close();
    timers.clear();
    task.on_stop();
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc as std_mpsc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum Key {
        A,
        B,
    }

    #[test]
    fn test_timer_queue_orders_and_replaces() {
        let mut timers = TimerQueue::new();
        let now = Instant::now();
        timers.schedule_at(Key::A, now + Duration::from_millis(50));
        timers.schedule_at(Key::B, now + Duration::from_millis(10));
        assert_eq!(timers.next_deadline().map(|(k, _)| k), Some(Key::B));

        // Rescheduling replaces the deadline
        timers.schedule_at(Key::B, now + Duration::from_millis(100));
        assert_eq!(timers.next_deadline().map(|(k, _)| k), Some(Key::A));

        assert_eq!(timers.pop_expired(now), None);
        assert_eq!(timers.pop_expired(now + Duration::from_millis(60)), Some(Key::A));
        assert!(timers.cancel(Key::B));
        assert!(!timers.cancel(Key::B));
        assert!(timers.is_empty());
    }

    enum Cmd {
        Echo(u32),
        Arm(Duration),
        Disarm,
        Work,
        Done(u32),
        Quit,
    }

    struct Recorder {
        out: std_mpsc::Sender<String>,
        me: CommandSender<Cmd>,
    }

    impl ContextTask for Recorder {
        type Command = Cmd;
        type Timer = Key;

        fn on_command(&mut self, command: Cmd, timers: &mut TimerQueue<Key>) -> LoopAction {
            match command {
                Cmd::Echo(n) => {
                    let _ = self.out.send(format!("echo {}", n));
                }
                Cmd::Arm(after) => timers.schedule(Key::A, after),
                Cmd::Disarm => {
                    timers.cancel(Key::A);
                }
                Cmd::Work => {
                    let me = self.me.clone();
                    tokio::spawn(async move {
                        let value = tokio::task::spawn_blocking(|| 6 * 7).await.unwrap_or(0);
                        me.send(Cmd::Done(value));
                    });
                }
                Cmd::Done(n) => {
                    let _ = self.out.send(format!("done {}", n));
                }
                Cmd::Quit => return LoopAction::Stop,
            }
            LoopAction::Continue
        }

        fn on_timer(&mut self, key: Key, _timers: &mut TimerQueue<Key>) -> LoopAction {
            let _ = self.out.send(format!("timer {:?}", key));
            LoopAction::Continue
        }

        fn on_stop(&mut self) {
            let _ = self.out.send("stopped".to_string());
        }
    }

    fn start() -> (BackgroundContext<Cmd>, std_mpsc::Receiver<String>) {
        let (out, rx) = std_mpsc::channel();
        let context =
            BackgroundContext::start("test-context", move |me| Recorder { out, me }).unwrap();
        (context, rx)
    }

    fn next(rx: &std_mpsc::Receiver<String>) -> String {
        rx.recv_timeout(Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_commands_run_in_order() {
        let (mut context, rx) = start();
        assert!(context.send(Cmd::Echo(1)));
        assert!(context.send(Cmd::Echo(2)));
        assert_eq!(next(&rx), "echo 1");
        assert_eq!(next(&rx), "echo 2");
        context.stop();
        assert_eq!(next(&rx), "stopped");
        assert!(!context.is_running());
        assert!(!context.send(Cmd::Echo(3)));
    }

    #[test]
    fn test_timer_fires_and_cancel_suppresses() {
        let (mut context, rx) = start();
        context.send(Cmd::Arm(Duration::from_millis(20)));
        assert_eq!(next(&rx), "timer A");

        context.send(Cmd::Arm(Duration::from_millis(200)));
        context.send(Cmd::Disarm);
        context.send(Cmd::Echo(9));
        assert_eq!(next(&rx), "echo 9");
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
        context.stop();
    }

    #[test]
    fn test_blocking_job_reports_back() {
        let (mut context, rx) = start();
        context.send(Cmd::Work);
        assert_eq!(next(&rx), "done 42");
        context.stop();
    }

    #[test]
    fn test_task_can_stop_itself() {
        let (mut context, rx) = start();
        context.send(Cmd::Quit);
        assert_eq!(next(&rx), "stopped");
        context.join();
        assert!(!context.is_running());
    }
}
