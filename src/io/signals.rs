//! Signal handling for longlapse.
//!
//! SIGINT, SIGTERM and SIGHUP are forwarded from a dedicated thread as
//! [`SignalMessage::Shutdown`] over a channel. Long waits block on that
//! channel with `recv_timeout`, so a signal interrupts them immediately.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM},
    iterator::Signals,
};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError},
    thread,
    time::Duration,
};

use crate::time::Clock;

/// Messages delivered from the signal thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalMessage {
    /// Shutdown requested (SIGTERM, SIGINT, SIGHUP)
    Shutdown { signal: i32 },
}

/// Shared shutdown state.
pub struct ShutdownSignal {
    /// Cleared once a shutdown has been requested
    running: Arc<AtomicBool>,
    receiver: Receiver<SignalMessage>,
    sender: Sender<SignalMessage>,
}

impl ShutdownSignal {
    /// Create a shutdown channel that no OS signal is attached to.
    ///
    /// Used by tests and by callers that drive shutdown themselves through
    /// [`ShutdownSignal::sender`].
    pub fn new() -> Self {
        let (sender, receiver) = std::sync::mpsc::channel();
        Self {
            running: Arc::new(AtomicBool::new(true)),
            receiver,
            sender,
        }
    }

    /// A sender that can request shutdown from another thread.
    pub fn sender(&self) -> Sender<SignalMessage> {
        self.sender.clone()
    }

    /// Request shutdown from the current thread.
    pub fn request_shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.sender.send(SignalMessage::Shutdown { signal: 0 });
    }

    pub fn is_shutdown_requested(&self) -> bool {
        !self.running.load(Ordering::SeqCst)
    }

    /// Block for at most `chunk`, returning `true` if shutdown was requested.
    ///
    /// Simulated clocks advance instantly, so the channel is only polled
    /// before handing the chunk to the clock.
    pub fn wait(&self, chunk: Duration, clock: &dyn Clock) -> bool {
        if self.is_shutdown_requested() {
            return true;
        }

        let received = if clock.is_simulated() {
            match self.receiver.try_recv() {
                Ok(message) => Some(message),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                    clock.sleep(chunk);
                    None
                }
            }
        } else {
            match self.receiver.recv_timeout(chunk) {
                Ok(message) => Some(message),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => {
                    clock.sleep(chunk);
                    None
                }
            }
        };

        match received {
            Some(SignalMessage::Shutdown { .. }) => {
                self.running.store(false, Ordering::SeqCst);
                true
            }
            None => self.is_shutdown_requested(),
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Register the shutdown signals and start the forwarding thread.
pub fn setup_signal_handler(debug_enabled: bool) -> Result<ShutdownSignal> {
    let state = ShutdownSignal::new();

    let mut signals =
        Signals::new([SIGINT, SIGTERM, SIGHUP]).context("failed to register signal handlers")?;

    let running = state.running.clone();
    let sender = state.sender.clone();

    thread::spawn(move || {
        for sig in signals.forever() {
            let name = match sig {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => "signal",
            };

            if debug_enabled {
                log_pipe!();
                log_debug!("Received {name} (PID {})", std::process::id());
            }

            running.store(false, Ordering::SeqCst);
            if sender.send(SignalMessage::Shutdown { signal: sig }).is_err() {
                // Main thread is gone
                break;
            }
        }
    });

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::SimulatedClock;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_wait_times_out_without_signal() {
        let clock = SimulatedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
        let signal = ShutdownSignal::new();

        assert!(!signal.wait(Duration::from_secs(1), &clock));
        assert_eq!(
            clock.now(),
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 1).unwrap()
        );
    }

    #[test]
    fn test_message_from_other_thread_interrupts_wait() {
        let clock = SimulatedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
        let signal = ShutdownSignal::new();
        let sender = signal.sender();

        thread::spawn(move || {
            let _ = sender.send(SignalMessage::Shutdown { signal: SIGTERM });
        })
        .join()
        .unwrap();

        assert!(signal.wait(Duration::from_secs(1), &clock));
        assert!(signal.is_shutdown_requested());
    }

    #[test]
    fn test_request_shutdown_is_sticky() {
        let clock = SimulatedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
        let signal = ShutdownSignal::new();
        signal.request_shutdown();

        assert!(signal.wait(Duration::from_secs(1), &clock));
        assert!(signal.wait(Duration::from_secs(1), &clock));
    }
}
