//! Per-direction error and deadline state.
//!
//! Every [`Buffer`](crate::Buffer) keeps one [`OperationState`] for reads and one for
//! writes. A state is `open`, `deadline-exceeded` (transient) or `closed` (sticky). Only a
//! close leads to `closed`, and nothing leads out of it.
//!
//! A future deadline is enforced by a [`DeadlineTimer`]: an OS thread sleeping on its own
//! cancel signal. The owning buffer always flips the cancel flag while holding the buffer
//! mutex, and an expiring timer re-checks that flag under the same mutex before touching
//! the state. The join of a cancelled timer happens after the buffer mutex is released, so
//! a timer that is already waiting for the mutex can run to completion.

use crate::error::BufferError;
use citadel_io::{Condvar, Mutex};
use citadel_logging::{trace, warn};
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

/// One half of a stream
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    pub(crate) fn timer_thread_name(&self) -> &'static str {
        match self {
            Direction::Read => "citadel-pipe-read-deadline",
            Direction::Write => "citadel-pipe-write-deadline",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Read => f.write_str("read"),
            Direction::Write => f.write_str("write"),
        }
    }
}

/// The cancel signal shared between a [`DeadlineTimer`] and its thread
#[derive(Default)]
pub(crate) struct TimerSignal {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

impl TimerSignal {
    fn cancel(&self) {
        *self.cancelled.lock() = true;
        self.cond.notify_all();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        *self.cancelled.lock()
    }

    /// Sleeps until `deadline` or until cancelled. Returns true if the deadline was reached
    fn sleep_until(&self, deadline: Instant) -> bool {
        let mut cancelled = self.cancelled.lock();
        while !*cancelled && Instant::now() < deadline {
            let _ = self.cond.wait_until(&mut cancelled, deadline);
        }

        !*cancelled
    }
}

/// Handle to a running deadline thread
pub(crate) struct DeadlineTimer {
    signal: Arc<TimerSignal>,
    handle: JoinHandle<()>,
}

impl DeadlineTimer {
    /// Starts a thread that calls `on_expire` once `deadline` is reached, unless cancelled
    /// first. `on_expire` must re-check [`TimerSignal::is_cancelled`] once it holds the lock
    /// guarding whatever it mutates
    pub(crate) fn spawn<F>(name: &str, deadline: Instant, on_expire: F) -> std::io::Result<Self>
    where
        F: FnOnce(&TimerSignal) + Send + 'static,
    {
        let signal = Arc::new(TimerSignal::default());
        let thread_signal = signal.clone();
        let handle = citadel_io::spawn_thread(name, move || {
            if thread_signal.sleep_until(deadline) {
                on_expire(&thread_signal)
            }
        })?;

        Ok(Self { signal, handle })
    }

    fn cancel(&self) {
        self.signal.cancel()
    }

    /// Blocks until the timer thread has terminated
    pub(crate) fn join(self) {
        if self.handle.join().is_err() {
            warn!(target: "citadel", "Deadline timer thread panicked");
        }
    }
}

impl Debug for DeadlineTimer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadlineTimer")
            .field("cancelled", &self.signal.is_cancelled())
            .finish()
    }
}

/// The outcome of [`OperationState::set_deadline`]. Must be [finished](Self::finish) after
/// the buffer mutex has been released
#[must_use]
pub(crate) struct DeadlineUpdate {
    stale: Option<DeadlineTimer>,
    /// Waiters must be woken because the state just entered an error
    pub(crate) wake: bool,
    armed: Result<(), BufferError>,
}

impl DeadlineUpdate {
    /// Waits for the replaced timer to terminate and reports whether the new deadline was
    /// installed
    pub(crate) fn finish(self) -> Result<(), BufferError> {
        if let Some(stale) = self.stale {
            stale.join();
        }

        self.armed
    }
}

/// The error and deadline state of one direction of a buffer
#[derive(Debug)]
pub(crate) struct OperationState {
    err: Option<BufferError>,
    timer: Option<DeadlineTimer>,
    /// Whether entering an error must wake every waiter. Only readers ever wait
    broadcast: bool,
}

impl OperationState {
    pub(crate) fn new(broadcast: bool) -> Self {
        Self {
            err: None,
            timer: None,
            broadcast,
        }
    }

    pub(crate) fn error(&self) -> Option<&BufferError> {
        self.err.as_ref()
    }

    pub(crate) fn is_closed(&self) -> bool {
        matches!(self.err, Some(BufferError::EndOfStream))
    }

    pub(crate) fn has_deadline(&self) -> bool {
        self.timer.is_some()
    }

    /// Moves the state into `closed`. The returned timer was cancelled and must be joined
    /// once the buffer mutex is released
    pub(crate) fn close(&mut self) -> Option<DeadlineTimer> {
        let stale = self.cancel_deadline();
        self.err = Some(BufferError::EndOfStream);
        stale
    }

    /// Installs a new deadline. `None` clears the deadline and any timeout error, a
    /// deadline that already passed fails the direction immediately, and a future deadline
    /// is handed to `arm` to start a timer. A closed state only drops its old timer
    pub(crate) fn set_deadline<F>(&mut self, deadline: Option<Instant>, arm: F) -> DeadlineUpdate
    where
        F: FnOnce(Instant) -> std::io::Result<DeadlineTimer>,
    {
        let mut update = DeadlineUpdate {
            stale: self.cancel_deadline(),
            wake: false,
            armed: Ok(()),
        };

        if self.is_closed() {
            return update;
        }

        match deadline {
            None => {
                self.err = None;
            }

            Some(deadline) if deadline <= Instant::now() => {
                update.wake = self.set_error(BufferError::DeadlineExceeded);
            }

            Some(deadline) => {
                self.err = None;
                match arm(deadline) {
                    Ok(timer) => {
                        let remaining = deadline.saturating_duration_since(Instant::now());
                        trace!(target: "citadel", "Armed deadline timer for {remaining:?}");
                        self.timer = Some(timer);
                    }

                    Err(err) => {
                        warn!(target: "citadel", "Unable to start deadline timer: {err}");
                        update.armed = Err(BufferError::Timer(err.to_string()));
                    }
                }
            }
        }

        update
    }

    /// Called by an expired timer while holding the buffer mutex. Returns true if waiters
    /// must be woken
    pub(crate) fn expire(&mut self, signal: &TimerSignal) -> bool {
        if signal.is_cancelled() {
            trace!(target: "citadel", "Cancelled deadline timer lost the race for the buffer lock");
            return false;
        }

        self.set_error(BufferError::DeadlineExceeded)
    }

    /// Sets `err` unless the state is closed. Returns true if waiters must be woken
    fn set_error(&mut self, err: BufferError) -> bool {
        if self.is_closed() {
            return false;
        }

        self.err = Some(err);
        self.broadcast
    }

    fn cancel_deadline(&mut self) -> Option<DeadlineTimer> {
        let timer = self.timer.take()?;
        timer.cancel();
        Some(timer)
    }
}

impl Drop for OperationState {
    fn drop(&mut self) {
        // may run on the timer thread itself, so the timer is only told to stop
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}
