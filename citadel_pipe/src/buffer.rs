//! A single direction of the pipe.
//!
//! A [`Buffer`] is a FIFO byte queue guarded by one mutex, with a condition variable that
//! blocking readers park on while the queue is empty and a [`Notify`] that async readers
//! await instead. Writes never block. Both
//! [`OperationState`]s live under the same mutex as the queue, and deadline timers lock
//! that mutex before they inject an error.

use crate::error::BufferError;
use crate::state::{DeadlineTimer, Direction, OperationState, TimerSignal};
use bytes::{Buf, BytesMut};
use citadel_io::{Condvar, Mutex, Notify};
use citadel_logging::trace;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Weak};
use std::time::Instant;

/// A lockable, conditional, unbounded byte queue. Cloning yields another handle to the same
/// queue; the queue lives until the last handle is dropped
#[derive(Clone, Default)]
pub struct Buffer {
    shared: Arc<Shared>,
}

struct Shared {
    inner: Mutex<BufferInner>,
    cond: Condvar,
    notify: Notify,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            inner: Mutex::new(BufferInner {
                queue: BytesMut::new(),
                // several readers may wait on the same deadline, so reads broadcast
                read: OperationState::new(true),
                write: OperationState::new(false),
            }),
            cond: Condvar::new(),
            notify: Notify::new(),
        }
    }
}

struct BufferInner {
    queue: BytesMut,
    read: OperationState,
    write: OperationState,
}

impl BufferInner {
    /// Takes queued bytes, or the read error once the queue is drained. `None` means the
    /// caller has to wait
    fn try_take(&mut self, dst: &mut [u8]) -> Option<Result<usize, BufferError>> {
        if !self.queue.is_empty() {
            let n = dst.len().min(self.queue.len());
            self.queue.copy_to_slice(&mut dst[..n]);
            return Some(Ok(n));
        }

        if let Some(err) = self.read.error() {
            return Some(Err(err.clone()));
        }

        if dst.is_empty() {
            return Some(Ok(0));
        }

        None
    }

    fn state_mut(&mut self, direction: Direction) -> &mut OperationState {
        match direction {
            Direction::Read => &mut self.read,
            Direction::Write => &mut self.write,
        }
    }
}

impl Shared {
    /// Runs on a timer thread once its deadline passed
    fn expire(this: &Weak<Shared>, direction: Direction, signal: &TimerSignal) {
        let Some(shared) = this.upgrade() else {
            return;
        };

        let mut inner = shared.inner.lock();
        if inner.state_mut(direction).expire(signal) {
            trace!(target: "citadel", "{direction} deadline exceeded, waking all readers");
            shared.wake_all();
        }
    }

    fn wake_all(&self) {
        self.cond.notify_all();
        self.notify.notify_waiters();
    }

    /// Wakes one blocking reader and every async reader; whoever locks first takes the bytes
    fn wake_one(&self) {
        self.cond.notify_one();
        self.notify.notify_waiters();
    }
}

impl Buffer {
    /// Returns a new, empty and open buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads from the buffer into `dst`.
    ///
    /// If bytes are queued, up to `dst.len()` of them are copied out and returned without
    /// blocking, even after the buffer was closed. Otherwise the read error is returned if
    /// there is one, and if not the calling thread waits until a write, a close or an
    /// expiring read deadline wakes it.
    pub fn read(&self, dst: &mut [u8]) -> Result<usize, BufferError> {
        let mut inner = self.shared.inner.lock();

        loop {
            if let Some(res) = self.take(&mut inner, dst) {
                return res;
            }

            self.shared.cond.wait(&mut inner);
        }
    }

    /// Like [`Buffer::read`], but returns `None` instead of waiting
    pub fn try_read(&self, dst: &mut [u8]) -> Option<Result<usize, BufferError>> {
        let mut inner = self.shared.inner.lock();
        self.take(&mut inner, dst)
    }

    /// Like [`Buffer::read`], but suspends the task instead of parking the thread.
    ///
    /// Cancel safe: bytes are only taken from the queue in the same poll that returns them,
    /// so dropping the future before it resolves loses nothing.
    pub async fn read_async(&self, dst: &mut [u8]) -> Result<usize, BufferError> {
        loop {
            let mut notified = std::pin::pin!(self.shared.notify.notified());
            notified.as_mut().enable();

            if let Some(res) = self.try_read(dst) {
                return res;
            }

            notified.await;
        }
    }

    fn take(
        &self,
        inner: &mut BufferInner,
        dst: &mut [u8],
    ) -> Option<Result<usize, BufferError>> {
        let res = inner.try_take(dst);
        // leftovers belong to the next waiting reader
        if matches!(res, Some(Ok(_))) && !inner.queue.is_empty() {
            self.shared.wake_one();
        }

        res
    }

    /// Appends `src` to the queue and wakes a reader. Never blocks. Fails without writing
    /// anything if the write side is closed or past its deadline
    pub fn write(&self, src: &[u8]) -> Result<usize, BufferError> {
        let mut inner = self.shared.inner.lock();

        if let Some(err) = inner.write.error() {
            return Err(err.clone());
        }

        inner.queue.extend_from_slice(src);
        self.shared.wake_one();
        Ok(src.len())
    }

    /// Closes both directions of the buffer. Queued bytes stay readable; once drained,
    /// reads return [`BufferError::EndOfStream`]. Pending deadline timers are cancelled and
    /// have terminated by the time this returns. Closing twice is a no-op
    pub fn close(&self) -> Result<(), BufferError> {
        let stale = {
            let mut inner = self.shared.inner.lock();
            let stale = [inner.read.close(), inner.write.close()];
            self.shared.wake_all();
            stale
        };

        for timer in stale.into_iter().flatten() {
            timer.join();
        }

        trace!(target: "citadel", "Buffer closed");
        Ok(())
    }

    /// Sets the read deadline. Readers that are waiting when the deadline passes return
    /// [`BufferError::DeadlineExceeded`]. `None` removes the deadline
    pub fn set_read_deadline(&self, deadline: Option<Instant>) -> Result<(), BufferError> {
        self.set_deadline(Direction::Read, deadline)
    }

    /// Sets the write deadline. Writes never wait, so this only decides whether the next
    /// write fails
    pub fn set_write_deadline(&self, deadline: Option<Instant>) -> Result<(), BufferError> {
        self.set_deadline(Direction::Write, deadline)
    }

    fn set_deadline(
        &self,
        direction: Direction,
        deadline: Option<Instant>,
    ) -> Result<(), BufferError> {
        let weak = Arc::downgrade(&self.shared);
        let update = {
            let mut inner = self.shared.inner.lock();
            let update = inner.state_mut(direction).set_deadline(deadline, |at| {
                DeadlineTimer::spawn(direction.timer_thread_name(), at, move |signal| {
                    Shared::expire(&weak, direction, signal)
                })
            });

            if update.wake {
                self.shared.wake_all();
            }

            update
        };

        update.finish()
    }

    /// Number of queued, unread bytes
    pub fn len(&self) -> usize {
        self.shared.inner.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.shared.inner.lock().read.is_closed()
    }

    /// Whether both handles point to the same queue
    pub fn ptr_eq(&self, other: &Buffer) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Debug for Buffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("Buffer")
            .field("len", &inner.queue.len())
            .field("read", &inner.read.error())
            .field("write", &inner.write.error())
            .field("read_deadline", &inner.read.has_deadline())
            .field("write_deadline", &inner.write.has_deadline())
            .finish()
    }
}
