//! Synchronization primitives backed by parking_lot, plus tokio's [`Notify`] for tasks
//! that must wait without parking a thread.
//!
//! parking_lot locks never poison, so guards are obtained without a `Result`, and
//! `Condvar::wait` takes the guard by `&mut` instead of consuming it.

/// A mutual exclusion primitive useful for protecting shared data.
pub type Mutex<T> = parking_lot::Mutex<T>;

/// A condition variable paired with a [`Mutex`]. Spurious wakeups are possible, so
/// waiters must re-check their predicate in a loop.
pub type Condvar = parking_lot::Condvar;

/// The async counterpart of [`Condvar`]. A waiter has to `enable` its `Notified` future
/// before checking its predicate, otherwise a `notify_waiters` in between is missed.
pub type Notify = tokio::sync::Notify;

#[cfg(test)]
mod tests {
    use super::{Condvar, Mutex, Notify};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[test]
    fn condvar_wakes_waiter() {
        let pair = Arc::new((Mutex::new(false), Condvar::new()));
        let pair2 = pair.clone();

        let waiter = std::thread::spawn(move || {
            let (lock, cond) = &*pair2;
            let mut ready = lock.lock();
            while !*ready {
                cond.wait(&mut ready);
            }
        });

        {
            let (lock, cond) = &*pair;
            *lock.lock() = true;
            cond.notify_all();
        }

        waiter.join().unwrap();
    }

    #[test]
    fn condvar_wait_until_times_out() {
        let lock = Mutex::new(());
        let cond = Condvar::new();
        let deadline = Instant::now() + Duration::from_millis(20);
        let mut guard = lock.lock();
        let res = cond.wait_until(&mut guard, deadline);
        assert!(res.timed_out());
        assert!(Instant::now() >= deadline);
    }

    #[tokio::test]
    async fn enabled_notified_sees_earlier_notify_waiters() {
        let notify = Notify::new();
        let notified = notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        notify.notify_waiters();
        tokio::time::timeout(Duration::from_secs(1), notified)
            .await
            .unwrap();
    }
}
