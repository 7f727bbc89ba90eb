//! Runtime primitives shared by the pipe crates.
//!
//! Locks and condition variables come from `parking_lot`, deadline timers run on named OS
//! threads, and tokio's `Notify` wakes async readers.

pub mod locks;
pub mod spawn;

pub use locks::*;
pub use spawn::spawn_thread;

#[cfg(feature = "deadlock-detection")]
pub use parking_lot::deadlock;
