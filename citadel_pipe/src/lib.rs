//! # Citadel Pipe
//!
//! An in-process, fully duplex connection pair. Each side behaves like a socket: reads
//! block until the peer writes or closes, writes never block, and reads and writes have
//! independent deadlines. No operating system resources are involved, which makes the pair
//! a deterministic stand-in for a network peer when testing protocol code.
//!
//! ## Core Components
//!
//! - [`pipe`] / [`PipeBuilder`]: creates two cross-wired [`Endpoint`]s
//! - [`Endpoint`]: the connection contract (read, write, close, shutdown, deadlines,
//!   addresses), also available through `std::io::Read`/`Write` and the async
//!   [`stream::ReliableOrderedStreamToTarget`] trait
//! - [`Buffer`]: one direction of the pair; a blocking FIFO byte queue
//! - [`Address`]: the synthetic address of a side
//! - [`DebugLog`]: optional sink that observes every read and write
//!
//! ## Example
//!
//! ```rust
//! use citadel_pipe::{pipe, ConnError, DebugLog};
//! use std::time::{Duration, Instant};
//!
//! let (client, server) = pipe(DebugLog::none());
//! client.write(b"hello").unwrap();
//! client.close().unwrap();
//!
//! let mut buf = [0u8; 16];
//! let n = server.read(&mut buf).unwrap();
//! assert_eq!(&buf[..n], b"hello");
//! assert_eq!(server.read(&mut buf), Err(ConnError::EndOfStream));
//!
//! let (_client, server) = pipe(DebugLog::none());
//! server.set_read_deadline(Some(Instant::now() + Duration::from_millis(10))).unwrap();
//! assert!(server.read(&mut buf).unwrap_err().is_timeout());
//! ```
//!
//! ## Error Handling
//!
//! End-of-stream is sticky and is reported as [`ConnError::EndOfStream`]. A passed deadline
//! is transient: it fails reads (or writes) with a timeout [`OpError`] until a new deadline
//! is set, but it never closes the connection. Once a side is closed, end-of-stream wins
//! over any deadline.
#![forbid(unsafe_code)]

pub mod address;
pub mod buffer;
pub mod debug_log;
pub mod endpoint;
pub mod error;
pub mod pipe;
mod state;
pub mod stream;

pub use address::Address;
pub use buffer::Buffer;
pub use debug_log::DebugLog;
pub use endpoint::{CloseMode, Endpoint};
pub use error::{BufferError, ConnError, Op, OpError};
pub use pipe::{pipe, PipeBuilder};
pub use state::Direction;

pub mod prelude {
    pub use crate::stream::{ConnAddr, ReliableOrderedStreamToTarget};
    pub use crate::{
        pipe, Address, CloseMode, ConnError, DebugLog, Direction, Endpoint, PipeBuilder,
    };
}
