//! Error taxonomy of the connection pair.
//!
//! [`BufferError`] is what a single direction reports. An [`Endpoint`](crate::Endpoint)
//! turns it into a [`ConnError`]: end-of-stream passes through as
//! [`ConnError::EndOfStream`], anything else is decorated with the operation and both
//! addresses as an [`OpError`], so callers can classify timeouts the same way they would
//! with a socket.

use crate::address::Address;
use std::fmt::{Display, Formatter};

/// Errors produced by one direction of the pipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// The buffer was closed. Sticky: every later read on a drained buffer and every later
    /// write reports it
    EndOfStream,
    /// A deadline passed. Transient: cleared by setting a new deadline
    DeadlineExceeded,
    /// A deadline timer could not be started
    Timer(String),
}

impl BufferError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BufferError::DeadlineExceeded)
    }
}

impl Display for BufferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferError::EndOfStream => f.write_str("EOF"),
            BufferError::DeadlineExceeded => f.write_str("i/o timeout"),
            BufferError::Timer(err) => write!(f, "unable to start deadline timer: {err}"),
        }
    }
}

impl std::error::Error for BufferError {}

/// The operation during which an [`OpError`] occurred
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    Read,
    Write,
    Close,
    SetDeadline,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Read => "read",
            Op::Write => "write",
            Op::Close => "close",
            Op::SetDeadline => "set deadline",
        }
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non end-of-stream error together with the operation and addresses it happened on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpError {
    pub op: Op,
    pub net: String,
    pub source: Address,
    pub addr: Address,
    pub err: BufferError,
}

impl OpError {
    pub fn is_timeout(&self) -> bool {
        self.err.is_timeout()
    }
}

impl Display for OpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}->{}: {}",
            self.op, self.net, self.source, self.addr, self.err
        )
    }
}

impl std::error::Error for OpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.err)
    }
}

/// The error type returned by [`Endpoint`](crate::Endpoint) operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnError {
    /// Orderly end of the stream. Never wrapped, so it can be matched directly
    EndOfStream,
    Op(OpError),
}

impl ConnError {
    pub fn is_eof(&self) -> bool {
        matches!(self, ConnError::EndOfStream)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ConnError::Op(err) if err.is_timeout())
    }
}

impl Display for ConnError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnError::EndOfStream => Display::fmt(&BufferError::EndOfStream, f),
            ConnError::Op(err) => Display::fmt(err, f),
        }
    }
}

impl std::error::Error for ConnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnError::EndOfStream => None,
            ConnError::Op(err) => Some(err),
        }
    }
}

impl From<OpError> for ConnError {
    fn from(err: OpError) -> Self {
        ConnError::Op(err)
    }
}

impl From<ConnError> for std::io::Error {
    fn from(val: ConnError) -> Self {
        let kind = match &val {
            ConnError::EndOfStream => std::io::ErrorKind::UnexpectedEof,
            ConnError::Op(err) if err.is_timeout() => std::io::ErrorKind::TimedOut,
            ConnError::Op(_) => std::io::ErrorKind::Other,
        };

        std::io::Error::new(kind, val)
    }
}
