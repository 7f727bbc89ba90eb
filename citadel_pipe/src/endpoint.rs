//! One side of a paired in-memory connection.
//!
//! An [`Endpoint`] owns no bytes. It reads from one [`Buffer`] and writes to another, and
//! its peer holds the same two buffers the other way around. Errors are decorated the way
//! a socket decorates them: an [`OpError`] naming the operation and both addresses, except
//! for end-of-stream, which is returned bare so it can be matched directly.

use crate::address::Address;
use crate::buffer::Buffer;
use crate::debug_log::DebugLog;
use crate::error::{BufferError, ConnError, Op, OpError};
use crate::state::Direction;
use std::net::Shutdown;
use std::time::Instant;

/// What [`Endpoint::close`] tears down
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CloseMode {
    /// Close both the outgoing and the incoming direction
    #[default]
    Full,
    /// Close only the outgoing direction; the peer sees end-of-stream while this side can
    /// keep reading whatever the peer still sends
    Half,
}

/// A connection endpoint. Cloning yields another handle to the same endpoint
#[derive(Debug, Clone)]
pub struct Endpoint {
    name: String,
    input: Buffer,
    output: Buffer,
    local: Address,
    remote: Address,
    close_mode: CloseMode,
    log: DebugLog,
}

impl Endpoint {
    pub(crate) fn new(
        name: String,
        input: Buffer,
        output: Buffer,
        local: Address,
        remote: Address,
        close_mode: CloseMode,
        log: DebugLog,
    ) -> Self {
        Self {
            name,
            input,
            output,
            local,
            remote,
            close_mode,
            log,
        }
    }

    /// Reads from the incoming buffer, blocking while it is empty and open
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, ConnError> {
        let res = self.input.read(buf).map_err(|err| self.op_error(Op::Read, err));
        self.trace_io(Direction::Read, &res);
        res
    }

    /// Reads from the incoming buffer without blocking the thread. Cancel safe
    pub async fn read_async(&self, buf: &mut [u8]) -> Result<usize, ConnError> {
        let res = self
            .input
            .read_async(buf)
            .await
            .map_err(|err| self.op_error(Op::Read, err));
        self.trace_io(Direction::Read, &res);
        res
    }

    /// Writes to the outgoing buffer. Never blocks
    pub fn write(&self, buf: &[u8]) -> Result<usize, ConnError> {
        let res = self
            .output
            .write(buf)
            .map_err(|err| self.op_error(Op::Write, err));
        self.trace_io(Direction::Write, &res);
        res
    }

    /// Writes the entire buffer. Since writes never block or split, a single write suffices
    pub fn write_all(&self, buf: &[u8]) -> Result<(), ConnError> {
        self.write(buf).map(|_| ())
    }

    /// Closes the endpoint according to its [`CloseMode`]. Idempotent
    pub fn close(&self) -> Result<(), ConnError> {
        match self.close_mode {
            CloseMode::Full => self.shutdown(Shutdown::Both),
            CloseMode::Half => self.shutdown(Shutdown::Write),
        }
    }

    /// Shuts down the read half, the write half, or both. Shutting down the write half
    /// signals end-of-stream to the peer once it drained what was written
    pub fn shutdown(&self, how: Shutdown) -> Result<(), ConnError> {
        let (input, output) = match how {
            Shutdown::Read => (self.input.close(), Ok(())),
            Shutdown::Write => (Ok(()), self.output.close()),
            Shutdown::Both => (self.input.close(), self.output.close()),
        };

        citadel_logging::debug!(target: "citadel", "[{}] shutdown {how:?}", self.name);
        output.and(input).map_err(|err| self.op_error(Op::Close, err))
    }

    /// Sets both the read and the write deadline. Both are applied even if the first fails;
    /// the first error is returned
    pub fn set_deadline(&self, deadline: Option<Instant>) -> Result<(), ConnError> {
        let read = self.set_read_deadline(deadline);
        let write = self.set_write_deadline(deadline);
        read.and(write)
    }

    pub fn set_read_deadline(&self, deadline: Option<Instant>) -> Result<(), ConnError> {
        self.input
            .set_read_deadline(deadline)
            .map_err(|err| self.op_error(Op::SetDeadline, err))
    }

    pub fn set_write_deadline(&self, deadline: Option<Instant>) -> Result<(), ConnError> {
        self.output
            .set_write_deadline(deadline)
            .map_err(|err| self.op_error(Op::SetDeadline, err))
    }

    pub fn local_addr(&self) -> &Address {
        &self.local
    }

    pub fn remote_addr(&self) -> &Address {
        &self.remote
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn close_mode(&self) -> CloseMode {
        self.close_mode
    }

    /// Number of bytes waiting to be read on this side
    pub fn pending(&self) -> usize {
        self.input.len()
    }

    fn trace_io(&self, direction: Direction, res: &Result<usize, ConnError>) {
        if !self.log.is_enabled() {
            return;
        }

        let (err, len) = match res {
            Ok(n) => (None, *n),
            Err(err) => (Some(err), 0),
        };

        self.log.println(&[&self.name, &err, &direction, &len]);
    }

    /// End-of-stream passes through; everything else gets the operation and addresses
    fn op_error(&self, op: Op, err: BufferError) -> ConnError {
        match err {
            BufferError::EndOfStream => ConnError::EndOfStream,
            err => ConnError::Op(OpError {
                op,
                net: self.local.network().to_string(),
                source: self.local.clone(),
                addr: self.remote.clone(),
                err,
            }),
        }
    }
}

fn to_io(err: ConnError, eof: std::io::ErrorKind) -> std::io::Error {
    match err {
        ConnError::EndOfStream => std::io::Error::new(eof, ConnError::EndOfStream),
        err => err.into(),
    }
}

impl std::io::Read for &Endpoint {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match Endpoint::read(*self, buf) {
            Err(ConnError::EndOfStream) => Ok(0),
            res => res.map_err(|err| to_io(err, std::io::ErrorKind::UnexpectedEof)),
        }
    }
}

impl std::io::Write for &Endpoint {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Endpoint::write(*self, buf).map_err(|err| to_io(err, std::io::ErrorKind::BrokenPipe))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl std::io::Read for Endpoint {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        <&Endpoint as std::io::Read>::read(&mut &*self, buf)
    }
}

impl std::io::Write for Endpoint {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        <&Endpoint as std::io::Write>::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citadel_io::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    fn loopback(log: DebugLog) -> Endpoint {
        let b = Buffer::new();
        Endpoint::new(
            "test".to_string(),
            b.clone(),
            b,
            Address::tcp("4.3.2.1:4321"),
            Address::tcp("1.2.3.4:1234"),
            CloseMode::Full,
            log,
        )
    }

    #[test]
    fn addresses_and_loopback() {
        let c = loopback(DebugLog::none());
        assert_eq!(c.remote_addr(), &Address::tcp("1.2.3.4:1234"));
        assert_eq!(c.local_addr(), &Address::tcp("4.3.2.1:4321"));

        let wrote = b"hello";
        assert_eq!(c.write(wrote).unwrap(), wrote.len());
        assert_eq!(c.pending(), wrote.len());

        let mut read = [0u8; 5];
        assert_eq!(c.read(&mut read).unwrap(), wrote.len());
        assert_eq!(&read, wrote);
    }

    #[test]
    fn timeouts_are_wrapped_eof_is_not() {
        let c = loopback(DebugLog::none());
        c.set_read_deadline(Some(Instant::now())).unwrap();

        let err = c.read(&mut [0u8; 4]).unwrap_err();
        assert!(err.is_timeout());
        match err {
            ConnError::Op(op) => {
                assert_eq!(op.op, Op::Read);
                assert_eq!(op.net, "tcp");
                assert_eq!(op.source, Address::tcp("4.3.2.1:4321"));
                assert_eq!(op.addr, Address::tcp("1.2.3.4:1234"));
            }
            other => panic!("unexpected {other:?}"),
        }

        c.close().unwrap();
        assert_eq!(c.read(&mut [0u8; 4]), Err(ConnError::EndOfStream));
        assert_eq!(c.write(b"x"), Err(ConnError::EndOfStream));
    }

    #[test]
    fn debug_log_sees_every_io_call() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let c = loopback(DebugLog::new(move |args| {
            sink.lock().push(crate::debug_log::join_args(args))
        }));

        c.write(b"abc").unwrap();
        c.read(&mut [0u8; 8]).unwrap();
        c.close().unwrap();
        let _ = c.read(&mut [0u8; 8]);

        let lines = lines.lock();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "\"test\" None Write 3");
        assert_eq!(lines[1], "\"test\" None Read 3");
        assert_eq!(lines[2], "\"test\" Some(EndOfStream) Read 0");
    }

    #[test]
    fn io_traits() {
        use std::io::{Read, Write};

        let mut c = loopback(DebugLog::none());
        c.write_all(b"over io").unwrap();
        c.flush().unwrap();
        c.shutdown(Shutdown::Write).unwrap();

        let mut out = String::new();
        c.read_to_string(&mut out).unwrap();
        assert_eq!(out, "over io");

        let err = Write::write(&mut c, b"late").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn io_timeout_kind() {
        let c = loopback(DebugLog::none());
        c.set_read_deadline(Some(Instant::now() + Duration::from_millis(20)))
            .unwrap();
        let err = std::io::Read::read(&mut &c, &mut [0u8; 1]).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);
    }

    #[test]
    fn set_deadline_reaches_both_directions() {
        let c = loopback(DebugLog::none());
        c.write(b"queued").unwrap();
        c.set_deadline(Some(Instant::now())).unwrap();

        assert!(c.write(b"x").unwrap_err().is_timeout());
        assert_eq!(c.read(&mut [0u8; 6]).unwrap(), 6);
        assert!(c.read(&mut [0u8; 6]).unwrap_err().is_timeout());

        c.set_deadline(None).unwrap();
        c.write(b"x").unwrap();
        assert_eq!(c.read(&mut [0u8; 6]).unwrap(), 1);
    }

    #[tokio::test]
    async fn read_async_wraps_errors_like_read() {
        let c = loopback(DebugLog::none());
        c.write(b"abc").unwrap();
        assert_eq!(c.read_async(&mut [0u8; 8]).await.unwrap(), 3);

        c.set_read_deadline(Some(Instant::now())).unwrap();
        let err = c.read_async(&mut [0u8; 8]).await.unwrap_err();
        assert!(matches!(err, ConnError::Op(ref op) if op.op == Op::Read && op.err.is_timeout()));

        c.close().unwrap();
        assert_eq!(c.read_async(&mut [0u8; 8]).await, Err(ConnError::EndOfStream));
    }
}
