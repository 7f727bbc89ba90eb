//! Async access to an [`Endpoint`].
//!
//! Protocol code is usually written against [`ReliableOrderedStreamToTarget`] and
//! [`ConnAddr`] rather than a concrete socket. Implementing both for [`Endpoint`] lets such
//! code run unmodified against an in-memory peer. `recv` suspends the task rather than a
//! thread and is cancel safe, so it can sit in a `select!` or under a timeout.

use crate::endpoint::Endpoint;
use crate::error::ConnError;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use std::sync::Arc;

/// Size of the chunk `recv` reads at most
pub const RECV_CHUNK: usize = 4096;

#[async_trait]
/// An ordered, reliable byte stream to a single peer
pub trait ReliableOrderedStreamToTarget: Send + Sync {
    /// Sends the whole input to the peer
    async fn send_to_peer(&self, input: &[u8]) -> std::io::Result<()>;
    /// Returns the next chunk sent by the peer. An empty chunk means end of stream
    async fn recv(&self) -> std::io::Result<Bytes>;
}

pub trait ConnAddr {
    /// Returns the address of this side of the connection
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
    /// Returns the address of the other side
    fn peer_addr(&self) -> std::io::Result<SocketAddr>;
}

pub trait ReliableOrderedConnectionToTarget: ConnAddr + ReliableOrderedStreamToTarget {}
impl<T: ConnAddr + ReliableOrderedStreamToTarget> ReliableOrderedConnectionToTarget for T {}

#[async_trait]
impl ReliableOrderedStreamToTarget for Endpoint {
    async fn send_to_peer(&self, input: &[u8]) -> std::io::Result<()> {
        self.write_all(input).map_err(|err| match err {
            ConnError::EndOfStream => std::io::Error::new(std::io::ErrorKind::BrokenPipe, err),
            err => err.into(),
        })
    }

    async fn recv(&self) -> std::io::Result<Bytes> {
        let mut buf = BytesMut::zeroed(RECV_CHUNK);
        match self.read_async(&mut buf).await {
            Ok(n) => {
                buf.truncate(n);
                Ok(buf.freeze())
            }
            Err(ConnError::EndOfStream) => Ok(Bytes::new()),
            Err(err) => Err(err.into()),
        }
    }
}

impl ConnAddr for Endpoint {
    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        Endpoint::local_addr(self).socket_addr()
    }

    fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.remote_addr().socket_addr()
    }
}

#[async_trait]
impl<T: ReliableOrderedStreamToTarget + ?Sized> ReliableOrderedStreamToTarget for Arc<T> {
    async fn send_to_peer(&self, input: &[u8]) -> std::io::Result<()> {
        T::send_to_peer(self, input).await
    }

    async fn recv(&self) -> std::io::Result<Bytes> {
        T::recv(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_log::DebugLog;
    use crate::pipe::{pipe, CLIENT_ADDR, SERVER_ADDR};
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn send_and_recv() {
        let (client, server) = pipe(DebugLog::none());
        client.send_to_peer(b"hello").await.unwrap();
        assert_eq!(server.recv().await.unwrap(), Bytes::from_static(b"hello"));

        client.close().unwrap();
        assert!(server.recv().await.unwrap().is_empty());
        let err = server.send_to_peer(b"late").await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn recv_waits_for_peer() {
        let (client, server) = pipe(DebugLog::none());
        let receiver = tokio::spawn(async move { server.recv().await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!receiver.is_finished());

        client.send_to_peer(b"late").await.unwrap();
        let got = receiver.await.unwrap().unwrap();
        assert_eq!(got.as_ref(), b"late");
    }

    #[tokio::test]
    async fn recv_times_out() {
        let (_client, server) = pipe(DebugLog::none());
        server
            .set_read_deadline(Some(Instant::now() + Duration::from_millis(20)))
            .unwrap();
        let err = server.recv().await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn through_arc_and_addrs() {
        let (client, server) = pipe(DebugLog::none());
        let client = Arc::new(client);
        assert_eq!(
            ConnAddr::local_addr(&*client).unwrap(),
            CLIENT_ADDR.parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            client.peer_addr().unwrap(),
            SERVER_ADDR.parse::<SocketAddr>().unwrap()
        );

        client.send_to_peer(b"arc").await.unwrap();
        assert_eq!(server.recv().await.unwrap().as_ref(), b"arc");
    }

    #[tokio::test]
    async fn cancelled_recv_keeps_later_data() {
        let (client, server) = pipe(DebugLog::none());
        let res = tokio::time::timeout(Duration::from_millis(50), server.recv()).await;
        assert!(res.is_err());

        client.send_to_peer(b"data").await.unwrap();
        let got = tokio::time::timeout(Duration::from_millis(500), server.recv())
            .await
            .expect("data sent after a cancelled recv was lost")
            .unwrap();
        assert_eq!(got.as_ref(), b"data");
    }

    #[test]
    fn runtime_shuts_down_with_pending_recv() {
        let (client, server) = pipe(DebugLog::none());
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        rt.spawn(async move { server.recv().await });
        rt.block_on(async { tokio::time::sleep(Duration::from_millis(20)).await });

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            drop(rt);
            tx.send(()).unwrap();
        });
        rx.recv_timeout(Duration::from_secs(2))
            .expect("runtime did not shut down");
        assert_eq!(client.write(b"after").unwrap(), 5);
    }
}
