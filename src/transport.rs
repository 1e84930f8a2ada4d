//! Transport abstraction (§6): a WebTransport-equivalent QUIC session.
//!
//! The engine only ever talks to the `dyn Transport` trait object handed to
//! it by the host; this module also ships a `quinn`-backed implementation,
//! splitting a connection-level trait from stream-level traits. Certificate
//! fingerprint verification happens before a `QuicTransport` is constructed
//! and is the caller's responsibility (§1 Out of scope).

use async_trait::async_trait;

#[async_trait]
pub trait SendStream: Send + Sync {
    async fn write_all(&mut self, buf: &[u8]) -> anyhow::Result<()>;
    /// Closes the write side; the peer observes end-of-stream once this settles.
    async fn finish(&mut self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait RecvStream: Send + Sync {
    /// Reads the next available chunk of bytes, or `None` once the peer has
    /// signaled stream end. The control stream (long-lived, many messages)
    /// and an object stream (single object, closed after one write) both
    /// read through this one primitive; [`read_to_end`] layers the
    /// single-shot framing used by object streams on top of it.
    async fn recv_chunk(&mut self) -> anyhow::Result<Option<Vec<u8>>>;
}

/// Drains `stream` until end-of-stream, concatenating every chunk. Correct
/// for a per-object unidirectional stream (§4.A: "no trailing delimiter;
/// stream end frames the payload") but not for the persistent control
/// stream, which is read incrementally instead (see `session::ControlChannel`).
pub(crate) async fn read_to_end(stream: &mut dyn RecvStream) -> anyhow::Result<Vec<u8>> {
    let mut buf = Vec::new();
    while let Some(chunk) = stream.recv_chunk().await? {
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens the single bidirectional control stream (§4.D).
    async fn open_bi(&self) -> anyhow::Result<(Box<dyn SendStream>, Box<dyn RecvStream>)>;
    /// Opens a unidirectional object stream with a `sendOrder` priority hint (§4.E).
    async fn open_uni(&self, send_order: u64) -> anyhow::Result<Box<dyn SendStream>>;
    /// Accepts the next incoming unidirectional object stream (§4.F).
    async fn accept_uni(&self) -> anyhow::Result<Box<dyn RecvStream>>;
    /// Resolves once the session is established.
    async fn ready(&self) -> anyhow::Result<()>;
    /// Resolves when the peer or transport closes the session.
    async fn closed(&self);
}

#[cfg(not(target_arch = "wasm32"))]
pub mod quic {
    use super::{RecvStream, SendStream, Transport};
    use async_trait::async_trait;

    /// Adapts a `quinn::Connection` (already verified/handshaken by the
    /// caller) to the [`Transport`] trait.
    #[derive(Debug, Clone)]
    pub struct QuicTransport {
        connection: quinn::Connection,
    }

    impl QuicTransport {
        pub fn new(connection: quinn::Connection) -> Self {
            Self { connection }
        }
    }

    pub struct QuicSendStream(quinn::SendStream);

    #[async_trait]
    impl SendStream for QuicSendStream {
        async fn write_all(&mut self, buf: &[u8]) -> anyhow::Result<()> {
            self.0.write_all(buf).await.map_err(Into::into)
        }

        async fn finish(&mut self) -> anyhow::Result<()> {
            self.0.finish().map_err(Into::into)
        }
    }

    pub struct QuicRecvStream(quinn::RecvStream);

    #[async_trait]
    impl RecvStream for QuicRecvStream {
        async fn recv_chunk(&mut self) -> anyhow::Result<Option<Vec<u8>>> {
            let mut chunk = vec![0u8; 4096];
            match self.0.read(&mut chunk).await? {
                Some(n) => {
                    chunk.truncate(n);
                    Ok(Some(chunk))
                }
                None => Ok(None),
            }
        }
    }

    #[async_trait]
    impl Transport for QuicTransport {
        async fn open_bi(&self) -> anyhow::Result<(Box<dyn SendStream>, Box<dyn RecvStream>)> {
            let (send, recv) = self.connection.open_bi().await?;
            Ok((Box::new(QuicSendStream(send)), Box::new(QuicRecvStream(recv))))
        }

        async fn open_uni(&self, send_order: u64) -> anyhow::Result<Box<dyn SendStream>> {
            let mut send = self.connection.open_uni().await?;
            send.set_priority(send_order.min(i32::MAX as u64) as i32).ok();
            Ok(Box::new(QuicSendStream(send)))
        }

        async fn accept_uni(&self) -> anyhow::Result<Box<dyn RecvStream>> {
            let recv = self.connection.accept_uni().await?;
            Ok(Box::new(QuicRecvStream(recv)))
        }

        async fn ready(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn closed(&self) {
            self.connection.closed().await;
        }
    }
}
