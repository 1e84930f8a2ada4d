//! Session lifecycle and handshake driving (§3, §5).
//!
//! A `Session` owns the control stream and walks both peers through
//! SETUP/ANNOUNCE/SUBSCRIBE before handing off to the publisher or
//! subscriber engine. Once `Stopped`, every inbound message is ignored
//! rather than re-erroring.

use crate::error::{HandshakeError, WireError};
use crate::transport::{RecvStream, SendStream, Transport};
use crate::wire::control::{
    peek_tag, Announce, AnnounceOk, ControlMessageType, Role, Setup, SetupOk, SubscribeError,
    SubscribeRequest, SubscribeResponse,
};
use bytes::BytesMut;
use tracing::{debug, info, warn};

pub const PROTOCOL_VERSION: u32 = 0xff00_0001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Instantiated,
    Running,
    Stopped,
}

impl SessionState {
    /// Once `Stopped` there is no way back; every other transition is legal
    /// exactly once, in order.
    pub fn advance(self, to: SessionState) -> SessionState {
        if self == SessionState::Stopped {
            warn!(target: "session", "ignoring transition to {to:?}: session already stopped");
            return self;
        }
        to
    }
}

/// Drives the control stream to completion and hands back the peer's
/// negotiated role plus the open stream pair for the engine to keep using.
pub struct ControlChannel {
    send: Box<dyn SendStream>,
    recv: Box<dyn RecvStream>,
    buf: BytesMut,
}

impl ControlChannel {
    pub async fn open(transport: &dyn Transport) -> anyhow::Result<Self> {
        transport.ready().await?;
        let (send, recv) = transport.open_bi().await?;
        Ok(ControlChannel { send, recv, buf: BytesMut::new() })
    }

    async fn send_bytes(&mut self, buf: &BytesMut) -> anyhow::Result<()> {
        self.send.write_all(buf).await
    }

    async fn fill_more(&mut self) -> Result<(), HandshakeError> {
        match self.recv.recv_chunk().await.map_err(|_| HandshakeError::ControlStreamClosed)? {
            Some(chunk) => {
                self.buf.extend_from_slice(&chunk);
                Ok(())
            }
            None => Err(HandshakeError::ControlStreamClosed),
        }
    }

    /// Reads one complete message off the persistent control stream,
    /// accumulating chunks in `self.buf` until `parse` succeeds. The
    /// control stream never reaches end-of-stream mid-session (unlike an
    /// object stream), so framing is incremental rather than read-to-end:
    /// a `TruncatedHeader` just means "not enough bytes yet", not an error.
    async fn recv_message<M>(
        &mut self,
        parse: impl Fn(&mut BytesMut) -> Result<M, WireError>,
    ) -> anyhow::Result<M> {
        loop {
            let mut attempt = self.buf.clone();
            match parse(&mut attempt) {
                Ok(message) => {
                    self.buf = attempt;
                    return Ok(message);
                }
                Err(WireError::TruncatedHeader) => match self.recv.recv_chunk().await? {
                    Some(chunk) => self.buf.extend_from_slice(&chunk),
                    None => anyhow::bail!("control stream closed before a full message arrived"),
                },
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Publisher-side handshake: send SETUP(role=Publisher), expect
    /// SETUP_OK from a peer willing to receive, then ANNOUNCE each
    /// namespace (carrying that namespace's own `authInfo`, per §4.D) and
    /// expect ANNOUNCE_OK for it.
    pub async fn run_publisher_setup(
        &mut self,
        auth_info: Option<String>,
        namespaces: &[(String, String)],
    ) -> Result<(), HandshakeError> {
        let setup = Setup { version: PROTOCOL_VERSION, role: Role::Publisher, auth_info };
        self.send_bytes(&setup.packetize()).await.map_err(|_| HandshakeError::ControlStreamClosed)?;

        let setup_ok: SetupOk =
            self.recv_message(SetupOk::depacketize).await.map_err(|_| HandshakeError::ControlStreamClosed)?;
        if !Role::Publisher.accepts(setup_ok.role) {
            return Err(HandshakeError::UnsupportedRole(setup_ok.role as u8));
        }

        for (namespace, ns_auth_info) in namespaces {
            let announce = Announce { namespace: namespace.clone(), auth_info: Some(ns_auth_info.clone()) };
            self.send_bytes(&announce.packetize()).await.map_err(|_| HandshakeError::ControlStreamClosed)?;

            let ok: AnnounceOk = self
                .recv_message(AnnounceOk::depacketize)
                .await
                .map_err(|_| HandshakeError::ControlStreamClosed)?;
            if &ok.namespace != namespace {
                return Err(HandshakeError::NamespaceMismatch {
                    expected: namespace.clone(),
                    got: ok.namespace,
                });
            }
            info!(target: "session", namespace = %namespace, "announced");
        }
        Ok(())
    }

    /// Subscriber-side handshake: send SETUP(role=Subscriber), expect
    /// SETUP_OK from a peer willing to send, then SUBSCRIBE_REQUEST for a
    /// single track and expect SUBSCRIBE_RESPONSE carrying its trackId.
    /// If the peer instead replies SUBSCRIBE_ERROR (the REDESIGN in
    /// `DESIGN.md`), that surfaces as `HandshakeError::SubscribeRejected`
    /// rather than being mistaken for a closed stream.
    pub async fn run_subscriber_setup(
        &mut self,
        auth_info: Option<String>,
        namespace: &str,
        track_name: &str,
    ) -> Result<u64, HandshakeError> {
        let setup = Setup { version: PROTOCOL_VERSION, role: Role::Subscriber, auth_info: auth_info.clone() };
        self.send_bytes(&setup.packetize()).await.map_err(|_| HandshakeError::ControlStreamClosed)?;

        let setup_ok: SetupOk =
            self.recv_message(SetupOk::depacketize).await.map_err(|_| HandshakeError::ControlStreamClosed)?;
        if !Role::Subscriber.accepts(setup_ok.role) {
            return Err(HandshakeError::UnsupportedRole(setup_ok.role as u8));
        }

        let req = SubscribeRequest {
            namespace: namespace.to_string(),
            track_name: track_name.to_string(),
            auth_info,
        };
        self.send_bytes(&req.packetize()).await.map_err(|_| HandshakeError::ControlStreamClosed)?;

        loop {
            match peek_tag(&self.buf) {
                Some(ControlMessageType::SubscribeResponse) => {
                    let mut attempt = self.buf.clone();
                    match SubscribeResponse::depacketize(&mut attempt) {
                        Ok(resp) => {
                            self.buf = attempt;
                            if resp.namespace != namespace || resp.track_name != track_name {
                                return Err(HandshakeError::TrackNameMismatch {
                                    expected: track_name.to_string(),
                                    got: resp.track_name,
                                });
                            }
                            debug!(target: "session", track_id = resp.track_id, "subscribed");
                            return Ok(resp.track_id);
                        }
                        Err(WireError::TruncatedHeader) => self.fill_more().await?,
                        Err(_) => return Err(HandshakeError::ControlStreamClosed),
                    }
                }
                Some(ControlMessageType::SubscribeError) => {
                    let mut attempt = self.buf.clone();
                    match SubscribeError::depacketize(&mut attempt) {
                        Ok(err) => {
                            self.buf = attempt;
                            return Err(HandshakeError::SubscribeRejected {
                                namespace: err.namespace,
                                name: err.track_name,
                                reason: err.reason,
                            });
                        }
                        Err(WireError::TruncatedHeader) => self.fill_more().await?,
                        Err(_) => return Err(HandshakeError::ControlStreamClosed),
                    }
                }
                Some(_) => return Err(HandshakeError::ControlStreamClosed),
                None if self.buf.is_empty() => self.fill_more().await?,
                None => return Err(HandshakeError::ControlStreamClosed),
            }
        }
    }

    /// Publisher side: accept one SUBSCRIBE_REQUEST off the control stream.
    pub(crate) async fn recv_subscribe_request(&mut self) -> anyhow::Result<SubscribeRequest> {
        self.recv_message(SubscribeRequest::depacketize).await
    }

    pub(crate) async fn send_subscribe_response(&mut self, resp: &SubscribeResponse) -> anyhow::Result<()> {
        self.send_bytes(&resp.packetize()).await
    }

    /// Publisher side: reply SUBSCRIBE_ERROR to a request this core declines
    /// (§9 REDESIGN — see `DESIGN.md`).
    pub(crate) async fn send_subscribe_error(&mut self, err: &SubscribeError) -> anyhow::Result<()> {
        self.send_bytes(&err.packetize()).await
    }
}
