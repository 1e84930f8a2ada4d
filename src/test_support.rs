#![cfg(test)]
//! Shared in-memory `Transport` test double used by the session, publisher,
//! and subscriber scenario tests below. The control-stream peer can either
//! behave like a real MOQT counterpart (`ScriptedPeer`, for handshake-driving
//! tests where reply content must track whatever was just sent) or simply
//! replay a fixed list of frames (for tests exercising one inbound message
//! in isolation, e.g. `PublisherEngine::accept_subscribe`).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::BytesMut;

use crate::session::PROTOCOL_VERSION;
use crate::transport::{RecvStream, SendStream, Transport};
use crate::wire::control::{
    peek_tag, Announce, AnnounceOk, ControlMessageType, Role, Setup, SetupOk, SubscribeRequest,
    SubscribeResponse,
};

#[derive(Clone, Default)]
pub(crate) struct RecordingSendStream(pub(crate) Arc<Mutex<Vec<u8>>>);

#[async_trait]
impl SendStream for RecordingSendStream {
    async fn write_all(&mut self, buf: &[u8]) -> anyhow::Result<()> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(())
    }

    async fn finish(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct QueuedRecvStream(pub(crate) VecDeque<Vec<u8>>);

impl QueuedRecvStream {
    pub(crate) fn one(frame: Vec<u8>) -> Self {
        QueuedRecvStream(VecDeque::from([frame]))
    }
}

#[async_trait]
impl RecvStream for QueuedRecvStream {
    async fn recv_chunk(&mut self) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.0.pop_front())
    }
}

/// Replies the way a well-behaved counterpart advertising `peer_role`
/// would: SETUP_OK with that role, then ANNOUNCE_OK / SUBSCRIBE_RESPONSE
/// echoing whatever the engine under test just wrote. This keeps handshake
/// tests independent of the nondeterministic order namespaces are iterated
/// in (`HashSet` dedup has no stable order).
pub(crate) struct ScriptedPeer {
    control_send: Arc<Mutex<Vec<u8>>>,
    read_pos: usize,
    peer_role: Role,
    next_track_id: u64,
}

#[async_trait]
impl RecvStream for ScriptedPeer {
    async fn recv_chunk(&mut self) -> anyhow::Result<Option<Vec<u8>>> {
        let sent = self.control_send.lock().unwrap().clone();
        let mut cursor = BytesMut::from(&sent[self.read_pos..]);
        let reply = match peek_tag(&cursor) {
            Some(ControlMessageType::Setup) => {
                Setup::depacketize(&mut cursor).map_err(|e| anyhow::anyhow!(e))?;
                SetupOk { version: PROTOCOL_VERSION as u64, role: self.peer_role }.packetize()
            }
            Some(ControlMessageType::Announce) => {
                let announce = Announce::depacketize(&mut cursor).map_err(|e| anyhow::anyhow!(e))?;
                AnnounceOk { namespace: announce.namespace }.packetize()
            }
            Some(ControlMessageType::SubscribeRequest) => {
                let req = SubscribeRequest::depacketize(&mut cursor).map_err(|e| anyhow::anyhow!(e))?;
                let track_id = self.next_track_id;
                self.next_track_id += 1;
                SubscribeResponse { namespace: req.namespace, track_name: req.track_name, track_id, expires: 0 }
                    .packetize()
            }
            _ => return Ok(None),
        };
        self.read_pos = sent.len() - cursor.len();
        Ok(Some(reply.to_vec()))
    }
}

enum ControlRecv {
    Scripted(Role),
    Queued(VecDeque<Vec<u8>>),
}

struct ObjectSendStream {
    send_order: u64,
    buf: Vec<u8>,
    sink: Arc<Mutex<Vec<(u64, Vec<u8>)>>>,
}

#[async_trait]
impl SendStream for ObjectSendStream {
    async fn write_all(&mut self, buf: &[u8]) -> anyhow::Result<()> {
        self.buf.extend_from_slice(buf);
        Ok(())
    }

    async fn finish(&mut self) -> anyhow::Result<()> {
        self.sink.lock().unwrap().push((self.send_order, std::mem::take(&mut self.buf)));
        Ok(())
    }
}

pub(crate) struct FakeTransport {
    control_send: Arc<Mutex<Vec<u8>>>,
    control_recv: Mutex<ControlRecv>,
    objects: Arc<Mutex<Vec<(u64, Vec<u8>)>>>,
    accept_queue: Mutex<VecDeque<Vec<u8>>>,
}

impl FakeTransport {
    /// A transport whose control-stream peer behaves like a real MOQT
    /// counterpart advertising `peer_role` (for handshake-driving tests).
    pub(crate) fn scripted(peer_role: Role) -> Self {
        FakeTransport {
            control_send: Arc::new(Mutex::new(Vec::new())),
            control_recv: Mutex::new(ControlRecv::Scripted(peer_role)),
            objects: Arc::new(Mutex::new(Vec::new())),
            accept_queue: Mutex::new(VecDeque::new()),
        }
    }

    /// A transport whose control stream simply replays `frames` in order,
    /// for tests exercising one inbound control message in isolation.
    pub(crate) fn with_control_frames(frames: Vec<Vec<u8>>) -> Self {
        FakeTransport {
            control_send: Arc::new(Mutex::new(Vec::new())),
            control_recv: Mutex::new(ControlRecv::Queued(frames.into())),
            objects: Arc::new(Mutex::new(Vec::new())),
            accept_queue: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn control_sent(&self) -> Vec<u8> {
        self.control_send.lock().unwrap().clone()
    }

    pub(crate) fn objects_sent(&self) -> Vec<(u64, Vec<u8>)> {
        self.objects.lock().unwrap().clone()
    }

    pub(crate) fn push_incoming_object(&self, frame: Vec<u8>) {
        self.accept_queue.lock().unwrap().push_back(frame);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn open_bi(&self) -> anyhow::Result<(Box<dyn SendStream>, Box<dyn RecvStream>)> {
        let send: Box<dyn SendStream> = Box::new(RecordingSendStream(self.control_send.clone()));
        let recv: Box<dyn RecvStream> = match &mut *self.control_recv.lock().unwrap() {
            ControlRecv::Scripted(role) => Box::new(ScriptedPeer {
                control_send: self.control_send.clone(),
                read_pos: 0,
                peer_role: *role,
                next_track_id: 0,
            }),
            ControlRecv::Queued(frames) => Box::new(QueuedRecvStream(std::mem::take(frames))),
        };
        Ok((send, recv))
    }

    async fn open_uni(&self, send_order: u64) -> anyhow::Result<Box<dyn SendStream>> {
        Ok(Box::new(ObjectSendStream { send_order, buf: Vec::new(), sink: self.objects.clone() }))
    }

    async fn accept_uni(&self) -> anyhow::Result<Box<dyn RecvStream>> {
        match self.accept_queue.lock().unwrap().pop_front() {
            Some(bytes) => Ok(Box::new(QueuedRecvStream::one(bytes))),
            None => anyhow::bail!("no queued incoming object stream"),
        }
    }

    async fn ready(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn closed(&self) {}
}
