//! Publisher engine: accepts SUBSCRIBE_REQUESTs, then turns host-supplied
//! chunks into framed objects dispatched over per-track unidirectional
//! streams, honoring the in-flight bound and sendOrder priority.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::events::{ChunkMessage, EngineEvent, SendStats};
use crate::packager::{ChunkType, LocEnvelope, MediaType, RawEnvelope};
use crate::session::{ControlChannel, SessionState};
use crate::track::{PublisherTrackState, TrackKind, TrackMap};
use crate::transport::Transport;
use crate::wire::control::{SubscribeError, SubscribeResponse};
use crate::wire::object::ObjectHeader;

/// `floor((2^53 - 1) / 2)`, the hipri offset added to `seqId` so audio
/// objects always sort ahead of same-seqId video objects (§3).
const HIPRI_OFFSET: u64 = 4_503_599_627_370_495;

fn send_order_for(seq_id: i64, is_hipri: bool) -> u64 {
    if seq_id < 0 {
        return u64::MAX;
    }
    let seq_id = seq_id as u64;
    if is_hipri {
        seq_id + HIPRI_OFFSET
    } else {
        seq_id
    }
}

/// One object in flight on its per-object unidirectional stream. Dropped
/// (and thus its stream's write side abandoned) on engine teardown.
struct InFlightObject {
    track: TrackKind,
    group_seq: u64,
    obj_seq: u64,
}

pub struct PublisherEngine<T: Transport> {
    transport: T,
    state: SessionState,
    tracks: TrackMap,
    track_states: HashMap<TrackKind, PublisherTrackState>,
    in_flight: HashMap<u64, InFlightObject>,
    next_object_id: u64,
}

impl<T: Transport> PublisherEngine<T> {
    pub fn new(transport: T, tracks: TrackMap) -> Self {
        PublisherEngine {
            transport,
            state: SessionState::Created,
            tracks,
            track_states: HashMap::new(),
            in_flight: HashMap::new(),
            next_object_id: 0,
        }
    }

    /// Runs the SETUP/ANNOUNCE handshake and then accepts SUBSCRIBE_REQUESTs
    /// one at a time, assigning each matching track a trackId (§5).
    pub async fn run_handshake(&mut self, auth_info: Option<String>) -> anyhow::Result<ControlChannel> {
        self.state = self.state.advance(SessionState::Instantiated);
        let mut control = ControlChannel::open(&self.transport).await?;
        // One ANNOUNCE per distinct namespace, carrying that namespace's own
        // authInfo (§4.D). Tracks sharing a namespace are expected to share
        // its authInfo too; the first track encountered for a namespace wins.
        let mut namespaces: HashMap<String, String> = HashMap::new();
        for track in self.tracks.values() {
            namespaces.entry(track.namespace.clone()).or_insert_with(|| track.auth_info.clone());
        }
        let namespaces: Vec<(String, String)> = namespaces.into_iter().collect();
        control.run_publisher_setup(auth_info, &namespaces).await?;
        self.state = self.state.advance(SessionState::Running);
        Ok(control)
    }

    /// Accepts one SUBSCRIBE_REQUEST, validating namespace/name/authInfo
    /// against the configured tracks. On match, assigns a trackId and
    /// replies SUBSCRIBE_RESPONSE; on authInfo mismatch, emits
    /// SUBSCRIBE_ERROR (the REDESIGN decision recorded in `DESIGN.md`).
    pub async fn accept_subscribe(&mut self, control: &mut ControlChannel) -> anyhow::Result<EngineEvent> {
        let req = control.recv_subscribe_request().await?;
        let track = self
            .tracks
            .values_mut()
            .find(|t| t.namespace == req.namespace && t.name == req.track_name);

        let Some(track) = track else {
            return Ok(EngineEvent::Dropped { reason: "unknown track".into() });
        };

        if track.auth_info != req.auth_info.unwrap_or_default() {
            let auth_err = AuthError { namespace: req.namespace.clone(), name: req.track_name.clone() };
            warn!(target: "publisher", "{auth_err}");
            let err = SubscribeError {
                namespace: req.namespace.clone(),
                track_name: req.track_name.clone(),
                reason: "authInfo mismatch".into(),
            };
            control.send_subscribe_error(&err).await?;
            return Ok(EngineEvent::Dropped { reason: "authInfo mismatch".into() });
        }

        let track_id = track.id.unwrap_or(self.next_object_id);
        track.id = Some(track_id);
        self.next_object_id = self.next_object_id.max(track_id + 1);
        track.num_subscribers += 1;

        let resp = SubscribeResponse {
            namespace: req.namespace.clone(),
            track_name: req.track_name.clone(),
            track_id,
            expires: 0,
        };
        control.send_subscribe_response(&resp).await?;
        info!(target: "publisher", namespace = %req.namespace, name = %req.track_name, track_id, "subscribed");
        Ok(EngineEvent::Info(format!("subscribed {}/{}", req.namespace, req.track_name)))
    }

    /// Packages and dispatches one host-supplied chunk as an object.
    /// Returns `Dropped { reason }` rather than an error for every
    /// non-fatal rejection path (§3): transport not running, no
    /// subscribers, in-flight bound reached, or a delta chunk arriving
    /// before any keyframe has been sent for the track.
    pub async fn publish(&mut self, msg: ChunkMessage) -> anyhow::Result<EngineEvent> {
        if self.state != SessionState::Running {
            return Ok(EngineEvent::Dropped { reason: "transport not open".into() });
        }

        let Some(track) = self.tracks.get(&msg.track).cloned() else {
            return Ok(EngineEvent::Dropped { reason: "mediaType not configured".into() });
        };
        let Some(track_id) = track.id else {
            return Ok(EngineEvent::Dropped { reason: "no subscribers".into() });
        };
        if track.num_subscribers == 0 {
            return Ok(EngineEvent::Dropped { reason: "no subscribers".into() });
        }

        let in_flight_for_track =
            self.in_flight.values().filter(|o| o.track == msg.track).count() as u32;
        if in_flight_for_track >= track.max_in_flight {
            debug!(target: "publisher", track = ?msg.track, "in-flight bound reached, dropping newest");
            return Ok(EngineEvent::Dropped { reason: "too many inflight".into() });
        }

        let state = self.track_states.entry(msg.track).or_default();
        let is_key = msg.chunk == "key";
        let is_first_object = state.current_group_seq == 0 && state.current_object_seq == 0;
        if track.kind.uses_loc() && !is_key && is_first_object {
            return Ok(EngineEvent::Dropped { reason: "first object must be key".into() });
        }

        if is_key {
            state.current_group_seq += 1;
            state.current_object_seq = 0;
        }
        let group_seq = state.current_group_seq;
        let obj_seq = state.current_object_seq;
        state.current_object_seq += 1;

        let send_order = send_order_for(msg.seq_id, track.is_hipri);
        let payload = if track.kind.uses_loc() {
            let media_type = match track.kind {
                TrackKind::Audio => MediaType::Audio,
                TrackKind::Video => MediaType::Video,
                TrackKind::Data => unreachable!("data tracks never use_loc"),
            };
            let chunk_type = if is_key { ChunkType::Key } else { ChunkType::Delta };
            LocEnvelope {
                media_type,
                timestamp: msg.compensated_ts,
                duration: msg.estimated_duration,
                chunk_type,
                seq_id: msg.seq_id,
                first_frame_clk_ms: msg.first_frame_clkms,
                metadata: msg.metadata,
                data: msg.data,
            }
            .packetize()
        } else {
            RawEnvelope::new(msg.chunk.clone(), msg.seq_id, msg.data).packetize()
        };

        let header = ObjectHeader { track_id, group_seq, obj_seq, send_order };
        let mut frame = header.packetize();
        frame.extend_from_slice(&payload);

        let mut stream = self.transport.open_uni(send_order).await?;
        let object_id = self.next_object_id;
        self.next_object_id += 1;
        self.in_flight.insert(object_id, InFlightObject { track: msg.track, group_seq, obj_seq });

        let result = stream.write_all(&frame).await.and(stream.finish().await);
        self.in_flight.remove(&object_id);
        result?;

        Ok(EngineEvent::Sendstats(SendStats { clkms: msg.compensated_ts, in_flight_req: self.in_flight.len() as u32 }))
    }

    /// A snapshot of in-flight object identifiers, corrected to return a
    /// plain union rather than the duplicated list the REDESIGN decision
    /// in `DESIGN.md` flags in the original accessor.
    pub fn inflight_snapshot(&self) -> Vec<u64> {
        self.in_flight.keys().copied().collect()
    }

    /// Aborts every in-flight stream and closes the transport once. Safe to
    /// call more than once; only the first call has an effect.
    pub async fn stop(&mut self) {
        if self.state == SessionState::Stopped {
            return;
        }
        self.state = SessionState::Stopped;
        self.in_flight.clear();
        self.transport.closed().await;
    }
}
