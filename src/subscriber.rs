//! Subscriber engine: runs the handshake for one track, then demultiplexes
//! incoming object streams into host-facing chunk events.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use bytes::BytesMut;
use tracing::{debug, warn};

use crate::events::{DataChunkEvent, DownloaderStats, EngineEvent, MediaChunkEvent};
use crate::packager::{LocEnvelope, RawEnvelope};
use crate::session::{ControlChannel, SessionState};
use crate::track::{TrackDescriptor, TrackKind};
use crate::transport::{self, Transport};
use crate::wire::object::ObjectHeader;

fn wall_clock_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

pub struct SubscriberEngine<T: Transport> {
    transport: T,
    state: SessionState,
    track: TrackDescriptor,
    /// Wall-clock of the last successfully decoded object, fed to
    /// `downloader_stats` (§6 `downloaderstats`).
    last_received_clkms: i64,
}

impl<T: Transport> SubscriberEngine<T> {
    pub fn new(transport: T, track: TrackDescriptor) -> Self {
        SubscriberEngine { transport, state: SessionState::Created, track, last_received_clkms: 0 }
    }

    /// Snapshot of this subscriber's running stats (§6 `downloaderstats`).
    /// Unlike the publisher's `Sendstats`, which rides back on the single
    /// event `publish()` already returns per chunk, the subscriber's
    /// per-call return slot is spoken for by the decoded chunk event
    /// itself — there is no second event to piggyback stats on without
    /// dropping a chunk. The host instead polls this on whatever interval
    /// it otherwise reports stats on.
    pub fn downloader_stats(&self) -> EngineEvent {
        EngineEvent::Downloaderstats(DownloaderStats { clkms: self.last_received_clkms, track: self.track.kind })
    }

    /// Runs the SETUP/SUBSCRIBE handshake and records this track's assigned
    /// trackId for matching against inbound object headers.
    pub async fn run_handshake(&mut self, auth_info: Option<String>) -> anyhow::Result<ControlChannel> {
        self.state = self.state.advance(SessionState::Instantiated);
        let mut control = ControlChannel::open(&self.transport).await?;
        let track_id = control
            .run_subscriber_setup(auth_info, &self.track.namespace, &self.track.name)
            .await?;
        self.track.id = Some(track_id);
        self.state = self.state.advance(SessionState::Running);
        Ok(control)
    }

    /// Accepts and decodes the next incoming object stream. A header that
    /// fails to parse, or names a trackId other than this track's, discards
    /// only the stream (§4.F) rather than tearing down the session.
    pub async fn recv_next(&mut self) -> anyhow::Result<EngineEvent> {
        if self.state != SessionState::Running {
            return Ok(EngineEvent::Dropped { reason: "transport not open".into() });
        }

        // Timed from just before this object's stream is accepted, not from
        // subscribe time, so the latency probe below reflects this object's
        // own delay rather than however long the session has been running.
        let accept_started_at = Instant::now();
        let mut recv = self.transport.accept_uni().await?;
        let raw = transport::read_to_end(&mut *recv).await?;
        let mut buf = BytesMut::from(&raw[..]);

        let header = match ObjectHeader::depacketize(&mut buf) {
            Ok(h) => h,
            Err(_) => return Ok(EngineEvent::DroppedStream { reason: "malformed object header".into() }),
        };
        if Some(header.track_id) != self.track.id {
            return Ok(EngineEvent::DroppedStream { reason: "unknown trackId".into() });
        }

        if self.track.kind.uses_loc() {
            let env = match LocEnvelope::depacketize(&mut buf) {
                Ok(env) => env,
                Err(_) => return Ok(EngineEvent::DroppedStream { reason: "malformed LOC payload".into() }),
            };
            self.check_latency(accept_started_at, env.duration);
            self.last_received_clkms = wall_clock_ms();
            let event = MediaChunkEvent {
                track: self.track.kind,
                timestamp: env.timestamp,
                chunk_type: env.chunk_type.as_str().to_string(),
                duration: env.duration,
                seq_id: env.seq_id,
                capture_clkms: env.first_frame_clk_ms,
                metadata: env.metadata,
                data: env.data,
            };
            Ok(match self.track.kind {
                TrackKind::Audio => EngineEvent::Audiochunk(event),
                TrackKind::Video => EngineEvent::Videochunk(event),
                TrackKind::Data => unreachable!("data tracks never use_loc"),
            })
        } else {
            let env = match RawEnvelope::depacketize(&mut buf) {
                Ok(env) => env,
                Err(_) => return Ok(EngineEvent::DroppedStream { reason: "malformed RAW payload".into() }),
            };
            self.last_received_clkms = wall_clock_ms();
            Ok(EngineEvent::Datachunk(DataChunkEvent {
                track: self.track.kind,
                chunk_type: env.chunk_type,
                seq_id: env.seq_id,
                data: env.data,
            }))
        }
    }

    /// Compares wall-clock elapsed time since this object's stream was
    /// accepted against the chunk's declared `duration` and logs at
    /// `warning` when it looks stale. Deliberately compares elapsed
    /// milliseconds against `duration / 1000` rather than `duration` (which
    /// is itself in microseconds), preserving the original's 1000x-looser
    /// threshold rather than silently tightening it into a behavior change
    /// (a REDESIGN decision, see `DESIGN.md`).
    fn check_latency(&self, accept_started_at: Instant, duration_us: u32) {
        let elapsed = accept_started_at.elapsed();
        let budget = Duration::from_millis((duration_us / 1000).max(1) as u64);
        if elapsed > budget {
            warn!(target: "subscriber", elapsed_ms = elapsed.as_millis() as u64, budget_ms = budget.as_millis() as u64, "object arrived late");
        } else {
            debug!(target: "subscriber", "object on time");
        }
    }

    pub async fn stop(&mut self) {
        if self.state == SessionState::Stopped {
            return;
        }
        self.state = SessionState::Stopped;
        self.transport.closed().await;
    }
}
