//! Host-facing message schemas (§6): what the host posts into the engine
//! and what the engine posts back out. Both are `serde`-tagged enums so a
//! host can speak JSON over a message channel without depending on the
//! wire-level types in [`crate::wire`].

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::track::TrackKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackConfig {
    pub namespace: String,
    pub name: String,
    pub kind: TrackKind,
    #[serde(rename = "authInfo")]
    pub auth_info: String,
    #[serde(rename = "isHipri", default)]
    pub is_hipri: bool,
    #[serde(rename = "maxInFlight", default = "default_max_in_flight")]
    pub max_in_flight: u32,
}

fn default_max_in_flight() -> u32 {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublisherConfig {
    pub url_host_port: String,
    pub moq_tracks: Vec<TrackConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberConfig {
    pub url_host_port: String,
    pub moq_tracks: Vec<TrackConfig>,
}

/// Parses `urlHostPort` as a URL the way the transport layer eventually will
/// (`url::Url::parse`), so a malformed host fails validation instead of
/// surfacing as an opaque connect error later.
fn validate_url_host_port(url_host_port: &str) -> Result<(), ConfigError> {
    if url_host_port.is_empty() {
        return Err(ConfigError::MissingHost);
    }
    url::Url::parse(url_host_port).map_err(|_| ConfigError::MissingHost)?;
    Ok(())
}

fn validate_tracks(tracks: &[TrackConfig]) -> Result<(), ConfigError> {
    if tracks.is_empty() {
        return Err(ConfigError::EmptyTracks);
    }
    for track in tracks {
        if track.namespace.is_empty() || track.name.is_empty() || track.auth_info.is_empty() {
            return Err(ConfigError::IncompleteTrack(format!("{}/{}", track.namespace, track.name)));
        }
    }
    Ok(())
}

impl PublisherConfig {
    /// Eagerly validates `urlHostPort` and `moqTracks` so a misconfigured
    /// host fails before opening a transport (§7 ConfigError).
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url_host_port(&self.url_host_port)?;
        validate_tracks(&self.moq_tracks)
    }
}

impl SubscriberConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url_host_port(&self.url_host_port)?;
        validate_tracks(&self.moq_tracks)
    }
}

/// A single media or data chunk the host hands to the publisher for a track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMessage {
    pub track: TrackKind,
    pub seq_id: i64,
    pub first_frame_clkms: i64,
    pub compensated_ts: i64,
    pub estimated_duration: u32,
    /// `"key"` / `"delta"` for LOC tracks, opaque for RAW tracks.
    pub chunk: String,
    #[serde(default)]
    pub metadata: Vec<u8>,
    pub data: Vec<u8>,
}

/// Messages the host posts into a running engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HostMessage {
    #[serde(rename = "muxersendini")]
    MuxerSenderConfig(PublisherConfig),
    #[serde(rename = "downloadersendini")]
    DownloaderConfig(SubscriberConfig),
    Stop,
    Chunk(ChunkMessage),
}

/// A decoded object handed up from the subscriber side (§4.B/§4.C).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunkEvent {
    pub track: TrackKind,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub chunk_type: String,
    pub duration: u32,
    pub seq_id: i64,
    pub capture_clkms: i64,
    #[serde(default)]
    pub metadata: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataChunkEvent {
    pub track: TrackKind,
    #[serde(rename = "type")]
    pub chunk_type: String,
    pub seq_id: i64,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendStats {
    pub clkms: i64,
    pub in_flight_req: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DownloaderStats {
    pub clkms: i64,
    pub track: TrackKind,
}

/// Messages the engine posts back out to the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EngineEvent {
    Info(String),
    Debug(String),
    Warning(String),
    Error(String),
    /// An object or request the engine declined without tearing down the
    /// session (§3): reason is a short, stable machine string.
    Dropped { reason: String },
    /// An inbound object stream that failed to parse or named an unknown
    /// track; only the stream is discarded (§4.F).
    DroppedStream { reason: String },
    Sendstats(SendStats),
    Downloaderstats(DownloaderStats),
    Audiochunk(MediaChunkEvent),
    Videochunk(MediaChunkEvent),
    Datachunk(DataChunkEvent),
}

#[cfg(test)]
mod tests {
    mod success {
        use crate::events::*;

        #[test]
        fn host_message_stop_round_trips_through_json() {
            let msg = HostMessage::Stop;
            let json = serde_json::to_string(&msg).unwrap();
            let back: HostMessage = serde_json::from_str(&json).unwrap();
            assert_eq!(back, msg);
        }

        #[test]
        fn engine_event_dropped_round_trips_through_json() {
            let event = EngineEvent::Dropped { reason: "no subscribers".into() };
            let json = serde_json::to_string(&event).unwrap();
            let back: EngineEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(back, event);
        }

        #[test]
        fn track_config_defaults_max_in_flight_when_absent() {
            let json = r#"{"namespace":"ns","name":"a","kind":"Audio","authInfo":"x"}"#;
            let cfg: TrackConfig = serde_json::from_str(json).unwrap();
            assert_eq!(cfg.max_in_flight, 50);
            assert!(!cfg.is_hipri);
        }

        #[test]
        fn publisher_config_with_one_complete_track_validates() {
            let cfg = PublisherConfig {
                url_host_port: "moqt://localhost:4433".into(),
                moq_tracks: vec![TrackConfig {
                    namespace: "ns".into(),
                    name: "video0".into(),
                    kind: crate::track::TrackKind::Video,
                    auth_info: "secret".into(),
                    is_hipri: false,
                    max_in_flight: 50,
                }],
            };
            assert!(cfg.validate().is_ok());
        }
    }

    mod failure {
        use crate::error::ConfigError;
        use crate::events::*;

        #[test]
        fn missing_host_is_rejected() {
            let cfg = PublisherConfig { url_host_port: "".into(), moq_tracks: vec![] };
            assert_eq!(cfg.validate().unwrap_err(), ConfigError::MissingHost);
        }

        #[test]
        fn schemeless_host_is_rejected() {
            let cfg = PublisherConfig { url_host_port: "localhost:4433".into(), moq_tracks: vec![] };
            assert_eq!(cfg.validate().unwrap_err(), ConfigError::MissingHost);
        }

        #[test]
        fn empty_tracks_is_rejected() {
            let cfg = SubscriberConfig { url_host_port: "moqt://localhost:4433".into(), moq_tracks: vec![] };
            assert_eq!(cfg.validate().unwrap_err(), ConfigError::EmptyTracks);
        }

        #[test]
        fn incomplete_track_is_rejected() {
            let cfg = PublisherConfig {
                url_host_port: "moqt://localhost:4433".into(),
                moq_tracks: vec![TrackConfig {
                    namespace: "ns".into(),
                    name: "video0".into(),
                    kind: crate::track::TrackKind::Video,
                    auth_info: "".into(),
                    is_hipri: false,
                    max_in_flight: 50,
                }],
            };
            assert!(matches!(cfg.validate(), Err(ConfigError::IncompleteTrack(_))));
        }
    }
}
