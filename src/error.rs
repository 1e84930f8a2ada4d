use thiserror::Error;

/// Errors raised while validating host-supplied configuration (§7 ConfigError).
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("urlHostPort must not be empty")]
    MissingHost,
    #[error("moqTracks must contain at least one track")]
    EmptyTracks,
    #[error("track {0:?} is missing namespace, name, or authInfo")]
    IncompleteTrack(String),
}

/// Errors raised during the SETUP/ANNOUNCE/SUBSCRIBE handshake (§7 HandshakeError).
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum HandshakeError {
    #[error("peer advertised unsupported role {0}")]
    UnsupportedRole(u8),
    #[error("ANNOUNCE_OK namespace {got:?} does not match requested {expected:?}")]
    NamespaceMismatch { expected: String, got: String },
    #[error("SUBSCRIBE_RESPONSE track name {got:?} does not match requested {expected:?}")]
    TrackNameMismatch { expected: String, got: String },
    #[error("setup handshake timed out")]
    Timeout,
    #[error("control stream closed before handshake completed")]
    ControlStreamClosed,
    #[error("subscribe request for {namespace}/{name} rejected: {reason}")]
    SubscribeRejected { namespace: String, name: String, reason: String },
}

/// Malformed or truncated wire data (§7 ProtocolError, §4.A/§4.B/§4.C).
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum WireError {
    #[error("truncated header")]
    TruncatedHeader,
    #[error("unknown media type {0:?}")]
    UnknownMediaType(String),
    #[error("unknown chunk type {0:?}")]
    UnknownChunkType(String),
    #[error("unknown control message tag {0:#04x}")]
    UnknownTag(u8),
    #[error("malformed frame: {0}")]
    Malformed(&'static str),
}

/// A SUBSCRIBE_REQUEST whose authInfo does not match the configured track (§7 AuthError).
#[derive(Error, Debug, PartialEq, Eq, Clone)]
#[error("authInfo mismatch for track {namespace}/{name}")]
pub struct AuthError {
    pub namespace: String,
    pub name: String,
}
