//! MOQT publisher/subscriber endpoint core: wire codec, LOC/RAW packagers,
//! session handshake, and object dispatch over a pluggable QUIC transport.

pub mod error;
pub mod events;
pub mod packager;
pub mod publisher;
pub mod session;
pub mod subscriber;
pub mod track;
pub mod transport;
#[cfg(test)]
mod test_support;
pub(crate) mod wire;

pub use error::{AuthError, ConfigError, HandshakeError, WireError};
pub use events::{
    ChunkMessage, EngineEvent, HostMessage, MediaChunkEvent, PublisherConfig, SubscriberConfig,
    TrackConfig,
};
pub use publisher::PublisherEngine;
pub use session::{SessionState, PROTOCOL_VERSION};
pub use subscriber::SubscriberEngine;
pub use track::{TrackDescriptor, TrackKind};
pub use transport::{RecvStream, SendStream, Transport};

/// Installs a `tracing_subscriber::fmt` layer honoring `RUST_LOG`, defaulting
/// to `INFO`. Intended for binaries embedding this crate; library consumers
/// that already install their own subscriber should not call this.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    use tracing_subscriber::{filter::LevelFilter, EnvFilter};

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(env_filter)
        .init();
}
