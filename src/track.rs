//! Track descriptors and the per-track bookkeeping the publisher engine
//! carries for group/object sequencing (§3).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Selects which packager (§4.B LOC or §4.C RAW) frames a track's objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    Audio,
    Video,
    Data,
}

impl TrackKind {
    pub fn uses_loc(self) -> bool {
        !matches!(self, TrackKind::Data)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            TrackKind::Audio => "audio",
            TrackKind::Video => "video",
            TrackKind::Data => "data",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackDescriptor {
    pub namespace: String,
    pub name: String,
    pub kind: TrackKind,
    /// Assigned by the publisher, echoed in SUBSCRIBE_RESPONSE; `None` until
    /// the publisher side of the handshake assigns it, or until a subscriber
    /// receives the response updating it.
    pub id: Option<u64>,
    pub auth_info: String,
    pub is_hipri: bool,
    /// Publisher-only: the in-flight bound (§3). Ignored by subscribers.
    pub max_in_flight: u32,
    /// Publisher-only: starts at 0, incremented on each accepted SUBSCRIBE_REQUEST.
    pub num_subscribers: u32,
}

impl TrackDescriptor {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        kind: TrackKind,
        auth_info: impl Into<String>,
        is_hipri: bool,
        max_in_flight: u32,
    ) -> Self {
        TrackDescriptor {
            namespace: namespace.into(),
            name: name.into(),
            kind,
            id: None,
            auth_info: auth_info.into(),
            is_hipri,
            max_in_flight,
            num_subscribers: 0,
        }
    }
}

/// `{ currentGroupSeq, currentObjectSeq }`, created lazily on the first
/// keyframe object for a track (§3 invariant).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PublisherTrackState {
    pub current_group_seq: u64,
    pub current_object_seq: u64,
}

pub type TrackMap = HashMap<TrackKind, TrackDescriptor>;
