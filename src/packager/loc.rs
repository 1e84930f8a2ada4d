//! LOC ("Low Overhead Container") media envelope (§4.B): the framing carried
//! inside every object payload for `audio`/`video` tracks.

use crate::error::WireError;
use crate::wire::params::{get_lp_bytes, get_lp_string, put_lp_bytes, put_lp_string};
use crate::wire::varint::{
    get_signed_varint, get_varint, put_signed_varint, put_varint,
};
use bytes::BytesMut;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Audio,
    Video,
}

impl MediaType {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            MediaType::Audio => "audio",
            MediaType::Video => "video",
        }
    }

    fn parse(s: &str) -> Result<Self, WireError> {
        match s {
            "audio" => Ok(MediaType::Audio),
            "video" => Ok(MediaType::Video),
            other => Err(WireError::UnknownMediaType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    Key,
    Delta,
}

impl ChunkType {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ChunkType::Key => "key",
            ChunkType::Delta => "delta",
        }
    }

    fn parse(s: &str) -> Result<Self, WireError> {
        match s {
            "key" => Ok(ChunkType::Key),
            "delta" => Ok(ChunkType::Delta),
            other => Err(WireError::UnknownChunkType(other.to_string())),
        }
    }

    pub fn is_key(self) -> bool {
        matches!(self, ChunkType::Key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocEnvelope {
    pub media_type: MediaType,
    pub timestamp: i64,
    pub duration: u32,
    pub chunk_type: ChunkType,
    pub seq_id: i64,
    pub first_frame_clk_ms: i64,
    pub metadata: Vec<u8>,
    pub data: Vec<u8>,
}

impl LocEnvelope {
    pub fn packetize(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        put_lp_string(&mut buf, self.media_type.as_str());
        put_signed_varint(&mut buf, self.timestamp);
        put_varint(&mut buf, self.duration as u64);
        put_lp_string(&mut buf, self.chunk_type.as_str());
        put_signed_varint(&mut buf, self.seq_id);
        put_signed_varint(&mut buf, self.first_frame_clk_ms);
        put_lp_bytes(&mut buf, &self.metadata);
        put_lp_bytes(&mut buf, &self.data);
        buf
    }

    pub fn depacketize(buf: &mut BytesMut) -> Result<Self, WireError> {
        let media_type = MediaType::parse(&get_lp_string(buf)?)?;
        let timestamp = get_signed_varint(buf).ok_or(WireError::TruncatedHeader)?;
        let duration = get_varint(buf).ok_or(WireError::TruncatedHeader)? as u32;
        let chunk_type = ChunkType::parse(&get_lp_string(buf)?)?;
        let seq_id = get_signed_varint(buf).ok_or(WireError::TruncatedHeader)?;
        let first_frame_clk_ms = get_signed_varint(buf).ok_or(WireError::TruncatedHeader)?;
        let metadata = get_lp_bytes(buf)?;
        let data = get_lp_bytes(buf)?;
        Ok(LocEnvelope {
            media_type,
            timestamp,
            duration,
            chunk_type,
            seq_id,
            first_frame_clk_ms,
            metadata,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    mod success {
        use crate::packager::loc::*;
        use bytes::BytesMut;

        fn sample() -> LocEnvelope {
            LocEnvelope {
                media_type: MediaType::Audio,
                timestamp: 1_000,
                duration: 20_000,
                chunk_type: ChunkType::Key,
                seq_id: 42,
                first_frame_clk_ms: 1_732_000_000_000,
                metadata: vec![],
                data: vec![0xAA, 0xBB, 0xCC],
            }
        }

        #[test]
        fn roundtrip_key_audio() {
            let env = sample();
            let mut buf = env.packetize();
            assert_eq!(LocEnvelope::depacketize(&mut buf).unwrap(), env);
        }

        #[test]
        fn roundtrip_delta_video_with_metadata() {
            let env = LocEnvelope {
                media_type: MediaType::Video,
                timestamp: -5,
                duration: 33_333,
                chunk_type: ChunkType::Delta,
                seq_id: -1,
                first_frame_clk_ms: -1,
                metadata: vec![1, 2, 3],
                data: vec![],
            };
            let mut buf = env.packetize();
            assert_eq!(LocEnvelope::depacketize(&mut buf).unwrap(), env);
        }

        #[test]
        fn chunk_type_is_key_helper() {
            assert!(ChunkType::Key.is_key());
            assert!(!ChunkType::Delta.is_key());
        }
    }

    mod failure {
        use crate::error::WireError;
        use crate::packager::loc::*;
        use bytes::BytesMut;

        #[test]
        fn unknown_media_type_is_fatal() {
            let mut buf = BytesMut::new();
            crate::wire::params::put_lp_string(&mut buf, "picture");
            let err = LocEnvelope::depacketize(&mut buf).unwrap_err();
            assert_eq!(err, WireError::UnknownMediaType("picture".to_string()));
        }

        #[test]
        fn unknown_chunk_type_is_fatal() {
            let env = sample_with_raw_chunk_type("sei");
            let mut buf = env;
            let err = LocEnvelope::depacketize(&mut buf).unwrap_err();
            assert_eq!(err, WireError::UnknownChunkType("sei".to_string()));
        }

        fn sample_with_raw_chunk_type(chunk_type: &str) -> BytesMut {
            let mut buf = BytesMut::new();
            crate::wire::params::put_lp_string(&mut buf, "audio");
            crate::wire::varint::put_signed_varint(&mut buf, 0);
            crate::wire::varint::put_varint(&mut buf, 0);
            crate::wire::params::put_lp_string(&mut buf, chunk_type);
            buf
        }

        #[test]
        fn truncated_header_is_fatal() {
            let mut buf = BytesMut::new();
            crate::wire::params::put_lp_string(&mut buf, "audio");
            assert_eq!(LocEnvelope::depacketize(&mut buf).unwrap_err(), WireError::TruncatedHeader);
        }
    }
}
