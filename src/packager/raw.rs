//! RAW opaque-data envelope (§4.C): minimal framing for `data`-kind tracks
//! that carry application payloads the core does not interpret.

use crate::error::WireError;
use crate::wire::params::{get_lp_bytes, get_lp_string, put_lp_bytes, put_lp_string};
use crate::wire::varint::{get_signed_varint, put_signed_varint};
use bytes::BytesMut;

/// The only `mediaType` this packager recognizes (§4.C).
pub const RAW_MEDIA_TYPE: &str = "data";

#[derive(Debug, Clone, PartialEq)]
pub struct RawEnvelope {
    pub media_type: String,
    pub chunk_type: String,
    pub seq_id: i64,
    pub data: Vec<u8>,
}

impl RawEnvelope {
    pub fn new(chunk_type: impl Into<String>, seq_id: i64, data: Vec<u8>) -> Self {
        RawEnvelope {
            media_type: RAW_MEDIA_TYPE.to_string(),
            chunk_type: chunk_type.into(),
            seq_id,
            data,
        }
    }

    pub fn packetize(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        put_lp_string(&mut buf, &self.media_type);
        put_lp_string(&mut buf, &self.chunk_type);
        put_signed_varint(&mut buf, self.seq_id);
        put_lp_bytes(&mut buf, &self.data);
        buf
    }

    pub fn depacketize(buf: &mut BytesMut) -> Result<Self, WireError> {
        let media_type = get_lp_string(buf)?;
        if media_type != RAW_MEDIA_TYPE {
            return Err(WireError::UnknownMediaType(media_type));
        }
        let chunk_type = get_lp_string(buf)?;
        let seq_id = get_signed_varint(buf).ok_or(WireError::TruncatedHeader)?;
        let data = get_lp_bytes(buf)?;
        Ok(RawEnvelope { media_type, chunk_type, seq_id, data })
    }
}
