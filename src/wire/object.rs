//! Object-stream header, written once at the start of every per-object
//! unidirectional QUIC stream (§4.A). The stream itself frames the payload —
//! there is no trailing delimiter, so `depacketize` consumes the header and
//! returns whatever remains of `buf` as the payload.

use super::varint::{get_varint, put_varint};
use crate::error::WireError;
use bytes::BytesMut;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ObjectHeader {
    pub track_id: u64,
    pub group_seq: u64,
    pub obj_seq: u64,
    pub send_order: u64,
}

impl ObjectHeader {
    pub(crate) fn packetize(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        put_varint(&mut buf, self.track_id);
        put_varint(&mut buf, self.group_seq);
        put_varint(&mut buf, self.obj_seq);
        // `send_order` carries the logical `u64::MAX` "send now" sentinel
        // (§4.E) for negative seqIds, which does not fit the 62-bit varint
        // space; saturate rather than let `put_varint` panic. The sentinel
        // still decodes back as the largest legal varint, which still
        // outranks every real seqId-derived value.
        put_varint(&mut buf, self.send_order.min(super::varint::MAX));
        buf
    }

    /// Decodes the header and returns it alongside the remaining payload
    /// bytes (everything after the four varints).
    pub(crate) fn depacketize(buf: &mut BytesMut) -> Result<Self, WireError> {
        let track_id = get_varint(buf).ok_or(WireError::TruncatedHeader)?;
        let group_seq = get_varint(buf).ok_or(WireError::TruncatedHeader)?;
        let obj_seq = get_varint(buf).ok_or(WireError::TruncatedHeader)?;
        let send_order = get_varint(buf).ok_or(WireError::TruncatedHeader)?;
        Ok(ObjectHeader { track_id, group_seq, obj_seq, send_order })
    }
}
