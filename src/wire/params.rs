//! Length-prefixed byte strings and the MOQT parameter list grammar built on
//! top of [`crate::wire::varint`].

use super::varint::{get_varint, put_varint};
use crate::error::WireError;
use bytes::{Buf, BufMut, BytesMut};

/// A varint length followed by that many raw bytes.
pub(crate) fn put_lp_bytes(buf: &mut BytesMut, value: &[u8]) {
    put_varint(buf, value.len() as u64);
    buf.put_slice(value);
}

pub(crate) fn get_lp_bytes(buf: &mut BytesMut) -> Result<Vec<u8>, WireError> {
    let len = get_varint(buf).ok_or(WireError::TruncatedHeader)? as usize;
    if buf.len() < len {
        return Err(WireError::TruncatedHeader);
    }
    Ok(buf.copy_to_bytes(len).to_vec())
}

/// UTF-8 text carried as `lp_bytes`.
pub(crate) fn put_lp_string(buf: &mut BytesMut, value: &str) {
    put_lp_bytes(buf, value.as_bytes());
}

pub(crate) fn get_lp_string(buf: &mut BytesMut) -> Result<String, WireError> {
    let bytes = get_lp_bytes(buf)?;
    String::from_utf8(bytes).map_err(|_| WireError::Malformed("string is not valid utf-8"))
}

/// Parameter keys recognized by this endpoint (§4.A).
pub(crate) const PARAM_ROLE: u64 = 0x00;
pub(crate) const PARAM_AUTH_INFO: u64 = 0x02;

/// A count-prefixed list of `(key: varint, value: lp_bytes)` pairs.
pub(crate) fn put_params(buf: &mut BytesMut, params: &[(u64, Vec<u8>)]) {
    put_varint(buf, params.len() as u64);
    for (key, value) in params {
        put_varint(buf, *key);
        put_lp_bytes(buf, value);
    }
}

pub(crate) fn get_params(buf: &mut BytesMut) -> Result<Vec<(u64, Vec<u8>)>, WireError> {
    let count = get_varint(buf).ok_or(WireError::TruncatedHeader)?;
    let mut params = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let key = get_varint(buf).ok_or(WireError::TruncatedHeader)?;
        let value = get_lp_bytes(buf)?;
        params.push((key, value));
    }
    Ok(params)
}

pub(crate) fn find_param(params: &[(u64, Vec<u8>)], key: u64) -> Option<&[u8]> {
    params.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_slice())
}
