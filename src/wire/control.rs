//! Control-stream message tags and layouts (§4.A).
//!
//! Every message is a tag byte followed by its fields in declared order;
//! there is no length prefix around the whole message (unlike the object
//! header, the control stream is a single ordered sequence of messages, so
//! each `depacketize` call consumes exactly one message's fields).

use super::params::{
    PARAM_AUTH_INFO, PARAM_ROLE, find_param, get_lp_string, get_params, put_lp_string, put_params,
};
use super::varint::{get_varint, put_varint};
use crate::error::WireError;
use bytes::{Buf, BufMut, BytesMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub(crate) enum ControlMessageType {
    SubscribeRequest = 0x01,
    SubscribeResponse = 0x02,
    SubscribeError = 0x03,
    Announce = 0x06,
    AnnounceOk = 0x07,
    Setup = 0x40,
    SetupOk = 0x41,
}

/// `ROLE` parameter values (§4.A).
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Role {
    Publisher = 1,
    Subscriber = 2,
    Both = 3,
}

impl Role {
    pub(crate) fn accepts(self, peer: Role) -> bool {
        matches!(
            (self, peer),
            (Role::Publisher, Role::Subscriber | Role::Both)
                | (Role::Subscriber, Role::Publisher | Role::Both)
        )
    }
}

fn put_header(buf: &mut BytesMut, tag: ControlMessageType) {
    buf.put_u8(tag.into());
}

fn expect_tag(buf: &mut BytesMut, want: ControlMessageType) -> Result<(), WireError> {
    if buf.is_empty() {
        return Err(WireError::TruncatedHeader);
    }
    let tag = buf.get_u8();
    let got = ControlMessageType::try_from(tag).map_err(|_| WireError::UnknownTag(tag))?;
    if got != want {
        return Err(WireError::Malformed("unexpected control message tag"));
    }
    Ok(())
}

/// Peeks the tag of the next control message without consuming it.
pub(crate) fn peek_tag(buf: &BytesMut) -> Option<ControlMessageType> {
    buf.first().and_then(|b| ControlMessageType::try_from(*b).ok())
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Setup {
    pub version: u64,
    pub role: Role,
    pub auth_info: Option<String>,
}

impl Setup {
    pub(crate) fn packetize(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        put_header(&mut buf, ControlMessageType::Setup);
        put_varint(&mut buf, self.version);
        let mut params = vec![(PARAM_ROLE, vec![self.role.into()])];
        if let Some(auth) = &self.auth_info {
            let mut value = BytesMut::new();
            put_lp_string(&mut value, auth);
            params.push((PARAM_AUTH_INFO, value.to_vec()));
        }
        put_params(&mut buf, &params);
        buf
    }

    pub(crate) fn depacketize(buf: &mut BytesMut) -> Result<Self, WireError> {
        expect_tag(buf, ControlMessageType::Setup)?;
        let version = get_varint(buf).ok_or(WireError::TruncatedHeader)?;
        let params = get_params(buf)?;
        let role = decode_role(&params)?;
        let auth_info = decode_auth_info(&params)?;
        Ok(Setup { version, role, auth_info })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SetupOk {
    pub version: u64,
    pub role: Role,
}

impl SetupOk {
    pub(crate) fn packetize(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        put_header(&mut buf, ControlMessageType::SetupOk);
        put_varint(&mut buf, self.version);
        put_params(&mut buf, &[(PARAM_ROLE, vec![self.role.into()])]);
        buf
    }

    pub(crate) fn depacketize(buf: &mut BytesMut) -> Result<Self, WireError> {
        expect_tag(buf, ControlMessageType::SetupOk)?;
        let version = get_varint(buf).ok_or(WireError::TruncatedHeader)?;
        let params = get_params(buf)?;
        let role = decode_role(&params)?;
        Ok(SetupOk { version, role })
    }
}

fn decode_role(params: &[(u64, Vec<u8>)]) -> Result<Role, WireError> {
    let raw = find_param(params, PARAM_ROLE).ok_or(WireError::Malformed("missing ROLE parameter"))?;
    let byte = *raw.first().ok_or(WireError::TruncatedHeader)?;
    Role::try_from(byte).map_err(|_| WireError::Malformed("invalid ROLE value"))
}

fn decode_auth_info(params: &[(u64, Vec<u8>)]) -> Result<Option<String>, WireError> {
    match find_param(params, PARAM_AUTH_INFO) {
        None => Ok(None),
        Some(raw) => {
            let mut buf = BytesMut::from(raw);
            Ok(Some(get_lp_string(&mut buf)?))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Announce {
    pub namespace: String,
    pub auth_info: Option<String>,
}

impl Announce {
    pub(crate) fn packetize(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        put_header(&mut buf, ControlMessageType::Announce);
        put_lp_string(&mut buf, &self.namespace);
        let mut params = vec![];
        if let Some(auth) = &self.auth_info {
            let mut value = BytesMut::new();
            put_lp_string(&mut value, auth);
            params.push((PARAM_AUTH_INFO, value.to_vec()));
        }
        put_params(&mut buf, &params);
        buf
    }

    pub(crate) fn depacketize(buf: &mut BytesMut) -> Result<Self, WireError> {
        expect_tag(buf, ControlMessageType::Announce)?;
        let namespace = get_lp_string(buf)?;
        let params = get_params(buf)?;
        let auth_info = decode_auth_info(&params)?;
        Ok(Announce { namespace, auth_info })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AnnounceOk {
    pub namespace: String,
}

impl AnnounceOk {
    pub(crate) fn packetize(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        put_header(&mut buf, ControlMessageType::AnnounceOk);
        put_lp_string(&mut buf, &self.namespace);
        buf
    }

    pub(crate) fn depacketize(buf: &mut BytesMut) -> Result<Self, WireError> {
        expect_tag(buf, ControlMessageType::AnnounceOk)?;
        let namespace = get_lp_string(buf)?;
        Ok(AnnounceOk { namespace })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SubscribeRequest {
    pub namespace: String,
    pub track_name: String,
    pub auth_info: Option<String>,
}

impl SubscribeRequest {
    pub(crate) fn packetize(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        put_header(&mut buf, ControlMessageType::SubscribeRequest);
        put_lp_string(&mut buf, &self.namespace);
        put_lp_string(&mut buf, &self.track_name);
        let mut params = vec![];
        if let Some(auth) = &self.auth_info {
            let mut value = BytesMut::new();
            put_lp_string(&mut value, auth);
            params.push((PARAM_AUTH_INFO, value.to_vec()));
        }
        put_params(&mut buf, &params);
        buf
    }

    pub(crate) fn depacketize(buf: &mut BytesMut) -> Result<Self, WireError> {
        expect_tag(buf, ControlMessageType::SubscribeRequest)?;
        let namespace = get_lp_string(buf)?;
        let track_name = get_lp_string(buf)?;
        let params = get_params(buf)?;
        let auth_info = decode_auth_info(&params)?;
        Ok(SubscribeRequest { namespace, track_name, auth_info })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SubscribeResponse {
    pub namespace: String,
    pub track_name: String,
    pub track_id: u64,
    pub expires: u64,
}

impl SubscribeResponse {
    pub(crate) fn packetize(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        put_header(&mut buf, ControlMessageType::SubscribeResponse);
        put_lp_string(&mut buf, &self.namespace);
        put_lp_string(&mut buf, &self.track_name);
        put_varint(&mut buf, self.track_id);
        put_varint(&mut buf, self.expires);
        buf
    }

    pub(crate) fn depacketize(buf: &mut BytesMut) -> Result<Self, WireError> {
        expect_tag(buf, ControlMessageType::SubscribeResponse)?;
        let namespace = get_lp_string(buf)?;
        let track_name = get_lp_string(buf)?;
        let track_id = get_varint(buf).ok_or(WireError::TruncatedHeader)?;
        let expires = get_varint(buf).ok_or(WireError::TruncatedHeader)?;
        Ok(SubscribeResponse { namespace, track_name, track_id, expires })
    }
}

/// Parsed but, per spec §4.A, not emitted by the publisher side of this core
/// (see `DESIGN.md` for the REDESIGN decision to emit it on auth mismatch).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SubscribeError {
    pub namespace: String,
    pub track_name: String,
    pub reason: String,
}

impl SubscribeError {
    pub(crate) fn packetize(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        put_header(&mut buf, ControlMessageType::SubscribeError);
        put_lp_string(&mut buf, &self.namespace);
        put_lp_string(&mut buf, &self.track_name);
        put_lp_string(&mut buf, &self.reason);
        buf
    }

    pub(crate) fn depacketize(buf: &mut BytesMut) -> Result<Self, WireError> {
        expect_tag(buf, ControlMessageType::SubscribeError)?;
        let namespace = get_lp_string(buf)?;
        let track_name = get_lp_string(buf)?;
        let reason = get_lp_string(buf)?;
        Ok(SubscribeError { namespace, track_name, reason })
    }
}
