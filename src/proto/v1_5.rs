//! IPMI v1.5 session framing.
//!
//! The session header is auth type, outbound sequence, session id, an
//! optional 16-byte auth code, and a one-byte payload length. Auth codes are
//! computed here for the MD5 and straight-password schemes.

use md5::{Digest, Md5};

use crate::error::{Error, ProtocolError, SecurityError};
use crate::wire::{Decode, Encode, Reader, WireError, Writer};

use super::rmcp::{self, RmcpHeader};

/// The v1.5 per-packet authentication scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    None,
    Md2,
    Md5,
    Password,
    Oem,
}

impl AuthType {
    pub fn value(&self) -> u8 {
        match self {
            AuthType::None => 0x00,
            AuthType::Md2 => 0x01,
            AuthType::Md5 => 0x02,
            AuthType::Password => 0x04,
            AuthType::Oem => 0x05,
        }
    }
}

impl TryFrom<u8> for AuthType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        let ty = match value {
            0x00 => Self::None,
            0x01 => Self::Md2,
            0x02 => Self::Md5,
            0x04 => Self::Password,
            0x05 => Self::Oem,
            _ => return Err(()),
        };
        Ok(ty)
    }
}

/// The marker the v2.0 session header carries in the auth-type slot.
pub const AUTH_TYPE_FORMAT_V2: u8 = 0x06;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct V1Header {
    pub auth_type: AuthType,
    pub sequence: u32,
    pub session_id: u32,
    pub auth_code: Option<[u8; 16]>,
    pub length: u8,
}

impl Encode for V1Header {
    fn encode(&self, w: &mut Writer) {
        w.write_u8(self.auth_type.value());
        w.write_u32(self.sequence);
        w.write_u32(self.session_id);
        if self.auth_type != AuthType::None {
            match &self.auth_code {
                Some(code) => w.write_bytes(code),
                None => w.write_bytes(&[0u8; 16]),
            }
        }
        w.write_u8(self.length);
    }
}

impl Decode for V1Header {
    fn decode(r: &mut Reader<'_>) -> Self {
        let auth_byte = r.read_u8();
        let auth_type = match AuthType::try_from(auth_byte) {
            Ok(ty) => ty,
            Err(()) => {
                r.set_err(WireError::Invalid("v1.5 auth type"));
                AuthType::None
            }
        };
        let sequence = r.read_u32();
        let session_id = r.read_u32();
        let auth_code = if auth_type != AuthType::None {
            Some(r.read_array::<16>())
        } else {
            None
        };
        let length = r.read_u8();

        Self {
            auth_type,
            sequence,
            session_id,
            auth_code,
            length,
        }
    }
}

/// The 16-byte per-packet auth code for session traffic.
///
/// MD5 covers `password ‖ session-id ‖ payload ‖ sequence ‖ password`; the
/// password scheme is the zero-padded password itself.
pub fn auth_code(
    auth_type: AuthType,
    password: &[u8; 16],
    session_id: u32,
    sequence: u32,
    payload: &[u8],
) -> Option<[u8; 16]> {
    match auth_type {
        AuthType::None | AuthType::Md2 | AuthType::Oem => None,
        AuthType::Password => Some(*password),
        AuthType::Md5 => {
            let mut h = Md5::new();
            h.update(password);
            h.update(session_id.to_le_bytes());
            h.update(payload);
            h.update(sequence.to_le_bytes());
            h.update(password);
            Some(h.finalize().into())
        }
    }
}

/// Build one v1.5 packet around an already-encoded message body.
pub fn encode_packet(
    auth_type: AuthType,
    password: &[u8; 16],
    session_id: u32,
    sequence: u32,
    payload: &[u8],
) -> Vec<u8> {
    let header = V1Header {
        auth_type,
        sequence,
        session_id,
        auth_code: auth_code(auth_type, password, session_id, sequence, payload),
        length: payload.len() as u8,
    };

    let mut w = Writer::with_capacity(32 + payload.len());
    RmcpHeader::ipmi().encode(&mut w);
    header.encode(&mut w);
    w.write_bytes(payload);
    w.finish().expect("v1.5 packet serialisation is infallible")
}

/// A parsed v1.5 packet.
#[derive(Debug, Clone)]
pub struct V1Packet {
    pub header: V1Header,
    pub payload: Vec<u8>,
}

/// Parse one v1.5 packet and, when the header carries an auth code and the
/// password is known, verify it.
pub fn decode_packet(data: &[u8], password: Option<&[u8; 16]>) -> Result<V1Packet, Error> {
    let mut r = Reader::new(data);

    let rmcp = RmcpHeader::decode(&mut r);
    r.err().map_or(Ok(()), Err)?;
    if rmcp.class != rmcp::CLASS_IPMI {
        return Err(ProtocolError::UnsupportedRmcpClass(rmcp.class).into());
    }

    let header = V1Header::decode(&mut r);
    // Bound the payload region; some BMCs append a legacy pad byte after it.
    let mut body = r.fork(header.length as usize);
    let payload = body.read_rest().to_vec();
    r.finish()?;

    if let (Some(code), Some(password)) = (header.auth_code, password) {
        let expected = auth_code(
            header.auth_type,
            password,
            header.session_id,
            header.sequence,
            &payload,
        );
        if expected.map(|e| e != code).unwrap_or(false) {
            return Err(SecurityError::AuthCodeMismatch.into());
        }
    }

    Ok(V1Packet { header, payload })
}
