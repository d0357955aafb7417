//! IPMI v2.0 / RMCP+ session framing.
//!
//! Outbound packets are built in one buffer: RMCP header, session header
//! with a placeholder length, the (possibly encrypted) payload, a patched
//! length, and, for authenticated sessions, the integrity pad, pad length,
//! next-header byte and truncated MAC. Inbound packets verify the MAC
//! before anything is decrypted.

use crate::crypto::{
    decrypt_aes_cbc, encrypt_aes_cbc, fresh_iv, ConfidentialityAlgorithm, IntegrityAlgorithm,
    SessionKeys,
};
use crate::error::{Error, ProtocolError, SecurityError};
use crate::wire::{Decode, Encode, Reader, Writer};

use super::rmcp::{self, RmcpHeader};
use super::v1_5::AUTH_TYPE_FORMAT_V2;

/// The payload class carried in the low six bits of the payload-type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadType {
    Ipmi,
    Sol,
    OemExplicit,
    OpenSessionRequest,
    OpenSessionResponse,
    RakpMessage1,
    RakpMessage2,
    RakpMessage3,
    RakpMessage4,
}

impl PayloadType {
    pub fn value(&self) -> u8 {
        match self {
            PayloadType::Ipmi => 0x00,
            PayloadType::Sol => 0x01,
            PayloadType::OemExplicit => 0x02,
            PayloadType::OpenSessionRequest => 0x10,
            PayloadType::OpenSessionResponse => 0x11,
            PayloadType::RakpMessage1 => 0x12,
            PayloadType::RakpMessage2 => 0x13,
            PayloadType::RakpMessage3 => 0x14,
            PayloadType::RakpMessage4 => 0x15,
        }
    }
}

impl TryFrom<u8> for PayloadType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        let ty = match value {
            0x00 => Self::Ipmi,
            0x01 => Self::Sol,
            0x02 => Self::OemExplicit,
            0x10 => Self::OpenSessionRequest,
            0x11 => Self::OpenSessionResponse,
            0x12 => Self::RakpMessage1,
            0x13 => Self::RakpMessage2,
            0x14 => Self::RakpMessage3,
            0x15 => Self::RakpMessage4,
            _ => return Err(()),
        };
        Ok(ty)
    }
}

/// Bit 6 of the payload-type byte: the packet carries an integrity trailer.
const FLAG_AUTHENTICATED: u8 = 0x40;
/// Bit 7: the payload is encrypted.
const FLAG_ENCRYPTED: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct V2Header {
    pub payload_type: PayloadType,
    pub authenticated: bool,
    pub encrypted: bool,
    /// IANA and payload id, present only for OEM-explicit payloads.
    pub oem: Option<(u32, u16)>,
    pub session_id: u32,
    pub sequence: u32,
    pub length: u16,
}

impl Encode for V2Header {
    fn encode(&self, w: &mut Writer) {
        let mut ty = self.payload_type.value();
        if self.authenticated {
            ty |= FLAG_AUTHENTICATED;
        }
        if self.encrypted {
            ty |= FLAG_ENCRYPTED;
        }

        w.write_u8(AUTH_TYPE_FORMAT_V2);
        w.write_u8(ty);
        if let Some((iana, payload_id)) = self.oem {
            w.write_u32(iana);
            w.write_u16(payload_id);
        }
        w.write_u32(self.session_id);
        w.write_u32(self.sequence);
        w.write_u16(self.length);
    }
}

impl Decode for V2Header {
    fn decode(r: &mut Reader<'_>) -> Self {
        let _auth_type = r.read_u8();
        let ty_byte = r.read_u8();

        let authenticated = ty_byte & FLAG_AUTHENTICATED != 0;
        let encrypted = ty_byte & FLAG_ENCRYPTED != 0;
        let payload_type = PayloadType::try_from(ty_byte & 0x3F).unwrap_or(PayloadType::Ipmi);

        let oem = if payload_type == PayloadType::OemExplicit {
            Some((r.read_u32(), r.read_u16()))
        } else {
            None
        };
        let session_id = r.read_u32();
        let sequence = r.read_u32();
        let length = r.read_u16();

        Self {
            payload_type,
            authenticated,
            encrypted,
            oem,
            session_id,
            sequence,
            length,
        }
    }
}

/// A parsed v2.0 packet with its payload already verified and decrypted.
#[derive(Debug, Clone)]
pub struct V2Packet {
    pub header: V2Header,
    pub payload: Vec<u8>,
}

/// Per-packet protection for one session: the negotiated integrity and
/// confidentiality algorithms plus the derived keys.
pub struct SessionProtection {
    integrity: IntegrityAlgorithm,
    confidentiality: ConfidentialityAlgorithm,
    keys: SessionKeys,
    forced_iv: Option<[u8; 16]>,
}

impl SessionProtection {
    /// Protection for the pre-session handshake: nothing is authenticated
    /// or encrypted yet.
    pub fn plaintext() -> Self {
        Self {
            integrity: IntegrityAlgorithm::None,
            confidentiality: ConfidentialityAlgorithm::None,
            keys: SessionKeys::empty(),
            forced_iv: None,
        }
    }

    pub fn new(
        integrity: IntegrityAlgorithm,
        confidentiality: ConfidentialityAlgorithm,
        keys: SessionKeys,
        forced_iv: Option<[u8; 16]>,
    ) -> Self {
        Self {
            integrity,
            confidentiality,
            keys,
            forced_iv,
        }
    }

    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    fn authenticated(&self) -> bool {
        self.integrity != IntegrityAlgorithm::None
    }

    fn encrypted(&self) -> bool {
        self.confidentiality != ConfidentialityAlgorithm::None
    }

    fn protects(&self, ty: PayloadType) -> bool {
        // Handshake payloads ride outside the session and stay plaintext.
        ty == PayloadType::Ipmi
    }

    /// Build one outbound packet.
    pub fn encode_packet(
        &self,
        ty: PayloadType,
        session_id: u32,
        sequence: u32,
        payload: &[u8],
    ) -> Result<Vec<u8>, Error> {
        let authenticated = self.protects(ty) && self.authenticated();
        let encrypted = self.protects(ty) && self.encrypted();

        let mut w = Writer::with_capacity(64 + payload.len());
        RmcpHeader::ipmi().encode(&mut w);

        let session_header_start = w.len();
        V2Header {
            payload_type: ty,
            authenticated,
            encrypted,
            oem: None,
            session_id,
            sequence,
            length: 0,
        }
        .encode(&mut w);
        let body_start = w.len();

        if encrypted {
            let iv = fresh_iv(self.forced_iv);
            w.write_bytes(&encrypt_aes_cbc(self.keys.aes_key(), iv, payload));
        } else {
            w.write_bytes(payload);
        }

        // Patch the session header's length now that the body is known.
        let body_len = (w.len() - body_start) as u16;
        w.bytes_mut()[body_start - 2..body_start].copy_from_slice(&body_len.to_le_bytes());

        if authenticated {
            // Pad so that everything from the session header through the
            // trailing MAC lands on a four-byte boundary. The MAC sizes are
            // all multiples of four, so they drop out of the remainder.
            let trailer_base = w.len() - session_header_start + 2;
            let pad = (4 - trailer_base % 4) % 4;

            w.write_bytes(&[0xFF, 0xFF, 0xFF][..pad]);
            w.write_u8(pad as u8);
            w.write_u8(0x07);

            let mac = self
                .integrity
                .mac(&self.keys.k1, &w.bytes()[session_header_start..]);
            let mac_len = self.integrity.mac_len();
            w.write_bytes(&mac[..mac_len]);
        }

        Ok(w.finish()?)
    }

    /// Parse one inbound packet. Authenticated packets are verified before
    /// any decryption happens.
    pub fn decode_packet(&self, data: &[u8], expected: PayloadType) -> Result<V2Packet, Error> {
        let mut r = Reader::new(data);

        let rmcp_header = RmcpHeader::decode(&mut r);
        r.err().map_or(Ok(()), Err)?;
        if rmcp_header.class != rmcp::CLASS_IPMI {
            return Err(ProtocolError::UnsupportedRmcpClass(rmcp_header.class).into());
        }

        if data.len() < 6 || data[4] != AUTH_TYPE_FORMAT_V2 {
            return Err(ProtocolError::NotIpmiV2(data.get(4).copied().unwrap_or(0)).into());
        }

        let ty_byte = data[5] & 0x3F;
        if ty_byte != expected.value() {
            return Err(ProtocolError::UnexpectedPayloadType {
                expected: expected.value(),
                actual: ty_byte,
            }
            .into());
        }

        let header = V2Header::decode(&mut r);
        r.err().map_or(Ok(()), Err)?;

        let wants_auth = self.protects(expected) && self.authenticated();
        let wants_encryption = self.protects(expected) && self.encrypted();
        if header.authenticated != wants_auth {
            return Err(ProtocolError::MismatchedAuthenticationState.into());
        }
        if header.encrypted != wants_encryption {
            return Err(ProtocolError::MismatchedEncryptionState.into());
        }

        let mac_len = if wants_auth {
            self.integrity.mac_len()
        } else {
            0
        };

        if wants_auth {
            if data.len() < 4 + mac_len + 2 {
                return Err(ProtocolError::LengthMismatch.into());
            }
            let (covered, mac) = data[4..].split_at(data.len() - 4 - mac_len);
            let expected_mac = self.integrity.mac(&self.keys.k1, covered);
            if mac != &expected_mac[..mac_len] {
                return Err(SecurityError::AuthCodeMismatch.into());
            }

            let next_header = covered[covered.len() - 1];
            if next_header != 0x07 {
                return Err(ProtocolError::UnknownNextHeader(next_header).into());
            }
        }

        let body = r.read_bytes(header.length as usize).to_vec();
        r.err().map_or(Ok(()), Err)?;

        if wants_auth {
            // Whatever follows the payload must be exactly the declared
            // pad, the two trailer bytes, and the MAC.
            let pad_len = data[data.len() - mac_len - 2] as usize;
            if r.len() != pad_len + 2 + mac_len {
                return Err(ProtocolError::LengthMismatch.into());
            }
        } else if r.len() != 0 {
            return Err(ProtocolError::LengthMismatch.into());
        }

        let payload = if wants_encryption {
            decrypt_aes_cbc(self.keys.aes_key(), &body).map_err(Error::Security)?
        } else {
            body
        };

        Ok(V2Packet {
            header,
            payload,
        })
    }
}

impl core::fmt::Debug for SessionProtection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionProtection")
            .field("integrity", &self.integrity)
            .field("confidentiality", &self.confidentiality)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{AuthAlgorithm, KeyExchangeInputs};
    use hex_literal::hex;

    const OPEN_SESSION_REQUEST: [u8; 48] = hex!(
        "06 00 ff 07 06 10 00 00 00 00 00 00 00 00 20 00"
        "00 00 00 00 a4 a3 a2 a0 00 00 00 08 01 00 00 00"
        "01 00 00 08 01 00 00 00 02 00 00 08 01 00 00 00"
    );

    #[test]
    fn handshake_packet_matches_capture() {
        let payload = &OPEN_SESSION_REQUEST[16..];
        let packet = SessionProtection::plaintext()
            .encode_packet(PayloadType::OpenSessionRequest, 0, 0, payload)
            .unwrap();
        assert_eq!(packet, OPEN_SESSION_REQUEST);
    }

    #[test]
    fn handshake_packet_decodes() {
        let packet = SessionProtection::plaintext()
            .decode_packet(&OPEN_SESSION_REQUEST, PayloadType::OpenSessionRequest)
            .unwrap();
        assert_eq!(packet.header.session_id, 0);
        assert_eq!(packet.header.sequence, 0);
        assert!(!packet.header.authenticated);
        assert_eq!(packet.payload, &OPEN_SESSION_REQUEST[16..]);
    }

    #[test]
    fn unexpected_payload_type_is_rejected() {
        let err = SessionProtection::plaintext()
            .decode_packet(&OPEN_SESSION_REQUEST, PayloadType::RakpMessage1)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::UnexpectedPayloadType { .. })
        ));
    }

    fn protected() -> SessionProtection {
        let local_nonce = hex!("457b81bb81b86c946897113ab5ff3b30");
        let remote_nonce = hex!("526575198bb73c5e42e8947c25b138b5");
        let remote_guid = hex!("34393433 3239434e 47303133 53363334");
        let keys = KeyExchangeInputs {
            password: b"123456abc",
            username: b"Administrator",
            privilege: 0x14,
            local_session_id: 0xA0A2A3A4,
            remote_session_id: 0x00993554,
            local_nonce: &local_nonce,
            remote_nonce: &remote_nonce,
            remote_guid: &remote_guid,
        }
        .derive_keys(AuthAlgorithm::HmacSha1, IntegrityAlgorithm::HmacSha1_96);

        SessionProtection::new(
            IntegrityAlgorithm::HmacSha1_96,
            ConfidentialityAlgorithm::AesCbc128,
            keys,
            Some([0x5F; 16]),
        )
    }

    #[test]
    fn protected_packet_round_trips() {
        let prot = protected();
        let payload = hex!("20 18 c8 81 04 3b 04 3c");

        let packet = prot
            .encode_packet(PayloadType::Ipmi, 0x00993554, 3, &payload)
            .unwrap();

        // Authenticated and encrypted bits are set on the payload type.
        assert_eq!(packet[5], 0xC0);
        // The whole packet minus the RMCP prefix is 4-byte aligned.
        assert_eq!((packet.len() - 4) % 4, 0);

        let parsed = prot.decode_packet(&packet, PayloadType::Ipmi).unwrap();
        assert_eq!(parsed.header.session_id, 0x00993554);
        assert_eq!(parsed.header.sequence, 3);
        assert!(parsed.header.authenticated);
        assert!(parsed.header.encrypted);
        assert_eq!(parsed.payload, payload);
    }

    #[test]
    fn tampered_packet_fails_verification() {
        let prot = protected();
        let payload = hex!("20 18 c8 81 04 3b 04 3c");
        let mut packet = prot
            .encode_packet(PayloadType::Ipmi, 0x00993554, 3, &payload)
            .unwrap();

        // Flip a payload bit; the MAC check must catch it before decryption.
        packet[20] ^= 0x01;
        let err = prot.decode_packet(&packet, PayloadType::Ipmi).unwrap_err();
        assert!(matches!(
            err,
            Error::Security(SecurityError::AuthCodeMismatch)
        ));
    }

    #[test]
    fn plaintext_session_rejects_protected_bits() {
        let prot = protected();
        let payload = hex!("20 18 c8 81 04 3b 04 3c");
        let packet = prot
            .encode_packet(PayloadType::Ipmi, 0x00993554, 3, &payload)
            .unwrap();

        let err = SessionProtection::plaintext()
            .decode_packet(&packet, PayloadType::Ipmi)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::MismatchedAuthenticationState)
        ));
    }
}
