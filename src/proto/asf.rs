//! ASF presence ping/pong, used to probe whether the remote end speaks IPMI
//! before any session work starts.

use crate::error::{Error, ProtocolError};
use crate::wire::{Decode, Encode, Reader, WireError, Writer};

use super::rmcp::{self, RmcpHeader};

/// The ASF/IANA enterprise number, big-endian on the wire.
pub const ASF_IANA: u32 = 0x0011BE;

const MESSAGE_TYPE_PING: u8 = 0x80;
const MESSAGE_TYPE_PONG: u8 = 0x40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AsfHeader {
    iana: u32,
    message_type: u8,
    message_tag: u8,
    data_len: u8,
}

impl Encode for AsfHeader {
    fn encode(&self, w: &mut Writer) {
        w.write_u32_be(self.iana);
        w.write_u8(self.message_type);
        w.write_u8(self.message_tag);
        w.write_u8(0x00);
        w.write_u8(self.data_len);
    }
}

impl Decode for AsfHeader {
    fn decode(r: &mut Reader<'_>) -> Self {
        let iana = r.read_u32_be();
        let message_type = r.read_u8();
        let message_tag = r.read_u8();
        let _reserved = r.read_u8();
        let data_len = r.read_u8();

        Self {
            iana,
            message_type,
            message_tag,
            data_len,
        }
    }
}

/// Serialise a presence ping carrying `tag`.
pub fn encode_ping(tag: u8) -> Vec<u8> {
    let mut w = Writer::with_capacity(12);
    RmcpHeader::asf().encode(&mut w);
    AsfHeader {
        iana: ASF_IANA,
        message_type: MESSAGE_TYPE_PING,
        message_tag: tag,
        data_len: 0,
    }
    .encode(&mut w);
    w.finish().expect("ping serialisation is infallible")
}

/// A presence pong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pong {
    pub message_tag: u8,
    pub iana: u32,
    pub oem: u32,
    pub supported_entities: u8,
    pub supported_interactions: u8,
}

impl Pong {
    /// Bit 7 of the supported entities advertises IPMI.
    pub fn supports_ipmi(&self) -> bool {
        self.supported_entities & 0x80 != 0
    }
}

/// Parse a pong datagram, checking the RMCP class and the ASF header shape.
pub fn decode_pong(data: &[u8]) -> Result<Pong, Error> {
    let mut r = Reader::new(data);

    let rmcp = RmcpHeader::decode(&mut r);
    r.err().map_or(Ok(()), Err)?;
    if rmcp.class != rmcp::CLASS_ASF {
        return Err(ProtocolError::UnsupportedRmcpClass(rmcp.class).into());
    }

    let header = AsfHeader::decode(&mut r);
    if header.message_type != MESSAGE_TYPE_PONG || header.data_len != 16 {
        return Err(ProtocolError::IpmiNotSupported.into());
    }

    let iana = r.read_u32_be();
    let oem = r.read_u32_be();
    let supported_entities = r.read_u8();
    let supported_interactions = r.read_u8();
    let _reserved = r.read_bytes(6);
    r.finish()?;

    Ok(Pong {
        message_tag: header.message_tag,
        iana,
        oem,
        supported_entities,
        supported_interactions,
    })
}

/// Serialise a pong; only the replay test server sends these.
pub fn encode_pong(pong: &Pong) -> Vec<u8> {
    let mut w = Writer::with_capacity(28);
    RmcpHeader::asf().encode(&mut w);
    AsfHeader {
        iana: ASF_IANA,
        message_type: MESSAGE_TYPE_PONG,
        message_tag: pong.message_tag,
        data_len: 16,
    }
    .encode(&mut w);
    w.write_u32_be(pong.iana);
    w.write_u32_be(pong.oem);
    w.write_u8(pong.supported_entities);
    w.write_u8(pong.supported_interactions);
    w.write_bytes(&[0u8; 6]);
    w.finish().expect("pong serialisation is infallible")
}

/// Recognise an inbound ping, for symmetry with [`encode_ping`].
pub fn decode_ping(data: &[u8]) -> Result<u8, WireError> {
    let mut r = Reader::new(data);
    let _rmcp = RmcpHeader::decode(&mut r);
    let header = AsfHeader::decode(&mut r);
    if header.iana != ASF_IANA || header.message_type != MESSAGE_TYPE_PING {
        r.set_err(WireError::Invalid("ASF ping header"));
    }
    r.finish()?;
    Ok(header.message_tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const PING: [u8; 12] = hex!("06 00 ff 06 00 00 11 be 80 00 00 00");
    const PONG: [u8; 28] =
        hex!("06 00 ff 06 00 00 11 be 40 11 00 10 00 00 11 be 00 00 00 00 81 00 00 00 00 00 00 00");

    #[test]
    fn ping_matches_capture() {
        assert_eq!(encode_ping(0x00), PING);
        assert_eq!(decode_ping(&PING).unwrap(), 0x00);
    }

    #[test]
    fn pong_matches_capture() {
        let pong = decode_pong(&PONG).unwrap();
        assert_eq!(pong.message_tag, 0x11);
        assert_eq!(pong.iana, ASF_IANA);
        assert_eq!(pong.oem, 0);
        assert_eq!(pong.supported_entities, 0x81);
        assert_eq!(pong.supported_interactions, 0x00);
        assert!(pong.supports_ipmi());

        assert_eq!(encode_pong(&pong), PONG);
    }

    #[test]
    fn pong_without_ipmi_entity() {
        let mut data = PONG;
        data[20] = 0x01;
        let pong = decode_pong(&data).unwrap();
        assert!(!pong.supports_ipmi());
    }

    #[test]
    fn truncated_pong_is_an_error() {
        assert!(decode_pong(&PONG[..20]).is_err());
    }
}
