//! The IPMI message body shared by both packet generations: six header
//! bytes, the command data, and two one-byte two's-complement checksums.

use crate::commands::{CompletionCode, NetFn};
use crate::error::ProtocolError;
use crate::wire::{Reader, Writer};

use super::checksum;

/// The BMC's responder address on the system interface.
pub const BMC_ADDR: u8 = 0x20;
/// Our requester address: the first remote console software id.
pub const REMOTE_CONSOLE_ADDR: u8 = 0x81;

/// An outbound command framed for the session layer.
#[derive(Debug, Clone, Copy)]
pub struct RequestFrame<'a> {
    pub net_fn: NetFn,
    pub cmd: u8,
    /// Requester sequence, already shifted into the top six bits.
    pub rq_seq: u8,
    pub data: &'a [u8],
}

impl RequestFrame<'_> {
    /// Serialise the body: responder, netfn/LUN, header checksum, requester,
    /// sequence/LUN, command, data, data checksum.
    pub fn encode(&self, w: &mut Writer) {
        let netfn_lun = self.net_fn.request_value() << 2;

        w.write_u8(BMC_ADDR);
        w.write_u8(netfn_lun);
        w.write_u8(checksum([BMC_ADDR, netfn_lun]));
        w.write_u8(REMOTE_CONSOLE_ADDR);
        w.write_u8(self.rq_seq);
        w.write_u8(self.cmd);
        w.write_bytes(self.data);
        w.write_u8(checksum(
            [REMOTE_CONSOLE_ADDR, self.rq_seq, self.cmd]
                .into_iter()
                .chain(self.data.iter().copied()),
        ));
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(8 + self.data.len());
        self.encode(&mut w);
        w.finish().expect("request body serialisation is infallible")
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseFrame {
    pub net_fn: NetFn,
    pub cmd: u8,
    pub rq_seq: u8,
    pub code: CompletionCode,
    pub data: Vec<u8>,
}

impl ResponseFrame {
    /// Parse a response body. `r` must be forked to exactly the body region;
    /// both checksums are verified first.
    pub fn decode(r: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        let body = r.read_rest();
        if body.len() < 8 {
            return Err(ProtocolError::MalformedRecord("short response body"));
        }
        if !validate_checksums(body) {
            return Err(ProtocolError::ChecksumMismatch);
        }

        let net_fn = NetFn::from(body[1] >> 2);
        let rq_seq = body[4];
        let cmd = body[5];
        let code = CompletionCode(body[6]);
        let data = body[7..body.len() - 1].to_vec();

        Ok(Self {
            net_fn,
            cmd,
            rq_seq,
            code,
            data,
        })
    }

    /// Serialise a response body; the replay test server uses this.
    pub fn encode(&self, w: &mut Writer) {
        let netfn_lun = self.net_fn.response_value() << 2;

        w.write_u8(REMOTE_CONSOLE_ADDR);
        w.write_u8(netfn_lun);
        w.write_u8(checksum([REMOTE_CONSOLE_ADDR, netfn_lun]));
        w.write_u8(BMC_ADDR);
        w.write_u8(self.rq_seq);
        w.write_u8(self.cmd);
        w.write_u8(self.code.0);
        w.write_bytes(&self.data);
        w.write_u8(checksum(
            [BMC_ADDR, self.rq_seq, self.cmd, self.code.0]
                .into_iter()
                .chain(self.data.iter().copied()),
        ));
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(9 + self.data.len());
        self.encode(&mut w);
        w.finish().expect("response body serialisation is infallible")
    }
}

/// Verify both body checksums: byte 2 closes bytes 0..2, and the final byte
/// closes everything from byte 3 on.
pub fn validate_checksums(body: &[u8]) -> bool {
    if body.len() < 7 {
        return false;
    }

    let header_ok = checksum(body[..2].iter().copied()) == body[2];
    let data_ok = checksum(body[3..body.len() - 1].iter().copied()) == body[body.len() - 1];

    header_ok && data_ok
}
