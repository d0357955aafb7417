//! The 4-byte RMCP envelope every packet starts with.

use crate::wire::{Decode, Encode, Reader, WireError, Writer};

pub const RMCP_VERSION_1: u8 = 0x06;
pub const CLASS_ASF: u8 = 0x06;
pub const CLASS_IPMI: u8 = 0x07;

/// Sequence number for traffic that does not want an RMCP-level ACK.
pub const NO_ACK_SEQUENCE: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RmcpHeader {
    pub version: u8,
    pub sequence: u8,
    pub class: u8,
}

impl RmcpHeader {
    pub fn ipmi() -> Self {
        Self {
            version: RMCP_VERSION_1,
            sequence: NO_ACK_SEQUENCE,
            class: CLASS_IPMI,
        }
    }

    pub fn asf() -> Self {
        Self {
            version: RMCP_VERSION_1,
            sequence: NO_ACK_SEQUENCE,
            class: CLASS_ASF,
        }
    }
}

impl Encode for RmcpHeader {
    fn encode(&self, w: &mut Writer) {
        w.write_u8(self.version);
        w.write_u8(0x00);
        w.write_u8(self.sequence);
        w.write_u8(self.class);
    }
}

impl Decode for RmcpHeader {
    fn decode(r: &mut Reader<'_>) -> Self {
        let version = r.read_u8();
        let _reserved = r.read_u8();
        let sequence = r.read_u8();
        let class = r.read_u8();

        if r.err().is_none() {
            if version != RMCP_VERSION_1 {
                r.set_err(WireError::Invalid("RMCP version"));
            } else if class != CLASS_ASF && class != CLASS_IPMI {
                r.set_err(WireError::Invalid("RMCP class"));
            }
        }

        Self {
            version,
            sequence,
            class,
        }
    }
}
