//! The system event log: info, reservation, and the fixed 16-byte entries.

use crate::commands::{self, CommandCode};
use crate::conn::Command;
use crate::error::{Error, ProtocolError};
use crate::wire::{Decode, Encode, Reader, Writer};

use super::ReservationId;

/// Every SEL entry is exactly this long on the wire.
pub const ENTRY_LEN: usize = 16;

/// Record id of the first entry.
pub const FIRST_ENTRY_ID: u16 = 0x0000;
/// The next-record id marking the end of the log.
pub const LAST_ENTRY_ID: u16 = 0xFFFF;

/// Get SEL Info.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetSelInfo;

impl Encode for GetSelInfo {
    fn encode(&self, _: &mut Writer) {}
}

impl Command for GetSelInfo {
    const CODE: CommandCode = commands::GET_SEL_INFO;
    type Output = SelInfo;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelInfo {
    /// BCD encoded, low nibble first: `0x51` is version 1.5.
    pub version: u8,
    pub entries: u16,
    pub free_space: u16,
    pub most_recent_addition: u32,
    pub most_recent_erase: u32,
    pub operation_support: u8,
}

impl SelInfo {
    pub fn version_string(&self) -> String {
        format!("{}.{}", self.version & 0x0F, self.version >> 4)
    }

    pub fn overflowed(&self) -> bool {
        self.operation_support & 0x80 != 0
    }
}

impl Decode for SelInfo {
    fn decode(r: &mut Reader<'_>) -> Self {
        Self {
            version: r.read_u8(),
            entries: r.read_u16(),
            free_space: r.read_u16(),
            most_recent_addition: r.read_u32(),
            most_recent_erase: r.read_u32(),
            operation_support: r.read_u8(),
        }
    }
}

/// Reserve SEL.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReserveSel;

impl Encode for ReserveSel {
    fn encode(&self, _: &mut Writer) {}
}

impl Command for ReserveSel {
    const CODE: CommandCode = commands::RESERVE_SEL;
    type Output = ReservationId;
}

/// Get SEL Entry: one windowed read of an entry.
#[derive(Debug, Clone, Copy)]
pub struct GetSelEntry {
    pub reservation: ReservationId,
    pub record_id: u16,
    pub offset: u8,
    pub count: u8,
}

impl Encode for GetSelEntry {
    fn encode(&self, w: &mut Writer) {
        w.write_u16(self.reservation.0);
        w.write_u16(self.record_id);
        w.write_u8(self.offset);
        w.write_u8(self.count);
    }
}

impl Command for GetSelEntry {
    const CODE: CommandCode = commands::GET_SEL_ENTRY;
    type Output = SelBlock;
}

/// The bytes one Get SEL Entry round returns, plus the id of the entry
/// after this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelBlock {
    pub next_record_id: u16,
    pub data: Vec<u8>,
}

impl Decode for SelBlock {
    fn decode(r: &mut Reader<'_>) -> Self {
        Self {
            next_record_id: r.read_u16(),
            data: r.read_rest().to_vec(),
        }
    }
}

/// A platform event from the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemEvent {
    pub record_id: u16,
    pub timestamp: u32,
    /// Slave address or software id of the event generator.
    pub generator_id: u16,
    pub event_message_revision: u8,
    pub sensor_type: u8,
    pub sensor_number: u8,
    pub is_assertion: bool,
    pub event_type: u8,
    pub event_data: [u8; 3],
}

/// One decoded SEL entry, keyed by its record type byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelEntry {
    /// Record type `0x02`.
    System(SystemEvent),
    /// Record types `0xC0..=0xDF` carry a timestamp and an OEM payload.
    OemTimestamped {
        record_id: u16,
        record_type: u8,
        timestamp: u32,
        manufacturer_id: u32,
        data: [u8; 6],
    },
    /// Record types `0xE0..=0xFF` are entirely OEM-defined.
    OemRaw {
        record_id: u16,
        record_type: u8,
        data: [u8; 13],
    },
}

impl SelEntry {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        if data.len() < ENTRY_LEN {
            return Err(ProtocolError::MalformedRecord("short SEL entry").into());
        }

        let mut r = Reader::new(&data[..ENTRY_LEN]);
        let record_id = r.read_u16();
        let record_type = r.read_u8();

        let entry = match record_type {
            0x02 => {
                let timestamp = r.read_u32();
                let generator_id = r.read_u16();
                let event_message_revision = r.read_u8();
                let sensor_type = r.read_u8();
                let sensor_number = r.read_u8();
                let dir_type = r.read_u8();
                let event_data = r.read_array::<3>();

                SelEntry::System(SystemEvent {
                    record_id,
                    timestamp,
                    generator_id,
                    event_message_revision,
                    sensor_type,
                    sensor_number,
                    is_assertion: dir_type & 0x80 == 0,
                    event_type: dir_type & 0x7F,
                    event_data,
                })
            }
            0xC0..=0xDF => {
                let timestamp = r.read_u32();
                let id = r.read_array::<3>();
                SelEntry::OemTimestamped {
                    record_id,
                    record_type,
                    timestamp,
                    manufacturer_id: u32::from_le_bytes([id[0], id[1], id[2], 0]),
                    data: r.read_array::<6>(),
                }
            }
            0xE0..=0xFF => SelEntry::OemRaw {
                record_id,
                record_type,
                data: r.read_array::<13>(),
            },
            _ => {
                return Err(ProtocolError::MalformedRecord("unknown SEL record type").into());
            }
        };
        r.finish()?;

        Ok(entry)
    }

    pub fn record_id(&self) -> u16 {
        match self {
            SelEntry::System(event) => event.record_id,
            SelEntry::OemTimestamped { record_id, .. } => *record_id,
            SelEntry::OemRaw { record_id, .. } => *record_id,
        }
    }

    pub fn timestamp(&self) -> Option<u32> {
        match self {
            SelEntry::System(event) => Some(event.timestamp),
            SelEntry::OemTimestamped { timestamp, .. } => Some(*timestamp),
            SelEntry::OemRaw { .. } => None,
        }
    }
}

/// Render a SEL timestamp. Values below `0x20000000` count seconds since
/// system boot rather than an absolute time.
#[cfg(feature = "time")]
pub fn timestamp_string(timestamp: u32) -> String {
    if timestamp < 0x2000_0000 {
        return format!("boot+{timestamp}s");
    }

    time::OffsetDateTime::from_unix_timestamp(timestamp as i64)
        .ok()
        .and_then(|t| {
            t.format(&time::format_description::well_known::Rfc3339)
                .ok()
        })
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn system_event_round_trip() {
        let data = hex!("2a 00 02 80 33 21 63 20 00 04 01 0d 01 57 00 00");
        let entry = SelEntry::parse(&data).unwrap();

        let event = match entry {
            SelEntry::System(event) => event,
            other => panic!("wrong entry kind: {other:?}"),
        };
        assert_eq!(event.record_id, 0x2A);
        assert_eq!(event.timestamp, 0x63213380);
        assert_eq!(event.generator_id, 0x0020);
        assert_eq!(event.sensor_type, 0x01);
        assert_eq!(event.sensor_number, 0x0D);
        assert!(event.is_assertion);
        assert_eq!(event.event_type, 0x01);
        assert_eq!(event.event_data, [0x57, 0x00, 0x00]);
    }

    #[test]
    fn oem_timestamped_entry() {
        let data = hex!("01 00 c1 80 33 21 63 57 01 00 11 22 33 44 55 66");
        let entry = SelEntry::parse(&data).unwrap();
        assert_eq!(
            entry,
            SelEntry::OemTimestamped {
                record_id: 1,
                record_type: 0xC1,
                timestamp: 0x63213380,
                manufacturer_id: 0x157,
                data: [0x11, 0x22, 0x33, 0x44, 0x55, 0x66],
            }
        );
        assert_eq!(entry.timestamp(), Some(0x63213380));
    }

    #[test]
    fn oem_raw_entry() {
        let data = hex!("02 00 e0 01 02 03 04 05 06 07 08 09 0a 0b 0c 0d");
        let entry = SelEntry::parse(&data).unwrap();
        match entry {
            SelEntry::OemRaw {
                record_type, data, ..
            } => {
                assert_eq!(record_type, 0xE0);
                assert_eq!(data[0], 1);
                assert_eq!(data[12], 0x0D);
            }
            other => panic!("wrong entry kind: {other:?}"),
        }
    }

    #[test]
    fn short_entries_are_rejected() {
        assert!(SelEntry::parse(&[0u8; 15]).is_err());
    }

    #[cfg(feature = "time")]
    #[test]
    fn early_timestamps_count_from_boot() {
        assert_eq!(timestamp_string(120), "boot+120s");
        assert!(timestamp_string(0x63213380).starts_with("2022-"));
    }
}
