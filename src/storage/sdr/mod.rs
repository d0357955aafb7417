//! The sensor data record repository: info, reservation, and the windowed
//! Get SDR read used to assemble records larger than one response.

pub mod record;

use crate::commands::{self, CommandCode};
use crate::conn::Command;
use crate::wire::{Decode, Encode, Reader, Writer};

use super::ReservationId;

/// The per-read window the repository loop requests. BMCs commonly refuse
/// larger partial reads.
pub const BLOCK_LEN: u8 = 16;

/// Record id of the first record in the repository.
pub const FIRST_RECORD_ID: u16 = 0x0000;
/// The next-record id that marks the end of the repository.
pub const LAST_RECORD_ID: u16 = 0xFFFF;

/// Get SDR Repository Info.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetSdrRepositoryInfo;

impl Encode for GetSdrRepositoryInfo {
    fn encode(&self, _: &mut Writer) {}
}

impl Command for GetSdrRepositoryInfo {
    const CODE: CommandCode = commands::GET_SDR_REPOSITORY_INFO;
    type Output = SdrRepositoryInfo;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdrRepositoryInfo {
    /// BCD encoded, low nibble first: `0x51` is version 1.5.
    pub version: u8,
    pub record_count: u16,
    pub free_space: u16,
    pub most_recent_addition: u32,
    pub most_recent_erase: u32,
    pub operation_support: u8,
}

impl SdrRepositoryInfo {
    pub fn version_string(&self) -> String {
        format!("{}.{}", self.version & 0x0F, self.version >> 4)
    }
}

impl Decode for SdrRepositoryInfo {
    fn decode(r: &mut Reader<'_>) -> Self {
        Self {
            version: r.read_u8(),
            record_count: r.read_u16(),
            free_space: r.read_u16(),
            most_recent_addition: r.read_u32(),
            most_recent_erase: r.read_u32(),
            operation_support: r.read_u8(),
        }
    }
}

/// Reserve SDR Repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReserveSdrRepository;

impl Encode for ReserveSdrRepository {
    fn encode(&self, _: &mut Writer) {}
}

impl Command for ReserveSdrRepository {
    const CODE: CommandCode = commands::RESERVE_SDR_REPOSITORY;
    type Output = ReservationId;
}

/// Get SDR: one windowed read of a record.
#[derive(Debug, Clone, Copy)]
pub struct GetSdr {
    pub reservation: ReservationId,
    pub record_id: u16,
    pub offset: u8,
    pub count: u8,
}

impl Encode for GetSdr {
    fn encode(&self, w: &mut Writer) {
        w.write_u16(self.reservation.0);
        w.write_u16(self.record_id);
        w.write_u8(self.offset);
        w.write_u8(self.count);
    }
}

impl Command for GetSdr {
    const CODE: CommandCode = commands::GET_SDR;
    type Output = SdrBlock;
}

/// The slice of record bytes one Get SDR round returns, plus the id of the
/// record after this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdrBlock {
    pub next_record_id: u16,
    pub data: Vec<u8>,
}

impl Decode for SdrBlock {
    fn decode(r: &mut Reader<'_>) -> Self {
        Self {
            next_record_id: r.read_u16(),
            data: r.read_rest().to_vec(),
        }
    }
}

/// Reassembly buffer for one record read block by block.
#[derive(Debug, Default)]
pub struct RecordAccumulator {
    data: Vec<u8>,
}

impl RecordAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, block: &[u8]) {
        self.data.extend_from_slice(block);
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// The record's declared length, once the five header bytes are in.
    pub fn declared_len(&self) -> Option<usize> {
        if self.data.len() < 5 {
            None
        } else {
            Some(5 + self.data[4] as usize)
        }
    }

    /// A record is complete when the assembled bytes reach the five header
    /// bytes plus the declared record length.
    pub fn is_complete(&self) -> bool {
        self.declared_len()
            .map(|declared| self.data.len() >= declared)
            .unwrap_or(false)
    }

    /// How many bytes remain, used to shrink the final read window.
    pub fn remaining(&self) -> usize {
        self.declared_len()
            .map(|declared| declared.saturating_sub(self.data.len()))
            .unwrap_or(BLOCK_LEN as usize)
    }

    /// The window size for the next read: the full block first, then what
    /// remains once the declared length is known.
    pub fn next_window(&self) -> u8 {
        self.remaining().min(BLOCK_LEN as usize) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{from_bytes, to_bytes};

    #[test]
    fn get_sdr_request_layout() {
        let request = GetSdr {
            reservation: ReservationId(0x1234),
            record_id: 0x0F00,
            offset: 16,
            count: 16,
        };
        assert_eq!(
            to_bytes(&request).unwrap(),
            [0x34, 0x12, 0x00, 0x0F, 16, 16]
        );
    }

    #[test]
    fn block_keeps_the_cursor() {
        let block = from_bytes::<SdrBlock>(&[0x2A, 0x00, 1, 2, 3]).unwrap();
        assert_eq!(block.next_record_id, 0x2A);
        assert_eq!(block.data, [1, 2, 3]);

        // An empty data region is still a valid reply.
        let block = from_bytes::<SdrBlock>(&[0xFF, 0xFF]).unwrap();
        assert_eq!(block.next_record_id, LAST_RECORD_ID);
        assert!(block.data.is_empty());
    }

    #[test]
    fn accumulator_tracks_completion() {
        let mut acc = RecordAccumulator::new();
        assert!(!acc.is_complete());
        assert_eq!(acc.next_window(), BLOCK_LEN);

        // Header declares 29 bytes after it: 34 in total.
        acc.extend(&[0x01, 0x00, 0x51, 0x02, 29, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(acc.declared_len(), Some(34));
        assert!(!acc.is_complete());
        assert_eq!(acc.remaining(), 18);
        assert_eq!(acc.next_window(), 16);

        acc.extend(&[0u8; 16]);
        assert_eq!(acc.remaining(), 2);
        assert_eq!(acc.next_window(), 2);

        acc.extend(&[0u8; 2]);
        assert!(acc.is_complete());
        assert_eq!(acc.remaining(), 0);
    }

    #[test]
    fn repository_info_version() {
        let info = from_bytes::<SdrRepositoryInfo>(&[
            0x51, 0x10, 0x00, 0x00, 0x08, 1, 0, 0, 0, 2, 0, 0, 0, 0x2A,
        ])
        .unwrap();
        assert_eq!(info.version_string(), "1.5");
        assert_eq!(info.record_count, 16);
        assert_eq!(info.free_space, 0x0800);
    }
}
