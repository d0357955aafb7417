//! OEM records: a manufacturer id and opaque data.

use crate::wire::{Decode, Reader};

use super::RecordHeader;

#[derive(Debug, Clone)]
pub struct OemRecord {
    pub header: RecordHeader,
    pub manufacturer_id: u32,
    pub data: Vec<u8>,
}

impl Decode for OemRecord {
    fn decode(r: &mut Reader<'_>) -> Self {
        let header = RecordHeader::decode(r);
        let id = r.read_array::<3>();
        let data = r.read_rest().to_vec();

        Self {
            header,
            manufacturer_id: u32::from_le_bytes([id[0], id[1], id[2], 0]),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::sdr::record::Record;

    #[test]
    fn decodes_an_oem_record() {
        let data = [
            0x60, 0x00, 0x51, 0xC0, 0x07, // header: 7 bytes follow
            0x57, 0x01, 0x00, // manufacturer 0x157
            0xDE, 0xAD, 0xBE, 0xEF,
        ];

        let record = Record::parse(&data).unwrap();
        let oem = match record {
            Record::Oem(o) => o,
            other => panic!("wrong variant {}", other.kind()),
        };

        assert_eq!(oem.manufacturer_id, 0x157);
        assert_eq!(oem.data, [0xDE, 0xAD, 0xBE, 0xEF]);
    }
}
