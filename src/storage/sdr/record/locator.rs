//! Device locator records for generic devices and FRUs.

use crate::wire::{Decode, Reader};

use super::{IdString, RecordHeader};

#[derive(Debug, Clone)]
pub struct GenericDeviceLocatorRecord {
    pub header: RecordHeader,
    pub device_access_address: u8,
    pub device_slave_address: u8,
    pub access_lun: u8,
    pub private_bus_id: u8,
    pub address_span: u8,
    pub device_type: u8,
    pub device_type_modifier: u8,
    pub entity_id: u8,
    pub entity_instance: u8,
    pub oem: u8,
    pub id_string: IdString,
}

impl Decode for GenericDeviceLocatorRecord {
    fn decode(r: &mut Reader<'_>) -> Self {
        let header = RecordHeader::decode(r);
        let device_access_address = r.read_u8() >> 1;
        let device_slave_address = r.read_u8() >> 1;
        let lun_bus = r.read_u8();
        let address_span = r.read_u8() & 0x07;
        let _reserved = r.read_u8();
        let device_type = r.read_u8();
        let device_type_modifier = r.read_u8();
        let entity_id = r.read_u8();
        let entity_instance = r.read_u8();
        let oem = r.read_u8();
        let id_string = IdString::read(r);

        Self {
            header,
            device_access_address,
            device_slave_address,
            access_lun: (lun_bus >> 3) & 0x03,
            private_bus_id: lun_bus & 0x07,
            address_span,
            device_type,
            device_type_modifier,
            entity_id,
            entity_instance,
            oem,
            id_string,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FruDeviceLocatorRecord {
    pub header: RecordHeader,
    pub device_access_address: u8,
    /// FRU device id for logical devices, slave address otherwise.
    pub device_id: u8,
    pub is_logical: bool,
    pub access_lun: u8,
    pub private_bus_id: u8,
    pub channel: u8,
    pub device_type: u8,
    pub device_type_modifier: u8,
    pub entity_id: u8,
    pub entity_instance: u8,
    pub oem: u8,
    pub id_string: IdString,
}

impl Decode for FruDeviceLocatorRecord {
    fn decode(r: &mut Reader<'_>) -> Self {
        let header = RecordHeader::decode(r);
        let device_access_address = r.read_u8() >> 1;
        let device_id = r.read_u8();
        let logical_lun_bus = r.read_u8();
        let channel = r.read_u8() >> 4;
        let _reserved = r.read_u8();
        let device_type = r.read_u8();
        let device_type_modifier = r.read_u8();
        let entity_id = r.read_u8();
        let entity_instance = r.read_u8();
        let oem = r.read_u8();
        let id_string = IdString::read(r);

        Self {
            header,
            device_access_address,
            device_id,
            is_logical: logical_lun_bus & 0x80 != 0,
            access_lun: (logical_lun_bus >> 3) & 0x03,
            private_bus_id: logical_lun_bus & 0x07,
            channel,
            device_type,
            device_type_modifier,
            entity_id,
            entity_instance,
            oem,
            id_string,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::sdr::record::Record;

    #[test]
    fn decodes_a_fru_locator() {
        let mut data = vec![
            0x40, 0x00, 0x51, 0x11, 0x15, // header: 21 bytes follow
            0x40, // access address 0x20
            0x01, // FRU device id 1
            0x80, // logical device, LUN 0, bus 0
            0x00, // channel 0
            0x00, // reserved
            0x10, 0x00, // device type/modifier
            0x07, 0x01, // system board, instance 1
            0x00, // oem
            0xCA, // latin1, 10 chars
        ];
        data.extend_from_slice(b"FRU Board ");
        assert_eq!(data.len(), 5 + 0x15);

        let record = Record::parse(&data).unwrap();
        let fru = match record {
            Record::FruDeviceLocator(f) => f,
            other => panic!("wrong variant {}", other.kind()),
        };

        assert_eq!(fru.device_access_address, 0x20);
        assert_eq!(fru.device_id, 1);
        assert!(fru.is_logical);
        assert_eq!(fru.device_type, 0x10);
        assert_eq!(fru.id_string.text(), "FRU Board ");
    }

    #[test]
    fn decodes_a_generic_locator() {
        let mut data = vec![
            0x41, 0x00, 0x51, 0x10, 0x10, // header: 16 bytes follow
            0x40, // access address 0x20
            0xA0, // slave address 0x50
            0x18, // LUN 3, bus 0
            0x01, // address span 1
            0x00, // reserved
            0x02, 0x00, // device type/modifier
            0x07, 0x01, // entity
            0x00, // oem
            0xC5, // latin1, 5 chars
        ];
        data.extend_from_slice(b"SEEPR");
        assert_eq!(data.len(), 5 + 0x10);

        let record = Record::parse(&data).unwrap();
        let generic = match record {
            Record::GenericDeviceLocator(g) => g,
            other => panic!("wrong variant {}", other.kind()),
        };

        assert_eq!(generic.device_access_address, 0x20);
        assert_eq!(generic.device_slave_address, 0x50);
        assert_eq!(generic.access_lun, 3);
        assert_eq!(generic.address_span, 1);
        assert_eq!(generic.id_string.text(), "SEEPR");
    }
}
