//! Management-controller records: locator, confirmation, and the BMC
//! message channel table.

use crate::wire::{Decode, Reader};

use super::{IdString, RecordHeader};

#[derive(Debug, Clone)]
pub struct McDeviceLocatorRecord {
    pub header: RecordHeader,
    pub device_slave_address: u8,
    pub channel: u8,
    /// ACPI notification and global-initialization flags.
    pub power_state_notification: u8,
    pub device_capabilities: u8,
    pub entity_id: u8,
    pub entity_instance: u8,
    pub oem: u8,
    pub id_string: IdString,
}

impl Decode for McDeviceLocatorRecord {
    fn decode(r: &mut Reader<'_>) -> Self {
        let header = RecordHeader::decode(r);
        let device_slave_address = r.read_u8() >> 1;
        let channel = r.read_u8() & 0x0F;
        let power_state_notification = r.read_u8();
        let device_capabilities = r.read_u8();
        let _reserved = r.read_bytes(3);
        let entity_id = r.read_u8();
        let entity_instance = r.read_u8();
        let oem = r.read_u8();
        let id_string = IdString::read(r);

        Self {
            header,
            device_slave_address,
            channel,
            power_state_notification,
            device_capabilities,
            entity_id,
            entity_instance,
            oem,
            id_string,
        }
    }
}

#[derive(Debug, Clone)]
pub struct McDeviceConfirmationRecord {
    pub header: RecordHeader,
    pub device_slave_address: u8,
    pub device_id: u8,
    pub channel: u8,
    pub device_revision: u8,
    pub firmware_major: u8,
    pub firmware_minor: u8,
    pub ipmi_version: u8,
    pub manufacturer_id: u32,
    pub product_id: u16,
    pub guid: [u8; 16],
}

impl Decode for McDeviceConfirmationRecord {
    fn decode(r: &mut Reader<'_>) -> Self {
        let header = RecordHeader::decode(r);
        let device_slave_address = r.read_u8() >> 1;
        let device_id = r.read_u8();
        let channel_revision = r.read_u8();
        let firmware_major = r.read_u8() & 0x7F;
        let firmware_minor = r.read_u8();
        let ipmi_version = r.read_u8();
        let id = r.read_array::<3>();
        let product_id = r.read_u16();
        let guid = r.read_array::<16>();

        Self {
            header,
            device_slave_address,
            device_id,
            channel: channel_revision >> 4,
            device_revision: channel_revision & 0x0F,
            firmware_major,
            firmware_minor,
            ipmi_version,
            manufacturer_id: u32::from_le_bytes([id[0], id[1], id[2], 0]),
            product_id,
            guid,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageChannelInfoRecord {
    pub header: RecordHeader,
    /// Protocol info for message channels 0 through 7.
    pub channels: [u8; 8],
    pub messaging_interrupt_type: u8,
    pub event_buffer_interrupt_type: u8,
}

impl Decode for MessageChannelInfoRecord {
    fn decode(r: &mut Reader<'_>) -> Self {
        let header = RecordHeader::decode(r);
        let channels = r.read_array::<8>();
        let messaging_interrupt_type = r.read_u8();
        let event_buffer_interrupt_type = r.read_u8();
        let _reserved = r.read_u8();

        Self {
            header,
            channels,
            messaging_interrupt_type,
            event_buffer_interrupt_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::sdr::record::Record;

    #[test]
    fn decodes_an_mc_locator() {
        let mut data = vec![
            0x50, 0x00, 0x51, 0x12, 0x0E, // header: 14 bytes follow
            0x40, // slave address 0x20
            0x00, // channel 0
            0x00, 0xBF, // power state, capabilities
            0x00, 0x00, 0x00, // reserved
            0x2E, 0x01, // entity
            0x00, // oem
            0xC3, // latin1, 3 chars
        ];
        data.extend_from_slice(b"BMC");
        assert_eq!(data.len(), 5 + 0x0E);

        let record = Record::parse(&data).unwrap();
        let mc = match record {
            Record::McDeviceLocator(m) => m,
            other => panic!("wrong variant {}", other.kind()),
        };

        assert_eq!(mc.device_slave_address, 0x20);
        assert_eq!(mc.device_capabilities, 0xBF);
        assert_eq!(mc.id_string.text(), "BMC");
    }

    #[test]
    fn decodes_an_mc_confirmation() {
        let mut data = vec![
            0x51, 0x00, 0x51, 0x13, 0x1B, // header: 27 bytes follow
            0x40, // slave address 0x20
            0x11, // device id
            0x21, // channel 2, revision 1
            0x02, 0x05, // firmware 2.5
            0x20, // IPMI 2.0
            0x0B, 0x00, 0x00, // manufacturer
            0x00, 0x20, // product
        ];
        data.extend_from_slice(b"494329CNG013S634");
        assert_eq!(data.len(), 5 + 0x1B);

        let record = Record::parse(&data).unwrap();
        let confirmation = match record {
            Record::McDeviceConfirmation(c) => c,
            other => panic!("wrong variant {}", other.kind()),
        };

        assert_eq!(confirmation.device_slave_address, 0x20);
        assert_eq!(confirmation.channel, 2);
        assert_eq!(confirmation.device_revision, 1);
        assert_eq!(confirmation.manufacturer_id, 0x0B);
        assert_eq!(confirmation.product_id, 0x2000);
        assert_eq!(&confirmation.guid, b"494329CNG013S634");
    }

    #[test]
    fn decodes_a_channel_info_record() {
        let data = [
            0x52, 0x00, 0x51, 0x14, 0x0B, // header: 11 bytes follow
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, // channels
            0x11, 0x22, // interrupt types
            0x00, // reserved
        ];

        let record = Record::parse(&data).unwrap();
        let info = match record {
            Record::MessageChannelInfo(i) => i,
            other => panic!("wrong variant {}", other.kind()),
        };

        assert_eq!(info.channels, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(info.messaging_interrupt_type, 0x11);
        assert_eq!(info.event_buffer_interrupt_type, 0x22);
    }
}
