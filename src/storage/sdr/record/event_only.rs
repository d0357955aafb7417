//! Event-only sensor records: sensors that generate events but cannot be
//! read.

use crate::wire::{Decode, Reader};

use super::{EntityInstance, IdString, RecordHeader, SensorKey};

#[derive(Debug, Clone)]
pub struct EventOnlyRecord {
    pub header: RecordHeader,
    pub key: SensorKey,
    pub entity_id: u8,
    pub entity_instance: EntityInstance,
    pub sensor_type: u8,
    pub event_reading_type: u8,
    pub direction: u8,
    pub id_modifier_type: u8,
    pub share_count: u8,
    pub entity_instance_shared: bool,
    pub id_modifier_offset: u8,
    pub oem: u8,
    pub id_string: IdString,
}

impl Decode for EventOnlyRecord {
    fn decode(r: &mut Reader<'_>) -> Self {
        let header = RecordHeader::decode(r);
        let key = SensorKey::decode(r);
        let entity_id = r.read_u8();
        let entity_instance = EntityInstance::from(r.read_u8());
        let sensor_type = r.read_u8();
        let event_reading_type = r.read_u8();

        let sharing_1 = r.read_u8();
        let sharing_2 = r.read_u8();

        let _reserved = r.read_u8();
        let oem = r.read_u8();
        let id_string = IdString::read(r);

        Self {
            header,
            key,
            entity_id,
            entity_instance,
            sensor_type,
            event_reading_type,
            direction: sharing_1 >> 6,
            id_modifier_type: (sharing_1 >> 4) & 0x03,
            share_count: sharing_1 & 0x0F,
            entity_instance_shared: sharing_2 & 0x80 != 0,
            id_modifier_offset: sharing_2 & 0x7F,
            oem,
            id_string,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::sdr::record::Record;

    #[test]
    fn decodes_an_event_only_sensor() {
        let mut data = vec![
            0x21, 0x00, 0x51, 0x03, 0x11, // header: 17 bytes follow
            0x20, 0x00, 0x60, // key
            0x07, 0x01, // processor, instance 1
            0x07, 0x6F, // sensor type, reading type
            0x00, 0x00, // sharing
            0x00, // reserved
            0x00, // oem
            0xC5, // latin1, 5 chars
        ];
        data.extend_from_slice(b"CPU 1");
        assert_eq!(data.len(), 5 + 0x11);

        let record = Record::parse(&data).unwrap();
        let event = match record {
            Record::EventOnly(e) => e,
            other => panic!("wrong variant {}", other.kind()),
        };

        assert_eq!(event.key.sensor_number.get(), 0x60);
        assert_eq!(event.sensor_type, 0x07);
        assert_eq!(event.id_string.text(), "CPU 1");
    }
}
