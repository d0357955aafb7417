//! Compact sensor records: discrete sensors without conversion factors,
//! possibly shared across a run of sensor numbers.

use crate::wire::{Decode, Reader};

use super::{EntityInstance, IdString, RecordHeader, SensorInit, SensorKey, SensorUnits};

#[derive(Debug, Clone)]
pub struct CompactSensorRecord {
    pub header: RecordHeader,
    pub key: SensorKey,
    pub entity_id: u8,
    pub entity_instance: EntityInstance,
    pub initialization: SensorInit,
    pub capabilities: u8,
    pub sensor_type: u8,
    pub event_reading_type: u8,
    pub masks: [u8; 6],
    pub units: SensorUnits,
    pub direction: u8,
    pub id_modifier_type: u8,
    /// How many sensors share this record.
    pub share_count: u8,
    pub entity_instance_shared: bool,
    pub id_modifier_offset: u8,
    pub positive_hysteresis: u8,
    pub negative_hysteresis: u8,
    pub oem: u8,
    pub id_string: IdString,
}

impl CompactSensorRecord {
    pub fn can_ignore(&self) -> bool {
        self.capabilities & 0x80 != 0
    }
}

impl Decode for CompactSensorRecord {
    fn decode(r: &mut Reader<'_>) -> Self {
        let header = RecordHeader::decode(r);
        let key = SensorKey::decode(r);
        let entity_id = r.read_u8();
        let entity_instance = EntityInstance::from(r.read_u8());
        let initialization = SensorInit::from_bits_truncate(r.read_u8());
        let capabilities = r.read_u8();
        let sensor_type = r.read_u8();
        let event_reading_type = r.read_u8();
        let masks = r.read_array::<6>();
        let units = SensorUnits::decode(r);

        let sharing_1 = r.read_u8();
        let sharing_2 = r.read_u8();

        let positive_hysteresis = r.read_u8();
        let negative_hysteresis = r.read_u8();
        let _reserved = r.read_bytes(3);
        let oem = r.read_u8();
        let id_string = IdString::read(r);

        Self {
            header,
            key,
            entity_id,
            entity_instance,
            initialization,
            capabilities,
            sensor_type,
            event_reading_type,
            masks,
            units,
            direction: sharing_1 >> 6,
            id_modifier_type: (sharing_1 >> 4) & 0x03,
            share_count: sharing_1 & 0x0F,
            entity_instance_shared: sharing_2 & 0x80 != 0,
            id_modifier_offset: sharing_2 & 0x7F,
            positive_hysteresis,
            negative_hysteresis,
            oem,
            id_string,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::sdr::record::Record;

    #[test]
    fn decodes_a_shared_discrete_sensor() {
        let mut data = vec![
            0x10, 0x00, 0x51, 0x02, 0x22, // header: 34 bytes follow
            0x20, 0x00, 0x30, // key
            0x0A, 0x01, // power supply, instance 1
            0x01, 0x40, // init, capabilities
            0x08, 0x6F, // sensor type, discrete reading type
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // masks
            0x00, 0x00, 0x00, // units
            0x43, 0x81, // sharing: 4 sensors, numeric modifier, shared instance
            0x00, 0x00, // hysteresis
            0x00, 0x00, 0x00, // reserved
            0x00, // oem
            0xC4, // latin1, 4 chars
        ];
        data.extend_from_slice(b"PSU ");
        data.extend_from_slice(&[0u8; 3]);
        assert_eq!(data.len(), 5 + 0x22);

        let record = Record::parse(&data).unwrap();
        let compact = match record {
            Record::CompactSensor(c) => c,
            other => panic!("wrong variant {:?}", other.kind()),
        };

        assert_eq!(compact.key.sensor_number.get(), 0x30);
        assert_eq!(compact.sensor_type, 0x08);
        assert_eq!(compact.share_count, 3);
        assert_eq!(compact.direction, 1);
        assert!(compact.entity_instance_shared);
        assert_eq!(compact.id_modifier_offset, 1);
        assert_eq!(compact.id_string.text(), "PSU ");
    }
}
