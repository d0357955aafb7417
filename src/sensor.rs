//! Sensor-device commands: readings, thresholds, hysteresis and the
//! factory reading factors.

use crate::commands::{self, CommandCode};
use crate::conn::Command;
use crate::storage::sdr::record::ReadingFactors;
use crate::wire::{Decode, Encode, Reader, Writer};

/// Get Sensor Reading.
#[derive(Debug, Clone, Copy)]
pub struct GetSensorReading {
    pub number: u8,
}

impl Encode for GetSensorReading {
    fn encode(&self, w: &mut Writer) {
        w.write_u8(self.number);
    }
}

impl Command for GetSensorReading {
    const CODE: CommandCode = commands::GET_SENSOR_READING;
    type Output = SensorReading;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorReading {
    pub reading: u8,
    /// Status byte plus any event-state bytes the sensor returned.
    pub flags: Vec<u8>,
}

impl SensorReading {
    fn status(&self) -> u8 {
        self.flags.first().copied().unwrap_or(0)
    }

    pub fn all_events_disabled(&self) -> bool {
        self.status() & 0x80 == 0
    }

    pub fn scanning_disabled(&self) -> bool {
        self.status() & 0x40 == 0
    }

    /// The reading byte is meaningless while this is set.
    pub fn reading_unavailable(&self) -> bool {
        self.status() & 0x20 != 0
    }
}

impl Decode for SensorReading {
    fn decode(r: &mut Reader<'_>) -> Self {
        Self {
            reading: r.read_u8(),
            flags: r.read_rest().to_vec(),
        }
    }
}

/// Get Sensor Thresholds.
#[derive(Debug, Clone, Copy)]
pub struct GetSensorThresholds {
    pub number: u8,
}

impl Encode for GetSensorThresholds {
    fn encode(&self, w: &mut Writer) {
        w.write_u8(self.number);
    }
}

impl Command for GetSensorThresholds {
    const CODE: CommandCode = commands::GET_SENSOR_THRESHOLDS;
    type Output = SensorThresholds;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorThresholds {
    /// Bit field of which raw threshold bytes below are readable.
    pub readable: u8,
    pub lower_non_critical: u8,
    pub lower_critical: u8,
    pub lower_non_recoverable: u8,
    pub upper_non_critical: u8,
    pub upper_critical: u8,
    pub upper_non_recoverable: u8,
}

impl SensorThresholds {
    pub fn has_lower_non_critical(&self) -> bool {
        self.readable & 1 != 0
    }

    pub fn has_lower_critical(&self) -> bool {
        self.readable & (1 << 1) != 0
    }

    pub fn has_lower_non_recoverable(&self) -> bool {
        self.readable & (1 << 2) != 0
    }

    pub fn has_upper_non_critical(&self) -> bool {
        self.readable & (1 << 3) != 0
    }

    pub fn has_upper_critical(&self) -> bool {
        self.readable & (1 << 4) != 0
    }

    pub fn has_upper_non_recoverable(&self) -> bool {
        self.readable & (1 << 5) != 0
    }
}

impl Decode for SensorThresholds {
    fn decode(r: &mut Reader<'_>) -> Self {
        Self {
            readable: r.read_u8(),
            lower_non_critical: r.read_u8(),
            lower_critical: r.read_u8(),
            lower_non_recoverable: r.read_u8(),
            upper_non_critical: r.read_u8(),
            upper_critical: r.read_u8(),
            upper_non_recoverable: r.read_u8(),
        }
    }
}

/// Get Sensor Hysteresis.
#[derive(Debug, Clone, Copy)]
pub struct GetSensorHysteresis {
    pub number: u8,
}

impl Encode for GetSensorHysteresis {
    fn encode(&self, w: &mut Writer) {
        w.write_u8(self.number);
        // Reserved for hysteresis mask, always 0xFF.
        w.write_u8(0xFF);
    }
}

impl Command for GetSensorHysteresis {
    const CODE: CommandCode = commands::GET_SENSOR_HYSTERESIS;
    type Output = SensorHysteresis;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorHysteresis {
    pub positive_going: u8,
    pub negative_going: u8,
}

impl Decode for SensorHysteresis {
    fn decode(r: &mut Reader<'_>) -> Self {
        Self {
            positive_going: r.read_u8(),
            negative_going: r.read_u8(),
        }
    }
}

/// Get Sensor Reading Factors, for sensors with non-linear conversion
/// tables.
#[derive(Debug, Clone, Copy)]
pub struct GetSensorReadingFactors {
    pub number: u8,
    pub reading: u8,
}

impl Encode for GetSensorReadingFactors {
    fn encode(&self, w: &mut Writer) {
        w.write_u8(self.number);
        w.write_u8(self.reading);
    }
}

impl Command for GetSensorReadingFactors {
    const CODE: CommandCode = commands::GET_SENSOR_READING_FACTORS;
    type Output = SensorReadingFactors;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReadingFactors {
    /// The next reading byte at which the factors change again.
    pub next_reading: u8,
    pub factors: ReadingFactors,
}

impl Decode for SensorReadingFactors {
    fn decode(r: &mut Reader<'_>) -> Self {
        Self {
            next_reading: r.read_u8(),
            factors: ReadingFactors::unpack(r.read_array::<6>()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::from_bytes;

    #[test]
    fn reading_status_flags() {
        let reading = from_bytes::<SensorReading>(&[0x18, 0xC0, 0x00]).unwrap();
        assert_eq!(reading.reading, 0x18);
        assert!(!reading.reading_unavailable());
        assert!(!reading.scanning_disabled());
        assert!(!reading.all_events_disabled());

        let reading = from_bytes::<SensorReading>(&[0x00, 0x20]).unwrap();
        assert!(reading.reading_unavailable());
        assert!(reading.scanning_disabled());
    }

    #[test]
    fn threshold_flags() {
        let thresholds =
            from_bytes::<SensorThresholds>(&[0b0011_1000, 0, 0, 0, 10, 20, 30]).unwrap();
        assert!(!thresholds.has_lower_critical());
        assert!(thresholds.has_upper_non_critical());
        assert!(thresholds.has_upper_critical());
        assert!(thresholds.has_upper_non_recoverable());
        assert_eq!(thresholds.upper_critical, 20);
    }

    #[test]
    fn reading_factors_unpack_through_the_shared_path() {
        // M = 1, everything else zero.
        let factors = from_bytes::<SensorReadingFactors>(&[0x00, 0x01, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(factors.factors.m, 1);
        assert_eq!(factors.factors.b, 0);
        assert_eq!(factors.factors.result_exponent, 0);
    }
}
