//! Full sensor records: the only variant carrying factory conversion
//! factors, thresholds and analog ranges.

use crate::error::{Error, ProtocolError};
use crate::wire::{Decode, Reader};

use super::{
    sign_extend_1c, sign_extend_2c, DataFormat, EntityInstance, IdString, Linearization,
    RecordHeader, SensorInit, SensorKey, SensorUnits,
};

/// The packed factory conversion factors: `M`, `B`, tolerance, accuracy and
/// the two exponents, spread across six bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingFactors {
    /// 10-bit two's complement.
    pub m: i16,
    pub tolerance: u8,
    /// 10-bit two's complement.
    pub b: i16,
    pub accuracy: u16,
    pub accuracy_exponent: u8,
    pub direction: u8,
    /// 4-bit two's complement.
    pub result_exponent: i8,
    /// 4-bit two's complement.
    pub b_exponent: i8,
}

impl ReadingFactors {
    pub fn unpack(bytes: [u8; 6]) -> Self {
        let [m_lsb, m_msb_tolerance, b_lsb, b_msb_accuracy, accuracy_exp_dir, exponents] = bytes;

        let m = sign_extend_2c(
            m_lsb as i32 | ((m_msb_tolerance & 0xC0) as i32) << 2,
            10,
        ) as i16;
        let b = sign_extend_2c(
            b_lsb as i32 | ((b_msb_accuracy & 0xC0) as i32) << 2,
            10,
        ) as i16;

        let accuracy = (b_msb_accuracy & 0x3F) as u16 | ((accuracy_exp_dir & 0xF0) as u16) << 2;
        // Kept as observed in deployed decoders: the exponent lands in
        // bits 3:2 of this byte.
        let accuracy_exponent = (accuracy_exp_dir & 0x0F) >> 2;
        let direction = accuracy_exp_dir & 0x03;

        let result_exponent = sign_extend_2c((exponents >> 4) as i32, 4) as i8;
        let b_exponent = sign_extend_2c((exponents & 0x0F) as i32, 4) as i8;

        Self {
            m,
            tolerance: m_msb_tolerance & 0x3F,
            b,
            accuracy,
            accuracy_exponent,
            direction,
            result_exponent,
            b_exponent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FullSensorRecord {
    pub header: RecordHeader,
    pub key: SensorKey,
    pub entity_id: u8,
    pub entity_instance: EntityInstance,
    pub initialization: SensorInit,
    pub capabilities: u8,
    pub sensor_type: u8,
    pub event_reading_type: u8,
    /// Assertion, deassertion and discrete/settable-readable mask bytes.
    pub masks: [u8; 6],
    pub units: SensorUnits,
    pub linearization: Linearization,
    pub factors: ReadingFactors,
    pub analog_flags: u8,
    pub nominal_reading: u8,
    pub normal_maximum: u8,
    pub normal_minimum: u8,
    pub maximum_reading: u8,
    pub minimum_reading: u8,
    pub upper_non_recoverable_threshold: u8,
    pub upper_critical_threshold: u8,
    pub upper_non_critical_threshold: u8,
    pub lower_non_recoverable_threshold: u8,
    pub lower_critical_threshold: u8,
    pub lower_non_critical_threshold: u8,
    pub positive_hysteresis: u8,
    pub negative_hysteresis: u8,
    pub oem: u8,
    pub id_string: IdString,
}

impl FullSensorRecord {
    /// The ignore bit: the sensed entity may be absent or disabled.
    pub fn can_ignore(&self) -> bool {
        self.capabilities & 0x80 != 0
    }

    pub fn has_nominal_reading(&self) -> bool {
        self.analog_flags & 0x01 != 0
    }

    /// Convert a raw reading of `bits` significant bits into the sensor's
    /// unit, applying the factory factors and the linearization formula.
    pub fn calc(&self, raw: i32, bits: u32) -> Result<f64, Error> {
        if bits < 1 {
            return Err(ProtocolError::InvalidReadingWidth.into());
        }

        let base = match self.units.data_format() {
            DataFormat::Unsigned | DataFormat::NoAnalog => raw,
            DataFormat::OnesComplement => sign_extend_1c(raw, bits),
            DataFormat::TwosComplement => sign_extend_2c(raw, bits),
        };

        let y = (self.factors.m as f64 * base as f64 + self.factors.b as f64)
            * 10f64.powi(self.factors.result_exponent as i32);

        let value = match self.linearization {
            Linearization::Linear => y,
            Linearization::Ln => y.ln(),
            Linearization::Log10 => y.log10(),
            Linearization::Log2 => y.log2(),
            Linearization::Exp10 => 10f64.powf(y),
            Linearization::Exp2 => 2f64.powf(y),
            Linearization::Inverse => 1.0 / y,
            Linearization::Square => y * y,
            Linearization::Cube => y * y * y,
            Linearization::Sqrt => y.sqrt(),
            Linearization::CubeRoot => y.cbrt(),
            Linearization::Exp => {
                return Err(ProtocolError::UnsupportedLinearization(4).into());
            }
            Linearization::NonLinear(v) => {
                return Err(ProtocolError::UnsupportedLinearization(v).into());
            }
        };

        Ok(value)
    }
}

impl Decode for FullSensorRecord {
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
        let linearization = Linearization::from(r.read_u8());
        let factors = ReadingFactors::unpack(r.read_array::<6>());
        let analog_flags = r.read_u8();
        let nominal_reading = r.read_u8();
        let normal_maximum = r.read_u8();
        let normal_minimum = r.read_u8();
        let maximum_reading = r.read_u8();
        let minimum_reading = r.read_u8();
        let upper_non_recoverable_threshold = r.read_u8();
        let upper_critical_threshold = r.read_u8();
        let upper_non_critical_threshold = r.read_u8();
        let lower_non_recoverable_threshold = r.read_u8();
        let lower_critical_threshold = r.read_u8();
        let lower_non_critical_threshold = r.read_u8();
        let positive_hysteresis = r.read_u8();
        let negative_hysteresis = r.read_u8();
        let _reserved = r.read_u16();
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
            linearization,
            factors,
            analog_flags,
            nominal_reading,
            normal_maximum,
            normal_minimum,
            maximum_reading,
            minimum_reading,
            upper_non_recoverable_threshold,
            upper_critical_threshold,
            upper_non_critical_threshold,
            lower_non_recoverable_threshold,
            lower_critical_threshold,
            lower_non_critical_threshold,
            positive_hysteresis,
            negative_hysteresis,
            oem,
            id_string,
        }
    }
}
