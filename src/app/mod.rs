//! Application (IPM device "global") commands.

pub mod auth;

use crate::commands::{self, CommandCode};
use crate::conn::Command;
use crate::wire::{Decode, Encode, Reader, Writer};

/// Get Device ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetDeviceId;

impl Encode for GetDeviceId {
    fn encode(&self, _: &mut Writer) {}
}

impl Command for GetDeviceId {
    const CODE: CommandCode = commands::GET_DEVICE_ID;
    type Output = DeviceId;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceId {
    pub device_id: u8,
    pub device_revision: u8,
    pub device_available: bool,
    pub firmware_major: u8,
    pub firmware_minor: u8,
    /// BCD encoded, e.g. `0x20` for IPMI 2.0.
    pub ipmi_version: u8,
    pub additional_device_support: u8,
    pub manufacturer_id: u32,
    pub product_id: u16,
    /// Optional auxiliary firmware revision bytes.
    pub auxiliary: Vec<u8>,
}

impl DeviceId {
    pub fn firmware_revision(&self) -> String {
        format!("{}.{:02}", self.firmware_major, self.firmware_minor)
    }

    pub fn ipmi_version_string(&self) -> String {
        format!("{}.{}", self.ipmi_version & 0x0F, self.ipmi_version >> 4)
    }
}

impl Decode for DeviceId {
    fn decode(r: &mut Reader<'_>) -> Self {
        let device_id = r.read_u8();
        let device_revision = r.read_u8();
        let firmware = r.read_u8();
        let firmware_minor = r.read_u8();
        let ipmi_version = r.read_u8();
        let additional_device_support = r.read_u8();
        let id = r.read_array::<3>();
        let manufacturer_id = u32::from_le_bytes([id[0], id[1], id[2], 0]);
        let product_id = r.read_u16();
        let auxiliary = r.read_rest().to_vec();

        Self {
            device_id,
            device_revision,
            device_available: firmware & 0x80 == 0,
            firmware_major: firmware & 0x7F,
            firmware_minor,
            ipmi_version,
            additional_device_support,
            manufacturer_id,
            product_id,
            auxiliary,
        }
    }
}

/// Get Device GUID.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetDeviceGuid;

impl Encode for GetDeviceGuid {
    fn encode(&self, _: &mut Writer) {}
}

impl Command for GetDeviceGuid {
    const CODE: CommandCode = commands::GET_DEVICE_GUID;
    type Output = DeviceGuid;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceGuid(pub [u8; 16]);

impl Decode for DeviceGuid {
    fn decode(r: &mut Reader<'_>) -> Self {
        Self(r.read_array::<16>())
    }
}

impl core::fmt::Display for DeviceGuid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // GUID bytes arrive least-significant first.
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[15], b[14], b[13], b[12], b[11], b[10], b[9], b[8],
            b[7], b[6], b[5], b[4], b[3], b[2], b[1], b[0],
        )
    }
}

/// Get Self Test Results.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetSelfTestResults;

impl Encode for GetSelfTestResults {
    fn encode(&self, _: &mut Writer) {}
}

impl Command for GetSelfTestResults {
    const CODE: CommandCode = commands::GET_SELF_TEST_RESULTS;
    type Output = SelfTestResults;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfTestResults {
    pub result: u8,
    pub detail: u8,
}

impl SelfTestResults {
    pub fn passed(&self) -> bool {
        self.result == 0x55
    }

    pub fn message(&self) -> &'static str {
        match self.result {
            0x55 => "no error",
            0x56 => "self test function not implemented",
            0x57 => "corrupted or inaccessible data or device",
            0x58 => "fatal hardware error",
            0xFF => "reserved",
            _ => "device-specific failure",
        }
    }
}

impl Decode for SelfTestResults {
    fn decode(r: &mut Reader<'_>) -> Self {
        Self {
            result: r.read_u8(),
            detail: r.read_u8(),
        }
    }
}

/// Get ACPI Power State.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetAcpiPowerState;

impl Encode for GetAcpiPowerState {
    fn encode(&self, _: &mut Writer) {}
}

impl Command for GetAcpiPowerState {
    const CODE: CommandCode = commands::GET_ACPI_POWER_STATE;
    type Output = AcpiPowerState;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcpiPowerState {
    pub system: u8,
    pub device: u8,
}

impl AcpiPowerState {
    pub fn system_state(&self) -> &'static str {
        match self.system & 0x7F {
            0x00 => "S0/G0 working",
            0x01 => "S1",
            0x02 => "S2",
            0x03 => "S3",
            0x04 => "S4",
            0x05 => "S5/G2 soft-off",
            0x06 => "S4/S5 soft-off",
            0x07 => "G3 mechanical off",
            0x08 => "sleeping",
            0x09 => "G1 sleeping",
            0x0A => "override",
            0x20 => "legacy on",
            0x21 => "legacy off",
            0x2A => "unknown",
            _ => "unspecified",
        }
    }

    pub fn device_state(&self) -> &'static str {
        match self.device & 0x7F {
            0x00 => "D0",
            0x01 => "D1",
            0x02 => "D2",
            0x03 => "D3",
            0x2A => "unknown",
            _ => "unspecified",
        }
    }
}

impl Decode for AcpiPowerState {
    fn decode(r: &mut Reader<'_>) -> Self {
        Self {
            system: r.read_u8(),
            device: r.read_u8(),
        }
    }
}

/// Cold Reset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColdReset;

impl Encode for ColdReset {
    fn encode(&self, _: &mut Writer) {}
}

impl Command for ColdReset {
    const CODE: CommandCode = commands::COLD_RESET;
    type Output = ();
}

/// Warm Reset.
#[derive(Debug, Clone, Copy, Default)]
pub struct WarmReset;

impl Encode for WarmReset {
    fn encode(&self, _: &mut Writer) {}
}

impl Command for WarmReset {
    const CODE: CommandCode = commands::WARM_RESET;
    type Output = ();
}
