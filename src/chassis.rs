//! Chassis commands: power state, capabilities, control, restart cause and
//! the power-on-hours counter.

use std::str::FromStr;

use crate::commands::{self, CommandCode};
use crate::conn::Command;
use crate::wire::{Decode, Encode, Reader, Writer};

/// Get Chassis Capabilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetChassisCapabilities;

impl Encode for GetChassisCapabilities {
    fn encode(&self, _: &mut Writer) {}
}

impl Command for GetChassisCapabilities {
    const CODE: CommandCode = commands::GET_CHASSIS_CAPABILITIES;
    type Output = ChassisCapabilities;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChassisCapabilities {
    pub flags: u8,
    pub fru_info_device_address: u8,
    pub sdr_device_address: u8,
    pub sel_device_address: u8,
    pub system_management_device_address: u8,
    pub bridge_device_address: Option<u8>,
}

impl ChassisCapabilities {
    pub fn power_interlock(&self) -> bool {
        self.flags & (1 << 3) != 0
    }

    pub fn diagnostic_interrupt(&self) -> bool {
        self.flags & (1 << 2) != 0
    }

    pub fn front_panel_lockout(&self) -> bool {
        self.flags & (1 << 1) != 0
    }

    pub fn intrusion_sensor(&self) -> bool {
        self.flags & 1 != 0
    }
}

impl Decode for ChassisCapabilities {
    fn decode(r: &mut Reader<'_>) -> Self {
        let flags = r.read_u8();
        let fru_info_device_address = r.read_u8();
        let sdr_device_address = r.read_u8();
        let sel_device_address = r.read_u8();
        let system_management_device_address = r.read_u8();
        let bridge_device_address = if r.len() >= 1 { Some(r.read_u8()) } else { None };

        Self {
            flags,
            fru_info_device_address,
            sdr_device_address,
            sel_device_address,
            system_management_device_address,
            bridge_device_address,
        }
    }
}

/// Get Chassis Status.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetChassisStatus;

impl Encode for GetChassisStatus {
    fn encode(&self, _: &mut Writer) {}
}

impl Command for GetChassisStatus {
    const CODE: CommandCode = commands::GET_CHASSIS_STATUS;
    type Output = ChassisStatus;
}

/// How the chassis behaves when mains power returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerRestorePolicy {
    StayOff,
    Restore,
    PowerUp,
    Unknown,
}

impl core::fmt::Display for PowerRestorePolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            PowerRestorePolicy::StayOff => "always power off",
            PowerRestorePolicy::Restore => "restore previous state",
            PowerRestorePolicy::PowerUp => "always power up",
            PowerRestorePolicy::Unknown => "unknown",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChassisStatus {
    pub current_power_state: u8,
    pub last_power_event: u8,
    pub chassis_state: u8,
    pub front_panel: Option<u8>,
}

impl ChassisStatus {
    pub fn power_restore_policy(&self) -> PowerRestorePolicy {
        match self.current_power_state >> 5 & 0x03 {
            0 => PowerRestorePolicy::StayOff,
            1 => PowerRestorePolicy::Restore,
            2 => PowerRestorePolicy::PowerUp,
            _ => PowerRestorePolicy::Unknown,
        }
    }

    pub fn power_control_fault(&self) -> bool {
        self.current_power_state & (1 << 4) != 0
    }

    pub fn power_fault(&self) -> bool {
        self.current_power_state & (1 << 3) != 0
    }

    pub fn interlock(&self) -> bool {
        self.current_power_state & (1 << 2) != 0
    }

    pub fn power_overload(&self) -> bool {
        self.current_power_state & (1 << 1) != 0
    }

    pub fn power_on(&self) -> bool {
        self.current_power_state & 1 != 0
    }

    pub fn last_event_power_on_via_ipmi(&self) -> bool {
        self.last_power_event & (1 << 4) != 0
    }

    pub fn last_event_power_down_by_fault(&self) -> bool {
        self.last_power_event & (1 << 3) != 0
    }

    pub fn last_event_power_down_by_interlock(&self) -> bool {
        self.last_power_event & (1 << 2) != 0
    }

    pub fn last_event_power_down_by_overload(&self) -> bool {
        self.last_power_event & (1 << 1) != 0
    }

    pub fn last_event_ac_failed(&self) -> bool {
        self.last_power_event & 1 != 0
    }

    pub fn identify_supported(&self) -> bool {
        self.chassis_state & (1 << 6) != 0
    }

    pub fn fan_fault(&self) -> bool {
        self.chassis_state & (1 << 3) != 0
    }

    pub fn drive_fault(&self) -> bool {
        self.chassis_state & (1 << 2) != 0
    }

    pub fn front_panel_lockout_active(&self) -> bool {
        self.chassis_state & (1 << 1) != 0
    }

    pub fn intrusion_active(&self) -> bool {
        self.chassis_state & 1 != 0
    }
}

impl Decode for ChassisStatus {
    fn decode(r: &mut Reader<'_>) -> Self {
        let current_power_state = r.read_u8();
        let last_power_event = r.read_u8();
        let chassis_state = r.read_u8();
        let front_panel = if r.len() >= 1 { Some(r.read_u8()) } else { None };

        Self {
            current_power_state,
            last_power_event,
            chassis_state,
            front_panel,
        }
    }
}

/// Chassis Control actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChassisControlAction {
    PowerDown,
    PowerUp,
    PowerCycle,
    HardReset,
    DiagnosticInterrupt,
    SoftShutdown,
}

impl ChassisControlAction {
    pub fn value(&self) -> u8 {
        match self {
            ChassisControlAction::PowerDown => 0,
            ChassisControlAction::PowerUp => 1,
            ChassisControlAction::PowerCycle => 2,
            ChassisControlAction::HardReset => 3,
            ChassisControlAction::DiagnosticInterrupt => 4,
            ChassisControlAction::SoftShutdown => 5,
        }
    }
}

impl FromStr for ChassisControlAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = match s.to_ascii_lowercase().as_str() {
            "off" | "power-down" => Self::PowerDown,
            "on" | "power-up" => Self::PowerUp,
            "cycle" => Self::PowerCycle,
            "reset" => Self::HardReset,
            "diag" => Self::DiagnosticInterrupt,
            "soft" => Self::SoftShutdown,
            other => return Err(format!("{other} is not a chassis control action")),
        };
        Ok(action)
    }
}

/// Chassis Control.
#[derive(Debug, Clone, Copy)]
pub struct ChassisControl {
    pub action: ChassisControlAction,
}

impl Encode for ChassisControl {
    fn encode(&self, w: &mut Writer) {
        w.write_u8(self.action.value());
    }
}

impl Command for ChassisControl {
    const CODE: CommandCode = commands::CHASSIS_CONTROL;
    type Output = ();
}

/// Chassis Identify.
#[derive(Debug, Clone, Copy)]
pub struct ChassisIdentify {
    /// Identify interval in seconds; zero turns the indicator off.
    pub interval: u8,
    pub force_on: bool,
}

impl Encode for ChassisIdentify {
    fn encode(&self, w: &mut Writer) {
        w.write_u8(self.interval);
        w.write_u8(self.force_on as u8);
    }
}

impl Command for ChassisIdentify {
    const CODE: CommandCode = commands::CHASSIS_IDENTIFY;
    type Output = ();
}

/// Get System Restart Cause.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetSystemRestartCause;

impl Encode for GetSystemRestartCause {
    fn encode(&self, _: &mut Writer) {}
}

impl Command for GetSystemRestartCause {
    const CODE: CommandCode = commands::GET_SYSTEM_RESTART_CAUSE;
    type Output = RestartCause;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartCause {
    pub cause: u8,
    pub channel: u8,
}

impl RestartCause {
    pub fn description(&self) -> &'static str {
        match self.cause & 0x0F {
            0 => "unknown",
            1 => "chassis control command",
            2 => "reset via pushbutton",
            3 => "power-up via power pushbutton",
            4 => "watchdog expiration",
            5 => "OEM",
            6 => "automatic power-up on AC (always restore)",
            7 => "automatic power-up on AC (restore previous state)",
            8 => "reset via PEF",
            9 => "power-cycle via PEF",
            10 => "soft reset",
            11 => "power-up via RTC wakeup",
            _ => "reserved",
        }
    }
}

impl Decode for RestartCause {
    fn decode(r: &mut Reader<'_>) -> Self {
        Self {
            cause: r.read_u8(),
            channel: r.read_u8(),
        }
    }
}

/// Get POH (power-on hours) Counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetPohCounter;

impl Encode for GetPohCounter {
    fn encode(&self, _: &mut Writer) {}
}

impl Command for GetPohCounter {
    const CODE: CommandCode = commands::GET_POH_COUNTER;
    type Output = PohCounter;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PohCounter {
    pub minutes_per_count: u8,
    pub counter: u32,
}

impl PohCounter {
    pub fn hours(&self) -> u64 {
        self.counter as u64 * self.minutes_per_count as u64 / 60
    }
}

impl Decode for PohCounter {
    fn decode(r: &mut Reader<'_>) -> Self {
        Self {
            minutes_per_count: r.read_u8(),
            counter: r.read_u32(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::from_bytes;

    #[test]
    fn chassis_status_bits() {
        // Power on (bit 0), restore policy "restore" (bits 5-6 = 01),
        // last event: power down by fault; fan fault.
        let status = from_bytes::<ChassisStatus>(&[0x21, 0x08, 0x48]).unwrap();
        assert!(status.power_on());
        assert!(!status.power_overload());
        assert_eq!(status.power_restore_policy(), PowerRestorePolicy::Restore);
        assert!(status.last_event_power_down_by_fault());
        assert!(!status.last_event_power_on_via_ipmi());
        assert!(status.fan_fault());
        assert!(status.identify_supported());
        assert_eq!(status.front_panel, None);

        let status = from_bytes::<ChassisStatus>(&[0x01, 0x00, 0x00, 0x0F]).unwrap();
        assert_eq!(status.front_panel, Some(0x0F));
    }

    #[test]
    fn capabilities_with_and_without_bridge() {
        let caps = from_bytes::<ChassisCapabilities>(&[0x0F, 0x20, 0x20, 0x20, 0x20]).unwrap();
        assert!(caps.power_interlock());
        assert!(caps.intrusion_sensor());
        assert_eq!(caps.bridge_device_address, None);

        let caps =
            from_bytes::<ChassisCapabilities>(&[0x00, 0x20, 0x20, 0x20, 0x20, 0x22]).unwrap();
        assert_eq!(caps.bridge_device_address, Some(0x22));
    }

    #[test]
    fn control_actions_parse() {
        assert_eq!(
            "cycle".parse::<ChassisControlAction>().unwrap(),
            ChassisControlAction::PowerCycle
        );
        assert_eq!(ChassisControlAction::SoftShutdown.value(), 5);
        assert!("blink".parse::<ChassisControlAction>().is_err());
    }

    #[test]
    fn restart_cause_describes_itself() {
        let cause = from_bytes::<RestartCause>(&[0x04, 0x01]).unwrap();
        assert_eq!(cause.description(), "watchdog expiration");
    }

    #[test]
    fn poh_counter_converts_to_hours() {
        let poh = from_bytes::<PohCounter>(&[60, 0x78, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(poh.counter, 120);
        assert_eq!(poh.hours(), 120);
    }
}
