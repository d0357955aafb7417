//! The command catalog: network functions, privilege levels, completion
//! codes, and a stable identifier for every command this crate speaks.

use std::str::FromStr;

/// The 6-bit namespace an IPMI command lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetFn {
    Chassis,
    Bridge,
    SensorEvent,
    App,
    Firmware,
    Storage,
    Transport,
    GroupExtension,
    Unknown(u8),
}

impl NetFn {
    /// The even (request) value for this network function.
    pub fn request_value(&self) -> u8 {
        match self {
            NetFn::Chassis => 0x00,
            NetFn::Bridge => 0x02,
            NetFn::SensorEvent => 0x04,
            NetFn::App => 0x06,
            NetFn::Firmware => 0x08,
            NetFn::Storage => 0x0A,
            NetFn::Transport => 0x0C,
            NetFn::GroupExtension => 0x2C,
            NetFn::Unknown(v) => v & !1,
        }
    }

    /// The odd (response) value for this network function.
    pub fn response_value(&self) -> u8 {
        self.request_value() | 1
    }
}

impl From<u8> for NetFn {
    fn from(value: u8) -> Self {
        match value & !1 {
            0x00 => Self::Chassis,
            0x02 => Self::Bridge,
            0x04 => Self::SensorEvent,
            0x06 => Self::App,
            0x08 => Self::Firmware,
            0x0A => Self::Storage,
            0x0C => Self::Transport,
            0x2C => Self::GroupExtension,
            v => Self::Unknown(v),
        }
    }
}

/// An IPMI privilege level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrivilegeLevel {
    None,
    Callback,
    User,
    Operator,
    Administrator,
    Oem,
}

impl PrivilegeLevel {
    pub fn value(&self) -> u8 {
        match self {
            PrivilegeLevel::None => 0,
            PrivilegeLevel::Callback => 1,
            PrivilegeLevel::User => 2,
            PrivilegeLevel::Operator => 3,
            PrivilegeLevel::Administrator => 4,
            PrivilegeLevel::Oem => 5,
        }
    }
}

impl From<PrivilegeLevel> for u8 {
    fn from(value: PrivilegeLevel) -> Self {
        value.value()
    }
}

impl TryFrom<u8> for PrivilegeLevel {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        let level = match value & 0x0F {
            0 => Self::None,
            1 => Self::Callback,
            2 => Self::User,
            3 => Self::Operator,
            4 => Self::Administrator,
            5 => Self::Oem,
            _ => return Err(()),
        };
        Ok(level)
    }
}

impl FromStr for PrivilegeLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.to_ascii_lowercase().as_str() {
            "" | "none" => Self::None,
            "callback" => Self::Callback,
            "user" => Self::User,
            "operator" => Self::Operator,
            "administrator" => Self::Administrator,
            "oem" => Self::Oem,
            other => return Err(format!("{other} is not a privilege level")),
        };
        Ok(level)
    }
}

impl core::fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            PrivilegeLevel::None => "none",
            PrivilegeLevel::Callback => "callback",
            PrivilegeLevel::User => "user",
            PrivilegeLevel::Operator => "operator",
            PrivilegeLevel::Administrator => "administrator",
            PrivilegeLevel::Oem => "oem",
        };
        f.write_str(name)
    }
}

/// The one-byte status carried in every IPMI response.
///
/// Non-zero values pass through to callers unchanged; [`Self::description`]
/// supplies a human message for the well-known ones.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CompletionCode(pub u8);

impl CompletionCode {
    pub const SUCCESS: Self = Self(0x00);
    pub const NODE_BUSY: Self = Self(0xC0);
    pub const INVALID_COMMAND: Self = Self(0xC1);
    pub const TIMEOUT: Self = Self(0xC3);
    pub const OUT_OF_SPACE: Self = Self(0xC4);
    pub const RESERVATION_CANCELLED: Self = Self(0xC5);
    pub const REQUEST_DATA_TRUNCATED: Self = Self(0xC6);
    pub const CANNOT_RETURN_REQUESTED_BYTES: Self = Self(0xCA);
    pub const REQUESTED_DATA_NOT_PRESENT: Self = Self(0xCB);
    pub const INVALID_DATA_FIELD: Self = Self(0xCC);
    pub const RESPONSE_UNAVAILABLE: Self = Self(0xCE);
    pub const INSUFFICIENT_PRIVILEGE: Self = Self(0xD4);
    pub const UNSPECIFIED: Self = Self(0xFF);

    pub fn is_success(&self) -> bool {
        self.0 == 0
    }

    /// A partial-read rejection: the command's cursor fields are still
    /// valid, but no further bytes will be served for this record.
    pub fn is_request_rejected(&self) -> bool {
        *self == Self::RESPONSE_UNAVAILABLE
    }

    pub fn is_reservation_cancelled(&self) -> bool {
        *self == Self::RESERVATION_CANCELLED
    }

    pub fn description(&self) -> &'static str {
        match self.0 {
            0x00 => "command completed normally",
            0xC0 => "node busy",
            0xC1 => "invalid command",
            0xC2 => "command invalid for given LUN",
            0xC3 => "timeout while processing command",
            0xC4 => "out of space",
            0xC5 => "reservation cancelled or invalid reservation id",
            0xC6 => "request data truncated",
            0xC7 => "request data length invalid",
            0xC8 => "request data field length limit exceeded",
            0xC9 => "parameter out of range",
            0xCA => "cannot return number of requested data bytes",
            0xCB => "requested sensor, data, or record not present",
            0xCC => "invalid data field in request",
            0xCD => "command illegal for specified sensor or record type",
            0xCE => "command response could not be provided",
            0xCF => "cannot execute duplicated request",
            0xD0 => "response unavailable, SDR repository in update mode",
            0xD1 => "response unavailable, device in firmware update mode",
            0xD2 => "response unavailable, BMC initialization in progress",
            0xD3 => "destination unavailable",
            0xD4 => "insufficient privilege level",
            0xD5 => "command not supported in present state",
            0xD6 => "sub-function disabled or unavailable",
            0xFF => "unspecified error",
            _ => "non-standard completion code",
        }
    }
}

impl core::fmt::Debug for CompletionCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "CompletionCode(0x{:02X})", self.0)
    }
}

impl core::fmt::Display for CompletionCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:02X} ({})", self.0, self.description())
    }
}

/// A stable identifier for one command: where it lives, its code, and the
/// minimum privilege level it requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandCode {
    pub name: &'static str,
    pub net_fn: NetFn,
    pub code: u8,
    pub privilege: PrivilegeLevel,
}

impl CommandCode {
    pub const fn new(
        name: &'static str,
        net_fn: NetFn,
        code: u8,
        privilege: PrivilegeLevel,
    ) -> Self {
        Self {
            name,
            net_fn,
            code,
            privilege,
        }
    }
}

macro_rules! commands {
    ($($(#[$attr:meta])* $konst:ident = ($name:literal, $netfn:ident, $code:literal, $priv:ident);)*) => {
        $(
            $(#[$attr])*
            pub const $konst: CommandCode = CommandCode::new(
                $name,
                NetFn::$netfn,
                $code,
                PrivilegeLevel::$priv,
            );
        )*
    };
}

// IPM device "global" commands.
commands! {
    GET_DEVICE_ID = ("Get Device ID", App, 0x01, User);
    COLD_RESET = ("Cold Reset", App, 0x02, Administrator);
    WARM_RESET = ("Warm Reset", App, 0x03, Administrator);
    GET_SELF_TEST_RESULTS = ("Get Self Test Results", App, 0x04, User);
    SET_ACPI_POWER_STATE = ("Set ACPI Power State", App, 0x06, Administrator);
    GET_ACPI_POWER_STATE = ("Get ACPI Power State", App, 0x07, User);
    GET_DEVICE_GUID = ("Get Device GUID", App, 0x08, User);
}

// Watchdog commands.
commands! {
    RESET_WATCHDOG_TIMER = ("Reset Watchdog Timer", App, 0x22, Operator);
    SET_WATCHDOG_TIMER = ("Set Watchdog Timer", App, 0x24, Operator);
    GET_WATCHDOG_TIMER = ("Get Watchdog Timer", App, 0x25, User);
}

// BMC device and messaging commands.
commands! {
    SET_BMC_GLOBAL_ENABLES = ("Set BMC Global Enables", App, 0x2E, None);
    GET_BMC_GLOBAL_ENABLES = ("Get BMC Global Enables", App, 0x2F, User);
    CLEAR_MESSAGE_FLAGS = ("Clear Message Flags", App, 0x30, None);
    GET_MESSAGE_FLAGS = ("Get Message Flags", App, 0x31, None);
    GET_MESSAGE = ("Get Message", App, 0x33, None);
    SEND_MESSAGE = ("Send Message", App, 0x34, User);
    GET_SYSTEM_GUID = ("Get System GUID", App, 0x37, None);
}

// Session commands.
commands! {
    GET_CHANNEL_AUTHENTICATION_CAPABILITIES =
        ("Get Channel Authentication Capabilities", App, 0x38, None);
    GET_SESSION_CHALLENGE = ("Get Session Challenge", App, 0x39, None);
    ACTIVATE_SESSION = ("Activate Session", App, 0x3A, None);
    SET_SESSION_PRIVILEGE_LEVEL = ("Set Session Privilege Level", App, 0x3B, User);
    CLOSE_SESSION = ("Close Session", App, 0x3C, Callback);
    GET_SESSION_INFO = ("Get Session Info", App, 0x3D, User);
    GET_AUTH_CODE = ("Get AuthCode", App, 0x3F, Operator);
    GET_CHANNEL_ACCESS = ("Get Channel Access", App, 0x41, User);
    GET_CHANNEL_INFO = ("Get Channel Info Command", App, 0x42, User);
    GET_CHANNEL_CIPHER_SUITES = ("Get Channel Cipher Suites", App, 0x54, None);
}

// Chassis device commands.
commands! {
    GET_CHASSIS_CAPABILITIES = ("Get Chassis Capabilities", Chassis, 0x00, User);
    GET_CHASSIS_STATUS = ("Get Chassis Status", Chassis, 0x01, User);
    CHASSIS_CONTROL = ("Chassis Control", Chassis, 0x02, Operator);
    CHASSIS_RESET = ("Chassis Reset", Chassis, 0x03, Operator);
    CHASSIS_IDENTIFY = ("Chassis Identify", Chassis, 0x04, Operator);
    SET_CHASSIS_CAPABILITIES = ("Set Chassis Capabilities", Chassis, 0x05, Administrator);
    SET_POWER_RESTORE_POLICY = ("Set Power Restore Policy", Chassis, 0x06, Operator);
    GET_SYSTEM_RESTART_CAUSE = ("Get System Restart Cause", Chassis, 0x07, User);
    SET_SYSTEM_BOOT_OPTIONS = ("Set System Boot Options", Chassis, 0x08, Operator);
    GET_SYSTEM_BOOT_OPTIONS = ("Get System Boot Options", Chassis, 0x09, Operator);
    GET_POH_COUNTER = ("Get POH Counter", Chassis, 0x0F, User);
}

// Event and sensor device commands.
commands! {
    SET_EVENT_RECEIVER = ("Set Event Receiver", SensorEvent, 0x00, Administrator);
    GET_EVENT_RECEIVER = ("Get Event Receiver", SensorEvent, 0x01, User);
    PLATFORM_EVENT = ("Platform Event", SensorEvent, 0x02, Operator);
    GET_DEVICE_SDR_INFO = ("Get Device SDR Info", SensorEvent, 0x20, User);
    GET_DEVICE_SDR = ("Get Device SDR", SensorEvent, 0x21, User);
    RESERVE_DEVICE_SDR_REPOSITORY =
        ("Reserve Device SDR Repository", SensorEvent, 0x22, User);
    GET_SENSOR_READING_FACTORS = ("Get Sensor Reading Factors", SensorEvent, 0x23, User);
    SET_SENSOR_HYSTERESIS = ("Set Sensor Hysteresis", SensorEvent, 0x24, Operator);
    GET_SENSOR_HYSTERESIS = ("Get Sensor Hysteresis", SensorEvent, 0x25, User);
    SET_SENSOR_THRESHOLDS = ("Set Sensor Thresholds", SensorEvent, 0x26, Operator);
    GET_SENSOR_THRESHOLDS = ("Get Sensor Thresholds", SensorEvent, 0x27, User);
    SET_SENSOR_EVENT_ENABLE = ("Set Sensor Event Enable", SensorEvent, 0x28, Operator);
    GET_SENSOR_EVENT_ENABLE = ("Get Sensor Event Enable", SensorEvent, 0x29, User);
    RE_ARM_SENSOR_EVENTS = ("Re-arm Sensor Events", SensorEvent, 0x2A, Operator);
    GET_SENSOR_EVENT_STATUS = ("Get Sensor Event Status", SensorEvent, 0x2B, User);
    GET_SENSOR_READING = ("Get Sensor Reading", SensorEvent, 0x2D, User);
    GET_SENSOR_TYPE = ("Get Sensor Type", SensorEvent, 0x2F, User);
}

// FRU inventory device commands.
commands! {
    GET_FRU_INVENTORY_AREA_INFO = ("Get FRU Inventory Area Info", Storage, 0x10, User);
    READ_FRU_DATA = ("Read FRU Data", Storage, 0x11, User);
    WRITE_FRU_DATA = ("Write FRU Data", Storage, 0x12, Operator);
}

// SDR repository commands.
commands! {
    GET_SDR_REPOSITORY_INFO = ("Get SDR Repository Info", Storage, 0x20, User);
    GET_SDR_REPOSITORY_ALLOCATION_INFO =
        ("Get SDR Repository Allocation Info", Storage, 0x21, User);
    RESERVE_SDR_REPOSITORY = ("Reserve SDR Repository", Storage, 0x22, User);
    GET_SDR = ("Get SDR", Storage, 0x23, User);
    GET_SDR_REPOSITORY_TIME = ("Get SDR Repository Time", Storage, 0x28, User);
    RUN_INITIALIZATION_AGENT = ("Run Initialization Agent", Storage, 0x2C, Operator);
}

// SEL device commands.
commands! {
    GET_SEL_INFO = ("Get SEL Info", Storage, 0x40, User);
    GET_SEL_ALLOCATION_INFO = ("Get SEL Allocation Info", Storage, 0x41, User);
    RESERVE_SEL = ("Reserve SEL", Storage, 0x42, User);
    GET_SEL_ENTRY = ("Get SEL Entry", Storage, 0x43, User);
    CLEAR_SEL = ("Clear SEL", Storage, 0x47, Operator);
    GET_SEL_TIME = ("Get SEL Time", Storage, 0x48, User);
    SET_SEL_TIME = ("Set SEL Time", Storage, 0x49, Operator);
}

// LAN transport commands.
commands! {
    SET_LAN_CONFIGURATION_PARAMETERS =
        ("Set LAN Configuration Parameters", Transport, 0x01, Administrator);
    GET_LAN_CONFIGURATION_PARAMETERS =
        ("Get LAN Configuration Parameters", Transport, 0x02, Operator);
    GET_IP_UDP_RMCP_STATISTICS = ("Get IP/UDP/RMCP Statistics", Transport, 0x04, User);
}

// Bridge management commands.
commands! {
    GET_BRIDGE_STATE = ("Get Bridge State", Bridge, 0x00, User);
    GET_ICMB_ADDRESS = ("Get ICMB Address", Bridge, 0x02, User);
    GET_BRIDGE_STATISTICS = ("Get Bridge Statistics", Bridge, 0x05, User);
}

// Group extension namespaces.
commands! {
    PICMG_EXTENSION = ("PICMG Non-IPMI Command", GroupExtension, 0x00, None);
    DMTF_EXTENSION = ("DMTF Non-IPMI Command", GroupExtension, 0x01, None);
    DCMI_EXTENSION = ("DCMI Specifications Non-IPMI Command", GroupExtension, 0xDC, None);
}
