//! ipmi-lan: an IPMI v1.5 / v2.0 (RMCP+) client over UDP.
//!
//! The crate splits into command serialisation ([`app`], [`chassis`],
//! [`sensor`], [`storage`]), the wire framing underneath it ([`proto`],
//! [`crypto`], [`wire`]), and the session transports ([`conn`]). [`Client`]
//! ties a transport to the high-level operations: listing the SDR
//! repository, walking the event log, and converting sensor readings.

pub mod app;
pub mod chassis;
pub mod commands;
pub mod conn;
pub mod crypto;
pub mod proto;
pub mod sensor;
pub mod storage;
pub mod wire;

mod error;
pub use error::{Error, ProtocolError, SecurityError};

mod fmt;
pub use fmt::{LogItem, LogOutput, Loggable, Logger};

use conn::{AnyTransport, Command, ConnectionOptions, Transport};
use sensor::GetSensorReading;
use storage::sdr::record::{FullSensorRecord, Record};
use storage::sdr::{self, GetSdr, RecordAccumulator, ReserveSdrRepository};
use storage::sel::{self, GetSelEntry, ReserveSel, SelEntry};
use storage::ReservationId;

/// Rounds of Get-SDR the reassembly loop will spend on a single record
/// before giving up on a BMC that never completes it.
const MAX_READ_ROUNDS: usize = 200;

/// A connected IPMI client.
pub struct Client<T = AnyTransport> {
    transport: T,
}

impl Client<AnyTransport> {
    /// Build a transport for `options` and open the session.
    pub fn connect(options: ConnectionOptions) -> Result<Self, Error> {
        let mut transport = conn::connect(options)?;
        transport.open()?;
        Ok(Self { transport })
    }
}

impl<T: Transport> Client<T> {
    /// Wrap an already-open transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn release(self) -> T {
        self.transport
    }

    pub fn close(&mut self) -> Result<(), Error> {
        self.transport.close()
    }

    /// Round-trip one typed command.
    pub fn exec<C: Command>(&mut self, request: &C) -> Result<C::Output, Error> {
        self.transport.exec(request)
    }

    pub fn device_id(&mut self) -> Result<app::DeviceId, Error> {
        self.exec(&app::GetDeviceId)
    }

    pub fn device_guid(&mut self) -> Result<app::DeviceGuid, Error> {
        self.exec(&app::GetDeviceGuid)
    }

    pub fn self_test_results(&mut self) -> Result<app::SelfTestResults, Error> {
        self.exec(&app::GetSelfTestResults)
    }

    pub fn acpi_power_state(&mut self) -> Result<app::AcpiPowerState, Error> {
        self.exec(&app::GetAcpiPowerState)
    }

    pub fn chassis_status(&mut self) -> Result<chassis::ChassisStatus, Error> {
        self.exec(&chassis::GetChassisStatus)
    }

    pub fn chassis_capabilities(&mut self) -> Result<chassis::ChassisCapabilities, Error> {
        self.exec(&chassis::GetChassisCapabilities)
    }

    pub fn chassis_control(&mut self, action: chassis::ChassisControlAction) -> Result<(), Error> {
        self.exec(&chassis::ChassisControl { action })
    }

    pub fn restart_cause(&mut self) -> Result<chassis::RestartCause, Error> {
        self.exec(&chassis::GetSystemRestartCause)
    }

    pub fn sdr_repository_info(&mut self) -> Result<sdr::SdrRepositoryInfo, Error> {
        self.exec(&sdr::GetSdrRepositoryInfo)
    }

    pub fn reserve_sdr_repository(&mut self) -> Result<ReservationId, Error> {
        self.exec(&ReserveSdrRepository)
    }

    pub fn sel_info(&mut self) -> Result<sel::SelInfo, Error> {
        self.exec(&sel::GetSelInfo)
    }

    pub fn reserve_sel(&mut self) -> Result<ReservationId, Error> {
        self.exec(&ReserveSel)
    }

    /// Read and decode every record in the SDR repository.
    pub fn list_sdr(&mut self) -> Result<Vec<Record>, Error> {
        let mut reservation = self.reserve_sdr_repository()?;
        let mut records = Vec::new();
        let mut record_id = sdr::FIRST_RECORD_ID;

        while record_id != sdr::LAST_RECORD_ID {
            let (record, next_id) = self.read_sdr_record(&mut reservation, record_id)?;
            if let Some(record) = record {
                records.push(record);
            }

            if next_id == record_id {
                log::error!("SDR repository repeats record 0x{record_id:04X}, stopping");
                break;
            }
            record_id = next_id;
        }

        Ok(records)
    }

    /// Iterate the SDR repository record by record.
    pub fn sdrs(&mut self) -> Result<SdrIter<'_, T>, Error> {
        let reservation = self.reserve_sdr_repository()?;
        Ok(SdrIter {
            client: self,
            reservation,
            next_id: Some(sdr::FIRST_RECORD_ID),
        })
    }

    /// Assemble one record through the fixed-size command window.
    ///
    /// Returns the decoded record (when the BMC served any bytes) and the id
    /// of the next record. A request-rejected completion code ends the read
    /// early but still carries the next id; a cancelled reservation is
    /// re-acquired and the record restarted.
    fn read_sdr_record(
        &mut self,
        reservation: &mut ReservationId,
        record_id: u16,
    ) -> Result<(Option<Record>, u16), Error> {
        let mut acc = RecordAccumulator::new();
        let mut offset = 0u8;
        let next_id;

        let mut round = 0;
        loop {
            let request = GetSdr {
                reservation: *reservation,
                record_id,
                offset,
                count: acc.next_window(),
            };

            match self.exec(&request) {
                Ok(block) => {
                    offset = offset.wrapping_add(block.data.len() as u8);
                    acc.extend(&block.data);

                    if acc.is_complete() || round > MAX_READ_ROUNDS {
                        next_id = block.next_record_id;
                        break;
                    }
                }
                Err(Error::Command { code, data, .. })
                    if code.is_request_rejected() && data.len() >= 2 =>
                {
                    // The BMC refused the partial read but the reply still
                    // carries the cursor.
                    next_id = u16::from_le_bytes([data[0], data[1]]);
                    break;
                }
                Err(e) if e.is_reservation_cancelled() => {
                    log::debug!("SDR reservation cancelled, re-reserving");
                    *reservation = self.reserve_sdr_repository()?;
                    acc.clear();
                    offset = 0;
                }
                Err(e) => return Err(e),
            }

            round += 1;
        }

        let record = if acc.is_empty() {
            None
        } else {
            match Record::parse(acc.bytes()) {
                Ok(record) => Some(record),
                Err(e) => {
                    // The cursor is still valid; skip what we cannot decode.
                    log::warn!("skipping SDR record 0x{record_id:04X}: {e}");
                    None
                }
            }
        };

        Ok((record, next_id))
    }

    /// Read and decode every entry in the system event log.
    pub fn list_sel(&mut self) -> Result<Vec<SelEntry>, Error> {
        let mut reservation = self.reserve_sel()?;
        let mut entries = Vec::new();
        let mut record_id = sel::FIRST_ENTRY_ID;

        while record_id != sel::LAST_ENTRY_ID {
            let mut data = Vec::with_capacity(sel::ENTRY_LEN);
            let mut offset = 0u8;
            let next_id;

            let mut round = 0;
            loop {
                let request = GetSelEntry {
                    reservation,
                    record_id,
                    offset,
                    count: sdr::BLOCK_LEN.min((sel::ENTRY_LEN - data.len()) as u8),
                };

                match self.exec(&request) {
                    Ok(block) => {
                        offset = offset.wrapping_add(block.data.len() as u8);
                        data.extend_from_slice(&block.data);

                        if data.len() >= sel::ENTRY_LEN || round > MAX_READ_ROUNDS {
                            next_id = block.next_record_id;
                            break;
                        }
                    }
                    Err(e) if e.is_reservation_cancelled() => {
                        log::debug!("SEL reservation cancelled, re-reserving");
                        reservation = self.reserve_sel()?;
                        data.clear();
                        offset = 0;
                    }
                    Err(e) => return Err(e),
                }

                round += 1;
            }

            if !data.is_empty() {
                entries.push(SelEntry::parse(&data)?);
            }

            if next_id == record_id {
                log::error!("SEL repeats record 0x{record_id:04X}, stopping");
                break;
            }
            record_id = next_id;
        }

        Ok(entries)
    }

    /// Read one sensor and convert it through its record's factors.
    pub fn read_sensor(&mut self, record: &FullSensorRecord) -> Result<f64, Error> {
        let reading = self.exec(&GetSensorReading {
            number: record.key.sensor_number.get(),
        })?;

        if record.can_ignore() && reading.scanning_disabled() {
            return Err(Error::IgnoredSensor);
        }
        if reading.reading_unavailable() {
            return Err(Error::ReadingUnavailable);
        }

        record.calc(reading.reading as i32, 8)
    }
}

/// Iterator over SDR records, re-reserving and reassembling as it goes.
pub struct SdrIter<'a, T: Transport> {
    client: &'a mut Client<T>,
    reservation: ReservationId,
    next_id: Option<u16>,
}

impl<T: Transport> Iterator for SdrIter<'_, T> {
    type Item = Result<Record, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let current = self.next_id.take()?;
            if current == sdr::LAST_RECORD_ID {
                return None;
            }

            match self
                .client
                .read_sdr_record(&mut self.reservation, current)
            {
                Ok((record, next_id)) => {
                    if next_id != current {
                        self.next_id = Some(next_id);
                    } else {
                        log::error!("SDR repository repeats record 0x{current:04X}, stopping");
                    }

                    match record {
                        Some(record) => return Some(Ok(record)),
                        None => continue,
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

// Log rendering for the structures the CLI prints.

impl Loggable for app::DeviceId {
    fn as_log(&self) -> Vec<LogItem> {
        vec![
            LogItem::title(0, "Device ID"),
            (1, "Device ID", format!("0x{:02X}", self.device_id)).into(),
            (1, "Revision", format!("0x{:02X}", self.device_revision)).into(),
            (1, "Firmware", self.firmware_revision()).into(),
            (1, "IPMI version", self.ipmi_version_string()).into(),
            (1, "Manufacturer", format!("0x{:06X}", self.manufacturer_id)).into(),
            (1, "Product", format!("0x{:04X}", self.product_id)).into(),
        ]
    }
}

impl Loggable for chassis::ChassisStatus {
    fn as_log(&self) -> Vec<LogItem> {
        vec![
            LogItem::title(0, "Chassis status"),
            (1, "Power", if self.power_on() { "on" } else { "off" }).into(),
            (1, "Restore policy", self.power_restore_policy()).into(),
            (1, "Power fault", self.power_fault()).into(),
            (1, "Power overload", self.power_overload()).into(),
            (1, "Interlock", self.interlock()).into(),
            (1, "Fan fault", self.fan_fault()).into(),
            (1, "Drive fault", self.drive_fault()).into(),
            (1, "Intrusion", self.intrusion_active()).into(),
        ]
    }
}

impl Loggable for sdr::SdrRepositoryInfo {
    fn as_log(&self) -> Vec<LogItem> {
        vec![
            LogItem::title(0, "SDR repository"),
            (1, "Version", self.version_string()).into(),
            (1, "Records", self.record_count).into(),
            (1, "Free space", format!("{} bytes", self.free_space)).into(),
        ]
    }
}

impl Loggable for sel::SelInfo {
    fn as_log(&self) -> Vec<LogItem> {
        vec![
            LogItem::title(0, "System event log"),
            (1, "Version", self.version_string()).into(),
            (1, "Entries", self.entries).into(),
            (1, "Free space", format!("{} bytes", self.free_space)).into(),
            (1, "Overflowed", self.overflowed()).into(),
        ]
    }
}

impl Loggable for Record {
    fn as_log(&self) -> Vec<LogItem> {
        let header = self.header();
        let mut items = vec![
            LogItem::title(0, format!("SDR record ({})", self.kind())),
            (1, "Record ID", format!("0x{:04X}", header.record_id)).into(),
            (
                1,
                "SDR version",
                format!("{}.{}", header.version_major(), header.version_minor()),
            )
                .into(),
        ];

        if let Some(id) = self.id_string() {
            items.push((1, "Name", id).into());
        }
        if let Some(number) = self.sensor_number() {
            items.push((1, "Sensor number", number.get()).into());
        }
        if let Some(full) = self.full_sensor() {
            items.push((1, "Sensor type", format!("0x{:02X}", full.sensor_type)).into());
            items.push((1, "Entity", format!("0x{:02X}", full.entity_id)).into());
        }

        items
    }
}

impl Loggable for SelEntry {
    fn as_log(&self) -> Vec<LogItem> {
        let mut items = vec![
            LogItem::title(0, "SEL entry"),
            (1, "Record ID", format!("0x{:04X}", self.record_id())).into(),
        ];

        match self {
            SelEntry::System(event) => {
                items.push((1, "Kind", "system event").into());
                #[cfg(feature = "time")]
                items.push((1, "Time", sel::timestamp_string(event.timestamp)).into());
                items.push((1, "Sensor type", format!("0x{:02X}", event.sensor_type)).into());
                items.push((1, "Sensor number", event.sensor_number).into());
                items.push((
                    1,
                    "Event",
                    format!(
                        "type 0x{:02X} {}",
                        event.event_type,
                        if event.is_assertion {
                            "asserted"
                        } else {
                            "deasserted"
                        }
                    ),
                )
                    .into());
            }
            SelEntry::OemTimestamped {
                manufacturer_id, ..
            } => {
                items.push((1, "Kind", "OEM timestamped").into());
                items.push((1, "Manufacturer", format!("0x{manufacturer_id:06X}")).into());
            }
            SelEntry::OemRaw { record_type, .. } => {
                items.push((1, "Kind", format!("OEM 0x{record_type:02X}")).into());
            }
        }

        items
    }
}
