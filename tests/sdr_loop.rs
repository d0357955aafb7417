//! The SDR reassembly loop against a scripted transport: block windows,
//! the partial-read rejection path, and reservation recovery.

use std::collections::VecDeque;

use ipmi_lan::commands::{self, CommandCode, CompletionCode};
use ipmi_lan::conn::{RawResponse, Transport};
use ipmi_lan::storage::sdr::record::Record;
use ipmi_lan::{Client, Error};

/// One expected exchange: the command we expect, an optional check on the
/// request payload, and the completion code plus data to answer with.
struct Step {
    expect: CommandCode,
    check: Option<Box<dyn Fn(&[u8]) + Send>>,
    code: CompletionCode,
    data: Vec<u8>,
}

impl Step {
    fn ok(expect: CommandCode, data: Vec<u8>) -> Self {
        Self {
            expect,
            check: None,
            code: CompletionCode::SUCCESS,
            data,
        }
    }

    fn fail(expect: CommandCode, code: CompletionCode, data: Vec<u8>) -> Self {
        Self {
            expect,
            check: None,
            code,
            data,
        }
    }

    fn checked(mut self, check: impl Fn(&[u8]) + Send + 'static) -> Self {
        self.check = Some(Box::new(check));
        self
    }
}

struct Scripted {
    steps: VecDeque<Step>,
}

impl Scripted {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
        }
    }

    fn finished(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Transport for Scripted {
    fn open(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn is_open(&self) -> bool {
        true
    }

    fn send_recv(&mut self, code: CommandCode, data: &[u8]) -> Result<RawResponse, Error> {
        let step = self
            .steps
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected command {}", code.name));
        assert_eq!(code, step.expect, "wrong command {}", code.name);
        if let Some(check) = &step.check {
            check(data);
        }

        Ok(RawResponse {
            net_fn: code.net_fn.response_value(),
            cmd: code.code,
            code: step.code,
            data: step.data,
        })
    }
}

/// A complete 12-byte OEM record: five header bytes, a manufacturer id and
/// four payload bytes.
fn oem_record(record_id: u16) -> Vec<u8> {
    let mut data = vec![0u8; 12];
    data[..2].copy_from_slice(&record_id.to_le_bytes());
    data[2] = 0x51;
    data[3] = 0xC0;
    data[4] = 7;
    data[5..8].copy_from_slice(&[0x57, 0x01, 0x00]);
    data[8..].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    data
}

fn sdr_reply(next_record_id: u16, block: &[u8]) -> Vec<u8> {
    let mut data = next_record_id.to_le_bytes().to_vec();
    data.extend_from_slice(block);
    data
}

#[test]
fn partial_read_rejection_keeps_the_cursor() {
    // A 34-byte record served 16 + 16 bytes, then refused: the loop must
    // give up on the record but follow next_record_id to a readable one.
    let mut big_record = vec![0x01, 0x00, 0x51, 0x01, 29];
    big_record.extend_from_slice(&[0u8; 29]);
    assert_eq!(big_record.len(), 34);

    let steps = vec![
        Step::ok(commands::RESERVE_SDR_REPOSITORY, vec![0x34, 0x12]),
        Step::ok(commands::GET_SDR, sdr_reply(0x000A, &big_record[..16])).checked(|req| {
            // reservation, record id 0, offset 0, window 16
            assert_eq!(req, [0x34, 0x12, 0x00, 0x00, 0, 16]);
        }),
        Step::ok(commands::GET_SDR, sdr_reply(0x000A, &big_record[16..32])).checked(|req| {
            assert_eq!(req, [0x34, 0x12, 0x00, 0x00, 16, 16]);
        }),
        Step::fail(
            commands::GET_SDR,
            CompletionCode::RESPONSE_UNAVAILABLE,
            sdr_reply(0x000A, &[]),
        )
        .checked(|req| {
            // Only the two missing bytes are requested.
            assert_eq!(req, [0x34, 0x12, 0x00, 0x00, 32, 2]);
        }),
        Step::ok(commands::GET_SDR, sdr_reply(0xFFFF, &oem_record(0x000A))).checked(|req| {
            assert_eq!(req, [0x34, 0x12, 0x0A, 0x00, 0, 16]);
        }),
    ];

    let mut client = Client::new(Scripted::new(steps));
    let records = client.list_sdr().unwrap();

    assert_eq!(records.len(), 1);
    match &records[0] {
        Record::Oem(oem) => {
            assert_eq!(oem.header.record_id, 0x000A);
            assert_eq!(oem.manufacturer_id, 0x157);
            assert_eq!(oem.data, [0xDE, 0xAD, 0xBE, 0xEF]);
        }
        other => panic!("wrong record kind {}", other.kind()),
    }

    assert!(client.release().finished());
}

#[test]
fn cancelled_reservation_is_reacquired() {
    let record = oem_record(0x0001);

    let steps = vec![
        Step::ok(commands::RESERVE_SDR_REPOSITORY, vec![0x11, 0x11]),
        Step::fail(
            commands::GET_SDR,
            CompletionCode::RESERVATION_CANCELLED,
            Vec::new(),
        )
        .checked(|req| {
            assert_eq!(&req[..2], [0x11, 0x11]);
        }),
        Step::ok(commands::RESERVE_SDR_REPOSITORY, vec![0x22, 0x22]),
        Step::ok(commands::GET_SDR, sdr_reply(0xFFFF, &record)).checked(|req| {
            // The read restarts from offset zero under the new reservation.
            assert_eq!(req, [0x22, 0x22, 0x01, 0x00, 0, 16]);
        }),
    ];

    let mut client = Client::new(Scripted::new(steps));
    let records = client.list_sdr().unwrap();

    assert_eq!(records.len(), 1);
    assert!(client.release().finished());
}

#[test]
fn multi_record_iteration_follows_next_ids() {
    let steps = vec![
        Step::ok(commands::RESERVE_SDR_REPOSITORY, vec![0x01, 0x00]),
        Step::ok(commands::GET_SDR, sdr_reply(0x0002, &oem_record(0x0001))),
        Step::ok(commands::GET_SDR, sdr_reply(0x0003, &oem_record(0x0002))),
        Step::ok(commands::GET_SDR, sdr_reply(0xFFFF, &oem_record(0x0003))),
    ];

    let mut client = Client::new(Scripted::new(steps));
    let records = client.list_sdr().unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].header().record_id, 0x0001);
    assert_eq!(records[2].header().record_id, 0x0003);
}

#[test]
fn sdr_iterator_yields_the_same_records() {
    let steps = vec![
        Step::ok(commands::RESERVE_SDR_REPOSITORY, vec![0x01, 0x00]),
        Step::ok(commands::GET_SDR, sdr_reply(0x0002, &oem_record(0x0001))),
        Step::ok(commands::GET_SDR, sdr_reply(0xFFFF, &oem_record(0x0002))),
    ];

    let mut client = Client::new(Scripted::new(steps));
    let records: Vec<_> = client
        .sdrs()
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(records.len(), 2);
}

#[test]
fn unrelated_bmc_errors_abort_the_listing() {
    let steps = vec![
        Step::ok(commands::RESERVE_SDR_REPOSITORY, vec![0x01, 0x00]),
        Step::fail(
            commands::GET_SDR,
            CompletionCode::INSUFFICIENT_PRIVILEGE,
            Vec::new(),
        ),
    ];

    let mut client = Client::new(Scripted::new(steps));
    let err = client.list_sdr().unwrap_err();
    assert_eq!(
        err.completion_code(),
        Some(CompletionCode::INSUFFICIENT_PRIVILEGE)
    );
}

#[test]
fn sel_entries_assemble_from_fixed_blocks() {
    use ipmi_lan::storage::sel::SelEntry;

    let entry = {
        let mut data = vec![0x2A, 0x00, 0x02];
        data.extend_from_slice(&[0x80, 0x33, 0x21, 0x63]);
        data.extend_from_slice(&[0x20, 0x00, 0x04, 0x01, 0x0D, 0x01, 0x57, 0x00, 0x00]);
        assert_eq!(data.len(), 16);
        data
    };

    let steps = vec![
        Step::ok(commands::RESERVE_SEL, vec![0x01, 0x00]),
        Step::ok(commands::GET_SEL_ENTRY, sdr_reply(0xFFFF, &entry)).checked(|req| {
            assert_eq!(req, [0x01, 0x00, 0x00, 0x00, 0, 16]);
        }),
    ];

    let mut client = Client::new(Scripted::new(steps));
    let entries = client.list_sel().unwrap();

    assert_eq!(entries.len(), 1);
    match &entries[0] {
        SelEntry::System(event) => {
            assert_eq!(event.record_id, 0x2A);
            assert_eq!(event.sensor_number, 0x0D);
        }
        other => panic!("wrong entry kind {other:?}"),
    }
}

#[test]
fn sensor_reading_converts_through_the_record() {
    use ipmi_lan::storage::sdr::record::FullSensorRecord;
    use ipmi_lan::wire::{Decode, Reader};

    // A linear temperature record with M = 1.
    let mut record_data = vec![
        0x0F, 0x00, 0x51, 0x01, 0x3B, 0x20, 0x00, 0x0D, 0x27, 0x01, 0x23, 0x49, 0x01, 0x01,
        0x00, 0x0A, 0x00, 0x60, 0x30, 0x00, 0x00, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x7F, 0x81, 0x2D, 0x29, 0x27, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0xC6,
    ];
    record_data.extend_from_slice(b"Temp 1");
    record_data.extend_from_slice(&[0u8; 10]);

    let mut r = Reader::new(&record_data);
    let record = FullSensorRecord::decode(&mut r);
    r.finish().unwrap();

    let steps = vec![Step::ok(
        commands::GET_SENSOR_READING,
        vec![0x18, 0xC0, 0x00],
    )
    .checked(|req| {
        assert_eq!(req, [0x0D]);
    })];

    let mut client = Client::new(Scripted::new(steps));
    let value = client.read_sensor(&record).unwrap();
    assert_eq!(value, 24.0);

    // The unavailable flag turns into its own error.
    let steps = vec![Step::ok(
        commands::GET_SENSOR_READING,
        vec![0x00, 0x20, 0x00],
    )];
    let mut client = Client::new(Scripted::new(steps));
    assert!(matches!(
        client.read_sensor(&record),
        Err(Error::ReadingUnavailable)
    ));
}
