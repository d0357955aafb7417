//! The IPMI v2.0 / RMCP+ session transport.
//!
//! State machine: probe authentication capabilities (over v1.5 framing),
//! Open Session, RAKP1 through RAKP4, then raise the privilege level over
//! the now-protected session. Teardown is a best-effort Close-Session.

use crate::app::auth::{
    AuthCapabilities, CloseSession, GetAuthCapabilities, SetSessionPrivilege, CHANNEL_THIS_V2,
};
use crate::commands::{CommandCode, PrivilegeLevel};
use crate::crypto::{
    AuthAlgorithm, ConfidentialityAlgorithm, IntegrityAlgorithm, KeyExchangeInputs,
};
use crate::error::{Error, ProtocolError, SecurityError};
use crate::proto::rakp::{
    OpenSessionRequest, OpenSessionResponse, RakpMessage1, RakpMessage2, RakpMessage3,
    RakpMessage4,
};
use crate::proto::v2_0::{PayloadType, SessionProtection};
use crate::proto::{message, v1_5};
use crate::wire::{from_bytes, to_bytes, Reader};

use super::{Command, ConnectionOptions, RawResponse, Transport, UdpConnection};

/// The name-lookup flag in the RAKP privilege byte: resolve the account by
/// both name and role.
const PRIVILEGE_ROLE_LOOKUP: u8 = 1 << 4;

/// Deterministic replacements for the session's random inputs, installed by
/// replay tests.
#[derive(Default)]
struct Determinism {
    nonce: Option<[u8; 16]>,
    session_id: Option<u32>,
    iv: Option<[u8; 16]>,
}

pub struct LanPlus {
    options: ConnectionOptions,
    socket: Option<UdpConnection>,
    active: bool,

    privilege: u8,
    role_lookup_only: bool,
    username: Vec<u8>,
    password: Vec<u8>,

    authentication: AuthAlgorithm,
    integrity: IntegrityAlgorithm,
    confidentiality: ConfidentialityAlgorithm,

    local_session_id: u32,
    bmc_session_id: u32,
    local_nonce: [u8; 16],
    remote_nonce: [u8; 16],
    remote_guid: [u8; 16],

    protection: SessionProtection,
    sequence: u32,
    rq_seq: u8,

    determinism: Determinism,
}

impl LanPlus {
    pub fn new(options: ConnectionOptions) -> Result<Self, Error> {
        if options.username.len() > 16 {
            return Err(SecurityError::UsernameTooLong.into());
        }
        if options.password.len() > 20 {
            return Err(SecurityError::PasswordTooLong.into());
        }

        // RAKP cannot sign anything without an authentication algorithm.
        let authentication = if options.authentication == AuthAlgorithm::None {
            AuthAlgorithm::HmacSha1
        } else {
            options.authentication
        };

        let privilege = options.effective_privilege().value();
        let username = options.username.clone().into_bytes();
        let password = options.password.clone().into_bytes();
        let integrity = options.integrity;
        let confidentiality = options.confidentiality;

        Ok(Self {
            options,
            socket: None,
            active: false,
            privilege,
            role_lookup_only: true,
            username,
            password,
            authentication,
            integrity,
            confidentiality,
            local_session_id: 0,
            bmc_session_id: 0,
            local_nonce: [0; 16],
            remote_nonce: [0; 16],
            remote_guid: [0; 16],
            protection: SessionProtection::plaintext(),
            sequence: 2,
            rq_seq: 0,
            determinism: Determinism::default(),
        })
    }

    /// Pin the RAKP nonce, the proposed session id and the per-packet IV
    /// for replay tests.
    pub fn set_deterministic(&mut self, nonce: [u8; 16], session_id: u32, iv: [u8; 16]) {
        self.determinism = Determinism {
            nonce: Some(nonce),
            session_id: Some(session_id),
            iv: Some(iv),
        };
    }

    /// The privilege byte RAKP messages carry, including the lookup flag.
    fn rakp_privilege(&self) -> u8 {
        if self.role_lookup_only {
            self.privilege | PRIVILEGE_ROLE_LOOKUP
        } else {
            self.privilege
        }
    }

    fn socket(&self) -> Result<&UdpConnection, Error> {
        self.socket.as_ref().ok_or(Error::Timeout)
    }

    fn next_sequence(&mut self) -> u32 {
        self.sequence = self.sequence.wrapping_add(1);
        self.sequence
    }

    fn next_rq_seq(&mut self) -> u8 {
        self.rq_seq = self.rq_seq.wrapping_add(1);
        self.rq_seq << 2
    }

    /// Send one handshake payload and receive its reply, both outside the
    /// session (id and sequence zero, no protection).
    fn handshake(
        &mut self,
        send_ty: PayloadType,
        payload: &[u8],
        recv_ty: PayloadType,
    ) -> Result<Vec<u8>, Error> {
        let packet = self.protection.encode_packet(send_ty, 0, 0, payload)?;
        self.socket()?.send(&packet)?;

        let reply = self.socket()?.recv()?;
        let packet = self.protection.decode_packet(&reply, recv_ty)?;
        Ok(packet.payload)
    }

    /// The capability probe rides on v1.5 framing even for RMCP+.
    fn get_auth_capabilities(&mut self) -> Result<(), Error> {
        let body = message::RequestFrame {
            net_fn: GetAuthCapabilities::CODE.net_fn,
            cmd: GetAuthCapabilities::CODE.code,
            rq_seq: 0,
            data: &to_bytes(&GetAuthCapabilities {
                channel: CHANNEL_THIS_V2,
                privilege: PrivilegeLevel::try_from(self.privilege & 0x0F)
                    .unwrap_or(PrivilegeLevel::Administrator),
            })?,
        }
        .to_bytes();

        let packet = v1_5::encode_packet(v1_5::AuthType::None, &[0u8; 16], 0, 0, &body);
        self.socket()?.send(&packet)?;

        let reply = self.socket()?.recv()?;
        let packet = v1_5::decode_packet(&reply, None)?;

        let mut r = Reader::new(&packet.payload);
        let frame = message::ResponseFrame::decode(&mut r)?;
        if !frame.code.is_success() {
            return Err(Error::Command {
                command: GetAuthCapabilities::CODE.name,
                code: frame.code,
                data: frame.data,
            });
        }

        let caps: AuthCapabilities = from_bytes(&frame.data)?;
        if !caps.supports_v2() {
            return Err(ProtocolError::WrongVersion(
                "BMC does not offer IPMI v2.0; use the lan interface",
            )
            .into());
        }
        Ok(())
    }

    fn open_rmcp_session(&mut self) -> Result<(), Error> {
        self.local_session_id = match self.determinism.session_id {
            Some(id) => id,
            None => loop {
                let id = rand::random::<u32>();
                if id != 0 {
                    break id;
                }
            },
        };

        let request = OpenSessionRequest {
            message_tag: 0,
            requested_privilege: 0,
            session_id: self.local_session_id,
            authentication: self.authentication,
            integrity: self.integrity,
            confidentiality: self.confidentiality,
        };

        let reply = self.handshake(
            PayloadType::OpenSessionRequest,
            &to_bytes(&request)?,
            PayloadType::OpenSessionResponse,
        )?;
        let response: OpenSessionResponse = from_bytes(&reply)?;

        if !response.status.is_ok() {
            return Err(Error::Rakp(response.status));
        }

        self.privilege = response.maximum_privilege;
        self.bmc_session_id = response.bmc_session_id;
        self.authentication = response.authentication;
        self.integrity = response.integrity;
        self.confidentiality = response.confidentiality;

        log::debug!(
            "opened RMCP+ session 0x{:08X}/0x{:08X} ({}, {}, {})",
            self.local_session_id,
            self.bmc_session_id,
            self.authentication,
            self.integrity,
            self.confidentiality,
        );

        Ok(())
    }

    fn rakp1_2(&mut self) -> Result<(), Error> {
        self.local_nonce = match self.determinism.nonce {
            Some(nonce) => nonce,
            None => rand::random::<[u8; 16]>(),
        };

        let request = RakpMessage1 {
            message_tag: 0,
            bmc_session_id: self.bmc_session_id,
            nonce: self.local_nonce,
            privilege: self.rakp_privilege(),
            username: self.username.clone(),
        };

        let reply = self.handshake(
            PayloadType::RakpMessage1,
            &to_bytes(&request)?,
            PayloadType::RakpMessage2,
        )?;

        let mut r = Reader::new(&reply);
        let response = RakpMessage2::decode(&mut r, self.authentication.output_len());
        r.finish()?;

        if !response.status.is_ok() {
            return Err(Error::Rakp(response.status));
        }

        self.remote_nonce = response.nonce;
        self.remote_guid = response.guid;

        let inputs = self.key_exchange_inputs();
        if response.key_exchange != inputs.rakp2_auth_code(self.authentication) {
            return Err(SecurityError::PasswordMismatch.into());
        }

        let keys = inputs.derive_keys(self.authentication, self.integrity);
        self.protection = SessionProtection::new(
            self.integrity,
            self.confidentiality,
            keys,
            self.determinism.iv,
        );

        Ok(())
    }

    fn rakp3_4(&mut self) -> Result<(), Error> {
        let inputs = self.key_exchange_inputs();
        let request = RakpMessage3 {
            message_tag: 0,
            status: crate::proto::rakp::RakpStatus::NoErrors,
            bmc_session_id: self.bmc_session_id,
            key_exchange: inputs.rakp3_auth_code(self.authentication),
        };

        let reply = self.handshake(
            PayloadType::RakpMessage3,
            &to_bytes(&request)?,
            PayloadType::RakpMessage4,
        )?;

        let mut r = Reader::new(&reply);
        let response = RakpMessage4::decode(&mut r, self.integrity.mac_len());
        r.finish()?;

        if !response.status.is_ok() {
            return Err(Error::Rakp(response.status));
        }

        let expected = self.protection.keys().rakp4_auth_code(
            self.authentication,
            &self.local_nonce,
            self.bmc_session_id,
            &self.remote_guid,
        );

        // The BMC truncates to the integrity algorithm's MAC size, so a
        // prefix match is a full match.
        let check = &response.integrity_check;
        if check.len() > expected.len() || *check != expected[..check.len()] {
            return Err(SecurityError::IntegrityCheckFailed.into());
        }

        Ok(())
    }

    fn key_exchange_inputs(&self) -> KeyExchangeInputs<'_> {
        KeyExchangeInputs {
            password: &self.password,
            username: &self.username,
            privilege: self.rakp_privilege(),
            local_session_id: self.local_session_id,
            remote_session_id: self.bmc_session_id,
            local_nonce: &self.local_nonce,
            remote_nonce: &self.remote_nonce,
            remote_guid: &self.remote_guid,
        }
    }

    fn open_session(&mut self) -> Result<(), Error> {
        self.sequence = 2;
        self.rq_seq = 0;
        self.protection = SessionProtection::plaintext();

        self.get_auth_capabilities()?;
        self.open_rmcp_session()?;
        self.active = true;

        self.rakp1_2()?;
        self.rakp3_4()?;

        let privilege = PrivilegeLevel::try_from(self.privilege & 0x0F)
            .unwrap_or(PrivilegeLevel::Administrator);
        let new_privilege = self.exec(&SetSessionPrivilege { privilege })?;
        log::debug!("RMCP+ session active at privilege {}", new_privilege.0);

        Ok(())
    }
}

impl Transport for LanPlus {
    fn open(&mut self) -> Result<(), Error> {
        self.socket = Some(UdpConnection::connect(
            &self.options.hostname,
            self.options.port,
        )?);

        match self.open_session() {
            Ok(()) => Ok(()),
            Err(e) => {
                // A failed handshake collapses by dropping the socket; the
                // BMC times the half-session out on its own.
                self.active = false;
                self.socket = None;
                Err(e)
            }
        }
    }

    fn close(&mut self) -> Result<(), Error> {
        if self.active {
            let session_id = self.bmc_session_id;
            if let Err(e) = self.exec(&CloseSession { session_id }) {
                log::warn!("error closing RMCP+ session: {e}");
            }
            self.active = false;
        }

        self.socket = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.socket.is_some() && self.active
    }

    fn send_recv(&mut self, code: CommandCode, data: &[u8]) -> Result<RawResponse, Error> {
        let rq_seq = self.next_rq_seq();
        let body = message::RequestFrame {
            net_fn: code.net_fn,
            cmd: code.code,
            rq_seq,
            data,
        }
        .to_bytes();

        let sequence = self.next_sequence();
        let packet = self.protection.encode_packet(
            PayloadType::Ipmi,
            self.bmc_session_id,
            sequence,
            &body,
        )?;
        self.socket()?.send(&packet)?;

        let reply = self.socket()?.recv()?;
        let packet = self.protection.decode_packet(&reply, PayloadType::Ipmi)?;

        if packet.header.session_id != self.local_session_id {
            log::warn!(
                "response for session 0x{:08X}, expected 0x{:08X}",
                packet.header.session_id,
                self.local_session_id,
            );
        }

        let mut r = Reader::new(&packet.payload);
        let frame = message::ResponseFrame::decode(&mut r)?;

        Ok(RawResponse {
            net_fn: frame.net_fn.response_value(),
            cmd: frame.cmd,
            code: frame.code,
            data: frame.data,
        })
    }
}
