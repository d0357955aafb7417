//! The IPMI v1.5 session transport.
//!
//! State machine: ping, probe authentication capabilities, request a
//! session challenge, activate the session, raise the privilege level.
//! Session traffic carries a per-packet auth code when the negotiated auth
//! type is not `none`.

use crate::app::auth::{
    ActivateSession, AuthCapabilities, CloseSession, GetAuthCapabilities, GetSessionChallenge,
    SetSessionPrivilege, CHANNEL_THIS,
};
use crate::commands::{self, CommandCode, PrivilegeLevel};
use crate::error::{Error, ProtocolError, SecurityError};
use crate::proto::v1_5::{self, AuthType};
use crate::proto::{asf, message};

use super::{ConnectionOptions, RawResponse, Transport, UdpConnection};

pub struct Lan {
    options: ConnectionOptions,
    socket: Option<UdpConnection>,
    active: bool,

    privilege: PrivilegeLevel,
    auth_type: AuthType,
    username: [u8; 16],
    password: [u8; 16],
    session_id: u32,
    sequence: u32,
    rq_seq: u8,

    forced_initial_sequence: Option<[u8; 4]>,
}

impl Lan {
    pub fn new(options: ConnectionOptions) -> Result<Self, Error> {
        if options.username.len() > 16 {
            return Err(SecurityError::UsernameTooLong.into());
        }
        if options.password.len() > 16 {
            return Err(SecurityError::PasswordTooLong.into());
        }

        let mut username = [0u8; 16];
        username[..options.username.len()].copy_from_slice(options.username.as_bytes());
        let mut password = [0u8; 16];
        password[..options.password.len()].copy_from_slice(options.password.as_bytes());

        let privilege = options.effective_privilege();

        Ok(Self {
            options,
            socket: None,
            active: false,
            privilege,
            auth_type: AuthType::None,
            username,
            password,
            session_id: 0,
            sequence: 0,
            rq_seq: 0,
            forced_initial_sequence: None,
        })
    }

    /// Pin the initial inbound sequence for replay tests.
    pub fn set_deterministic(&mut self, initial_sequence: [u8; 4]) {
        self.forced_initial_sequence = Some(initial_sequence);
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

    fn ping(&mut self) -> Result<(), Error> {
        self.socket()?.send(&asf::encode_ping(0x00))?;
        let reply = self.socket()?.recv()?;
        let pong = asf::decode_pong(&reply)?;

        if !pong.supports_ipmi() {
            return Err(ProtocolError::IpmiNotSupported.into());
        }
        Ok(())
    }

    fn open_session(&mut self) -> Result<(), Error> {
        self.ping()?;

        let caps: AuthCapabilities = self.exec(&GetAuthCapabilities {
            channel: CHANNEL_THIS,
            privilege: self.privilege,
        })?;

        self.auth_type = match caps.best_v1_auth() {
            Some(auth) => auth,
            None if caps.supports_v2() => {
                return Err(ProtocolError::WrongVersion(
                    "BMC only offers IPMI v2.0; use the lanplus interface",
                )
                .into())
            }
            None if caps.none_only() => AuthType::None,
            None => {
                return Err(ProtocolError::NoSupportedAuthType(caps.auth_type_support).into())
            }
        };
        log::debug!("v1.5 session will use auth type {:?}", self.auth_type);

        let challenge = self.exec(&GetSessionChallenge {
            auth_type: self.auth_type,
            username: self.username,
        })?;

        // Session traffic from here on is addressed to the temporary id and
        // authenticated with the negotiated auth type.
        self.session_id = challenge.temporary_session_id;
        self.active = true;

        let initial_sequence = match self.forced_initial_sequence {
            Some(seq) => seq,
            None => rand::random::<[u8; 4]>(),
        };

        let active = self.exec(&ActivateSession {
            auth_type: self.auth_type,
            privilege: self.privilege,
            challenge: challenge.challenge,
            initial_sequence,
        })?;

        self.session_id = active.session_id;
        self.auth_type = active.auth_type;
        self.sequence = active.initial_sequence;

        let new_privilege = self.exec(&SetSessionPrivilege {
            privilege: self.privilege,
        })?;
        log::debug!("v1.5 session active at privilege {}", new_privilege.0);

        Ok(())
    }
}

impl Transport for Lan {
    fn open(&mut self) -> Result<(), Error> {
        self.socket = Some(UdpConnection::connect(
            &self.options.hostname,
            self.options.port,
        )?);
        self.sequence = 0;
        self.rq_seq = 0;
        self.session_id = 0;
        self.active = false;

        match self.open_session() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.socket = None;
                self.active = false;
                Err(e)
            }
        }
    }

    fn close(&mut self) -> Result<(), Error> {
        if self.active {
            let session_id = self.session_id;
            if let Err(e) = self.exec(&CloseSession { session_id }) {
                log::warn!("error closing v1.5 session: {e}");
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

        // The capability probe always goes out with a zero sequence.
        let sequence = if code == commands::GET_CHANNEL_AUTHENTICATION_CAPABILITIES {
            0
        } else if self.session_id != 0 {
            self.next_sequence()
        } else {
            0
        };

        let auth_type = if self.active {
            self.auth_type
        } else {
            AuthType::None
        };

        let packet =
            v1_5::encode_packet(auth_type, &self.password, self.session_id, sequence, &body);
        self.socket()?.send(&packet)?;

        let reply = self.socket()?.recv()?;
        let packet = v1_5::decode_packet(&reply, Some(&self.password))?;

        let mut r = crate::wire::Reader::new(&packet.payload);
        let frame = message::ResponseFrame::decode(&mut r)?;

        Ok(RawResponse {
            net_fn: frame.net_fn.response_value(),
            cmd: frame.cmd,
            code: frame.code,
            data: frame.data,
        })
    }
}
