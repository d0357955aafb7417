//! Transports and connection configuration.
//!
//! A [`Transport`] owns one UDP socket and one in-flight request at a time.
//! Commands are typed pairs: the request knows how to serialise itself, the
//! response how to parse itself, and [`Transport::exec`] round-trips one
//! message through whichever session framing the transport speaks.

mod socket;
pub(crate) use socket::UdpConnection;

mod lan;
pub use lan::Lan;

mod lanplus;
pub use lanplus::LanPlus;

use std::str::FromStr;

use crate::commands::{CommandCode, CompletionCode, PrivilegeLevel};
use crate::crypto::{AuthAlgorithm, ConfidentialityAlgorithm, IntegrityAlgorithm};
use crate::error::{Error, ProtocolError, SecurityError};
use crate::wire::{to_bytes, Decode, Encode, Reader};

/// The default RMCP port.
pub const DEFAULT_PORT: u16 = 623;

/// Which session generation to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interface {
    /// IPMI v1.5.
    Lan,
    /// IPMI v2.0 / RMCP+.
    LanPlus,
}

impl FromStr for Interface {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lan" => Ok(Self::Lan),
            "lanplus" => Ok(Self::LanPlus),
            other => Err(format!("{other} is not a supported interface")),
        }
    }
}

/// Everything needed to reach and authenticate against one BMC.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub interface: Interface,
    pub privilege: PrivilegeLevel,
    pub authentication: AuthAlgorithm,
    pub integrity: IntegrityAlgorithm,
    pub confidentiality: ConfidentialityAlgorithm,
}

impl ConnectionOptions {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            interface: Interface::LanPlus,
            privilege: PrivilegeLevel::None,
            authentication: AuthAlgorithm::None,
            integrity: IntegrityAlgorithm::None,
            confidentiality: ConfidentialityAlgorithm::None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn interface(mut self, interface: Interface) -> Self {
        self.interface = interface;
        self
    }

    pub fn privilege(mut self, privilege: PrivilegeLevel) -> Self {
        self.privilege = privilege;
        self
    }

    pub fn algorithms(
        mut self,
        authentication: AuthAlgorithm,
        integrity: IntegrityAlgorithm,
        confidentiality: ConfidentialityAlgorithm,
    ) -> Self {
        self.authentication = authentication;
        self.integrity = integrity;
        self.confidentiality = confidentiality;
        self
    }

    /// The privilege level sessions actually ask for: administrator unless
    /// something else was configured.
    pub(crate) fn effective_privilege(&self) -> PrivilegeLevel {
        if self.privilege == PrivilegeLevel::None {
            PrivilegeLevel::Administrator
        } else {
            self.privilege
        }
    }
}

/// An IPMI command: a request payload bound to its catalog entry and the
/// response payload it produces.
pub trait Command: Encode {
    const CODE: CommandCode;
    type Output: crate::wire::Decode;
}

/// A raw decoded response as handed up by a transport.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub net_fn: u8,
    pub cmd: u8,
    pub code: CompletionCode,
    pub data: Vec<u8>,
}

/// One session to one BMC.
pub trait Transport {
    /// Bring the session up, running whichever handshake the transport
    /// speaks. On failure the socket is closed before returning.
    fn open(&mut self) -> Result<(), Error>;

    /// Best-effort Close-Session, then drop the socket.
    fn close(&mut self) -> Result<(), Error>;

    fn is_open(&self) -> bool;

    /// Round-trip one raw message.
    fn send_recv(&mut self, code: CommandCode, data: &[u8]) -> Result<RawResponse, Error>;

    /// Round-trip one typed command, checking the completion code and the
    /// echoed command identity, then parsing the typed response.
    fn exec<C: Command>(&mut self, request: &C) -> Result<C::Output, Error>
    where
        Self: Sized,
    {
        let data = to_bytes(request)?;
        let response = self.send_recv(C::CODE, &data)?;

        if response.cmd != C::CODE.code
            || response.net_fn & !1 != C::CODE.net_fn.request_value()
        {
            return Err(ProtocolError::MismatchedResponse {
                netfn: response.net_fn,
                cmd: response.cmd,
            }
            .into());
        }

        if !response.code.is_success() {
            return Err(Error::Command {
                command: C::CODE.name,
                code: response.code,
                data: response.data,
            });
        }

        let mut r = Reader::new(&response.data);
        let output = C::Output::decode(&mut r);
        r.finish()?;
        Ok(output)
    }
}

/// Build the transport the options ask for, rejecting algorithm choices the
/// selected interface cannot honour.
pub fn connect(options: ConnectionOptions) -> Result<AnyTransport, Error> {
    match options.interface {
        Interface::Lan => {
            if options.integrity != IntegrityAlgorithm::None {
                return Err(SecurityError::UnsupportedAlgorithm(format!(
                    "lan cannot use integrity algorithm {}",
                    options.integrity
                ))
                .into());
            }
            if options.confidentiality != ConfidentialityAlgorithm::None {
                return Err(SecurityError::UnsupportedAlgorithm(format!(
                    "lan cannot use confidentiality algorithm {}",
                    options.confidentiality
                ))
                .into());
            }
            Ok(AnyTransport::Lan(Lan::new(options)?))
        }
        Interface::LanPlus => {
            if !options.confidentiality.is_supported() {
                return Err(SecurityError::UnsupportedAlgorithm(format!(
                    "confidentiality algorithm {} is not supported",
                    options.confidentiality
                ))
                .into());
            }
            Ok(AnyTransport::LanPlus(LanPlus::new(options)?))
        }
    }
}

/// Either of the two session transports, selected at runtime.
pub enum AnyTransport {
    Lan(Lan),
    LanPlus(LanPlus),
}

impl Transport for AnyTransport {
    fn open(&mut self) -> Result<(), Error> {
        match self {
            AnyTransport::Lan(t) => t.open(),
            AnyTransport::LanPlus(t) => t.open(),
        }
    }

    fn close(&mut self) -> Result<(), Error> {
        match self {
            AnyTransport::Lan(t) => t.close(),
            AnyTransport::LanPlus(t) => t.close(),
        }
    }

    fn is_open(&self) -> bool {
        match self {
            AnyTransport::Lan(t) => t.is_open(),
            AnyTransport::LanPlus(t) => t.is_open(),
        }
    }

    fn send_recv(&mut self, code: CommandCode, data: &[u8]) -> Result<RawResponse, Error> {
        match self {
            AnyTransport::Lan(t) => t.send_recv(code, data),
            AnyTransport::LanPlus(t) => t.send_recv(code, data),
        }
    }
}
