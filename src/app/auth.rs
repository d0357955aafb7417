//! Session-establishment commands: authentication capabilities, the v1.5
//! challenge/activate exchange, privilege changes and session teardown.

use crate::commands::{self, CommandCode, PrivilegeLevel};
use crate::conn::Command;
use crate::proto::v1_5::AuthType;
use crate::wire::{Decode, Encode, Reader, Writer};

/// The channel byte that asks about the interface the request arrived on.
pub const CHANNEL_THIS: u8 = 0x0E;
/// Same, plus the flag requesting IPMI v2.0 extended data.
pub const CHANNEL_THIS_V2: u8 = 0x8E;

/// Get Channel Authentication Capabilities.
#[derive(Debug, Clone, Copy)]
pub struct GetAuthCapabilities {
    pub channel: u8,
    pub privilege: PrivilegeLevel,
}

impl Encode for GetAuthCapabilities {
    fn encode(&self, w: &mut Writer) {
        w.write_u8(self.channel);
        w.write_u8(self.privilege.value());
    }
}

impl Command for GetAuthCapabilities {
    const CODE: CommandCode = commands::GET_CHANNEL_AUTHENTICATION_CAPABILITIES;
    type Output = AuthCapabilities;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCapabilities {
    pub channel: u8,
    /// Bit field of supported v1.5 auth types; bit 7 flags v2.0 extended
    /// capability data.
    pub auth_type_support: u8,
    pub status: u8,
    /// Extended capabilities; bit 1 advertises IPMI v2.0 connections.
    pub extended: u8,
    pub oem: Vec<u8>,
}

impl AuthCapabilities {
    /// Pick the strongest authenticated v1.5 scheme this BMC offers, in the
    /// order the session code prefers them. `None` means neither MD5 nor
    /// password is available; see [`Self::none_only`] for the fallback.
    pub fn best_v1_auth(&self) -> Option<AuthType> {
        [AuthType::Md5, AuthType::Password]
            .into_iter()
            .find(|candidate| self.auth_type_support & (1 << candidate.value()) != 0)
    }

    /// True when the BMC offers no v1.5 authentication at all, so sessions
    /// run with auth type `none`.
    pub fn none_only(&self) -> bool {
        self.auth_type_support & 0x7F == 0
    }

    pub fn supports_v2(&self) -> bool {
        self.extended & 0x02 != 0
    }
}

impl Decode for AuthCapabilities {
    fn decode(r: &mut Reader<'_>) -> Self {
        Self {
            channel: r.read_u8(),
            auth_type_support: r.read_u8(),
            status: r.read_u8(),
            extended: r.read_u8(),
            oem: r.read_rest().to_vec(),
        }
    }
}

/// Get Session Challenge.
#[derive(Debug, Clone, Copy)]
pub struct GetSessionChallenge {
    pub auth_type: AuthType,
    pub username: [u8; 16],
}

impl Encode for GetSessionChallenge {
    fn encode(&self, w: &mut Writer) {
        w.write_u8(self.auth_type.value());
        w.write_bytes(&self.username);
    }
}

impl Command for GetSessionChallenge {
    const CODE: CommandCode = commands::GET_SESSION_CHALLENGE;
    type Output = SessionChallenge;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionChallenge {
    pub temporary_session_id: u32,
    pub challenge: [u8; 16],
}

impl Decode for SessionChallenge {
    fn decode(r: &mut Reader<'_>) -> Self {
        Self {
            temporary_session_id: r.read_u32(),
            challenge: r.read_array::<16>(),
        }
    }
}

/// Activate Session.
#[derive(Debug, Clone, Copy)]
pub struct ActivateSession {
    pub auth_type: AuthType,
    pub privilege: PrivilegeLevel,
    /// The challenge string handed back verbatim.
    pub challenge: [u8; 16],
    /// The initial inbound sequence number the BMC should use towards us.
    pub initial_sequence: [u8; 4],
}

impl Encode for ActivateSession {
    fn encode(&self, w: &mut Writer) {
        w.write_u8(self.auth_type.value());
        w.write_u8(self.privilege.value());
        w.write_bytes(&self.challenge);
        w.write_bytes(&self.initial_sequence);
    }
}

impl Command for ActivateSession {
    const CODE: CommandCode = commands::ACTIVATE_SESSION;
    type Output = ActiveSession;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSession {
    pub auth_type: AuthType,
    pub session_id: u32,
    /// Our starting outbound sequence number.
    pub initial_sequence: u32,
    pub max_privilege: u8,
}

impl Decode for ActiveSession {
    fn decode(r: &mut Reader<'_>) -> Self {
        use crate::wire::WireError;

        let auth_byte = r.read_u8();
        let auth_type = match AuthType::try_from(auth_byte & 0x0F) {
            Ok(ty) => ty,
            Err(()) => {
                r.set_err(WireError::Invalid("activated auth type"));
                AuthType::None
            }
        };

        Self {
            auth_type,
            session_id: r.read_u32(),
            initial_sequence: r.read_u32(),
            max_privilege: r.read_u8(),
        }
    }
}

/// Set Session Privilege Level.
#[derive(Debug, Clone, Copy)]
pub struct SetSessionPrivilege {
    pub privilege: PrivilegeLevel,
}

impl Encode for SetSessionPrivilege {
    fn encode(&self, w: &mut Writer) {
        w.write_u8(self.privilege.value());
    }
}

impl Command for SetSessionPrivilege {
    const CODE: CommandCode = commands::SET_SESSION_PRIVILEGE_LEVEL;
    type Output = NewPrivilege;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewPrivilege(pub u8);

impl Decode for NewPrivilege {
    fn decode(r: &mut Reader<'_>) -> Self {
        Self(r.read_u8())
    }
}

/// Close Session.
#[derive(Debug, Clone, Copy)]
pub struct CloseSession {
    pub session_id: u32,
}

impl Encode for CloseSession {
    fn encode(&self, w: &mut Writer) {
        w.write_u32(self.session_id);
    }
}

impl Command for CloseSession {
    const CODE: CommandCode = commands::CLOSE_SESSION;
    type Output = ();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{from_bytes, to_bytes};
    use hex_literal::hex;

    #[test]
    fn auth_capabilities_from_capture() {
        let caps = from_bytes::<AuthCapabilities>(&hex!("02 80 14 02 00 00 00 00")).unwrap();
        assert_eq!(caps.channel, 0x02);
        assert!(caps.supports_v2());
        // Only the v2 extended-data flag is set: no v1.5 auth types.
        assert_eq!(caps.best_v1_auth(), None);
    }

    #[test]
    fn best_auth_prefers_md5() {
        let caps = AuthCapabilities {
            channel: 1,
            auth_type_support: (1 << 2) | (1 << 4),
            status: 0,
            extended: 0,
            oem: Vec::new(),
        };
        assert_eq!(caps.best_v1_auth(), Some(AuthType::Md5));

        let caps = AuthCapabilities {
            auth_type_support: 1 << 4,
            ..caps
        };
        assert_eq!(caps.best_v1_auth(), Some(AuthType::Password));

        let caps = AuthCapabilities {
            auth_type_support: 0,
            ..caps
        };
        assert_eq!(caps.best_v1_auth(), None);
        assert!(caps.none_only());
    }

    #[test]
    fn challenge_request_pads_the_username() {
        let mut username = [0u8; 16];
        username[..5].copy_from_slice(b"admin");
        let data = to_bytes(&GetSessionChallenge {
            auth_type: AuthType::None,
            username,
        })
        .unwrap();
        assert_eq!(data.len(), 17);
        assert_eq!(&data[1..6], b"admin");
        assert_eq!(&data[6..], &[0u8; 11]);
    }

    #[test]
    fn activate_session_round_trip() {
        let data = hex!("02 44 33 22 11 01 00 00 00 04");
        let active = from_bytes::<ActiveSession>(&data).unwrap();
        assert_eq!(active.auth_type, AuthType::Md5);
        assert_eq!(active.session_id, 0x11223344);
        assert_eq!(active.initial_sequence, 1);
        assert_eq!(active.max_privilege, 4);
    }
}
