use crate::commands::CompletionCode;
use crate::proto::rakp::RakpStatus;
use crate::wire::WireError;

/// Everything that can go wrong between the caller and the BMC.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket-level failure (send, receive, resolve, bind).
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// The BMC did not answer within the read deadline.
    #[error("timed out waiting for the BMC")]
    Timeout,

    /// A packet or payload did not contain what its framing promised.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// A structurally valid packet that violates the protocol.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Authentication, integrity or confidentiality failure.
    #[error("security error: {0}")]
    Security(#[from] SecurityError),

    /// The BMC rejected a session-establishment message.
    #[error("session setup rejected: {0}")]
    Rakp(RakpStatus),

    /// The BMC answered with a non-zero completion code. The code and the
    /// raw response data pass through unchanged.
    #[error("{command} failed with completion code {code}")]
    Command {
        command: &'static str,
        code: CompletionCode,
        data: Vec<u8>,
    },

    /// The sensor exists but currently has no reading to give.
    #[error("sensor reading unavailable")]
    ReadingUnavailable,

    /// The sensor's entity is absent or disabled and should be skipped.
    #[error("sensor ignored: entity is not present or disabled")]
    IgnoredSensor,
}

impl Error {
    /// The completion code carried by a [`Error::Command`] failure.
    pub fn completion_code(&self) -> Option<CompletionCode> {
        match self {
            Error::Command { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True when a reservation-guarded read lost its reservation and the
    /// caller may retry after re-reserving.
    pub fn is_reservation_cancelled(&self) -> bool {
        self.completion_code()
            .map(|c| c.is_reservation_cancelled())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("unsupported RMCP class 0x{0:02X}")]
    UnsupportedRmcpClass(u8),

    #[error("packet is not an IPMI v2.0 packet (auth type 0x{0:02X})")]
    NotIpmiV2(u8),

    #[error("unexpected payload type 0x{actual:02X}, expected 0x{expected:02X}")]
    UnexpectedPayloadType { expected: u8, actual: u8 },

    #[error("payload encryption state does not match the session")]
    MismatchedEncryptionState,

    #[error("payload authentication state does not match the session")]
    MismatchedAuthenticationState,

    #[error("message checksum mismatch")]
    ChecksumMismatch,

    #[error("session header length disagrees with the packet")]
    LengthMismatch,

    #[error("integrity trailer carries unknown next-header 0x{0:02X}")]
    UnknownNextHeader(u8),

    #[error("remote does not support IPMI")]
    IpmiNotSupported,

    #[error("{0}")]
    WrongVersion(&'static str),

    #[error("BMC did not offer a supported authentication type (0x{0:02X})")]
    NoSupportedAuthType(u8),

    #[error("response does not match the request (netfn 0x{netfn:02X}, command 0x{cmd:02X})")]
    MismatchedResponse { netfn: u8, cmd: u8 },

    #[error("unknown SDR record type 0x{0:02X}")]
    UnknownRecordType(u8),

    #[error("malformed record: {0}")]
    MalformedRecord(&'static str),

    #[error("sensor reading is narrower than one bit")]
    InvalidReadingWidth,

    #[error("unsupported linearization formula {0}")]
    UnsupportedLinearization(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecurityError {
    /// The RAKP2 key-exchange code did not verify: the password (or the
    /// username it is paired with) is wrong.
    #[error("password does not match")]
    PasswordMismatch,

    /// The RAKP4 integrity check value did not verify.
    #[error("integrity check failed")]
    IntegrityCheckFailed,

    /// A per-packet authentication code did not verify.
    #[error("packet authentication code mismatch")]
    AuthCodeMismatch,

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("payload decryption failed")]
    DecryptFailed,

    #[error("username is longer than 16 bytes")]
    UsernameTooLong,

    #[error("password is longer than 20 bytes")]
    PasswordTooLong,
}
