//! The three RMCP+ algorithm families negotiated during Open Session, with
//! their wire identifiers, configuration names and MAC primitives.

use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::Sha256;
use std::str::FromStr;

mod cipher;
pub use cipher::{decrypt_aes_cbc, encrypt_aes_cbc, fresh_iv};

mod keys;
pub use keys::{KeyExchangeInputs, SessionKeys};

fn hmac_sha1(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha1>::new_from_slice(key).unwrap();
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hmac_md5(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Md5>::new_from_slice(key).unwrap();
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).unwrap();
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// The algorithm that signs the RAKP key-exchange messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAlgorithm {
    None,
    HmacSha1,
    HmacMd5,
    HmacSha256,
}

impl AuthAlgorithm {
    /// Output size of one signature, in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            AuthAlgorithm::None => 0,
            AuthAlgorithm::HmacSha1 => 20,
            AuthAlgorithm::HmacMd5 => 16,
            AuthAlgorithm::HmacSha256 => 32,
        }
    }

    pub fn mac(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
        match self {
            AuthAlgorithm::None => Vec::new(),
            AuthAlgorithm::HmacSha1 => hmac_sha1(key, data),
            AuthAlgorithm::HmacMd5 => hmac_md5(key, data),
            AuthAlgorithm::HmacSha256 => hmac_sha256(key, data),
        }
    }
}

impl From<AuthAlgorithm> for u8 {
    fn from(value: AuthAlgorithm) -> Self {
        match value {
            AuthAlgorithm::None => 0,
            AuthAlgorithm::HmacSha1 => 1,
            AuthAlgorithm::HmacMd5 => 2,
            AuthAlgorithm::HmacSha256 => 3,
        }
    }
}

impl TryFrom<u8> for AuthAlgorithm {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        let alg = match value {
            0 => Self::None,
            1 => Self::HmacSha1,
            2 => Self::HmacMd5,
            3 => Self::HmacSha256,
            _ => return Err(()),
        };
        Ok(alg)
    }
}

impl FromStr for AuthAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let alg = match s.to_ascii_lowercase().as_str() {
            "" | "none" => Self::None,
            "hmac-sha1" => Self::HmacSha1,
            "hmac-md5" => Self::HmacMd5,
            "hmac-sha256" => Self::HmacSha256,
            other => return Err(format!("{other} is not an authentication algorithm")),
        };
        Ok(alg)
    }
}

impl core::fmt::Display for AuthAlgorithm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            AuthAlgorithm::None => "none",
            AuthAlgorithm::HmacSha1 => "hmac-sha1",
            AuthAlgorithm::HmacMd5 => "hmac-md5",
            AuthAlgorithm::HmacSha256 => "hmac-sha256",
        })
    }
}

/// The per-packet MAC applied to authenticated session traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityAlgorithm {
    None,
    HmacSha1_96,
    HmacMd5_128,
    Md5_128,
    HmacSha256_128,
}

impl IntegrityAlgorithm {
    /// Truncated MAC size as it appears on the wire.
    pub fn mac_len(&self) -> usize {
        match self {
            IntegrityAlgorithm::None => 0,
            IntegrityAlgorithm::HmacSha1_96 => 12,
            IntegrityAlgorithm::HmacMd5_128 => 16,
            IntegrityAlgorithm::Md5_128 => 16,
            IntegrityAlgorithm::HmacSha256_128 => 16,
        }
    }

    /// Untruncated signature size; also the size of the derived session
    /// keys K1 and K2.
    pub fn sign_len(&self) -> usize {
        match self {
            IntegrityAlgorithm::None => 0,
            _ => 20,
        }
    }

    /// The untruncated signature over `data`. `MD5-128` is not an HMAC; it
    /// is keyed by prepending the password to the payload.
    pub fn mac(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
        match self {
            IntegrityAlgorithm::None => Vec::new(),
            IntegrityAlgorithm::HmacSha1_96 => hmac_sha1(key, data),
            IntegrityAlgorithm::HmacMd5_128 => hmac_md5(key, data),
            IntegrityAlgorithm::Md5_128 => {
                use md5::Digest;
                let mut h = Md5::new();
                h.update(key);
                h.update(data);
                h.finalize().to_vec()
            }
            IntegrityAlgorithm::HmacSha256_128 => hmac_sha256(key, data),
        }
    }
}

impl From<IntegrityAlgorithm> for u8 {
    fn from(value: IntegrityAlgorithm) -> Self {
        match value {
            IntegrityAlgorithm::None => 0,
            IntegrityAlgorithm::HmacSha1_96 => 1,
            IntegrityAlgorithm::HmacMd5_128 => 2,
            IntegrityAlgorithm::Md5_128 => 3,
            IntegrityAlgorithm::HmacSha256_128 => 4,
        }
    }
}

impl TryFrom<u8> for IntegrityAlgorithm {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        let alg = match value {
            0 => Self::None,
            1 => Self::HmacSha1_96,
            2 => Self::HmacMd5_128,
            3 => Self::Md5_128,
            4 => Self::HmacSha256_128,
            _ => return Err(()),
        };
        Ok(alg)
    }
}

impl FromStr for IntegrityAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let alg = match s.to_ascii_lowercase().as_str() {
            "" | "none" => Self::None,
            "hmac-sha1-96" => Self::HmacSha1_96,
            "hmac-md5-128" => Self::HmacMd5_128,
            "md5-128" => Self::Md5_128,
            "hmac-sha256-128" => Self::HmacSha256_128,
            other => return Err(format!("{other} is not an integrity algorithm")),
        };
        Ok(alg)
    }
}

impl core::fmt::Display for IntegrityAlgorithm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            IntegrityAlgorithm::None => "none",
            IntegrityAlgorithm::HmacSha1_96 => "hmac-sha1-96",
            IntegrityAlgorithm::HmacMd5_128 => "hmac-md5-128",
            IntegrityAlgorithm::Md5_128 => "md5-128",
            IntegrityAlgorithm::HmacSha256_128 => "hmac-sha256-128",
        })
    }
}

/// Payload confidentiality. The RC4 variants have wire identifiers and
/// configuration names but are rejected when a session is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidentialityAlgorithm {
    None,
    AesCbc128,
    Xrc4_128,
    Xrc4_40,
}

impl ConfidentialityAlgorithm {
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::None | Self::AesCbc128)
    }
}

impl From<ConfidentialityAlgorithm> for u8 {
    fn from(value: ConfidentialityAlgorithm) -> Self {
        match value {
            ConfidentialityAlgorithm::None => 0,
            ConfidentialityAlgorithm::AesCbc128 => 1,
            ConfidentialityAlgorithm::Xrc4_128 => 2,
            ConfidentialityAlgorithm::Xrc4_40 => 3,
        }
    }
}

impl TryFrom<u8> for ConfidentialityAlgorithm {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        let alg = match value {
            0 => Self::None,
            1 => Self::AesCbc128,
            2 => Self::Xrc4_128,
            3 => Self::Xrc4_40,
            _ => return Err(()),
        };
        Ok(alg)
    }
}

impl FromStr for ConfidentialityAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let alg = match s.to_ascii_lowercase().as_str() {
            "" | "none" => Self::None,
            "aes-cbc-128" => Self::AesCbc128,
            "xrc4-128" => Self::Xrc4_128,
            "xrc4-40" => Self::Xrc4_40,
            other => return Err(format!("{other} is not a confidentiality algorithm")),
        };
        Ok(alg)
    }
}

impl core::fmt::Display for ConfidentialityAlgorithm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            ConfidentialityAlgorithm::None => "none",
            ConfidentialityAlgorithm::AesCbc128 => "aes-cbc-128",
            ConfidentialityAlgorithm::Xrc4_128 => "xrc4-128",
            ConfidentialityAlgorithm::Xrc4_40 => "xrc4-40",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_ids_round_trip() {
        for id in 0u8..=3 {
            let alg = AuthAlgorithm::try_from(id).unwrap();
            assert_eq!(u8::from(alg), id);
        }
        for id in 0u8..=4 {
            let alg = IntegrityAlgorithm::try_from(id).unwrap();
            assert_eq!(u8::from(alg), id);
        }
        assert!(AuthAlgorithm::try_from(4).is_err());
        assert!(IntegrityAlgorithm::try_from(5).is_err());
        assert!(ConfidentialityAlgorithm::try_from(4).is_err());
    }

    #[test]
    fn names_parse_both_ways() {
        let alg: AuthAlgorithm = "hmac-sha256".parse().unwrap();
        assert_eq!(alg, AuthAlgorithm::HmacSha256);
        assert_eq!(alg.to_string(), "hmac-sha256");

        let alg: IntegrityAlgorithm = "hmac-sha1-96".parse().unwrap();
        assert_eq!(alg, IntegrityAlgorithm::HmacSha1_96);

        // rc4 names parse; whether they are usable is decided at open time.
        let alg: ConfidentialityAlgorithm = "xrc4-40".parse().unwrap();
        assert!(!alg.is_supported());
        assert!(ConfidentialityAlgorithm::AesCbc128.is_supported());
    }

    #[test]
    fn mac_output_sizes() {
        let key = b"0123456789abcdefghij";
        let data = b"payload";
        assert_eq!(AuthAlgorithm::HmacSha1.mac(key, data).len(), 20);
        assert_eq!(AuthAlgorithm::HmacMd5.mac(key, data).len(), 16);
        assert_eq!(AuthAlgorithm::HmacSha256.mac(key, data).len(), 32);
        assert!(AuthAlgorithm::None.mac(key, data).is_empty());

        assert_eq!(IntegrityAlgorithm::HmacSha1_96.mac(key, data).len(), 20);
        assert_eq!(IntegrityAlgorithm::HmacSha1_96.mac_len(), 12);
        assert_eq!(IntegrityAlgorithm::Md5_128.mac(key, data).len(), 16);
    }
}
