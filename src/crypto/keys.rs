//! Session key derivation and the RAKP key-exchange authentication codes.

use super::{AuthAlgorithm, IntegrityAlgorithm};
use crate::wire::Writer;
use aes::cipher::{consts::U16, generic_array::GenericArray};

/// The maximum password length; shorter passwords are right-padded with
/// zeros to this size before keying any RAKP MAC.
pub const PASSWORD_LEN: usize = 20;

/// Everything both ends agreed on by the time RAKP2 arrives. The MACs of
/// RAKP messages 2 through 4 and the session keys all derive from this.
pub struct KeyExchangeInputs<'a> {
    /// The raw (unpadded) password.
    pub password: &'a [u8],
    pub username: &'a [u8],
    /// Requested privilege byte, including the name-lookup flag.
    pub privilege: u8,
    /// Remote-console session id proposed in the Open Session request.
    pub local_session_id: u32,
    /// Managed-system session id from the Open Session response.
    pub remote_session_id: u32,
    /// The nonce this console sent in RAKP1.
    pub local_nonce: &'a [u8; 16],
    /// The nonce the BMC returned in RAKP2.
    pub remote_nonce: &'a [u8; 16],
    /// The BMC GUID returned in RAKP2.
    pub remote_guid: &'a [u8; 16],
}

pub(crate) fn padded_password(password: &[u8]) -> [u8; PASSWORD_LEN] {
    let mut padded = [0u8; PASSWORD_LEN];
    let n = password.len().min(PASSWORD_LEN);
    padded[..n].copy_from_slice(&password[..n]);
    padded
}

impl KeyExchangeInputs<'_> {
    /// The code the BMC must have produced in RAKP2, keyed by the password:
    /// `A(password, local-sid ‖ remote-sid ‖ Ra ‖ Rb ‖ guid ‖ priv ‖
    /// len(user) ‖ user)`.
    pub fn rakp2_auth_code(&self, auth: AuthAlgorithm) -> Vec<u8> {
        let mut w = Writer::with_capacity(128);
        w.write_u32(self.local_session_id);
        w.write_u32(self.remote_session_id);
        w.write_bytes(self.local_nonce);
        w.write_bytes(self.remote_nonce);
        w.write_bytes(self.remote_guid);
        w.write_u8(self.privilege);
        w.write_u8(self.username.len() as u8);
        w.write_bytes(self.username);
        auth.mac(&padded_password(self.password), w.bytes())
    }

    /// The code this console sends in RAKP3, keyed by the password:
    /// `A(password, Rb ‖ local-sid ‖ priv ‖ len(user) ‖ user)`.
    pub fn rakp3_auth_code(&self, auth: AuthAlgorithm) -> Vec<u8> {
        let mut w = Writer::with_capacity(64);
        w.write_bytes(self.remote_nonce);
        w.write_u32(self.local_session_id);
        w.write_u8(self.privilege);
        w.write_u8(self.username.len() as u8);
        w.write_bytes(self.username);
        auth.mac(&padded_password(self.password), w.bytes())
    }

    /// Derive the session integrity key and the two per-packet keys.
    pub fn derive_keys(
        &self,
        auth: AuthAlgorithm,
        integrity: IntegrityAlgorithm,
    ) -> SessionKeys {
        let mut w = Writer::with_capacity(64);
        w.write_bytes(self.local_nonce);
        w.write_bytes(self.remote_nonce);
        w.write_u8(self.privilege);
        w.write_u8(self.username.len() as u8);
        w.write_bytes(self.username);

        let sik = auth.mac(&padded_password(self.password), w.bytes());
        SessionKeys::derive(auth, integrity, sik)
    }
}

/// The session integrity key and the material derived from it.
pub struct SessionKeys {
    /// `SIK`: the session integrity key, sized by the authentication
    /// algorithm's output.
    pub sik: Vec<u8>,
    /// `K1`: the per-packet MAC key, truncated to the integrity
    /// algorithm's signature size.
    pub k1: Vec<u8>,
    /// `K2`, truncated the same way.
    pub k2: Vec<u8>,
    /// The first 16 bytes of the untruncated K2 output.
    aes_key: GenericArray<u8, U16>,
}

impl SessionKeys {
    /// A key set for a session with no protection negotiated.
    pub fn empty() -> Self {
        Self {
            sik: Vec::new(),
            k1: Vec::new(),
            k2: Vec::new(),
            aes_key: GenericArray::default(),
        }
    }

    fn derive(auth: AuthAlgorithm, integrity: IntegrityAlgorithm, sik: Vec<u8>) -> Self {
        let sign = integrity.sign_len();

        let k1_full = auth.mac(&sik, &vec![0x01; sik.len()]);
        let k2_full = auth.mac(&sik, &vec![0x02; sik.len()]);

        let mut aes_key = GenericArray::default();
        if k2_full.len() >= 16 {
            aes_key.copy_from_slice(&k2_full[..16]);
        }

        let k1 = k1_full[..sign.min(k1_full.len())].to_vec();
        let k2 = k2_full[..sign.min(k2_full.len())].to_vec();

        Self {
            sik,
            k1,
            k2,
            aes_key,
        }
    }

    /// The code the BMC proves possession of the SIK with in RAKP4:
    /// `A(SIK, Ra ‖ remote-sid ‖ guid)`, truncated by the BMC to the
    /// integrity algorithm's wire MAC size.
    pub fn rakp4_auth_code(
        &self,
        auth: AuthAlgorithm,
        local_nonce: &[u8; 16],
        remote_session_id: u32,
        remote_guid: &[u8; 16],
    ) -> Vec<u8> {
        let mut w = Writer::with_capacity(64);
        w.write_bytes(local_nonce);
        w.write_u32(remote_session_id);
        w.write_bytes(remote_guid);
        auth.mac(&self.sik, w.bytes())
    }

    pub fn aes_key(&self) -> &GenericArray<u8, U16> {
        &self.aes_key
    }
}

impl core::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Key material stays out of logs.
        f.debug_struct("SessionKeys").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    // Captured from a live RAKP exchange with an HMAC-SHA1 / HMAC-SHA1-96 /
    // AES-CBC-128 cipher suite, user "Administrator", password "123456abc".
    const LOCAL_SID: u32 = 0xA0A2A3A4;
    const REMOTE_SID: u32 = 0x00993554;
    const LOCAL_NONCE: [u8; 16] = hex!("457b81bb81b86c946897113ab5ff3b30");
    const REMOTE_NONCE: [u8; 16] = hex!("526575198bb73c5e42e8947c25b138b5");
    const REMOTE_GUID: [u8; 16] = hex!("34393433 3239434e 47303133 53363334");
    const PRIVILEGE: u8 = 0x14;

    fn inputs<'a>() -> KeyExchangeInputs<'a> {
        KeyExchangeInputs {
            password: b"123456abc",
            username: b"Administrator",
            privilege: PRIVILEGE,
            local_session_id: LOCAL_SID,
            remote_session_id: REMOTE_SID,
            local_nonce: &LOCAL_NONCE,
            remote_nonce: &REMOTE_NONCE,
            remote_guid: &REMOTE_GUID,
        }
    }

    #[test]
    fn password_pads_to_twenty_bytes() {
        let padded = padded_password(b"123456abc");
        assert_eq!(&padded[..9], b"123456abc");
        assert_eq!(&padded[9..], &[0u8; 11]);
    }

    #[test]
    fn rakp2_auth_code_matches_capture() {
        let code = inputs().rakp2_auth_code(AuthAlgorithm::HmacSha1);
        assert_eq!(
            code,
            hex!("b841467aa61f7ef4e1600c85761f07b2745433f6")
        );
    }

    #[test]
    fn rakp2_auth_code_matches_second_capture() {
        let local_nonce = hex!("5eb118c2290acaf0b7daf5951133eb9f");
        let remote_nonce = hex!("a99e466af2ffeaabd38b6c37c4eda2ae");
        let inputs = KeyExchangeInputs {
            local_nonce: &local_nonce,
            remote_nonce: &remote_nonce,
            ..inputs()
        };
        let code = inputs.rakp2_auth_code(AuthAlgorithm::HmacSha1);
        assert_eq!(
            code,
            hex!("edb33e4c068642cff9c7618a1b2e6bf05d760f97")
        );
    }

    #[test]
    fn rakp3_auth_code_matches_capture() {
        let code = inputs().rakp3_auth_code(AuthAlgorithm::HmacSha1);
        assert_eq!(
            code,
            hex!("328fbb8fd61ee102786d1faa40080c7a5e6a1efb")
        );
    }

    #[test]
    fn derived_keys_match_capture() {
        let keys = inputs().derive_keys(
            AuthAlgorithm::HmacSha1,
            IntegrityAlgorithm::HmacSha1_96,
        );
        assert_eq!(
            keys.sik,
            hex!("29a3aa86249a8d6bd5a7d9597339375d560f3806")
        );
        assert_eq!(
            keys.k1,
            hex!("c54ddc1bcc14a46989c6f2805679bb583d81b1c7")
        );
        assert_eq!(
            keys.k2,
            hex!("35f46e582502de151981f9a052d1ee2d5aa73bd5")
        );
        assert_eq!(keys.aes_key().as_slice(), &keys.k2[..16]);
    }

    #[test]
    fn rakp4_auth_code_matches_capture() {
        let keys = inputs().derive_keys(
            AuthAlgorithm::HmacSha1,
            IntegrityAlgorithm::HmacSha1_96,
        );
        let code = keys.rakp4_auth_code(
            AuthAlgorithm::HmacSha1,
            &LOCAL_NONCE,
            REMOTE_SID,
            &REMOTE_GUID,
        );
        // The BMC sends only the first 12 bytes with HMAC-SHA1-96.
        assert_eq!(&code[..12], hex!("6b0c077a02038f9a65891665"));
    }

    #[test]
    fn key_sizes_follow_the_algorithms() {
        let keys = inputs().derive_keys(
            AuthAlgorithm::HmacSha1,
            IntegrityAlgorithm::HmacSha1_96,
        );
        assert_eq!(keys.sik.len(), AuthAlgorithm::HmacSha1.output_len());
        assert_eq!(keys.k1.len(), IntegrityAlgorithm::HmacSha1_96.sign_len());
        assert_eq!(keys.k2.len(), IntegrityAlgorithm::HmacSha1_96.sign_len());

        let keys = inputs().derive_keys(AuthAlgorithm::HmacSha256, IntegrityAlgorithm::None);
        assert_eq!(keys.sik.len(), 32);
        assert!(keys.k1.is_empty());
        // Confidentiality still has its 16 key bytes available.
        assert_ne!(keys.aes_key().as_slice(), &[0u8; 16]);
    }
}
