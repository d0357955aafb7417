//! AES-CBC-128 payload framing.
//!
//! Every encrypted payload carries its own random 16-byte IV, followed by
//! the ciphertext of `plaintext ‖ 0x01 0x02 .. 0x0N ‖ N`. The pad counts up
//! so the receiver can verify it byte-for-byte, and a pad-length byte is
//! always present, so the plaintext region is never 16-aligned on its own.

use aes::cipher::{
    block_padding::NoPadding, consts::U16, generic_array::GenericArray, BlockDecryptMut,
    BlockEncryptMut, KeyIvInit,
};

use crate::error::SecurityError;

const BLOCK: usize = 16;

/// A fresh IV for the next payload, or `forced` when a replay harness has
/// pinned it.
pub fn fresh_iv(forced: Option<[u8; 16]>) -> [u8; 16] {
    match forced {
        Some(iv) => iv,
        None => {
            let mut iv = [0u8; 16];
            getrandom::getrandom(&mut iv).unwrap();
            iv
        }
    }
}

/// Encrypt `plaintext`, returning `iv ‖ ciphertext`.
pub fn encrypt_aes_cbc(key: &GenericArray<u8, U16>, iv: [u8; 16], plaintext: &[u8]) -> Vec<u8> {
    let pad_len = (BLOCK - (plaintext.len() + 1) % BLOCK) % BLOCK;

    let mut buf = Vec::with_capacity(BLOCK + plaintext.len() + pad_len + 1);
    buf.extend_from_slice(&iv);
    buf.extend_from_slice(plaintext);
    buf.extend((1..=pad_len).map(|b| b as u8));
    buf.push(pad_len as u8);

    let encryptor = cbc::Encryptor::<aes::Aes128>::new(key, &iv.into());
    let region = &mut buf[BLOCK..];
    let len = region.len();
    encryptor
        .encrypt_padded_mut::<NoPadding>(region, len)
        .unwrap();

    buf
}

/// Decrypt `iv ‖ ciphertext`, stripping and verifying the pad.
pub fn decrypt_aes_cbc(
    key: &GenericArray<u8, U16>,
    data: &[u8],
) -> Result<Vec<u8>, SecurityError> {
    if data.len() < 2 * BLOCK || (data.len() - BLOCK) % BLOCK != 0 {
        return Err(SecurityError::DecryptFailed);
    }

    let iv: [u8; 16] = data[..BLOCK].try_into().unwrap();
    let mut buf = data[BLOCK..].to_vec();

    let decryptor = cbc::Decryptor::<aes::Aes128>::new(key, &iv.into());
    decryptor
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|_| SecurityError::DecryptFailed)?;

    let pad_len = buf[buf.len() - 1] as usize;
    if pad_len >= buf.len() {
        return Err(SecurityError::DecryptFailed);
    }

    let data_len = buf.len() - pad_len - 1;
    let pad = &buf[data_len..buf.len() - 1];
    if pad.iter().zip(1..).any(|(b, expected)| *b != expected) {
        return Err(SecurityError::DecryptFailed);
    }

    buf.truncate(data_len);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> GenericArray<u8, U16> {
        GenericArray::clone_from_slice(b"0123456789abcdef")
    }

    #[test]
    fn round_trip() {
        let plaintext = b"\x20\x18\xc8\x81\x04\x3b\x04\x3c";
        let iv = [0x5Fu8; 16];

        let wire = encrypt_aes_cbc(&key(), iv, plaintext);
        assert_eq!(&wire[..16], &iv);
        assert_ne!(&wire[16..16 + plaintext.len()], plaintext);

        let back = decrypt_aes_cbc(&key(), &wire).unwrap();
        assert_eq!(back, plaintext);
    }

    #[test]
    fn empty_plaintext_is_one_padded_block() {
        let wire = encrypt_aes_cbc(&key(), [7u8; 16], &[]);
        // IV plus a single block holding fifteen pad bytes and the length.
        assert_eq!(wire.len(), 32);
        assert_eq!(decrypt_aes_cbc(&key(), &wire).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn each_length_pads_to_a_block_multiple() {
        for len in 0..48 {
            let plaintext: Vec<u8> = (0..len).map(|v| v as u8).collect();
            let wire = encrypt_aes_cbc(&key(), [3u8; 16], &plaintext);
            assert_eq!((wire.len() - 16) % 16, 0, "len {len}");
            assert_eq!(decrypt_aes_cbc(&key(), &wire).unwrap(), plaintext);
        }
    }

    #[test]
    fn short_input_is_rejected() {
        assert!(decrypt_aes_cbc(&key(), &[0u8; 16]).is_err());
        assert!(decrypt_aes_cbc(&key(), &[0u8; 33]).is_err());
    }
}
