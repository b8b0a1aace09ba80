//! SRTP key material and AES-CM / HMAC-SHA1 primitives (RFC 3711)

use super::SrtpError;
use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;
use std::fmt;

type HmacSha1 = Hmac<Sha1>;
type Aes128Ctr = Ctr128BE<Aes128>;

pub const MASTER_KEY_LEN: usize = 16;
pub const MASTER_SALT_LEN: usize = 14;
pub const AUTH_KEY_LEN: usize = 20;

/// SRTP protection profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SrtpProfile {
    /// AES-128-CM with an 80-bit HMAC-SHA1 tag
    #[default]
    Aes128CmHmacSha1_80,
    /// AES-128-CM with a 32-bit HMAC-SHA1 tag
    Aes128CmHmacSha1_32,
}

impl SrtpProfile {
    /// Get auth tag length in bytes
    pub fn auth_tag_len(&self) -> usize {
        match self {
            Self::Aes128CmHmacSha1_80 => 10,
            Self::Aes128CmHmacSha1_32 => 4,
        }
    }
}

/// SRTP master key material
#[derive(Clone)]
pub struct SrtpMasterKey {
    key: [u8; MASTER_KEY_LEN],
    salt: [u8; MASTER_SALT_LEN],
}

impl SrtpMasterKey {
    pub fn new(key: &[u8], salt: &[u8]) -> Result<Self, SrtpError> {
        let key = key.try_into().map_err(|_| SrtpError::InvalidKeyLength {
            expected: MASTER_KEY_LEN,
            actual: key.len(),
        })?;
        let salt = salt.try_into().map_err(|_| SrtpError::InvalidKeyLength {
            expected: MASTER_SALT_LEN,
            actual: salt.len(),
        })?;
        Ok(Self { key, salt })
    }

    /// Random master key and salt
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut key = [0u8; MASTER_KEY_LEN];
        let mut salt = [0u8; MASTER_SALT_LEN];
        rng.fill_bytes(&mut key);
        rng.fill_bytes(&mut salt);
        Self { key, salt }
    }
}

impl fmt::Debug for SrtpMasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SrtpMasterKey")
            .field("key", &"[REDACTED]")
            .field("salt", &"[REDACTED]")
            .finish()
    }
}

/// Key derivation labels for SRTP (RTCP labels are unused here)
#[derive(Debug, Clone, Copy)]
enum KeyLabel {
    Encryption = 0x00,
    Authentication = 0x01,
    Salting = 0x02,
}

/// Session keys for one SRTP direction
#[derive(Clone)]
pub struct SrtpSessionKeys {
    pub cipher_key: [u8; MASTER_KEY_LEN],
    pub auth_key: [u8; AUTH_KEY_LEN],
    pub salt: [u8; MASTER_SALT_LEN],
}

impl SrtpSessionKeys {
    /// Derive session keys with a key derivation rate of zero
    pub fn derive(master: &SrtpMasterKey) -> Self {
        let mut cipher_key = [0u8; MASTER_KEY_LEN];
        let mut auth_key = [0u8; AUTH_KEY_LEN];
        let mut salt = [0u8; MASTER_SALT_LEN];

        kdf(master, KeyLabel::Encryption, &mut cipher_key);
        kdf(master, KeyLabel::Authentication, &mut auth_key);
        kdf(master, KeyLabel::Salting, &mut salt);

        Self {
            cipher_key,
            auth_key,
            salt,
        }
    }
}

/// AES-CM PRF from RFC 3711 section 4.3.1
///
/// x = (label || r) XOR master_salt with r = 0, keystream starts at x * 2^16.
fn kdf(master: &SrtpMasterKey, label: KeyLabel, out: &mut [u8]) {
    let mut iv = [0u8; 16];
    iv[..MASTER_SALT_LEN].copy_from_slice(&master.salt);
    iv[7] ^= label as u8;

    out.fill(0);
    let mut cipher = Aes128Ctr::new(&master.key.into(), &iv.into());
    cipher.apply_keystream(out);
}

/// Counter block for a packet: (salt * 2^16) XOR (ssrc * 2^64) XOR (index * 2^16)
pub fn packet_iv(salt: &[u8; MASTER_SALT_LEN], ssrc: u32, index: u64) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[..MASTER_SALT_LEN].copy_from_slice(salt);

    for (b, s) in iv[4..8].iter_mut().zip(ssrc.to_be_bytes()) {
        *b ^= s;
    }
    for (b, i) in iv[8..14].iter_mut().zip(&index.to_be_bytes()[2..]) {
        *b ^= i;
    }

    iv
}

/// XOR `data` with the AES-CM keystream in place
pub fn apply_keystream(key: &[u8; MASTER_KEY_LEN], iv: &[u8; 16], data: &mut [u8]) {
    if !data.is_empty() {
        let mut cipher = Aes128Ctr::new(key.into(), iv.into());
        cipher.apply_keystream(data);
    }
}

/// HMAC-SHA1 over `authenticated || ROC`, truncated to `tag_len`
pub fn auth_tag(
    key: &[u8; AUTH_KEY_LEN],
    authenticated: &[u8],
    roc: u32,
    tag_len: usize,
) -> Result<Vec<u8>, SrtpError> {
    let mut mac = HmacSha1::new_from_slice(key).map_err(|e| SrtpError::Crypto(e.to_string()))?;
    mac.update(authenticated);
    mac.update(&roc.to_be_bytes());
    let digest = mac.finalize().into_bytes();
    Ok(digest[..tag_len.min(digest.len())].to_vec())
}

/// Constant-time check of a truncated tag
pub fn verify_auth_tag(
    key: &[u8; AUTH_KEY_LEN],
    authenticated: &[u8],
    roc: u32,
    tag: &[u8],
) -> Result<bool, SrtpError> {
    let mut mac = HmacSha1::new_from_slice(key).map_err(|e| SrtpError::Crypto(e.to_string()))?;
    mac.update(authenticated);
    mac.update(&roc.to_be_bytes());
    Ok(mac.verify_truncated_left(tag).is_ok())
}
