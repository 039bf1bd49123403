use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use argon2::{self, Argon2, Params};
use rand::RngCore;
use zeroize::Zeroize;

const VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
/// Bound into the GCM tag as associated data, so a sealed envelope from a
/// different context or format revision fails to open.
const AAD: &[u8] = b"lunara.store.v1";

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("key derivation failed")]
    KeyDerivation,
    #[error("sealing failed")]
    Seal,
    #[error("opening failed — wrong passphrase or corrupted data")]
    Open,
    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u8),
    #[error("invalid envelope")]
    InvalidEnvelope,
}

/// Derive a 256-bit key from a passphrase and salt using Argon2id
/// (19 MiB, 2 passes).
fn derive_key(passphrase: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
    let params =
        Params::new(19_456, 2, 1, Some(KEY_LEN)).map_err(|_| CryptoError::KeyDerivation)?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|_| CryptoError::KeyDerivation)?;

    Ok(key)
}

/// Seal plaintext under a passphrase.
/// Envelope layout: version (1) || salt (16) || nonce (12) || ciphertext.
pub fn seal(passphrase: &str, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let mut key = derive_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::Seal)?;
    key.zeroize();

    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad: AAD,
            },
        )
        .map_err(|_| CryptoError::Seal)?;

    let mut envelope = Vec::with_capacity(1 + SALT_LEN + NONCE_LEN + ciphertext.len());
    envelope.push(VERSION);
    envelope.extend_from_slice(&salt);
    envelope.extend_from_slice(&nonce_bytes);
    envelope.extend_from_slice(&ciphertext);

    Ok(envelope)
}

/// Open an envelope produced by [`seal`].
/// Fails if the passphrase is wrong or the envelope was tampered with.
pub fn open(passphrase: &str, envelope: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if envelope.len() < 1 + SALT_LEN + NONCE_LEN {
        return Err(CryptoError::InvalidEnvelope);
    }
    if envelope[0] != VERSION {
        return Err(CryptoError::UnsupportedVersion(envelope[0]));
    }

    let salt = &envelope[1..1 + SALT_LEN];
    let nonce_bytes = &envelope[1 + SALT_LEN..1 + SALT_LEN + NONCE_LEN];
    let ciphertext = &envelope[1 + SALT_LEN + NONCE_LEN..];

    let mut key = derive_key(passphrase, salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::Open)?;
    key.zeroize();

    let nonce = Nonce::from_slice(nonce_bytes);
    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad: AAD,
            },
        )
        .map_err(|_| CryptoError::Open)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let sealed = seal("a long passphrase", b"cycle data").unwrap();
        let opened = open("a long passphrase", &sealed).unwrap();
        assert_eq!(opened, b"cycle data");
    }

    #[test]
    fn wrong_passphrase_fails() {
        let sealed = seal("correct", b"secret").unwrap();
        assert!(matches!(open("wrong", &sealed), Err(CryptoError::Open)));
    }

    #[test]
    fn truncated_envelope_fails() {
        assert!(matches!(
            open("any", &[VERSION; 8]),
            Err(CryptoError::InvalidEnvelope)
        ));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut sealed = seal("pass", b"data").unwrap();
        sealed[0] = 9;
        assert!(matches!(
            open("pass", &sealed),
            Err(CryptoError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn flipped_ciphertext_bit_fails() {
        let mut sealed = seal("pass", b"data").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(matches!(open("pass", &sealed), Err(CryptoError::Open)));
    }
}
