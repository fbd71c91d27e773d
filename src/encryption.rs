//! Encryption service - pluggable authenticated encryption for attribute
//! and metadata values
//!
//! Behaviors take an [`Encrypter`] explicitly; the process-wide default is
//! only reached for at the composition root, and can be set exactly once
//! (at startup or test setup).

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use once_cell::sync::OnceCell;
use rand::RngCore;

use crate::error::{ToolsError, ToolsResult};

/// Authenticated encryption of string values.
///
/// `decrypt(encrypt(p)) == p` must hold for a fixed instance; `decrypt` of
/// anything this instance did not produce must fail with
/// [`ToolsError::Decryption`].
pub trait Encrypter: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> ToolsResult<String>;

    fn decrypt(&self, payload: &str) -> ToolsResult<String>;
}

/// AES-256-GCM encrypter. Payloads are base64 of `nonce || ciphertext`
/// with a random 96-bit nonce per encryption.
pub struct AesGcmEncrypter {
    cipher: Aes256Gcm,
}

const NONCE_LEN: usize = 12;

impl AesGcmEncrypter {
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    /// Generate a fresh random 256-bit key
    pub fn generate_key() -> [u8; 32] {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        key
    }
}

impl Encrypter for AesGcmEncrypter {
    fn encrypt(&self, plaintext: &str) -> ToolsResult<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| ToolsError::Encryption("AES-GCM encryption failed".to_string()))?;

        let mut payload = nonce_bytes.to_vec();
        payload.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(payload))
    }

    fn decrypt(&self, payload: &str) -> ToolsResult<String> {
        let raw = BASE64
            .decode(payload)
            .map_err(|_| ToolsError::Decryption("payload is not valid base64".to_string()))?;

        if raw.len() <= NONCE_LEN {
            return Err(ToolsError::Decryption("payload is too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| {
                ToolsError::Decryption("ciphertext failed authentication".to_string())
            })?;

        String::from_utf8(plaintext)
            .map_err(|_| ToolsError::Decryption("plaintext is not valid UTF-8".to_string()))
    }
}

static DEFAULT_ENCRYPTER: OnceCell<Box<dyn Encrypter>> = OnceCell::new();

/// Install the process-wide default encrypter. May only succeed once;
/// expected to run during startup or test setup.
pub fn set_default_encrypter(encrypter: Box<dyn Encrypter>) -> ToolsResult<()> {
    DEFAULT_ENCRYPTER
        .set(encrypter)
        .map_err(|_| ToolsError::Configuration("default encrypter is already set".to_string()))
}

/// The process-wide default encrypter, if one was installed
pub fn default_encrypter() -> ToolsResult<&'static dyn Encrypter> {
    DEFAULT_ENCRYPTER
        .get()
        .map(|boxed| boxed.as_ref())
        .ok_or_else(|| ToolsError::Configuration("no default encrypter configured".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let encrypter = AesGcmEncrypter::new(&AesGcmEncrypter::generate_key());

        let ciphertext = encrypter.encrypt("s3cr3t value").unwrap();
        assert_ne!(ciphertext, "s3cr3t value");
        assert_eq!(encrypter.decrypt(&ciphertext).unwrap(), "s3cr3t value");
    }

    #[test]
    fn test_each_encryption_produces_a_distinct_payload() {
        let encrypter = AesGcmEncrypter::new(&AesGcmEncrypter::generate_key());

        // Random nonce per call
        let first = encrypter.encrypt("same input").unwrap();
        let second = encrypter.encrypt("same input").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_decrypt_rejects_plaintext_input() {
        let encrypter = AesGcmEncrypter::new(&AesGcmEncrypter::generate_key());

        match encrypter.decrypt("never encrypted") {
            Err(ToolsError::Decryption(_)) => {}
            other => panic!("expected decryption error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_decrypt_rejects_ciphertext_from_another_key() {
        let a = AesGcmEncrypter::new(&AesGcmEncrypter::generate_key());
        let b = AesGcmEncrypter::new(&AesGcmEncrypter::generate_key());

        let ciphertext = a.encrypt("cross-key").unwrap();
        assert!(matches!(
            b.decrypt(&ciphertext),
            Err(ToolsError::Decryption(_))
        ));
    }
}
