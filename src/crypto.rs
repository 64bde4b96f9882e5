//! Encryption Module
//!
//! Symmetric encryption of stored entries, keyed by a password.
//!
//! The capability is optional: [`default_cipher`] returns `None` when the
//! crate is built without the `encryption` feature, and the file store then
//! keeps its entries in plaintext.

use crate::error::Result;

// == Cipher Trait ==
/// Password-based symmetric encryption of byte blobs.
pub trait Cipher: Send {
    /// Encrypts `plaintext` with a key derived from `password`.
    fn encrypt(&self, plaintext: &[u8], password: &str) -> Result<Vec<u8>>;

    /// Inverse of [`Cipher::encrypt`]; fails on a wrong password or tampered input.
    fn decrypt(&self, ciphertext: &[u8], password: &str) -> Result<Vec<u8>>;
}

/// Returns the built-in cipher, if this build includes one.
pub fn default_cipher() -> Option<Box<dyn Cipher>> {
    #[cfg(feature = "encryption")]
    {
        Some(Box::new(AesGcmCipher))
    }
    #[cfg(not(feature = "encryption"))]
    {
        None
    }
}

#[cfg(feature = "encryption")]
pub use aes::AesGcmCipher;

#[cfg(feature = "encryption")]
mod aes {
    use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
    use aes_gcm::{Aes256Gcm, Key, Nonce};
    use sha2::{Digest, Sha256};

    use super::Cipher;
    use crate::error::{CacheError, Result};

    const KEY_CONTEXT: &[u8] = b"memocache/aes-256-gcm/v1:";
    const NONCE_LEN: usize = 12;

    /// AES-256-GCM with a SHA-256 derived key and a random nonce per blob.
    ///
    /// Output layout: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AesGcmCipher;

    impl AesGcmCipher {
        fn cipher_for(password: &str) -> Aes256Gcm {
            let digest = Sha256::new()
                .chain_update(KEY_CONTEXT)
                .chain_update(password.as_bytes())
                .finalize();
            Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(digest.as_slice()))
        }
    }

    impl Cipher for AesGcmCipher {
        fn encrypt(&self, plaintext: &[u8], password: &str) -> Result<Vec<u8>> {
            let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
            let sealed = Self::cipher_for(password)
                .encrypt(&nonce, plaintext)
                .map_err(|_| CacheError::Decryption("encryption failed".to_string()))?;

            let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
            out.extend_from_slice(nonce.as_slice());
            out.extend_from_slice(&sealed);
            Ok(out)
        }

        fn decrypt(&self, ciphertext: &[u8], password: &str) -> Result<Vec<u8>> {
            if ciphertext.len() < NONCE_LEN {
                return Err(CacheError::Corrupted(format!(
                    "ciphertext shorter than nonce ({} bytes)",
                    ciphertext.len()
                )));
            }
            let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);
            Self::cipher_for(password)
                .decrypt(Nonce::from_slice(nonce), sealed)
                .map_err(|_| {
                    CacheError::Decryption("wrong password or tampered data".to_string())
                })
        }
    }
}
