//! AES-256-GCM vault encryption for credentials at rest.
//!
//! The master key is derived from an operator passphrase with Argon2id.
//! Encrypted format: `nonce (12 bytes) || ciphertext`.
//!
//! SECURITY: error types never contain plaintext or key material.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use thiserror::Error;

/// Nonce size for AES-256-GCM (96 bits / 12 bytes).
const NONCE_SIZE: usize = 12;

/// Errors from vault encryption operations.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("invalid ciphertext: too short")]
    CiphertextTooShort,

    #[error("key derivation failed")]
    KeyDerivationFailed,
}

/// AES-256-GCM encryption for signing credentials at rest.
///
/// Each encryption call generates a fresh random nonce, so encrypting the
/// same credential twice produces different ciphertext.
pub struct CredentialVault {
    cipher: Aes256Gcm,
}

impl CredentialVault {
    /// Create a vault from a raw 32-byte key.
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }

    /// Derive the vault key from a passphrase using Argon2id.
    ///
    /// OWASP parameters: 19 MiB memory, 2 iterations, parallelism 1. The
    /// salt is a fixed application constant; the passphrase provides the
    /// entropy, and the output is used as a KDF result, not stored for
    /// verification.
    pub fn from_passphrase(passphrase: &str) -> Result<Self, VaultError> {
        use argon2::{Algorithm, Argon2, Params, Version};

        let params =
            Params::new(19456, 2, 1, Some(32)).map_err(|_| VaultError::KeyDerivationFailed)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let salt = b"provenant-vault-v1";
        let mut key = [0u8; 32];
        argon2
            .hash_password_into(passphrase.as_bytes(), salt, &mut key)
            .map_err(|_| VaultError::KeyDerivationFailed)?;

        Ok(Self::new(&key))
    }

    /// Encrypt, returning `nonce (12 bytes) || ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| VaultError::EncryptionFailed)?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt data produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, VaultError> {
        if data.len() < NONCE_SIZE {
            return Err(VaultError::CiphertextTooShort);
        }
        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| VaultError::DecryptionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; 32] {
        let mut key = [0u8; 32];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8;
        }
        key
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let vault = CredentialVault::new(&test_key());
        let plaintext = [0x42u8; 32];

        let encrypted = vault.encrypt(&plaintext).unwrap();
        let decrypted = vault.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let vault1 = CredentialVault::new(&test_key());
        let mut wrong = test_key();
        wrong[0] = 0xff;
        let vault2 = CredentialVault::new(&wrong);

        let encrypted = vault1.encrypt(b"signing key bytes").unwrap();
        assert!(matches!(
            vault2.decrypt(&encrypted),
            Err(VaultError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_random_nonce_produces_different_ciphertexts() {
        let vault = CredentialVault::new(&test_key());
        let a = vault.encrypt(b"same input").unwrap();
        let b = vault.encrypt(b"same input").unwrap();
        assert_ne!(a, b);
        assert_eq!(vault.decrypt(&a).unwrap(), vault.decrypt(&b).unwrap());
    }

    #[test]
    fn test_ciphertext_too_short() {
        let vault = CredentialVault::new(&test_key());
        assert!(matches!(
            vault.decrypt(&[0u8; 5]),
            Err(VaultError::CiphertextTooShort)
        ));
    }

    #[test]
    fn test_same_passphrase_same_key() {
        let vault1 = CredentialVault::from_passphrase("correct horse battery").unwrap();
        let vault2 = CredentialVault::from_passphrase("correct horse battery").unwrap();
        let encrypted = vault1.encrypt(b"key material").unwrap();
        assert_eq!(vault2.decrypt(&encrypted).unwrap(), b"key material");
    }

    #[test]
    fn test_different_passphrases_differ() {
        let vault1 = CredentialVault::from_passphrase("one").unwrap();
        let vault2 = CredentialVault::from_passphrase("two").unwrap();
        let encrypted = vault1.encrypt(b"key material").unwrap();
        assert!(vault2.decrypt(&encrypted).is_err());
    }

    #[test]
    fn test_vault_error_never_contains_secrets() {
        let errors = [
            VaultError::EncryptionFailed,
            VaultError::DecryptionFailed,
            VaultError::CiphertextTooShort,
            VaultError::KeyDerivationFailed,
        ];
        for err in &errors {
            let msg = err.to_string();
            assert!(!msg.contains("key material"), "leaked: {msg}");
            assert!(msg.len() < 64);
        }
    }
}
