//! AES-256-GCM cipher for credential blobs stored at rest.
//!
//! The key is the SHA-256 digest of a server-held secret. Each blob is sealed with a
//! fresh 96-bit nonce which is prepended to the ciphertext; the result is base64-encoded
//! for storage in a text column.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tracing::warn;

use super::CredentialSet;
use crate::error::{credential_error, CredentialErrorKind, Error, ErrorKind};

/// 12-byte nonce size for AES-GCM
const NONCE_SIZE: usize = 12;

fn encryption_err() -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::Credential(CredentialErrorKind::EncryptionFailed),
    }
}

fn decryption_err() -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::Credential(CredentialErrorKind::DecryptionFailed),
    }
}

/// Symmetric cipher bound to one derived key for the lifetime of the process.
#[derive(Clone)]
pub struct VaultCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for VaultCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VaultCipher { .. }")
    }
}

impl VaultCipher {
    /// Derives the vault key from `secret`. An empty secret is rejected.
    pub fn from_secret(secret: &SecretString) -> Result<Self, Error> {
        let secret = secret.expose_secret();
        if secret.trim().is_empty() {
            return Err(credential_error(
                CredentialErrorKind::InvalidSecret,
                "encryption secret must not be empty",
            ));
        }

        let key = Sha256::digest(secret.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| encryption_err())?;

        Ok(Self { cipher })
    }

    /// Encrypts `plaintext` and returns base64(nonce || ciphertext).
    pub fn encrypt(&self, plaintext: &str) -> Result<String, Error> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| encryption_err())?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend(ciphertext);

        Ok(BASE64.encode(combined))
    }

    /// Decrypts a value produced by [`VaultCipher::encrypt`].
    pub fn decrypt(&self, ciphertext_b64: &str) -> Result<String, Error> {
        let combined = BASE64.decode(ciphertext_b64).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Credential(CredentialErrorKind::DecryptionFailed),
        })?;

        if combined.len() < NONCE_SIZE {
            return Err(decryption_err());
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext_bytes = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| decryption_err())?;

        String::from_utf8(plaintext_bytes).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Credential(CredentialErrorKind::DecryptionFailed),
        })
    }

    /// Serializes a credential set to JSON and encrypts it.
    pub fn seal(&self, data: &CredentialSet) -> Result<String, Error> {
        let json = serde_json::to_string(data)?;
        self.encrypt(&json)
    }

    /// Decrypts and parses a stored blob.
    ///
    /// Undecryptable, unparseable or non-object blobs yield an empty set so that a
    /// corrupted record reads exactly like a missing one.
    pub fn open(&self, blob: &str) -> CredentialSet {
        let plaintext = match self.decrypt(blob) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                warn!("Discarding undecryptable credential blob: {e}");
                return CredentialSet::new();
            }
        };

        match serde_json::from_str::<serde_json::Value>(&plaintext) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) => {
                warn!("Discarding credential blob that is not a JSON object");
                CredentialSet::new()
            }
            Err(e) => {
                warn!("Discarding unparseable credential blob: {e}");
                CredentialSet::new()
            }
        }
    }
}
