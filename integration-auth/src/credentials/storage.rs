//! Credential vault trait.

use async_trait::async_trait;

use crate::error::Error;

/// Provider-defined credential fields. Stored and returned as a whole.
pub type CredentialSet = serde_json::Map<String, serde_json::Value>;

/// Encrypted storage of one credential set per (user, provider) pair.
///
/// Implementations must:
/// - never persist plaintext
/// - overwrite the whole set on `save` (upsert)
/// - return an empty set from `get` when the pair is absent or its blob is unreadable
#[async_trait]
pub trait Vault: Send + Sync {
    /// Encrypts and stores `data`, replacing any existing set.
    async fn save(&self, user_id: &str, provider: &str, data: &CredentialSet)
        -> Result<(), Error>;

    /// Loads the decrypted set, or an empty one.
    async fn get(&self, user_id: &str, provider: &str) -> Result<CredentialSet, Error>;

    /// Removes the set. Removing a missing set succeeds.
    async fn delete(&self, user_id: &str, provider: &str) -> Result<(), Error>;
}
