//! In-process vault holding ciphertext in a map. Used by tests and local runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CredentialSet, Vault, VaultCipher};
use crate::error::Error;

type VaultKey = (String, String);

pub struct MemoryVault {
    cipher: VaultCipher,
    blobs: RwLock<HashMap<VaultKey, String>>,
}

impl MemoryVault {
    pub fn new(cipher: VaultCipher) -> Self {
        Self {
            cipher,
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the stored ciphertext for a pair.
    pub async fn raw_blob(&self, user_id: &str, provider: &str) -> Option<String> {
        self.blobs
            .read()
            .await
            .get(&(user_id.to_string(), provider.to_string()))
            .cloned()
    }

    /// Stores a blob as-is, bypassing encryption.
    pub async fn put_raw_blob(&self, user_id: &str, provider: &str, blob: String) {
        self.blobs
            .write()
            .await
            .insert((user_id.to_string(), provider.to_string()), blob);
    }
}

#[async_trait]
impl Vault for MemoryVault {
    async fn save(
        &self,
        user_id: &str,
        provider: &str,
        data: &CredentialSet,
    ) -> Result<(), Error> {
        let sealed = self.cipher.seal(data)?;
        self.put_raw_blob(user_id, provider, sealed).await;
        Ok(())
    }

    async fn get(&self, user_id: &str, provider: &str) -> Result<CredentialSet, Error> {
        Ok(self
            .raw_blob(user_id, provider)
            .await
            .map(|blob| self.cipher.open(&blob))
            .unwrap_or_default())
    }

    async fn delete(&self, user_id: &str, provider: &str) -> Result<(), Error> {
        self.blobs
            .write()
            .await
            .remove(&(user_id.to_string(), provider.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use serde_json::json;

    fn vault() -> MemoryVault {
        let cipher = VaultCipher::from_secret(&SecretString::new("test-secret".to_string()))
            .unwrap();
        MemoryVault::new(cipher)
    }

    fn credentials() -> CredentialSet {
        json!({ "base_url": "https://acme.atlassian.net", "email": "a@b.c", "api_token": "t" })
            .as_object()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn save_then_get_returns_equal_set() -> Result<(), Error> {
        let vault = vault();
        vault.save("user-1", "jira", &credentials()).await?;

        assert_eq!(vault.get("user-1", "jira").await?, credentials());
        Ok(())
    }

    #[tokio::test]
    async fn stored_blob_is_not_plaintext() -> Result<(), Error> {
        let vault = vault();
        vault.save("user-1", "jira", &credentials()).await?;

        let blob = vault.raw_blob("user-1", "jira").await.unwrap();
        assert!(!blob.contains("api_token"));
        assert!(!blob.contains("acme.atlassian.net"));
        Ok(())
    }

    #[tokio::test]
    async fn save_overwrites_whole_set() -> Result<(), Error> {
        let vault = vault();
        vault.save("user-1", "jira", &credentials()).await?;

        let replacement = json!({ "access_token": "a" }).as_object().cloned().unwrap();
        vault.save("user-1", "jira", &replacement).await?;

        assert_eq!(vault.get("user-1", "jira").await?, replacement);
        Ok(())
    }

    #[tokio::test]
    async fn get_on_missing_or_corrupted_pair_is_empty() -> Result<(), Error> {
        let vault = vault();
        assert!(vault.get("user-1", "trello").await?.is_empty());

        vault
            .put_raw_blob("user-1", "trello", "garbage".to_string())
            .await;
        assert!(vault.get("user-1", "trello").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_scoped_to_pair() -> Result<(), Error> {
        let vault = vault();
        vault.save("user-1", "jira", &credentials()).await?;
        vault.save("user-2", "jira", &credentials()).await?;

        vault.delete("user-1", "jira").await?;
        vault.delete("user-1", "jira").await?;

        assert!(vault.get("user-1", "jira").await?.is_empty());
        assert_eq!(vault.get("user-2", "jira").await?, credentials());
        Ok(())
    }
}
