//! Postgres-backed credential vault.
//!
//! One encrypted row per (user, provider) in `integration_credentials`. Only the
//! ciphertext produced by [`VaultCipher`] ever reaches the database.

use std::sync::Arc;

use async_trait::async_trait;
use integration_auth::error::{credential_error, CredentialErrorKind, Error as AuthError};
use log::*;
use sea_orm::DatabaseConnection;
use secrecy::SecretString;
use service::config::Config;

use crate::error::Error;
use crate::{CredentialSet, Id, Vault, VaultCipher};
use entity_api::integration_credential;

/// Derives the vault cipher from the configured encryption secret.
pub fn cipher_from_config(config: &Config) -> Result<VaultCipher, Error> {
    let secret = config
        .encryption_secret()
        .filter(|secret| !secret.trim().is_empty())
        .ok_or_else(|| Error::config("ENCRYPTION_SECRET is not set"))?;

    Ok(VaultCipher::from_secret(&SecretString::new(secret))?)
}

pub struct DbCredentialVault {
    db: Arc<DatabaseConnection>,
    cipher: VaultCipher,
}

impl DbCredentialVault {
    pub fn new(db: Arc<DatabaseConnection>, cipher: VaultCipher) -> Self {
        Self { db, cipher }
    }

    pub fn from_config(db: Arc<DatabaseConnection>, config: &Config) -> Result<Self, Error> {
        Ok(Self::new(db, cipher_from_config(config)?))
    }
}

fn parse_user_id(user_id: &str) -> Result<Id, AuthError> {
    user_id.parse::<Id>().map_err(|e| {
        warn!("Rejecting credential access for malformed user id {user_id}: {e}");
        credential_error(CredentialErrorKind::StorageFailed, "malformed user id")
    })
}

fn storage_error(err: entity_api::error::Error) -> AuthError {
    error!("Credential storage failed: {err:?}");
    AuthError {
        source: Some(Box::new(err)),
        error_kind: integration_auth::ErrorKind::Credential(CredentialErrorKind::StorageFailed),
    }
}

#[async_trait]
impl Vault for DbCredentialVault {
    async fn save(
        &self,
        user_id: &str,
        provider: &str,
        data: &CredentialSet,
    ) -> Result<(), AuthError> {
        let user_id = parse_user_id(user_id)?;
        let sealed = self.cipher.seal(data)?;

        integration_credential::upsert(&self.db, user_id, provider, sealed)
            .await
            .map_err(storage_error)?;

        debug!("Stored {provider} credentials for user {user_id}");
        Ok(())
    }

    async fn get(&self, user_id: &str, provider: &str) -> Result<CredentialSet, AuthError> {
        let user_id = parse_user_id(user_id)?;

        let row = integration_credential::find_by_user_and_provider(&self.db, user_id, provider)
            .await
            .map_err(storage_error)?;

        Ok(row
            .map(|row| self.cipher.open(&row.data_encrypted))
            .unwrap_or_default())
    }

    async fn delete(&self, user_id: &str, provider: &str) -> Result<(), AuthError> {
        let user_id = parse_user_id(user_id)?;

        integration_credential::delete_by_user_and_provider(&self.db, user_id, provider)
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, InternalErrorKind};

    #[test]
    fn test_missing_encryption_secret_is_a_config_error() {
        let config = Config::try_from_iter(["synthtask"]).unwrap();
        let err = cipher_from_config(&config).unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Config)
        );
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_blank_encryption_secret_is_a_config_error() {
        let config = Config::try_from_iter(["synthtask", "--encryption-secret", "   "]).unwrap();
        assert!(cipher_from_config(&config).is_err());
    }

    #[test]
    fn test_configured_secret_builds_a_cipher() {
        let config =
            Config::try_from_iter(["synthtask", "--encryption-secret", "local-dev-secret"]).unwrap();
        assert!(cipher_from_config(&config).is_ok());
    }
}
