//! Provider integration layer.
//!
//! Turns one internal "create task" request into provider-specific calls (Trello,
//! Jira Cloud) and normalizes their results and errors. Credentials live in an
//! encrypted per-(user, provider) vault; adapters are registered once at startup and
//! reached through the functions in [`dispatch`].

// Re-exports from `entity` crate via `entity_api`
pub use entity_api::{integration_credentials, Id};

pub use integration_auth::credentials::{CredentialSet, MemoryVault, Vault, VaultCipher};

pub mod credential_vault;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod integration;
