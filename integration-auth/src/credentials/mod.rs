//! Encrypted per-(user, provider) credential storage.
//!
//! A credential set is an opaque JSON object owned by a provider adapter. Vaults
//! encrypt it as a whole and never inspect its fields.

mod encryption;
mod memory;
mod storage;

pub use encryption::VaultCipher;
pub use memory::MemoryVault;
pub use storage::{CredentialSet, Vault};
