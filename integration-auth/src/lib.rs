//! # integration-auth
//!
//! Authentication building blocks for third-party task trackers:
//! - Credential vault primitives (AES-256-GCM cipher, `Vault` trait, in-memory vault)
//! - Request authenticators for static credentials (query key/token, Basic, Bearer)
//! - OAuth 2.0 authorization-code infrastructure and the Atlassian provider
//! - HTTP client building with a bounded timeout
//!
//! ## Architecture
//!
//! The `domain` crate builds its provider adapters on top of this crate:
//! - the Trello adapter uses `QueryKeyAuth`
//! - the Jira adapter uses `BasicAuth` or `BearerTokenAuth`, plus `oauth::providers::atlassian`
//!   for consent, code exchange, refresh and resource discovery
//!
//! ## Usage
//!
//! ```rust,ignore
//! use integration_auth::{
//!     api_key::{ProviderAuth, QueryKeyAuth},
//!     credentials::{MemoryVault, Vault, VaultCipher},
//!     http::HttpClientBuilder,
//! };
//! ```

pub mod api_key;
pub mod credentials;
pub mod error;
pub mod http;
pub mod oauth;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
