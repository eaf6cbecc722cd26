//! OAuth provider trait and types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::token::{RefreshResult, Tokens};
use crate::error::Error;

/// Authorization request with URL and state.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Authorization URL to redirect the user to.
    pub url: String,
    /// CSRF state parameter, echoed back on the callback.
    pub state: String,
}

/// A site the granted token can reach, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessibleResource {
    /// Cloud id used to route API calls.
    pub id: String,
    /// Site URL (e.g. `https://acme.atlassian.net`).
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Scopes granted on this site.
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// User information retrieved from OAuth provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Provider's unique user identifier.
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Trait for OAuth 2.0 providers.
///
/// Implementations handle platform-specific OAuth flows including:
/// - Authorization URL generation
/// - Authorization code exchange for tokens
/// - Token refresh (including rotating refresh tokens)
/// - Resource discovery and user info retrieval
#[async_trait]
pub trait Provider: Send + Sync {
    /// Builds the consent URL carrying `state`.
    fn authorization_url(&self, state: &str) -> AuthorizationRequest;

    /// Exchange authorization code for access and refresh tokens.
    ///
    /// `redirect_uri` overrides the configured one and must match the URI used for consent.
    async fn exchange_code(&self, code: &str, redirect_uri: Option<&str>)
        -> Result<Tokens, Error>;

    /// Refresh an access token using a refresh token.
    async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshResult, Error>;

    /// Lists the sites the access token can reach.
    ///
    /// Providers without per-site routing report none.
    async fn accessible_resources(
        &self,
        _access_token: &str,
    ) -> Result<Vec<AccessibleResource>, Error> {
        Ok(Vec::new())
    }

    /// Get user information using an access token.
    async fn get_user_info(&self, access_token: &str) -> Result<UserInfo, Error>;
}
