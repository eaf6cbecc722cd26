//! Standard Bearer token authentication.

use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};

use super::ProviderAuth;

/// Standard Bearer token authentication.
///
/// Uses the standard `Authorization: Bearer <token>` header pattern.
pub struct BearerTokenAuth {
    token: SecretString,
}

impl BearerTokenAuth {
    /// Create a new Bearer token authenticator.
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }
}

impl ProviderAuth for BearerTokenAuth {
    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.token.expose_secret())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_auth_sets_header() {
        let auth = BearerTokenAuth::new(SecretString::new("test_token".to_string()));
        let request = auth
            .authenticate(reqwest::Client::new().get("https://api.atlassian.com/me"))
            .build()
            .unwrap();

        assert_eq!(
            request.headers()["authorization"].to_str().unwrap(),
            "Bearer test_token"
        );
    }
}
