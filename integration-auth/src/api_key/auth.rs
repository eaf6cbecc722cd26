//! Request authentication trait and static-credential implementations.

use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};

/// Trait for authenticating outbound provider requests.
///
/// Implementations handle provider-specific authentication patterns like:
/// - Trello: `?key=xxx&token=yyy`
/// - Jira Cloud (API token): `Authorization: Basic base64(email:token)`
/// - Jira Cloud (OAuth): `Authorization: Bearer xxx`
pub trait ProviderAuth: Send + Sync {
    /// Apply authentication to a request builder.
    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder;
}

/// Key/token pair sent as query parameters.
pub struct QueryKeyAuth {
    key: SecretString,
    token: SecretString,
}

impl QueryKeyAuth {
    pub fn new(key: SecretString, token: SecretString) -> Self {
        Self { key, token }
    }
}

impl ProviderAuth for QueryKeyAuth {
    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        request.query(&[
            ("key", self.key.expose_secret().as_str()),
            ("token", self.token.expose_secret().as_str()),
        ])
    }
}

/// HTTP Basic authentication with a username and secret password.
pub struct BasicAuth {
    username: String,
    password: SecretString,
}

impl BasicAuth {
    pub fn new(username: String, password: SecretString) -> Self {
        Self { username, password }
    }
}

impl ProviderAuth for BasicAuth {
    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.username, Some(self.password.expose_secret()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::new(value.to_string())
    }

    #[test]
    fn test_query_key_auth_appends_key_and_token() {
        let auth = QueryKeyAuth::new(secret("k"), secret("t"));
        let request = auth
            .authenticate(reqwest::Client::new().get("https://api.trello.com/1/members/me"))
            .build()
            .unwrap();

        assert_eq!(request.url().query(), Some("key=k&token=t"));
    }

    #[test]
    fn test_basic_auth_sets_authorization_header() {
        let auth = BasicAuth::new("me@example.com".to_string(), secret("api-token"));
        let request = auth
            .authenticate(reqwest::Client::new().get("https://acme.atlassian.net/rest/api/3/project"))
            .build()
            .unwrap();

        let header = request.headers()["authorization"].to_str().unwrap().to_string();
        assert!(header.starts_with("Basic "));
        assert!(request.headers()["authorization"].is_sensitive());
    }
}
