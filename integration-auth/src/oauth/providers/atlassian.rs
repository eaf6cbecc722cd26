//! Atlassian OAuth 2.0 (3LO) provider implementation.
//!
//! Handles the authorization-code flow for Jira Cloud:
//! - consent URL generation (`audience=api.atlassian.com`, `prompt=consent`)
//! - code exchange and refresh against `/oauth/token`
//! - discovery of the cloud sites the token can reach
//! - user info retrieval (`/oauth/userinfo`, falling back to `/me`)
//!
//! The token endpoint is tried with a JSON body first, then a form body, then a form
//! body with HTTP Basic client authentication; the last failure is returned.

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{oauth_error, Error, ErrorKind, OAuthErrorKind};
use crate::http::ensure_success;
use crate::oauth::token::{RefreshResult, Tokens};
use crate::oauth::{AccessibleResource, AuthorizationRequest, UserInfo};

pub const DEFAULT_AUTH_BASE_URL: &str = "https://auth.atlassian.com";
pub const DEFAULT_API_BASE_URL: &str = "https://api.atlassian.com";

const AUDIENCE: &str = "api.atlassian.com";
const OFFLINE_ACCESS: &str = "offline_access";
const DEFAULT_EXPIRES_IN: i64 = 3600;

/// Base URLs of the Atlassian authorization server and API gateway.
#[derive(Debug, Clone)]
pub struct AtlassianUrls {
    pub auth_base_url: String,
    pub api_base_url: String,
}

impl AtlassianUrls {
    pub fn new(auth_base_url: &str, api_base_url: &str) -> Self {
        Self {
            auth_base_url: auth_base_url.trim_end_matches('/').to_string(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn token_url(&self) -> String {
        format!("{}/oauth/token", self.auth_base_url)
    }
}

impl Default for AtlassianUrls {
    fn default() -> Self {
        Self::new(DEFAULT_AUTH_BASE_URL, DEFAULT_API_BASE_URL)
    }
}

/// How a token request is encoded and how the client authenticates.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TokenTransport {
    Json,
    Form,
    FormWithBasicAuth,
}

const TOKEN_TRANSPORTS: [TokenTransport; 3] = [
    TokenTransport::Json,
    TokenTransport::Form,
    TokenTransport::FormWithBasicAuth,
];

/// OAuth token response from Atlassian
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn into_tokens(self) -> Tokens {
        Tokens {
            access_token: SecretString::new(self.access_token),
            refresh_token: self.refresh_token.map(SecretString::new),
            expires_in: self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
            obtained_at: Utc::now().timestamp(),
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            scopes: self
                .scope
                .unwrap_or_default()
                .split_whitespace()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// `GET /oauth/userinfo` payload
#[derive(Debug, Deserialize)]
struct OpenIdUserInfo {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// `GET /me` payload
#[derive(Debug, Deserialize)]
struct AccountProfile {
    account_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    nickname: Option<String>,
}

/// Atlassian OAuth provider.
pub struct Provider {
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    scopes: Vec<String>,
    urls: AtlassianUrls,
    http_client: reqwest::Client,
}

impl Provider {
    /// Create a new Atlassian OAuth provider.
    ///
    /// # Arguments
    ///
    /// * `client_id` - Atlassian developer app client ID
    /// * `client_secret` - Atlassian developer app client secret
    /// * `redirect_uri` - Callback URI registered with the app
    /// * `urls` - Authorization server and API gateway base URLs
    /// * `http_client` - Shared client (see [`crate::http::HttpClientBuilder`])
    pub fn new(
        client_id: String,
        client_secret: SecretString,
        redirect_uri: String,
        urls: AtlassianUrls,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            scopes: vec![OFFLINE_ACCESS.to_string()],
            urls,
            http_client,
        }
    }

    /// Sets the consent scopes. `offline_access` is always requested so a refresh token is issued.
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut scopes: Vec<String> = scopes
            .into_iter()
            .map(|scope| {
                let scope: String = scope.into();
                scope.trim().to_string()
            })
            .filter(|scope| !scope.is_empty())
            .collect();
        if !scopes.iter().any(|s| s == OFFLINE_ACCESS) {
            scopes.push(OFFLINE_ACCESS.to_string());
        }
        self.scopes = scopes;
        self
    }

    async fn request_token(
        &self,
        grant: &[(&'static str, String)],
        failure: OAuthErrorKind,
    ) -> Result<Tokens, Error> {
        let mut last_error = None;

        for transport in TOKEN_TRANSPORTS {
            match self.send_token_request(transport, grant).await {
                Ok(tokens) => return Ok(tokens),
                Err(e) => {
                    debug!("Atlassian token request via {transport:?} failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| oauth_error(failure, "no token transport attempted")))
    }

    async fn send_token_request(
        &self,
        transport: TokenTransport,
        grant: &[(&'static str, String)],
    ) -> Result<Tokens, Error> {
        let mut params: Vec<(&str, &str)> = grant.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let request = self.http_client.post(self.urls.token_url());
        let request = match transport {
            TokenTransport::Json => {
                params.push(("client_id", self.client_id.as_str()));
                params.push(("client_secret", self.client_secret.expose_secret().as_str()));
                let body: serde_json::Map<String, serde_json::Value> = params
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), serde_json::Value::from(v)))
                    .collect();
                request.json(&body)
            }
            TokenTransport::Form => {
                params.push(("client_id", self.client_id.as_str()));
                params.push(("client_secret", self.client_secret.expose_secret().as_str()));
                request.form(&params)
            }
            TokenTransport::FormWithBasicAuth => request
                .basic_auth(&self.client_id, Some(self.client_secret.expose_secret().as_str()))
                .form(&params),
        };

        let response = ensure_success(request.send().await?).await?;
        let tokens: TokenResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse Atlassian token response: {:?}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::OAuth(OAuthErrorKind::InvalidResponse),
            }
        })?;

        Ok(tokens.into_tokens())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, Error> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        ensure_success(response).await?.json().await.map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::OAuth(OAuthErrorKind::InvalidResponse),
        })
    }
}

#[async_trait]
impl crate::oauth::Provider for Provider {
    fn authorization_url(&self, state: &str) -> AuthorizationRequest {
        let scopes = self.scopes.join(" ");

        let url = format!(
            "{}/authorize?\
            audience={}&\
            client_id={}&\
            scope={}&\
            redirect_uri={}&\
            state={}&\
            response_type=code&\
            prompt=consent",
            self.urls.auth_base_url,
            urlencoding::encode(AUDIENCE),
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&scopes),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(state)
        );

        AuthorizationRequest {
            url,
            state: state.to_string(),
        }
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<Tokens, Error> {
        debug!("Exchanging Atlassian OAuth code for tokens");

        let grant = [
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            (
                "redirect_uri",
                redirect_uri.unwrap_or(&self.redirect_uri).to_string(),
            ),
        ];

        let tokens = self
            .request_token(&grant, OAuthErrorKind::TokenExchangeFailed)
            .await?;
        info!("Successfully exchanged Atlassian OAuth code for tokens");
        Ok(tokens)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshResult, Error> {
        debug!("Refreshing Atlassian access token");

        let grant = [
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.to_string()),
        ];

        let tokens = self
            .request_token(&grant, OAuthErrorKind::TokenRefreshFailed)
            .await?;

        let rotated = tokens
            .refresh_token
            .as_ref()
            .is_some_and(|new| new.expose_secret() != refresh_token);

        Ok(if rotated {
            RefreshResult::with_rotation(tokens)
        } else {
            RefreshResult::no_rotation(tokens)
        })
    }

    async fn accessible_resources(
        &self,
        access_token: &str,
    ) -> Result<Vec<AccessibleResource>, Error> {
        let url = format!(
            "{}/oauth/token/accessible-resources",
            self.urls.api_base_url
        );
        self.get_json(&url, access_token).await
    }

    async fn get_user_info(&self, access_token: &str) -> Result<UserInfo, Error> {
        let userinfo_url = format!("{}/oauth/userinfo", self.urls.api_base_url);
        match self
            .get_json::<OpenIdUserInfo>(&userinfo_url, access_token)
            .await
        {
            Ok(info) => {
                return Ok(UserInfo {
                    id: info.sub,
                    email: info.email,
                    name: info.name,
                })
            }
            Err(e) => debug!("Atlassian userinfo endpoint failed, trying /me: {e}"),
        }

        let me_url = format!("{}/me", self.urls.api_base_url);
        let profile: AccountProfile = self.get_json(&me_url, access_token).await?;
        Ok(UserInfo {
            id: profile.account_id,
            email: profile.email,
            name: profile.name.or(profile.nickname),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::Provider as _;
    use mockito::Matcher;

    fn provider(server: &mockito::Server) -> Provider {
        Provider::new(
            "client-id".to_string(),
            SecretString::new("client-secret".to_string()),
            "https://app.example.com/jira/callback".to_string(),
            AtlassianUrls::new(&server.url(), &server.url()),
            reqwest::Client::new(),
        )
    }

    #[tokio::test]
    async fn authorization_url_requests_consent_and_offline_access() {
        let server = mockito::Server::new_async().await;
        let provider = provider(&server).with_scopes(["read:jira-work", "write:jira-work"]);

        let request = provider.authorization_url("state-123");

        assert!(request.url.starts_with(&format!("{}/authorize?", server.url())));
        assert!(request.url.contains("audience=api.atlassian.com"));
        assert!(request.url.contains("client_id=client-id"));
        assert!(request
            .url
            .contains("scope=read%3Ajira-work%20write%3Ajira-work%20offline_access"));
        assert!(request.url.contains("state=state-123"));
        assert!(request.url.contains("response_type=code"));
        assert!(request.url.contains("prompt=consent"));
        assert_eq!(request.state, "state-123");
    }

    #[tokio::test]
    async fn exchange_code_sends_json_grant() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .match_body(Matcher::Json(serde_json::json!({
                "grant_type": "authorization_code",
                "code": "the-code",
                "redirect_uri": "https://other.example.com/cb",
                "client_id": "client-id",
                "client_secret": "client-secret"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"access_token":"at","refresh_token":"rt","expires_in":3600,"scope":"read:jira-work offline_access"}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let tokens = provider(&server)
            .exchange_code("the-code", Some("https://other.example.com/cb"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(tokens.access_token.expose_secret(), "at");
        assert_eq!(tokens.expires_in, 3600);
        assert_eq!(tokens.scopes, vec!["read:jira-work", "offline_access"]);
        assert!(!tokens.is_expiring());
    }

    #[tokio::test]
    async fn token_request_falls_back_to_form_then_basic_auth() {
        let mut server = mockito::Server::new_async().await;
        let json_mock = server
            .mock("POST", "/oauth/token")
            .match_header("content-type", "application/json")
            .with_status(400)
            .with_body(r#"{"error":"unsupported_content_type"}"#)
            .expect(1)
            .create_async()
            .await;
        let form_mock = server
            .mock("POST", "/oauth/token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_header("authorization", Matcher::Missing)
            .with_status(401)
            .with_body(r#"{"error":"invalid_client"}"#)
            .expect(1)
            .create_async()
            .await;
        let basic_mock = server
            .mock("POST", "/oauth/token")
            .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
            .match_body(Matcher::UrlEncoded(
                "grant_type".to_string(),
                "refresh_token".to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"access_token":"new-at","refresh_token":"new-rt","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let result = provider(&server).refresh_token("old-rt").await.unwrap();

        json_mock.assert_async().await;
        form_mock.assert_async().await;
        basic_mock.assert_async().await;
        assert!(result.refresh_token_rotated);
        assert_eq!(result.tokens.access_token.expose_secret(), "new-at");
    }

    #[tokio::test]
    async fn token_request_returns_last_error_when_all_transports_fail() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/token")
            .with_status(403)
            .with_body("invalid_grant")
            .expect(3)
            .create_async()
            .await;

        let err = provider(&server).refresh_token("rt").await.unwrap_err();

        assert_eq!(err.status(), Some(403));
    }

    #[tokio::test]
    async fn accessible_resources_lists_cloud_sites() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/oauth/token/accessible-resources")
            .match_header("authorization", "Bearer at")
            .with_status(200)
            .with_body(
                r#"[{"id":"cloud-1","url":"https://acme.atlassian.net","name":"acme","scopes":["read:jira-work"],"avatarUrl":"x"}]"#,
            )
            .create_async()
            .await;

        let resources = provider(&server).accessible_resources("at").await.unwrap();

        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].id, "cloud-1");
        assert_eq!(resources[0].url, "https://acme.atlassian.net");
        assert_eq!(resources[0].scopes, vec!["read:jira-work"]);
    }

    #[tokio::test]
    async fn get_user_info_falls_back_to_me() {
        let mut server = mockito::Server::new_async().await;
        let _userinfo = server
            .mock("GET", "/oauth/userinfo")
            .with_status(404)
            .create_async()
            .await;
        let _me = server
            .mock("GET", "/me")
            .with_status(200)
            .with_body(r#"{"account_id":"557058:abc","email":"ana@example.com","nickname":"ana"}"#)
            .create_async()
            .await;

        let info = provider(&server).get_user_info("at").await.unwrap();

        assert_eq!(info.id, "557058:abc");
        assert_eq!(info.email.as_deref(), Some("ana@example.com"));
        assert_eq!(info.name.as_deref(), Some("ana"));
    }
}
