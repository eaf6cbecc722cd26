use std::collections::HashMap;
use std::sync::Arc;

use integration_auth::http::HttpClientBuilder;
use integration_auth::oauth::providers::atlassian;
use log::*;
use secrecy::SecretString;
use service::config::Config;

use super::Integration;
use crate::error::{Error, IntegrationErrorKind};
use crate::gateway::{jira::JiraIntegration, trello::TrelloIntegration};
use crate::Vault;

/// Immutable provider name → adapter map, built once at startup.
#[derive(Clone)]
pub struct Registry {
    adapters: HashMap<&'static str, Arc<dyn Integration>>,
}

impl Registry {
    pub fn new(adapters: Vec<Arc<dyn Integration>>) -> Self {
        Self {
            adapters: adapters
                .into_iter()
                .map(|adapter| (adapter.provider_name(), adapter))
                .collect(),
        }
    }

    /// Builds every known adapter over a shared HTTP client and vault.
    pub fn from_config(config: &Config, vault: Arc<dyn Vault>) -> Result<Self, Error> {
        let client = HttpClientBuilder::new()
            .with_timeout(config.http_timeout())
            .build()?;

        let trello = TrelloIntegration::new(
            vault.clone(),
            client.clone(),
            config.trello_api_base_url(),
        );

        let oauth = match (
            config.jira_oauth_client_id(),
            config.jira_oauth_client_secret(),
        ) {
            (Some(client_id), Some(client_secret))
                if !client_id.trim().is_empty() && !client_secret.trim().is_empty() =>
            {
                Some(
                    atlassian::Provider::new(
                        client_id.trim().to_string(),
                        SecretString::new(client_secret),
                        config.jira_oauth_redirect_uri().unwrap_or_default(),
                        atlassian::AtlassianUrls::new(
                            config.jira_auth_base_url(),
                            config.jira_api_base_url(),
                        ),
                        client.clone(),
                    )
                    .with_scopes(config.jira_oauth_scopes.clone()),
                )
            }
            _ => {
                info!("Jira OAuth client is not configured; only API-token connections are available");
                None
            }
        };
        let jira = JiraIntegration::new(vault, client, oauth, config.jira_api_base_url());

        let adapters: Vec<Arc<dyn Integration>> = vec![Arc::new(trello), Arc::new(jira)];
        Ok(Self::new(adapters))
    }

    /// Looks up an adapter by case-insensitive name.
    pub fn get(&self, provider: &str) -> Result<Arc<dyn Integration>, Error> {
        let name = provider.trim().to_lowercase();
        self.adapters.get(name.as_str()).cloned().ok_or_else(|| {
            warn!("Requested unknown integration provider: {provider}");
            Error::integration(IntegrationErrorKind::UnsupportedProvider(name))
        })
    }

    /// Registered provider names, sorted.
    pub fn providers(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.adapters.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainErrorKind;
    use crate::{MemoryVault, VaultCipher};

    fn vault() -> Arc<dyn Vault> {
        let cipher =
            VaultCipher::from_secret(&SecretString::new("registry-secret".to_string())).unwrap();
        Arc::new(MemoryVault::new(cipher))
    }

    #[test]
    fn test_registry_contains_known_providers() {
        let config = Config::try_from_iter(["synthtask"]).unwrap();
        let registry = Registry::from_config(&config, vault()).unwrap();

        assert_eq!(registry.providers(), vec!["jira", "trello"]);
        assert_eq!(registry.get(" Trello ").unwrap().provider_name(), "trello");
        assert_eq!(registry.get("JIRA").unwrap().provider_name(), "jira");
    }

    #[test]
    fn test_unknown_provider_fails_fast() {
        let config = Config::try_from_iter(["synthtask"]).unwrap();
        let registry = Registry::from_config(&config, vault()).unwrap();

        let err = registry.get("asana").err().unwrap();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Integration(IntegrationErrorKind::UnsupportedProvider(
                "asana".to_string()
            ))
        );
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_jira_oauth_needs_client_credentials() {
        let config = Config::try_from_iter(["synthtask"]).unwrap();
        let registry = Registry::from_config(&config, vault()).unwrap();
        let jira = registry.get("jira").unwrap();
        assert!(jira
            .as_oauth_connect()
            .unwrap()
            .authorization_url("s")
            .is_err());

        let config = Config::try_from_iter([
            "synthtask",
            "--jira-oauth-client-id",
            "client-1",
            "--jira-oauth-client-secret",
            "secret-1",
            "--jira-oauth-redirect-uri",
            "https://app.example.com/callback",
        ])
        .unwrap();
        let registry = Registry::from_config(&config, vault()).unwrap();
        let url = registry
            .get("jira")
            .unwrap()
            .as_oauth_connect()
            .unwrap()
            .authorization_url("s")
            .unwrap();
        assert!(url.starts_with("https://auth.atlassian.com/authorize?"));
        assert!(url.contains("client_id=client-1"));
    }
}
