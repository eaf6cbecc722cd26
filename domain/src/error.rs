//! Error types for the `domain` layer.
use entity_api::error::{EntityApiErrorKind, Error as EntityApiError};
use integration_auth::error::{
    CredentialErrorKind, Error as AuthError, ErrorKind as AuthErrorKind, HttpErrorKind,
    OAuthErrorKind,
};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. Errors from `entity_api` and `integration-auth` are translated here so
/// that callers of `domain` never depend on those crates directly; [`Error::status_code`]
/// and [`Error::message`] give a request layer what it needs to answer a client.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
    Integration(IntegrationErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Entity(EntityErrorKind),
    Config,
    Other(String),
}

/// Entity errors bubbling up from `entity_api`, reduced to what the domain layer cares about.
#[derive(Debug, PartialEq)]
pub enum EntityErrorKind {
    NotFound,
    DbTransaction,
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    /// A provider answered with a non-2xx status; `message` is its normalized error text.
    Upstream {
        status: u16,
        message: String,
    },
    Other(String),
}

/// Errors raised by provider adapters before or instead of an upstream call.
#[derive(Debug, PartialEq)]
pub enum IntegrationErrorKind {
    /// A required credential or request field is absent or blank.
    MissingField(String),
    /// The request is present but malformed.
    InvalidRequest(String),
    /// No usable credentials are stored for the provider.
    NotConfigured(String),
    /// The OAuth grant lacks every scope that would allow the operation.
    UnauthorizedScope(String),
    NotFound(String),
    UnsupportedProvider(String),
}

impl Error {
    pub fn integration(kind: IntegrationErrorKind) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Integration(kind),
        }
    }

    pub fn upstream(status: u16, message: String) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::External(ExternalErrorKind::Upstream { status, message }),
        }
    }

    pub fn config(message: &str) -> Self {
        Error {
            source: Some(message.to_string().into()),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        }
    }

    /// HTTP status class a request layer should answer with.
    pub fn status_code(&self) -> u16 {
        match &self.error_kind {
            DomainErrorKind::Integration(kind) => match kind {
                IntegrationErrorKind::UnauthorizedScope(_) => 403,
                IntegrationErrorKind::NotFound(_) => 404,
                IntegrationErrorKind::MissingField(_)
                | IntegrationErrorKind::InvalidRequest(_)
                | IntegrationErrorKind::NotConfigured(_)
                | IntegrationErrorKind::UnsupportedProvider(_) => 400,
            },
            DomainErrorKind::External(ExternalErrorKind::Upstream { status, .. }) => *status,
            DomainErrorKind::External(_) => 502,
            DomainErrorKind::Internal(InternalErrorKind::Config) => 400,
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::NotFound)) => 404,
            DomainErrorKind::Internal(_) => 500,
        }
    }

    /// Human readable description, suitable for a response body.
    pub fn message(&self) -> String {
        match &self.error_kind {
            DomainErrorKind::Integration(kind) => match kind {
                IntegrationErrorKind::MissingField(field) => {
                    format!("Missing required field: {field}")
                }
                IntegrationErrorKind::InvalidRequest(reason) => format!("Invalid request: {reason}"),
                IntegrationErrorKind::NotConfigured(provider) => {
                    format!("{provider} credentials are not configured")
                }
                IntegrationErrorKind::UnauthorizedScope(reason) => {
                    format!("Missing OAuth scope: {reason}")
                }
                IntegrationErrorKind::NotFound(what) => format!("Not found: {what}"),
                IntegrationErrorKind::UnsupportedProvider(provider) => {
                    format!("Unsupported provider: {provider}")
                }
            },
            DomainErrorKind::External(ExternalErrorKind::Upstream { message, .. }) => {
                message.clone()
            }
            DomainErrorKind::External(ExternalErrorKind::Network) => {
                "Provider could not be reached".to_string()
            }
            DomainErrorKind::External(ExternalErrorKind::Other(message)) => message.clone(),
            DomainErrorKind::Internal(InternalErrorKind::Config) => match &self.source {
                Some(source) => format!("Configuration error: {source}"),
                None => "Configuration error".to_string(),
            },
            DomainErrorKind::Internal(_) => "Internal error".to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `entity_api` layer to the `domain` layer.
impl From<EntityApiError> for Error {
    fn from(err: EntityApiError) -> Self {
        let entity_error_kind = match err.error_kind {
            EntityApiErrorKind::RecordNotFound => EntityErrorKind::NotFound,
            EntityApiErrorKind::SystemError => EntityErrorKind::DbTransaction,
            _ => EntityErrorKind::Other("EntityErrorKind".to_string()),
        };

        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(entity_error_kind)),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                "Unexpected response from provider".to_string(),
            )),
        }
    }
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        let error_kind = match &err.error_kind {
            AuthErrorKind::Http(HttpErrorKind::Status { code, message }) => {
                DomainErrorKind::External(ExternalErrorKind::Upstream {
                    status: *code,
                    message: message.clone(),
                })
            }
            AuthErrorKind::Http(HttpErrorKind::BuilderFailed) => DomainErrorKind::Internal(
                InternalErrorKind::Other("Failed to build HTTP client".to_string()),
            ),
            AuthErrorKind::Http(_) => DomainErrorKind::External(ExternalErrorKind::Network),
            AuthErrorKind::OAuth(OAuthErrorKind::NotConfigured)
            | AuthErrorKind::Credential(CredentialErrorKind::InvalidSecret) => {
                DomainErrorKind::Internal(InternalErrorKind::Config)
            }
            AuthErrorKind::OAuth(kind) => DomainErrorKind::External(ExternalErrorKind::Other(
                format!("OAuth error: {kind:?}"),
            )),
            AuthErrorKind::Credential(_) => {
                DomainErrorKind::Internal(InternalErrorKind::Other(err.to_string()))
            }
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use integration_auth::error::{credential_error, status_error};

    #[test]
    fn test_integration_errors_map_to_client_statuses() {
        let cases = [
            (IntegrationErrorKind::MissingField("title".to_string()), 400),
            (IntegrationErrorKind::NotConfigured("jira".to_string()), 400),
            (IntegrationErrorKind::UnsupportedProvider("asana".to_string()), 400),
            (IntegrationErrorKind::UnauthorizedScope("read:jira-user".to_string()), 403),
            (IntegrationErrorKind::NotFound("board".to_string()), 404),
        ];

        for (kind, status) in cases {
            assert_eq!(Error::integration(kind).status_code(), status);
        }
    }

    #[test]
    fn test_upstream_status_and_message_pass_through() {
        let err = Error::upstream(409, "Issue type is required".to_string());
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.message(), "Issue type is required");
    }

    #[test]
    fn test_auth_status_error_becomes_upstream() {
        let err: Error = status_error(401, "Unauthorized".to_string()).into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Upstream {
                status: 401,
                message: "Unauthorized".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_vault_secret_is_a_config_error() {
        let err: Error = credential_error(CredentialErrorKind::InvalidSecret, "empty").into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Config)
        );
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.message(), "Configuration error: Credential error: InvalidSecret (empty)");
    }

    #[test]
    fn test_missing_field_message_names_the_field() {
        let err = Error::integration(IntegrationErrorKind::MissingField("api_key".to_string()));
        assert_eq!(err.message(), "Missing required field: api_key");
    }
}
