//! Provider gateways: the concrete [`crate::integration::Integration`] adapters.
//!
//! Helpers shared by the adapters live here: credential field extraction and
//! turning provider responses into domain results.

use log::*;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{DomainErrorKind, Error, ExternalErrorKind, IntegrationErrorKind};
use crate::CredentialSet;

pub mod jira;
pub mod trello;

/// Returns the trimmed, non-empty string value of `field`.
pub(crate) fn required_field(data: &CredentialSet, field: &str) -> Result<String, Error> {
    optional_string(data, field)
        .ok_or_else(|| Error::integration(IntegrationErrorKind::MissingField(field.to_string())))
}

/// Returns the trimmed string value of `field`, if present and non-empty.
pub(crate) fn optional_string(data: &CredentialSet, field: &str) -> Option<String> {
    match data.get(field) {
        Some(Value::String(value)) => {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        }
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    }
}

/// Sends a request, logging transport failures.
pub(crate) async fn send(request: RequestBuilder, provider: &str) -> Result<Response, Error> {
    request.send().await.map_err(|e| {
        warn!("Request to {provider} failed before a response arrived: {e:?}");
        Error::from(e)
    })
}

/// Parses a 2xx body as `T`; any other status becomes an upstream error carrying the
/// original status and the message `extract_message` pulls out of the body.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    provider: &str,
    extract_message: fn(&str) -> String,
) -> Result<T, Error> {
    let response = check_status(response, provider, extract_message).await?;
    response.json::<T>().await.map_err(|e| {
        warn!("Failed to parse {provider} response: {e:?}");
        Error {
            source: Some(Box::new(e)),
            error_kind: DomainErrorKind::External(ExternalErrorKind::Other(format!(
                "Invalid response from {provider}"
            ))),
        }
    })
}

/// Passes a 2xx response through and turns anything else into an upstream error.
pub(crate) async fn check_status(
    response: Response,
    provider: &str,
    extract_message: fn(&str) -> String,
) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let mut message = extract_message(&body);
    if message.trim().is_empty() {
        message = status.canonical_reason().unwrap_or("Unknown error").to_string();
    }

    warn!("{provider} API returned {status}: {message}");
    Err(Error::upstream(status.as_u16(), message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credential_set(value: Value) -> CredentialSet {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_required_field_trims_and_rejects_blank_values() {
        let data = credential_set(json!({ "api_key": "  abc  ", "token": "   " }));

        assert_eq!(required_field(&data, "api_key").unwrap(), "abc");

        let err = required_field(&data, "token").unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Integration(IntegrationErrorKind::MissingField("token".to_string()))
        );
        assert!(required_field(&data, "missing").is_err());
    }

    #[test]
    fn test_optional_string_accepts_numbers() {
        let data = credential_set(json!({ "expires_in": 3600, "flag": true }));
        assert_eq!(optional_string(&data, "expires_in"), Some("3600".to_string()));
        assert_eq!(optional_string(&data, "flag"), None);
    }

    #[tokio::test]
    async fn test_non_success_status_is_preserved() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/thing")
            .with_status(422)
            .with_body("raw failure")
            .create_async()
            .await;

        let response = reqwest::get(format!("{}/thing", server.url())).await.unwrap();
        let err = read_json::<Value>(response, "Test", |body| body.to_string())
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 422);
        assert_eq!(err.message(), "raw failure");
    }

    #[tokio::test]
    async fn test_empty_error_body_falls_back_to_reason_phrase() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/thing")
            .with_status(404)
            .create_async()
            .await;

        let response = reqwest::get(format!("{}/thing", server.url())).await.unwrap();
        let err = check_status(response, "Test", |body| body.to_string())
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 404);
        assert_eq!(err.message(), "Not Found");
    }
}
