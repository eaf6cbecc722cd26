//! Provider adapter contract.
//!
//! Every adapter implements [`Integration`] (credentials plus task creation). Discovery
//! and OAuth are optional capabilities exposed through `as_*` accessors; an adapter that
//! does not offer one returns `None`, which the dispatch layer reports as
//! [`Capability::Unsupported`].

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, IntegrationErrorKind};
use crate::{CredentialSet, Id};

pub mod registry;

pub use registry::Registry;

/// Task body: plain text, or a rich-text document already in the provider's format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskDescription {
    Text(String),
    Document(serde_json::Map<String, Value>),
}

impl TaskDescription {
    /// Flattens the description to plain text; documents contribute their text nodes,
    /// one line per block.
    pub fn plain_text(&self) -> String {
        match self {
            TaskDescription::Text(text) => text.clone(),
            TaskDescription::Document(document) => {
                let mut lines = Vec::new();
                if let Some(Value::Array(blocks)) = document.get("content") {
                    for block in blocks {
                        let mut line = String::new();
                        collect_text(block, &mut line);
                        lines.push(line);
                    }
                }
                lines.join("\n")
            }
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            TaskDescription::Text(text) => text.trim().is_empty(),
            TaskDescription::Document(document) => document.is_empty(),
        }
    }
}

fn collect_text(node: &Value, out: &mut String) {
    if let Some(text) = node.get("text").and_then(Value::as_str) {
        out.push_str(text);
    }
    if let Some(Value::Array(children)) = node.get("content") {
        for child in children {
            collect_text(child, out);
        }
    }
}

/// A provider-neutral "create task" request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<TaskDescription>,
    /// Free-text name or an opaque provider id.
    #[serde(default)]
    pub assignee: Option<String>,
    /// ISO date, `YYYY-MM-DD`.
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

impl TaskRequest {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }

    /// Checks the fields every adapter relies on.
    pub fn validate(&self) -> Result<(), Error> {
        if self.title.trim().is_empty() {
            return Err(Error::integration(IntegrationErrorKind::MissingField(
                "title".to_string(),
            )));
        }
        if let Some(due_date) = self.due_date() {
            NaiveDate::parse_from_str(due_date, "%Y-%m-%d").map_err(|_| {
                Error::integration(IntegrationErrorKind::InvalidRequest(format!(
                    "due_date must be YYYY-MM-DD, got {due_date}"
                )))
            })?;
        }
        Ok(())
    }

    pub fn title(&self) -> &str {
        self.title.trim()
    }

    pub fn description(&self) -> Option<&TaskDescription> {
        self.description.as_ref().filter(|d| !d.is_blank())
    }

    pub fn assignee(&self) -> Option<&str> {
        non_blank(self.assignee.as_deref())
    }

    pub fn due_date(&self) -> Option<&str> {
        non_blank(self.due_date.as_deref())
    }

    pub fn priority(&self) -> Option<&str> {
        non_blank(self.priority.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// What every adapter returns for a created task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Canonical browse URL.
    pub url: String,
    pub name: String,
}

/// Per-task result of a batch send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutcome {
    pub index: usize,
    pub title: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Created { result: TaskResult },
    Failed { status_code: u16, message: String },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Created { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardList {
    pub id: String,
    pub name: String,
}

/// A person (or account) on the provider side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRole {
    pub id: String,
    pub name: String,
}

/// Containers a task can be created in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Targets {
    Boards(Vec<Board>),
    Projects(Vec<Project>),
}

/// Summary of an OAuth connection after a successful code exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OAuthConnection {
    pub cloud_id: Option<String>,
    pub site_url: Option<String>,
    pub scopes: Vec<String>,
    pub account_id: Option<String>,
    pub account_email: Option<String>,
    pub account_name: Option<String>,
}

/// Whether an adapter offers an optional operation.
///
/// `Unsupported` is an answer, not a failure: errors from a supported operation are
/// returned as `Err`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "capability", content = "data", rename_all = "snake_case")]
pub enum Capability<T> {
    Supported(T),
    Unsupported,
}

impl<T> Capability<T> {
    pub fn is_supported(&self) -> bool {
        matches!(self, Capability::Supported(_))
    }
}

#[async_trait]
pub trait Integration: Send + Sync {
    /// Registry key, e.g. `trello`.
    fn provider_name(&self) -> &'static str;

    /// Validates and normalizes `data`, then stores it as the user's whole credential set.
    async fn save_credentials(&self, user_id: Id, data: CredentialSet) -> Result<(), Error>;

    /// True when the stored credentials are usable.
    async fn is_configured(&self, user_id: Id) -> Result<bool, Error>;

    async fn delete_credentials(&self, user_id: Id) -> Result<(), Error>;

    /// Creates a task in the container identified by `target_id` (list, project, ...).
    async fn create_task(
        &self,
        user_id: Id,
        target_id: &str,
        task: &TaskRequest,
    ) -> Result<TaskResult, Error>;

    fn as_board_discovery(&self) -> Option<&dyn BoardDiscovery> {
        None
    }

    fn as_project_discovery(&self) -> Option<&dyn ProjectDiscovery> {
        None
    }

    fn as_user_discovery(&self) -> Option<&dyn UserDiscovery> {
        None
    }

    fn as_role_discovery(&self) -> Option<&dyn RoleDiscovery> {
        None
    }

    fn as_oauth_connect(&self) -> Option<&dyn OAuthConnect> {
        None
    }
}

#[async_trait]
pub trait BoardDiscovery: Send + Sync {
    async fn boards(&self, user_id: Id) -> Result<Vec<Board>, Error>;

    async fn lists(&self, user_id: Id, board_id: &str) -> Result<Vec<BoardList>, Error>;

    async fn members(&self, user_id: Id, board_id: &str) -> Result<Vec<Member>, Error>;

    /// Returns the id of the board that owns `list_id`.
    async fn board_for_list(&self, user_id: Id, list_id: &str) -> Result<String, Error>;
}

#[async_trait]
pub trait ProjectDiscovery: Send + Sync {
    async fn projects(&self, user_id: Id) -> Result<Vec<Project>, Error>;
}

#[async_trait]
pub trait UserDiscovery: Send + Sync {
    async fn search_users(&self, user_id: Id, query: &str) -> Result<Vec<Member>, Error>;

    /// Users that can be assigned tasks in `target_id`, optionally narrowed by `query`.
    async fn assignable_users(
        &self,
        user_id: Id,
        target_id: &str,
        query: Option<&str>,
    ) -> Result<Vec<Member>, Error>;
}

#[async_trait]
pub trait RoleDiscovery: Send + Sync {
    async fn roles(&self, user_id: Id, target_id: &str) -> Result<Vec<ProjectRole>, Error>;

    async fn role_members(
        &self,
        user_id: Id,
        target_id: &str,
        role_id: &str,
    ) -> Result<Vec<Member>, Error>;
}

#[async_trait]
pub trait OAuthConnect: Send + Sync {
    /// Consent URL the user is sent to. `state` is echoed back on the callback.
    fn authorization_url(&self, state: &str) -> Result<String, Error>;

    /// Completes the authorization-code flow and stores the resulting tokens.
    async fn exchange_code(
        &self,
        user_id: Id,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<OAuthConnection, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainErrorKind;
    use serde_json::json;

    #[test]
    fn test_blank_title_is_a_missing_field() {
        let err = TaskRequest::new("   ").validate().unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Integration(IntegrationErrorKind::MissingField("title".to_string()))
        );
    }

    #[test]
    fn test_due_date_must_be_iso() {
        let mut task = TaskRequest::new("Write release notes");
        task.due_date = Some("2024-02-30".to_string());
        assert_eq!(task.validate().unwrap_err().status_code(), 400);

        task.due_date = Some("2024-02-29".to_string());
        assert!(task.validate().is_ok());
    }

    #[test]
    fn test_description_deserializes_as_text_or_document() {
        let task: TaskRequest = serde_json::from_value(json!({
            "title": "Ship it",
            "description": "plain body"
        }))
        .unwrap();
        assert_eq!(
            task.description,
            Some(TaskDescription::Text("plain body".to_string()))
        );

        let task: TaskRequest = serde_json::from_value(json!({
            "title": "Ship it",
            "description": {
                "type": "doc",
                "version": 1,
                "content": [
                    { "type": "paragraph", "content": [{ "type": "text", "text": "first" }] },
                    { "type": "paragraph", "content": [{ "type": "text", "text": "second" }] }
                ]
            }
        }))
        .unwrap();
        let description = task.description().unwrap();
        assert!(matches!(description, TaskDescription::Document(_)));
        assert_eq!(description.plain_text(), "first\nsecond");
    }

    #[test]
    fn test_blank_optional_fields_read_as_absent() {
        let task: TaskRequest = serde_json::from_value(json!({
            "title": " Follow up ",
            "assignee": " ",
            "priority": "",
            "description": ""
        }))
        .unwrap();

        assert_eq!(task.title(), "Follow up");
        assert_eq!(task.assignee(), None);
        assert_eq!(task.priority(), None);
        assert!(task.description().is_none());
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = TaskOutcome {
            index: 1,
            title: "Second".to_string(),
            status: OutcomeStatus::Failed {
                status_code: 400,
                message: "bad list".to_string(),
            },
        };

        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({ "index": 1, "title": "Second", "status": "failed", "status_code": 400, "message": "bad list" })
        );
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_unsupported_capability_is_distinct_from_empty() {
        let empty: Capability<Vec<Board>> = Capability::Supported(vec![]);
        let unsupported: Capability<Vec<Board>> = Capability::Unsupported;

        assert!(empty.is_supported());
        assert!(!unsupported.is_supported());
        assert_eq!(
            serde_json::to_value(&unsupported).unwrap(),
            json!({ "capability": "unsupported" })
        );
    }
}
