//! Trello adapter.
//!
//! Key and token are sent as query parameters on every call. Cards are created in a
//! list; boards, lists and board members are available for discovery.

use std::sync::Arc;

use async_trait::async_trait;
use integration_auth::api_key::{ProviderAuth, QueryKeyAuth};
use log::*;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;

use super::{optional_string, read_json, required_field, send};
use crate::error::{Error, IntegrationErrorKind};
use crate::integration::{
    Board, BoardDiscovery, BoardList, Integration, Member, TaskRequest, TaskResult,
};
use crate::{CredentialSet, Id, Vault};

pub const PROVIDER_NAME: &str = "trello";

const PROVIDER_LABEL: &str = "Trello";
const CARD_FOOTER: &str = "\n---\n_Created by SynthTask_";
/// Card links resolve by card id when Trello omits both URLs.
const CARD_LINK_BASE: &str = "https://trello.com/c";

#[derive(Debug, Deserialize)]
struct TrelloProfile {
    #[serde(default)]
    username: Option<String>,
    #[serde(default, rename = "fullName")]
    full_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrelloMember {
    id: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default, rename = "fullName")]
    full_name: Option<String>,
    #[serde(default, rename = "avatarUrl")]
    avatar_url: Option<String>,
}

impl From<TrelloMember> for Member {
    fn from(member: TrelloMember) -> Self {
        Member {
            id: member.id,
            username: member.username,
            display_name: member.full_name,
            avatar_url: member.avatar_url,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct TrelloListBoard {
    #[serde(default, rename = "idBoard")]
    id_board: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrelloCard {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "shortUrl")]
    short_url: Option<String>,
}

impl TrelloCard {
    fn browse_url(&self) -> String {
        [&self.url, &self.short_url]
            .into_iter()
            .flatten()
            .map(|url| url.trim())
            .find(|url| !url.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{CARD_LINK_BASE}/{}", self.id))
    }
}

pub struct TrelloIntegration {
    vault: Arc<dyn Vault>,
    client: reqwest::Client,
    base_url: String,
}

impl TrelloIntegration {
    pub fn new(vault: Arc<dyn Vault>, client: reqwest::Client, base_url: &str) -> Self {
        Self {
            vault,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Loads the stored key/token pair, or fails with NotConfigured.
    async fn credentials(&self, user_id: Id) -> Result<QueryKeyAuth, Error> {
        let data = self.vault.get(&user_id.to_string(), PROVIDER_NAME).await?;
        auth_from(&data).ok_or_else(|| {
            Error::integration(IntegrationErrorKind::NotConfigured(PROVIDER_NAME.to_string()))
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        auth: &QueryKeyAuth,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        let request = auth.authenticate(self.client.get(self.url(path)).query(query));
        let response = send(request, PROVIDER_LABEL).await?;
        read_json(response, PROVIDER_LABEL, error_message).await
    }

    /// Adds profile fields to a new credential set. Failures are logged and ignored.
    async fn enrich_profile(&self, auth: &QueryKeyAuth, data: &mut CredentialSet) {
        match self
            .get_json::<TrelloProfile>(auth, "members/me", &[("fields", "username,fullName,email")])
            .await
        {
            Ok(profile) => {
                let fields = [
                    ("username", profile.username),
                    ("fullName", profile.full_name),
                    ("email", profile.email),
                ];
                for (field, value) in fields {
                    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                        data.insert(field.to_string(), Value::String(value));
                    }
                }
            }
            Err(e) => warn!("Could not load Trello profile, saving credentials without it: {e}"),
        }
    }
}

fn auth_from(data: &CredentialSet) -> Option<QueryKeyAuth> {
    let api_key = optional_string(data, "api_key")?;
    let token = optional_string(data, "token")?;
    Some(QueryKeyAuth::new(
        SecretString::new(api_key),
        SecretString::new(token),
    ))
}

/// Extracts a readable message from a Trello error body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("message").and_then(Value::as_str) {
            Some("Invalid objectId") => "Invalid idList or idMembers".to_string(),
            Some(message) => message.to_string(),
            None => body.to_string(),
        },
        _ => body.to_string(),
    }
}

/// Trello member ids are 24 hex characters.
fn is_member_id(value: &str) -> bool {
    value.len() == 24 && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// Card body followed by the task metadata Trello has no native field for.
fn card_description(task: &TaskRequest) -> String {
    let mut description = task
        .description()
        .map(|d| d.plain_text())
        .unwrap_or_default();
    description.push_str("\n\n");

    if let Some(priority) = task.priority() {
        description.push_str(&format!("**Priority:** {priority}\n"));
    }
    if let Some(assignee) = task.assignee() {
        description.push_str(&format!("**Assignee:** {assignee}\n"));
    }
    if let Some(due_date) = task.due_date() {
        description.push_str(&format!("**Due:** {due_date}\n"));
    }
    description.push_str(CARD_FOOTER);
    description
}

fn card_params(list_id: &str, task: &TaskRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("idList", list_id.to_string()),
        ("name", task.title().to_string()),
        ("desc", card_description(task)),
    ];
    if let Some(due_date) = task.due_date() {
        params.push(("due", due_date.to_string()));
    }
    match task.assignee() {
        Some(assignee) if is_member_id(assignee) => {
            params.push(("idMembers", assignee.to_string()))
        }
        Some(assignee) => debug!("Trello assignee {assignee} is not a member id, leaving the card unassigned"),
        None => {}
    }
    params
}

#[async_trait]
impl Integration for TrelloIntegration {
    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn save_credentials(&self, user_id: Id, data: CredentialSet) -> Result<(), Error> {
        let api_key = required_field(&data, "api_key")?;
        let token = required_field(&data, "token")?;

        let mut normalized = data;
        normalized.insert("api_key".to_string(), Value::String(api_key.clone()));
        normalized.insert("token".to_string(), Value::String(token.clone()));

        let auth = QueryKeyAuth::new(SecretString::new(api_key), SecretString::new(token));
        self.enrich_profile(&auth, &mut normalized).await;

        self.vault
            .save(&user_id.to_string(), PROVIDER_NAME, &normalized)
            .await?;
        info!("Saved Trello credentials for user {user_id}");
        Ok(())
    }

    async fn is_configured(&self, user_id: Id) -> Result<bool, Error> {
        let data = self.vault.get(&user_id.to_string(), PROVIDER_NAME).await?;
        Ok(auth_from(&data).is_some())
    }

    async fn delete_credentials(&self, user_id: Id) -> Result<(), Error> {
        self.vault.delete(&user_id.to_string(), PROVIDER_NAME).await?;
        Ok(())
    }

    async fn create_task(
        &self,
        user_id: Id,
        target_id: &str,
        task: &TaskRequest,
    ) -> Result<TaskResult, Error> {
        task.validate()?;
        let list_id = target_id.trim();
        if list_id.is_empty() {
            return Err(Error::integration(IntegrationErrorKind::MissingField(
                "target_id".to_string(),
            )));
        }

        let auth = self.credentials(user_id).await?;
        let params = card_params(list_id, task);
        let request = auth.authenticate(self.client.post(self.url("cards")).query(&params));

        let response = send(request, PROVIDER_LABEL).await?;
        let card: TrelloCard = read_json(response, PROVIDER_LABEL, error_message).await?;

        info!("Created Trello card {} in list {list_id}", card.id);
        Ok(TaskResult {
            url: card.browse_url(),
            name: card.name.unwrap_or_else(|| task.title().to_string()),
            id: card.id,
            key: None,
        })
    }

    fn as_board_discovery(&self) -> Option<&dyn BoardDiscovery> {
        Some(self)
    }
}

#[async_trait]
impl BoardDiscovery for TrelloIntegration {
    async fn boards(&self, user_id: Id) -> Result<Vec<Board>, Error> {
        let auth = self.credentials(user_id).await?;
        self.get_json(&auth, "members/me/boards", &[("fields", "id,name")])
            .await
    }

    async fn lists(&self, user_id: Id, board_id: &str) -> Result<Vec<BoardList>, Error> {
        let auth = self.credentials(user_id).await?;
        let path = format!("boards/{}/lists", urlencoding::encode(board_id.trim()));
        self.get_json(&auth, &path, &[("fields", "id,name")]).await
    }

    async fn members(&self, user_id: Id, board_id: &str) -> Result<Vec<Member>, Error> {
        let auth = self.credentials(user_id).await?;
        let path = format!("boards/{}/members", urlencoding::encode(board_id.trim()));
        let members: Vec<TrelloMember> = self
            .get_json(&auth, &path, &[("fields", "id,username,fullName,avatarUrl")])
            .await?;
        Ok(members.into_iter().map(Member::from).collect())
    }

    async fn board_for_list(&self, user_id: Id, list_id: &str) -> Result<String, Error> {
        let auth = self.credentials(user_id).await?;
        let path = format!("lists/{}", urlencoding::encode(list_id.trim()));
        let list: TrelloListBoard = self.get_json(&auth, &path, &[("fields", "idBoard")]).await?;

        list.id_board.filter(|id| !id.is_empty()).ok_or_else(|| {
            Error::integration(IntegrationErrorKind::NotFound(format!(
                "board for list {list_id}"
            )))
        })
    }
}
