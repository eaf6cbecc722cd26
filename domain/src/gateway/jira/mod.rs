//! Jira Cloud adapter.
//!
//! A user connects either with an API token (Basic auth against their site) or through
//! Atlassian OAuth 2.0 (3LO). Stored OAuth tokens take precedence. In OAuth mode every
//! call goes through the cloud-routed API (`/ex/jira/{cloud_id}/rest/api/3`), the access
//! token is refreshed once when it is about to expire, and discovery calls are gated on
//! the granted scopes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use integration_auth::api_key::{BasicAuth, BearerTokenAuth, ProviderAuth};
use integration_auth::error::{oauth_error, OAuthErrorKind};
use integration_auth::oauth::providers::atlassian;
use integration_auth::oauth::token::is_expiring;
use integration_auth::oauth::{AccessibleResource, Provider as _};
use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{optional_string, read_json, required_field, send};
use crate::error::{Error, IntegrationErrorKind};
use crate::integration::{
    Integration, Member, OAuthConnect, OAuthConnection, Project, ProjectDiscovery, ProjectRole,
    RoleDiscovery, TaskRequest, TaskResult, UserDiscovery,
};
use crate::{CredentialSet, Id, Vault};

mod assignee;
mod document;

pub const PROVIDER_NAME: &str = "jira";

const PROVIDER_LABEL: &str = "Jira";
const ISSUE_TYPE: &str = "Task";
const USER_PAGE_SIZE: &str = "50";

const PROJECT_SCOPES: [&str; 2] = ["read:jira-work", "read:project:jira"];
const USER_SCOPES: [&str; 2] = ["read:jira-user", "read:user:jira"];
const ROLE_SCOPES: [&str; 3] = [
    "read:jira-work",
    "manage:jira-project",
    "read:project-role:jira",
];

/// OAuth token state kept inside the Jira credential blob.
#[derive(Debug, Clone, PartialEq)]
struct OAuthState {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    obtained_at: i64,
    cloud_id: Option<String>,
    site_url: Option<String>,
    scopes: Vec<String>,
}

impl OAuthState {
    fn from_credentials(data: &CredentialSet) -> Option<Self> {
        Some(Self {
            access_token: optional_string(data, "access_token")?,
            refresh_token: optional_string(data, "refresh_token")?,
            expires_in: integer(data, "expires_in")?,
            obtained_at: integer(data, "obtained_at").unwrap_or_default(),
            cloud_id: optional_string(data, "cloud_id"),
            site_url: optional_string(data, "site_url").map(|u| u.trim_end_matches('/').to_string()),
            scopes: scopes(data.get("scopes")),
        })
    }

    fn is_expiring(&self) -> bool {
        is_expiring(self.obtained_at, self.expires_in, Utc::now().timestamp())
    }

    /// Records the discovered site; its scopes are used only when none were granted.
    fn adopt_resource(&mut self, resource: AccessibleResource) {
        self.cloud_id = Some(resource.id);
        self.site_url = Some(resource.url.trim_end_matches('/').to_string());
        if self.scopes.is_empty() {
            self.scopes = resource.scopes;
        }
    }

    fn write_into(&self, data: &mut CredentialSet) {
        data.insert("access_token".into(), json!(self.access_token));
        data.insert("refresh_token".into(), json!(self.refresh_token));
        data.insert("expires_in".into(), json!(self.expires_in));
        data.insert("obtained_at".into(), json!(self.obtained_at));
        data.insert("scopes".into(), json!(self.scopes));
        if let Some(cloud_id) = &self.cloud_id {
            data.insert("cloud_id".into(), json!(cloud_id));
        }
        if let Some(site_url) = &self.site_url {
            data.insert("site_url".into(), json!(site_url));
        }
    }
}

/// How the stored credentials authenticate.
#[derive(Debug, Clone, PartialEq)]
enum Session {
    Basic {
        base_url: String,
        email: String,
        api_token: String,
    },
    OAuth(OAuthState),
}

impl Session {
    fn from_credentials(data: &CredentialSet) -> Option<Self> {
        if let Some(state) = OAuthState::from_credentials(data) {
            return Some(Session::OAuth(state));
        }
        Some(Session::Basic {
            base_url: optional_string(data, "base_url")?
                .trim_end_matches('/')
                .to_string(),
            email: optional_string(data, "email")?,
            api_token: optional_string(data, "api_token")?,
        })
    }
}

fn integer(data: &CredentialSet, field: &str) -> Option<i64> {
    match data.get(field)? {
        Value::Number(number) => number.as_i64(),
        Value::String(value) => value.trim().parse().ok(),
        _ => None,
    }
}

/// Scopes are stored as an array; a space or comma separated string is also accepted.
fn scopes(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(joined)) => joined
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Resolved per-call state: where to send requests and how to authenticate them.
struct JiraContext {
    api_base: String,
    browse_base: String,
    auth: Box<dyn ProviderAuth>,
    /// Granted scopes; `None` for Basic auth, which is not scope-gated.
    scopes: Option<Vec<String>>,
}

impl JiraContext {
    fn require_scope(&self, accepted: &[&str]) -> Result<(), Error> {
        let Some(granted) = &self.scopes else {
            return Ok(());
        };
        if accepted.iter().any(|scope| granted.iter().any(|g| g == scope)) {
            return Ok(());
        }
        warn!("Jira OAuth grant is missing any of the scopes {accepted:?}");
        Err(Error::integration(IntegrationErrorKind::UnauthorizedScope(
            accepted.join(" or "),
        )))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }
}

#[derive(Debug, Deserialize)]
struct JiraProject {
    id: String,
    key: String,
    name: String,
}

impl From<JiraProject> for Project {
    fn from(project: JiraProject) -> Self {
        Project {
            id: project.id,
            key: project.key,
            name: project.name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraUser {
    account_id: String,
    #[serde(default)]
    account_type: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email_address: Option<String>,
    #[serde(default)]
    avatar_urls: Option<Map<String, Value>>,
}

impl From<JiraUser> for Member {
    fn from(user: JiraUser) -> Self {
        let avatar_url = user.avatar_urls.as_ref().and_then(|urls| {
            urls.get("48x48")
                .or_else(|| urls.values().next())
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        Member {
            id: user.account_id,
            username: None,
            display_name: user.display_name,
            email: user.email_address,
            avatar_url,
            account_type: user.account_type,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleActor {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    actor_user: Option<ActorUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActorUser {
    account_id: String,
}

#[derive(Debug, Deserialize)]
struct RoleDetails {
    #[serde(default)]
    actors: Vec<RoleActor>,
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    id: String,
    key: String,
}

pub struct JiraIntegration {
    vault: Arc<dyn Vault>,
    client: reqwest::Client,
    oauth: Option<atlassian::Provider>,
    api_gateway_url: String,
}

impl JiraIntegration {
    /// `oauth` is `None` when no Atlassian app is configured; Basic auth still works.
    pub fn new(
        vault: Arc<dyn Vault>,
        client: reqwest::Client,
        oauth: Option<atlassian::Provider>,
        api_gateway_url: &str,
    ) -> Self {
        Self {
            vault,
            client,
            oauth,
            api_gateway_url: api_gateway_url.trim_end_matches('/').to_string(),
        }
    }

    fn oauth_provider(&self) -> Result<&atlassian::Provider, Error> {
        self.oauth
            .as_ref()
            .ok_or_else(|| Error::config("Jira OAuth client id and secret are not set"))
    }

    fn not_configured() -> Error {
        Error::integration(IntegrationErrorKind::NotConfigured(
            PROVIDER_NAME.to_string(),
        ))
    }

    /// Loads the session, refreshing and completing OAuth state as needed.
    async fn context(&self, user_id: Id) -> Result<JiraContext, Error> {
        let user_key = user_id.to_string();
        let mut data = self.vault.get(&user_key, PROVIDER_NAME).await?;

        let mut state = match Session::from_credentials(&data) {
            None => return Err(Self::not_configured()),
            Some(Session::Basic {
                base_url,
                email,
                api_token,
            }) => {
                return Ok(JiraContext {
                    api_base: format!("{base_url}/rest/api/3"),
                    browse_base: base_url,
                    auth: Box::new(BasicAuth::new(email, SecretString::new(api_token))),
                    scopes: None,
                })
            }
            Some(Session::OAuth(state)) => state,
        };

        let mut changed = false;
        if state.is_expiring() && self.refresh(&mut state).await {
            changed = true;
            if state.cloud_id.is_none() {
                changed |= self.discover_site(&mut state).await;
            }
        }
        if state.cloud_id.is_none() {
            changed |= self.discover_site(&mut state).await;
        }

        if changed {
            state.write_into(&mut data);
            if let Err(e) = self.vault.save(&user_key, PROVIDER_NAME, &data).await {
                warn!("Could not persist refreshed Jira OAuth state for user {user_id}: {e}");
            }
        }

        let cloud_id = state.cloud_id.clone().ok_or_else(|| {
            warn!("No Jira Cloud site is reachable with the stored token for user {user_id}");
            Self::not_configured()
        })?;
        let cloud_base = format!("{}/ex/jira/{cloud_id}", self.api_gateway_url);

        Ok(JiraContext {
            api_base: format!("{cloud_base}/rest/api/3"),
            browse_base: state.site_url.clone().unwrap_or(cloud_base),
            auth: Box::new(BearerTokenAuth::new(SecretString::new(
                state.access_token.clone(),
            ))),
            scopes: Some(state.scopes),
        })
    }

    /// One refresh-token grant. On failure the stale token is kept.
    async fn refresh(&self, state: &mut OAuthState) -> bool {
        let Some(provider) = &self.oauth else {
            warn!("Jira access token is expiring but no OAuth client is configured to refresh it");
            return false;
        };

        match provider.refresh_token(&state.refresh_token).await {
            Ok(result) => {
                let tokens = result.tokens;
                state.access_token = tokens.access_token.expose_secret().clone();
                state.expires_in = tokens.expires_in;
                state.obtained_at = tokens.obtained_at;
                if result.refresh_token_rotated {
                    if let Some(refresh_token) = tokens.refresh_token {
                        state.refresh_token = refresh_token.expose_secret().clone();
                    }
                }
                if !tokens.scopes.is_empty() {
                    state.scopes = tokens.scopes;
                }
                debug!("Refreshed Jira access token");
                true
            }
            Err(e) => {
                warn!("Jira token refresh failed, continuing with the stored token: {e}");
                false
            }
        }
    }

    /// Best-effort lookup of the first site the token can reach.
    async fn discover_site(&self, state: &mut OAuthState) -> bool {
        let Some(provider) = &self.oauth else {
            return false;
        };

        match provider.accessible_resources(&state.access_token).await {
            Ok(resources) => match resources.into_iter().next() {
                Some(resource) => {
                    debug!("Discovered Jira Cloud site {}", resource.url);
                    state.adopt_resource(resource);
                    true
                }
                None => {
                    warn!("Jira OAuth token has no accessible resources");
                    false
                }
            },
            Err(e) => {
                warn!("Jira accessible-resources lookup failed: {e}");
                false
            }
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        ctx: &JiraContext,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        let request = self
            .client
            .get(ctx.url(path))
            .query(query)
            .header(reqwest::header::ACCEPT, "application/json");
        let response = send(ctx.auth.authenticate(request), PROVIDER_LABEL).await?;
        read_json(response, PROVIDER_LABEL, document::error_message).await
    }

    /// Numeric project ids are turned into keys; anything else is taken as a key.
    async fn project_key(&self, ctx: &JiraContext, target_id: &str) -> Result<String, Error> {
        let target_id = target_id.trim();
        if target_id.is_empty() {
            return Err(Error::integration(IntegrationErrorKind::MissingField(
                "target_id".to_string(),
            )));
        }
        if !target_id.chars().all(|c| c.is_ascii_digit()) {
            return Ok(target_id.to_string());
        }

        let project: JiraProject = self
            .get_json(ctx, &format!("project/{target_id}"), &[])
            .await?;
        debug!("Resolved Jira project {target_id} to key {}", project.key);
        Ok(project.key)
    }

    async fn fetch_assignable(
        &self,
        ctx: &JiraContext,
        project_key: &str,
        query: Option<&str>,
    ) -> Result<Vec<Member>, Error> {
        let mut params = vec![("project", project_key), ("maxResults", USER_PAGE_SIZE)];
        if let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) {
            params.push(("query", query));
        }
        let users: Vec<JiraUser> = self
            .get_json(ctx, "user/assignable/search", &params)
            .await?;
        Ok(users.into_iter().map(Member::from).collect())
    }

    async fn fetch_roles(
        &self,
        ctx: &JiraContext,
        project_key: &str,
    ) -> Result<Vec<ProjectRole>, Error> {
        let roles: Map<String, Value> = self
            .get_json(ctx, &format!("project/{project_key}/role"), &[])
            .await?;

        Ok(roles
            .into_iter()
            .filter_map(|(name, url)| {
                let id = url.as_str()?.trim_end_matches('/').rsplit('/').next()?;
                (!id.is_empty()).then(|| ProjectRole {
                    id: id.to_string(),
                    name,
                })
            })
            .collect())
    }

    async fn fetch_role_members(
        &self,
        ctx: &JiraContext,
        project_key: &str,
        role_id: &str,
    ) -> Result<Vec<Member>, Error> {
        let role: RoleDetails = self
            .get_json(
                ctx,
                &format!("project/{project_key}/role/{}", role_id.trim()),
                &[],
            )
            .await?;

        Ok(role
            .actors
            .into_iter()
            .filter_map(|actor| {
                actor.actor_user.map(|user| Member {
                    id: user.account_id,
                    display_name: actor.display_name,
                    ..Default::default()
                })
            })
            .collect())
    }

    /// People holding any role in the project, without duplicates or service accounts.
    /// Roles that cannot be read are skipped.
    async fn role_member_pool(
        &self,
        ctx: &JiraContext,
        project_key: &str,
    ) -> Result<Vec<Member>, Error> {
        let mut pool: Vec<Member> = Vec::new();
        for role in self.fetch_roles(ctx, project_key).await? {
            let members = match self.fetch_role_members(ctx, project_key, &role.id).await {
                Ok(members) => members,
                Err(e) => {
                    warn!(
                        "Skipping role {} of Jira project {project_key}: {}",
                        role.id,
                        e.message()
                    );
                    continue;
                }
            };
            for member in members {
                if assignee::is_human(&member) && !pool.iter().any(|m| m.id == member.id) {
                    pool.push(member);
                }
            }
        }
        Ok(pool)
    }

    /// Account id for a free-text assignee. `None` leaves the issue unassigned.
    async fn resolve_assignee(
        &self,
        ctx: &JiraContext,
        project_key: &str,
        assignee: &str,
    ) -> Option<String> {
        if assignee::is_account_id(assignee) {
            return Some(assignee.to_string());
        }

        let candidates = match self.fetch_assignable(ctx, project_key, Some(assignee)).await {
            Ok(users) => users,
            Err(e) if matches!(e.status_code(), 401 | 403) => {
                debug!("Assignable user search denied, falling back to project roles");
                match self.role_member_pool(ctx, project_key).await {
                    Ok(members) => members,
                    Err(e) => {
                        warn!("Could not list {project_key} role members to resolve assignee: {e}");
                        return None;
                    }
                }
            }
            Err(e) => {
                warn!("Could not search assignable users in {project_key}: {e}");
                return None;
            }
        };

        match assignee::best_match(assignee, &candidates) {
            Some(member) => Some(member.id.clone()),
            None => {
                info!("No Jira user in {project_key} matches assignee {assignee}, leaving issue unassigned");
                None
            }
        }
    }
}

#[async_trait]
impl Integration for JiraIntegration {
    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    /// Accepts Basic credentials (`base_url`, `email`, `api_token`) or an OAuth token
    /// triple (`access_token`, `refresh_token`, `expires_in`).
    async fn save_credentials(&self, user_id: Id, data: CredentialSet) -> Result<(), Error> {
        let mut normalized = data;

        if let Some(mut state) = OAuthState::from_credentials(&normalized) {
            if integer(&normalized, "obtained_at").is_none() {
                state.obtained_at = Utc::now().timestamp();
            }
            state.write_into(&mut normalized);
        } else {
            let base_url = required_field(&normalized, "base_url")?;
            let email = required_field(&normalized, "email")?;
            let api_token = required_field(&normalized, "api_token")?;

            normalized.insert(
                "base_url".into(),
                json!(base_url.trim_end_matches('/')),
            );
            normalized.insert("email".into(), json!(email));
            normalized.insert("api_token".into(), json!(api_token));
        }

        self.vault
            .save(&user_id.to_string(), PROVIDER_NAME, &normalized)
            .await?;
        info!("Saved Jira credentials for user {user_id}");
        Ok(())
    }

    async fn is_configured(&self, user_id: Id) -> Result<bool, Error> {
        let data = self.vault.get(&user_id.to_string(), PROVIDER_NAME).await?;
        Ok(Session::from_credentials(&data).is_some())
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
        if target_id.trim().is_empty() {
            return Err(Error::integration(IntegrationErrorKind::MissingField(
                "target_id".to_string(),
            )));
        }

        let ctx = self.context(user_id).await?;
        let project_key = self.project_key(&ctx, target_id).await?;

        let mut fields = Map::new();
        fields.insert("project".into(), json!({ "key": project_key }));
        fields.insert("summary".into(), json!(task.title()));
        fields.insert("issuetype".into(), json!({ "name": ISSUE_TYPE }));
        if let Some(description) = task.description() {
            fields.insert("description".into(), document::to_adf(description));
        }
        if let Some(priority) = task.priority() {
            fields.insert("priority".into(), json!({ "name": priority }));
        }
        if let Some(due_date) = task.due_date() {
            fields.insert("duedate".into(), json!(due_date));
        }
        if let Some(assignee) = task.assignee() {
            if let Some(account_id) = self.resolve_assignee(&ctx, &project_key, assignee).await {
                fields.insert("assignee".into(), json!({ "accountId": account_id }));
            }
        }

        let request = self
            .client
            .post(ctx.url("issue"))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&json!({ "fields": fields }));
        let response = send(ctx.auth.authenticate(request), PROVIDER_LABEL).await?;
        let issue: CreatedIssue = read_json(response, PROVIDER_LABEL, document::error_message).await?;

        info!("Created Jira issue {} in project {project_key}", issue.key);
        Ok(TaskResult {
            url: format!("{}/browse/{}", ctx.browse_base, issue.key),
            name: task.title().to_string(),
            id: issue.id,
            key: Some(issue.key),
        })
    }

    fn as_project_discovery(&self) -> Option<&dyn ProjectDiscovery> {
        Some(self)
    }

    fn as_user_discovery(&self) -> Option<&dyn UserDiscovery> {
        Some(self)
    }

    fn as_role_discovery(&self) -> Option<&dyn RoleDiscovery> {
        Some(self)
    }

    fn as_oauth_connect(&self) -> Option<&dyn OAuthConnect> {
        Some(self)
    }
}

#[async_trait]
impl ProjectDiscovery for JiraIntegration {
    async fn projects(&self, user_id: Id) -> Result<Vec<Project>, Error> {
        let ctx = self.context(user_id).await?;
        ctx.require_scope(&PROJECT_SCOPES)?;

        let projects: Vec<JiraProject> = self.get_json(&ctx, "project", &[]).await?;
        Ok(projects.into_iter().map(Project::from).collect())
    }
}

#[async_trait]
impl UserDiscovery for JiraIntegration {
    async fn search_users(&self, user_id: Id, query: &str) -> Result<Vec<Member>, Error> {
        let ctx = self.context(user_id).await?;
        ctx.require_scope(&USER_SCOPES)?;

        let users: Vec<JiraUser> = self
            .get_json(
                &ctx,
                "user/search",
                &[("query", query.trim()), ("maxResults", USER_PAGE_SIZE)],
            )
            .await?;
        Ok(users.into_iter().map(Member::from).collect())
    }

    async fn assignable_users(
        &self,
        user_id: Id,
        target_id: &str,
        query: Option<&str>,
    ) -> Result<Vec<Member>, Error> {
        let ctx = self.context(user_id).await?;
        ctx.require_scope(&USER_SCOPES)?;

        let project_key = self.project_key(&ctx, target_id).await?;
        self.fetch_assignable(&ctx, &project_key, query).await
    }
}

#[async_trait]
impl RoleDiscovery for JiraIntegration {
    async fn roles(&self, user_id: Id, target_id: &str) -> Result<Vec<ProjectRole>, Error> {
        let ctx = self.context(user_id).await?;
        ctx.require_scope(&ROLE_SCOPES)?;

        let project_key = self.project_key(&ctx, target_id).await?;
        self.fetch_roles(&ctx, &project_key).await
    }

    async fn role_members(
        &self,
        user_id: Id,
        target_id: &str,
        role_id: &str,
    ) -> Result<Vec<Member>, Error> {
        let ctx = self.context(user_id).await?;
        ctx.require_scope(&ROLE_SCOPES)?;

        let project_key = self.project_key(&ctx, target_id).await?;
        self.fetch_role_members(&ctx, &project_key, role_id).await
    }
}

#[async_trait]
impl OAuthConnect for JiraIntegration {
    fn authorization_url(&self, state: &str) -> Result<String, Error> {
        Ok(self.oauth_provider()?.authorization_url(state).url)
    }

    async fn exchange_code(
        &self,
        user_id: Id,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<OAuthConnection, Error> {
        let provider = self.oauth_provider()?;
        if code.trim().is_empty() {
            return Err(Error::integration(IntegrationErrorKind::MissingField(
                "code".to_string(),
            )));
        }

        let tokens = provider.exchange_code(code.trim(), redirect_uri).await?;
        let access_token = tokens.access_token.expose_secret().clone();
        let Some(refresh_token) = tokens
            .refresh_token
            .as_ref()
            .map(|t| t.expose_secret().trim().to_string())
            .filter(|t| !t.is_empty())
        else {
            warn!("Atlassian issued no refresh token for user {user_id}; connection not saved");
            return Err(oauth_error(
                OAuthErrorKind::InvalidResponse,
                "no refresh token issued; offline_access was not granted",
            )
            .into());
        };

        let mut state = OAuthState {
            access_token: access_token.clone(),
            refresh_token,
            expires_in: tokens.expires_in,
            obtained_at: tokens.obtained_at,
            cloud_id: None,
            site_url: None,
            scopes: tokens.scopes,
        };
        self.discover_site(&mut state).await;

        let user_key = user_id.to_string();
        let mut data = self.vault.get(&user_key, PROVIDER_NAME).await?;
        state.write_into(&mut data);

        let mut connection = OAuthConnection {
            cloud_id: state.cloud_id.clone(),
            site_url: state.site_url.clone(),
            scopes: state.scopes.clone(),
            ..Default::default()
        };

        match provider.get_user_info(&access_token).await {
            Ok(info) => {
                data.insert("account_id".into(), json!(info.id));
                if let Some(email) = &info.email {
                    data.insert("account_email".into(), json!(email));
                }
                if let Some(name) = &info.name {
                    data.insert("account_name".into(), json!(name));
                }
                connection.account_id = Some(info.id);
                connection.account_email = info.email;
                connection.account_name = info.name;
            }
            Err(e) => warn!("Could not load Atlassian user info after code exchange: {e}"),
        }

        self.vault.save(&user_key, PROVIDER_NAME, &data).await?;
        info!("Connected Jira via OAuth for user {user_id}");
        Ok(connection)
    }
}
