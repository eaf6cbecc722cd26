//! Entry points for the request layer.
//!
//! Every function takes an already-authenticated user id and a provider name, looks
//! the adapter up in the [`Registry`] and forwards the call. Optional capabilities come
//! back as [`Capability::Unsupported`] when the provider does not offer them; adapter
//! errors are returned unchanged. Nothing here retries.

use log::*;
use serde_json::Value;

use crate::error::{Error, IntegrationErrorKind};
use crate::integration::{
    Board, BoardList, Capability, Member, OAuthConnection, OutcomeStatus, Project, ProjectRole,
    Registry, Targets, TaskOutcome, TaskRequest, TaskResult,
};
use crate::{CredentialSet, Id};

pub async fn connect(
    registry: &Registry,
    user_id: Id,
    provider: &str,
    data: CredentialSet,
) -> Result<(), Error> {
    registry.get(provider)?.save_credentials(user_id, data).await
}

pub async fn disconnect(registry: &Registry, user_id: Id, provider: &str) -> Result<(), Error> {
    registry.get(provider)?.delete_credentials(user_id).await
}

pub async fn is_connected(registry: &Registry, user_id: Id, provider: &str) -> Result<bool, Error> {
    registry.get(provider)?.is_configured(user_id).await
}

/// Containers tasks can be created in: boards when the provider has them, otherwise
/// projects.
pub async fn list_targets(
    registry: &Registry,
    user_id: Id,
    provider: &str,
) -> Result<Capability<Targets>, Error> {
    let adapter = registry.get(provider)?;
    if let Some(discovery) = adapter.as_board_discovery() {
        return Ok(Capability::Supported(Targets::Boards(
            discovery.boards(user_id).await?,
        )));
    }
    if let Some(discovery) = adapter.as_project_discovery() {
        return Ok(Capability::Supported(Targets::Projects(
            discovery.projects(user_id).await?,
        )));
    }
    Ok(Capability::Unsupported)
}

pub async fn boards(
    registry: &Registry,
    user_id: Id,
    provider: &str,
) -> Result<Capability<Vec<Board>>, Error> {
    let adapter = registry.get(provider)?;
    match adapter.as_board_discovery() {
        Some(discovery) => Ok(Capability::Supported(discovery.boards(user_id).await?)),
        None => Ok(Capability::Unsupported),
    }
}

pub async fn lists(
    registry: &Registry,
    user_id: Id,
    provider: &str,
    board_id: &str,
) -> Result<Capability<Vec<BoardList>>, Error> {
    let adapter = registry.get(provider)?;
    match adapter.as_board_discovery() {
        Some(discovery) => Ok(Capability::Supported(
            discovery.lists(user_id, board_id).await?,
        )),
        None => Ok(Capability::Unsupported),
    }
}

pub async fn members(
    registry: &Registry,
    user_id: Id,
    provider: &str,
    board_id: &str,
) -> Result<Capability<Vec<Member>>, Error> {
    let adapter = registry.get(provider)?;
    match adapter.as_board_discovery() {
        Some(discovery) => Ok(Capability::Supported(
            discovery.members(user_id, board_id).await?,
        )),
        None => Ok(Capability::Unsupported),
    }
}

pub async fn board_for_list(
    registry: &Registry,
    user_id: Id,
    provider: &str,
    list_id: &str,
) -> Result<Capability<String>, Error> {
    let adapter = registry.get(provider)?;
    match adapter.as_board_discovery() {
        Some(discovery) => Ok(Capability::Supported(
            discovery.board_for_list(user_id, list_id).await?,
        )),
        None => Ok(Capability::Unsupported),
    }
}

pub async fn projects(
    registry: &Registry,
    user_id: Id,
    provider: &str,
) -> Result<Capability<Vec<Project>>, Error> {
    let adapter = registry.get(provider)?;
    match adapter.as_project_discovery() {
        Some(discovery) => Ok(Capability::Supported(discovery.projects(user_id).await?)),
        None => Ok(Capability::Unsupported),
    }
}

pub async fn search_users(
    registry: &Registry,
    user_id: Id,
    provider: &str,
    query: &str,
) -> Result<Capability<Vec<Member>>, Error> {
    let adapter = registry.get(provider)?;
    match adapter.as_user_discovery() {
        Some(discovery) => Ok(Capability::Supported(
            discovery.search_users(user_id, query).await?,
        )),
        None => Ok(Capability::Unsupported),
    }
}

pub async fn assignable_users(
    registry: &Registry,
    user_id: Id,
    provider: &str,
    target_id: &str,
    query: Option<&str>,
) -> Result<Capability<Vec<Member>>, Error> {
    let adapter = registry.get(provider)?;
    match adapter.as_user_discovery() {
        Some(discovery) => Ok(Capability::Supported(
            discovery.assignable_users(user_id, target_id, query).await?,
        )),
        None => Ok(Capability::Unsupported),
    }
}

pub async fn roles(
    registry: &Registry,
    user_id: Id,
    provider: &str,
    target_id: &str,
) -> Result<Capability<Vec<ProjectRole>>, Error> {
    let adapter = registry.get(provider)?;
    match adapter.as_role_discovery() {
        Some(discovery) => Ok(Capability::Supported(
            discovery.roles(user_id, target_id).await?,
        )),
        None => Ok(Capability::Unsupported),
    }
}

pub async fn role_members(
    registry: &Registry,
    user_id: Id,
    provider: &str,
    target_id: &str,
    role_id: &str,
) -> Result<Capability<Vec<Member>>, Error> {
    let adapter = registry.get(provider)?;
    match adapter.as_role_discovery() {
        Some(discovery) => Ok(Capability::Supported(
            discovery.role_members(user_id, target_id, role_id).await?,
        )),
        None => Ok(Capability::Unsupported),
    }
}

/// Consent URL for providers connected through OAuth.
pub fn authorization_url(
    registry: &Registry,
    provider: &str,
    state: &str,
) -> Result<Capability<String>, Error> {
    let adapter = registry.get(provider)?;
    match adapter.as_oauth_connect() {
        Some(oauth) => Ok(Capability::Supported(oauth.authorization_url(state)?)),
        None => Ok(Capability::Unsupported),
    }
}

pub async fn exchange_code(
    registry: &Registry,
    user_id: Id,
    provider: &str,
    code: &str,
    redirect_uri: Option<&str>,
) -> Result<Capability<OAuthConnection>, Error> {
    let adapter = registry.get(provider)?;
    match adapter.as_oauth_connect() {
        Some(oauth) => Ok(Capability::Supported(
            oauth.exchange_code(user_id, code, redirect_uri).await?,
        )),
        None => Ok(Capability::Unsupported),
    }
}

pub async fn create_task(
    registry: &Registry,
    user_id: Id,
    provider: &str,
    target_id: &str,
    task: &TaskRequest,
) -> Result<TaskResult, Error> {
    let adapter = registry.get(provider)?;
    debug!("Creating {provider} task in target {target_id} for user {user_id}");
    adapter.create_task(user_id, target_id, task).await
}

/// Creates one task from a `{ "target_id": ..., "task": { ... } }` payload.
pub async fn create_task_from_payload(
    registry: &Registry,
    user_id: Id,
    provider: &str,
    payload: &Value,
) -> Result<TaskResult, Error> {
    let target_id = target_id(payload)?;
    let task = match payload.get("task") {
        Some(task @ Value::Object(_)) => parse_task(task)?,
        _ => {
            return Err(Error::integration(IntegrationErrorKind::MissingField(
                "task".to_string(),
            )))
        }
    };
    create_task(registry, user_id, provider, &target_id, &task).await
}

/// Creates every task in order. A failing task is recorded and the batch continues;
/// only an unknown provider fails the whole call.
pub async fn send_tasks(
    registry: &Registry,
    user_id: Id,
    provider: &str,
    target_id: &str,
    tasks: &[TaskRequest],
) -> Result<Vec<TaskOutcome>, Error> {
    let adapter = registry.get(provider)?;
    let mut outcomes = Vec::with_capacity(tasks.len());

    for (index, task) in tasks.iter().enumerate() {
        let status = match adapter.create_task(user_id, target_id, task).await {
            Ok(result) => OutcomeStatus::Created { result },
            Err(e) => {
                warn!("Task {index} of batch for {provider} failed: {}", e.message());
                failure(&e)
            }
        };
        outcomes.push(TaskOutcome {
            index,
            title: task.title().to_string(),
            status,
        });
    }

    let created = outcomes.iter().filter(|o| o.is_success()).count();
    info!(
        "Sent {created} of {} task(s) to {provider} for user {user_id}",
        outcomes.len()
    );
    Ok(outcomes)
}

/// Batch form of [`create_task_from_payload`]: `{ "target_id": ..., "tasks": [ ... ] }`.
/// A task that does not parse is recorded as failed without being sent.
pub async fn send_tasks_from_payload(
    registry: &Registry,
    user_id: Id,
    provider: &str,
    payload: &Value,
) -> Result<Vec<TaskOutcome>, Error> {
    let adapter = registry.get(provider)?;
    let target_id = target_id(payload)?;
    let Some(Value::Array(items)) = payload.get("tasks") else {
        return Err(Error::integration(IntegrationErrorKind::MissingField(
            "tasks".to_string(),
        )));
    };

    let mut outcomes = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let title = item
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();

        let status = match parse_task(item) {
            Ok(task) => match adapter.create_task(user_id, &target_id, &task).await {
                Ok(result) => OutcomeStatus::Created { result },
                Err(e) => {
                    warn!("Task {index} of batch for {provider} failed: {}", e.message());
                    failure(&e)
                }
            },
            Err(e) => failure(&e),
        };
        outcomes.push(TaskOutcome {
            index,
            title,
            status,
        });
    }
    Ok(outcomes)
}

fn failure(error: &Error) -> OutcomeStatus {
    OutcomeStatus::Failed {
        status_code: error.status_code(),
        message: error.message(),
    }
}

fn target_id(payload: &Value) -> Result<String, Error> {
    let target_id = match payload.get("target_id") {
        Some(Value::String(id)) => id.trim().to_string(),
        Some(Value::Number(id)) => id.to_string(),
        _ => String::new(),
    };
    if target_id.is_empty() {
        return Err(Error::integration(IntegrationErrorKind::MissingField(
            "target_id".to_string(),
        )));
    }
    Ok(target_id)
}

fn parse_task(value: &Value) -> Result<TaskRequest, Error> {
    let task: TaskRequest = serde_json::from_value(value.clone()).map_err(|e| {
        Error::integration(IntegrationErrorKind::InvalidRequest(format!(
            "task is malformed: {e}"
        )))
    })?;
    task.validate()?;
    Ok(task)
}
