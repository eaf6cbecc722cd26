use clap::{Parser, Subcommand};
use domain::credential_vault::DbCredentialVault;
use domain::dispatch;
use domain::error::{Error, IntegrationErrorKind};
use domain::integration::Registry;
use domain::{CredentialSet, Id};
use log::*;
use migration::{Migrator, MigratorTrait};
use serde_json::{json, Value};
use service::{config::Config, logging::Logger};
use std::sync::Arc;

/// Operator tool for the SynthTask integration layer.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Applies pending database migrations
    Migrate,
    /// Lists the registered providers
    Providers,
    /// Stores credentials for a user. Takes a JSON object or `@path` to a file holding one
    Connect {
        #[arg(long)]
        user_id: Id,
        #[arg(long)]
        provider: String,
        #[arg(long)]
        credentials: String,
    },
    /// Removes a user's stored credentials
    Disconnect {
        #[arg(long)]
        user_id: Id,
        #[arg(long)]
        provider: String,
    },
    /// Reports whether a user has usable credentials for a provider
    Status {
        #[arg(long)]
        user_id: Id,
        #[arg(long)]
        provider: String,
    },
    /// Lists the boards or projects tasks can be created in
    Targets {
        #[arg(long)]
        user_id: Id,
        #[arg(long)]
        provider: String,
    },
    /// Lists the lists of a board
    Lists {
        #[arg(long)]
        user_id: Id,
        #[arg(long)]
        provider: String,
        #[arg(long)]
        board_id: String,
    },
    /// Lists the members of a board
    Members {
        #[arg(long)]
        user_id: Id,
        #[arg(long)]
        provider: String,
        #[arg(long)]
        board_id: String,
    },
    /// Prints the board a list belongs to
    BoardForList {
        #[arg(long)]
        user_id: Id,
        #[arg(long)]
        provider: String,
        #[arg(long)]
        list_id: String,
    },
    /// Searches a provider's users
    Users {
        #[arg(long)]
        user_id: Id,
        #[arg(long)]
        provider: String,
        #[arg(long)]
        query: String,
    },
    /// Lists users that can be assigned tasks in a target
    Assignable {
        #[arg(long)]
        user_id: Id,
        #[arg(long)]
        provider: String,
        #[arg(long)]
        target_id: String,
        #[arg(long)]
        query: Option<String>,
    },
    /// Lists the roles of a project, or one role's members with `--role-id`
    Roles {
        #[arg(long)]
        user_id: Id,
        #[arg(long)]
        provider: String,
        #[arg(long)]
        target_id: String,
        #[arg(long)]
        role_id: Option<String>,
    },
    /// Creates one task from `{"target_id": ..., "task": {...}}`, inline or `@path`
    CreateTask {
        #[arg(long)]
        user_id: Id,
        #[arg(long)]
        provider: String,
        #[arg(long)]
        payload: String,
    },
    /// Creates tasks from `{"target_id": ..., "tasks": [...]}`, inline or `@path`
    SendTasks {
        #[arg(long)]
        user_id: Id,
        #[arg(long)]
        provider: String,
        #[arg(long)]
        payload: String,
    },
    /// Prints the OAuth consent URL for a provider
    AuthorizeUrl {
        #[arg(long)]
        provider: String,
        #[arg(long)]
        state: String,
    },
    /// Completes an OAuth connection with the code from the consent redirect
    ExchangeCode {
        #[arg(long)]
        user_id: Id,
        #[arg(long)]
        provider: String,
        #[arg(long)]
        code: String,
        #[arg(long)]
        redirect_uri: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    Logger::init_logger(&cli.config);

    info!("Starting SynthTask integrations [{}]", cli.config.runtime_env());

    let db = match service::init_database(&cli.config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    if let Command::Migrate = cli.command {
        if let Err(e) = Migrator::up(db.as_ref(), None).await {
            error!("Failed to apply migrations: {e}");
            std::process::exit(1);
        }
        info!("Migrations applied");
        return;
    }

    let registry = DbCredentialVault::from_config(db, &cli.config)
        .and_then(|vault| Registry::from_config(&cli.config, Arc::new(vault)));
    let output = match registry {
        Ok(registry) => run(&registry, cli.command).await,
        Err(e) => Err(e),
    };

    match output.and_then(|value| Ok(serde_json::to_string_pretty(&value)?)) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            error!("{} (status {})", e.message(), e.status_code());
            debug!("{e:?}");
            std::process::exit(1);
        }
    }
}

async fn run(registry: &Registry, command: Command) -> Result<Value, Error> {
    let value = match command {
        Command::Migrate => Value::Null,
        Command::Providers => json!(registry.providers()),
        Command::Connect {
            user_id,
            provider,
            credentials,
        } => {
            let data = credential_set(&read_json(&credentials)?)?;
            dispatch::connect(registry, user_id, &provider, data).await?;
            json!({ "connected": true })
        }
        Command::Disconnect { user_id, provider } => {
            dispatch::disconnect(registry, user_id, &provider).await?;
            json!({ "connected": false })
        }
        Command::Status { user_id, provider } => {
            json!({ "connected": dispatch::is_connected(registry, user_id, &provider).await? })
        }
        Command::Targets { user_id, provider } => {
            serde_json::to_value(dispatch::list_targets(registry, user_id, &provider).await?)?
        }
        Command::Lists {
            user_id,
            provider,
            board_id,
        } => serde_json::to_value(dispatch::lists(registry, user_id, &provider, &board_id).await?)?,
        Command::Members {
            user_id,
            provider,
            board_id,
        } => {
            serde_json::to_value(dispatch::members(registry, user_id, &provider, &board_id).await?)?
        }
        Command::BoardForList {
            user_id,
            provider,
            list_id,
        } => serde_json::to_value(
            dispatch::board_for_list(registry, user_id, &provider, &list_id).await?,
        )?,
        Command::Users {
            user_id,
            provider,
            query,
        } => serde_json::to_value(
            dispatch::search_users(registry, user_id, &provider, &query).await?,
        )?,
        Command::Assignable {
            user_id,
            provider,
            target_id,
            query,
        } => serde_json::to_value(
            dispatch::assignable_users(
                registry,
                user_id,
                &provider,
                &target_id,
                query.as_deref(),
            )
            .await?,
        )?,
        Command::Roles {
            user_id,
            provider,
            target_id,
            role_id: None,
        } => serde_json::to_value(
            dispatch::roles(registry, user_id, &provider, &target_id).await?,
        )?,
        Command::Roles {
            user_id,
            provider,
            target_id,
            role_id: Some(role_id),
        } => serde_json::to_value(
            dispatch::role_members(registry, user_id, &provider, &target_id, &role_id).await?,
        )?,
        Command::CreateTask {
            user_id,
            provider,
            payload,
        } => {
            let payload = read_json(&payload)?;
            serde_json::to_value(
                dispatch::create_task_from_payload(registry, user_id, &provider, &payload).await?,
            )?
        }
        Command::SendTasks {
            user_id,
            provider,
            payload,
        } => {
            let payload = read_json(&payload)?;
            serde_json::to_value(
                dispatch::send_tasks_from_payload(registry, user_id, &provider, &payload).await?,
            )?
        }
        Command::AuthorizeUrl { provider, state } => {
            serde_json::to_value(dispatch::authorization_url(registry, &provider, &state)?)?
        }
        Command::ExchangeCode {
            user_id,
            provider,
            code,
            redirect_uri,
        } => serde_json::to_value(
            dispatch::exchange_code(
                registry,
                user_id,
                &provider,
                &code,
                redirect_uri.as_deref(),
            )
            .await?,
        )?,
    };
    Ok(value)
}

/// Parses a JSON argument, reading it from a file when it starts with `@`.
fn read_json(argument: &str) -> Result<Value, Error> {
    let text = match argument.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            Error::integration(IntegrationErrorKind::InvalidRequest(format!(
                "cannot read {path}: {e}"
            )))
        })?,
        None => argument.to_string(),
    };
    serde_json::from_str(&text).map_err(|e| {
        Error::integration(IntegrationErrorKind::InvalidRequest(format!(
            "payload is not valid JSON: {e}"
        )))
    })
}

fn credential_set(value: &Value) -> Result<CredentialSet, Error> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        _ => Err(Error::integration(IntegrationErrorKind::InvalidRequest(
            "credentials must be a JSON object".to_string(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_send_tasks_arguments_parse() {
        let cli = Cli::try_parse_from([
            "synthtask",
            "send-tasks",
            "--user-id",
            "5f1c8a1e-2b3d-4c5e-8f90-123456789abc",
            "--provider",
            "trello",
            "--payload",
            r#"{"target_id":"l1","tasks":[]}"#,
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::SendTasks { ref provider, .. } if provider == "trello"));
    }

    #[test]
    fn test_malformed_user_id_is_rejected() {
        let result = Cli::try_parse_from([
            "synthtask",
            "status",
            "--user-id",
            "not-a-uuid",
            "--provider",
            "jira",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_inline_json_is_parsed() {
        let value = read_json(r#"{"api_key":"k","token":"t"}"#).unwrap();
        let set = credential_set(&value).unwrap();
        assert_eq!(set.get("api_key"), Some(&json!("k")));
    }

    #[test]
    fn test_non_object_credentials_are_rejected() {
        let err = credential_set(&json!(["k"])).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(read_json("{not json").is_err());
        assert!(read_json("@/nonexistent/payload.json").is_err());
    }
}
