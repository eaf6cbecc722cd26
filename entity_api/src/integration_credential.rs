use super::error::Error;
use entity::integration_credentials::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::debug;
use sea_orm::{
    entity::prelude::*, sea_query::OnConflict, ActiveValue::Set, DatabaseConnection,
};

/// Inserts the encrypted blob for `(user_id, provider)` or replaces the existing one.
///
/// The whole blob is overwritten; callers that need a partial update read, merge and
/// write back. Concurrent writers race and the last one wins.
pub async fn upsert(
    db: &DatabaseConnection,
    user_id: Id,
    provider: &str,
    data_encrypted: String,
) -> Result<Model, Error> {
    debug!("Upserting integration credentials for user_id: {user_id}, provider: {provider}");

    let now = chrono::Utc::now();

    let active_model = ActiveModel {
        id: Set(Id::new_v4()),
        user_id: Set(user_id),
        provider: Set(provider.to_string()),
        data_encrypted: Set(data_encrypted),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    Ok(Entity::insert(active_model)
        .on_conflict(
            OnConflict::columns([Column::UserId, Column::Provider])
                .update_columns([Column::DataEncrypted, Column::UpdatedAt])
                .to_owned(),
        )
        .exec_with_returning(db)
        .await?)
}

/// Finds the credential row for a (user, provider) pair
pub async fn find_by_user_and_provider(
    db: &DatabaseConnection,
    user_id: Id,
    provider: &str,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::Provider.eq(provider))
        .one(db)
        .await?)
}

/// Removes the credential row for a (user, provider) pair. Deleting a missing row is not an error.
pub async fn delete_by_user_and_provider(
    db: &DatabaseConnection,
    user_id: Id,
    provider: &str,
) -> Result<u64, Error> {
    let result = Entity::delete_many()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::Provider.eq(provider))
        .exec(db)
        .await?;

    debug!(
        "Deleted {} integration credential row(s) for user_id: {user_id}, provider: {provider}",
        result.rows_affected
    );

    Ok(result.rows_affected)
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn test_model(provider: &str) -> Model {
        let now = chrono::Utc::now();
        Model {
            id: Id::new_v4(),
            user_id: Id::new_v4(),
            provider: provider.to_string(),
            data_encrypted: "bm9uY2VjaXBoZXJ0ZXh0".to_string(),
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn upsert_returns_the_stored_row() -> Result<(), Error> {
        let model = test_model("trello");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![model.clone()]])
            .into_connection();

        let result = upsert(&db, model.user_id, "trello", model.data_encrypted.clone()).await?;

        assert_eq!(result.user_id, model.user_id);
        assert_eq!(result.provider, "trello");
        assert_eq!(result.data_encrypted, model.data_encrypted);

        Ok(())
    }

    #[tokio::test]
    async fn upsert_targets_the_user_provider_conflict() -> Result<(), Error> {
        let model = test_model("jira");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![model.clone()]])
            .into_connection();

        upsert(&db, model.user_id, "jira", "ciphertext".to_string()).await?;

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);
        let statement = format!("{:?}", log[0]);
        assert!(statement.contains("ON CONFLICT"));
        assert!(statement.contains("DO UPDATE"));

        Ok(())
    }

    #[tokio::test]
    async fn find_by_user_and_provider_returns_none_when_not_found() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results::<Model, Vec<Model>, _>(vec![vec![]])
            .into_connection();

        let result = find_by_user_and_provider(&db, Id::new_v4(), "trello").await?;
        assert!(result.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn find_by_user_and_provider_returns_model_when_found() -> Result<(), Error> {
        let model = test_model("jira");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![model.clone()]])
            .into_connection();

        let result = find_by_user_and_provider(&db, model.user_id, "jira").await?;
        assert_eq!(result.map(|m| m.id), Some(model.id));
        Ok(())
    }

    #[tokio::test]
    async fn delete_by_user_and_provider_is_idempotent() -> Result<(), Error> {
        let user_id = Id::new_v4();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                },
            ])
            .into_connection();

        assert_eq!(delete_by_user_and_provider(&db, user_id, "trello").await?, 1);
        assert_eq!(delete_by_user_and_provider(&db, user_id, "trello").await?, 0);

        assert_eq!(db.into_transaction_log().len(), 2);
        Ok(())
    }
}
