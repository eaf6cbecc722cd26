use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS synthtask")
            .await?;

        // One row per (user, provider). The blob is AES-256-GCM ciphertext produced by
        // the application; the database never sees plaintext credentials.
        let create_table_sql = r#"
            CREATE TABLE IF NOT EXISTS synthtask.integration_credentials (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                user_id UUID NOT NULL,
                provider VARCHAR(64) NOT NULL,
                data_encrypted TEXT NOT NULL,

                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT integration_credentials_user_provider_key UNIQUE (user_id, provider)
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_table_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_integration_credentials_user
                 ON synthtask.integration_credentials(user_id)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS synthtask.integration_credentials")
            .await?;

        Ok(())
    }
}
