pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_schema_and_integration_credentials;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(
            m20260301_000001_create_schema_and_integration_credentials::Migration,
        )]
    }

    fn migration_table_name() -> DynIden {
        Alias::new("synthtask_migrations").into_iden()
    }
}
