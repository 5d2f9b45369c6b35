//! MongoDB client factory and index migrations.
//!
//! The connection is an explicitly constructed handle passed to whoever needs it;
//! nothing here is process-global.

use anyhow::Context;
use bookshelf_kernel::{settings::DatabaseSettings, Migration};
use mongodb::{
    bson::{doc, Document},
    options::IndexOptions,
    Client, Database, IndexModel,
};

/// Connect to the configured deployment and verify it answers a ping.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Database> {
    let client = Client::with_uri_str(&settings.url)
        .await
        .context("invalid database connection string")?;
    let database = client.database(&settings.name);

    database
        .run_command(doc! { "ping": 1 })
        .await
        .context("database did not answer ping")?;

    tracing::info!(target: "bookshelf-db", database = %settings.name, "database connected");
    Ok(database)
}

/// Ensure every index declared by the registered modules exists.
///
/// Index creation is idempotent, so this runs on every boot.
pub async fn apply_migrations(
    database: &Database,
    migrations: &[(String, Migration)],
) -> anyhow::Result<()> {
    for (module, migration) in migrations {
        let model = index_model(migration);
        database
            .collection::<Document>(migration.collection)
            .create_index(model)
            .await
            .with_context(|| {
                format!("migration '{}' of module '{}' failed", migration.id, module)
            })?;

        tracing::info!(
            target: "bookshelf-db",
            module = %module,
            migration = migration.id,
            collection = migration.collection,
            "migration applied"
        );
    }
    Ok(())
}

fn index_model(migration: &Migration) -> IndexModel {
    let mut keys = Document::new();
    for (field, order) in migration.keys {
        keys.insert(*field, order.as_i32());
    }

    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .name(migration.id.to_string())
                .unique(migration.unique)
                .build(),
        )
        .build()
}
