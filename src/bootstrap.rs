//! Wires settings, backends and modules into a running server.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use bookshelf_kernel::{
    settings::{DatabaseDriver, Settings},
    InitCtx, ModuleRegistry,
};
use bookshelf_media::{ImageStore, ObjectImageStore};
use mongodb::Database;

use crate::modules::{
    self,
    books::repository::{BookRepository, MemoryBookRepository, MongoBookRepository},
};

/// Registered modules plus the backends they were built over.
pub struct App {
    settings: Settings,
    registry: ModuleRegistry,
    database: Option<Database>,
}

impl App {
    /// Connect the configured backends and register every module.
    pub async fn build(settings: Settings) -> anyhow::Result<Self> {
        let mut database = None;
        let repository: Arc<dyn BookRepository> = match settings.database.driver {
            DatabaseDriver::Mongodb => {
                let connected = bookshelf_db::connect(&settings.database).await?;
                let repository: Arc<dyn BookRepository> =
                    Arc::new(MongoBookRepository::new(&connected));
                database = Some(connected);
                repository
            }
            DatabaseDriver::Memory => {
                tracing::warn!("using in-memory book repository; records are lost on exit");
                Arc::new(MemoryBookRepository::new())
            }
        };

        let images = ObjectImageStore::from_settings(&settings.media)
            .await
            .context("failed to set up image store")?;

        let mut app = Self::with_backends(settings, repository, Arc::new(images));
        app.database = database;
        Ok(app)
    }

    /// Register every module over explicit backends. Nothing is connected.
    pub fn with_backends(
        settings: Settings,
        repository: Arc<dyn BookRepository>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &settings, repository, images);

        Self {
            settings,
            registry,
            database: None,
        }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
        };
        self.registry.init_modules(&ctx).await
    }

    /// Apply every module's index migrations. Returns how many were applied;
    /// the in-memory driver has nothing to migrate.
    pub async fn migrate(&self) -> anyhow::Result<usize> {
        let migrations = self.registry.collect_migrations();
        let Some(database) = &self.database else {
            tracing::info!(
                pending = migrations.len(),
                "no document store configured, skipping migrations"
            );
            return Ok(0);
        };

        bookshelf_db::apply_migrations(database, &migrations).await?;
        Ok(migrations.len())
    }

    /// The complete HTTP router, middleware included.
    pub fn router(&self) -> Router {
        bookshelf_http::build_router(&self.registry, &self.settings)
    }

    /// Start modules, serve until shutdown, then stop modules.
    pub async fn serve(&self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
        };
        self.registry.start_modules(&ctx).await?;

        let served = bookshelf_http::start_server(&self.registry, &self.settings).await;
        self.registry.stop_modules().await?;
        served
    }
}

/// Full server lifecycle: build, init, migrate, serve.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        database = ?settings.database.driver,
        media = ?settings.media.backend,
        "bookshelf bootstrap starting"
    );

    let app = App::build(settings).await?;
    app.init().await?;
    let applied = app.migrate().await?;
    tracing::info!(
        modules = app.registry().len(),
        migrations = applied,
        "bookshelf bootstrap complete"
    );

    app.serve().await
}
