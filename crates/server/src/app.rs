//! Main application structure and lifecycle management

use crate::{api::ApiServer, database::Database};
use anyhow::{Context, Result};
use config::RuntimeConfig;
use std::{future::Future, path::Path, sync::Arc};
use tracing::info;

/// Main application state, immutable once built
#[derive(Debug)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub database: Database,
}

/// Main application that coordinates all components
pub struct Application {
    state: Arc<AppState>,
    api_server: ApiServer,
}

impl Application {
    /// Create a new application instance
    pub async fn new(config: RuntimeConfig, migrations_dir: &Path) -> Result<Self> {
        info!("Initializing application components...");

        // Initialize database
        let database = Database::new(&config.db)
            .await
            .context("Failed to create database pool")?;

        // Run database migrations
        info!("Running database migrations from {}", migrations_dir.display());
        database
            .migrate(migrations_dir)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations complete");

        // Create shared application state
        let state = Arc::new(AppState { config, database });

        // Initialize API server
        let api_server = ApiServer::new(state.clone()).context("Failed to create API server")?;

        info!("Application components initialized successfully");

        Ok(Self { state, api_server })
    }

    /// Serve until `shutdown` resolves, then release resources
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Starting application services...");

        let Self { state, api_server } = self;
        api_server
            .run(shutdown)
            .await
            .context("API server error")?;
        info!("API server stopped");

        Self::shutdown(&state).await
    }

    async fn shutdown(state: &AppState) -> Result<()> {
        info!("Shutting down application...");

        state
            .database
            .close()
            .await
            .context("Failed to close database")?;
        info!("Database connections closed");

        info!("Application shutdown complete");
        Ok(())
    }
}
