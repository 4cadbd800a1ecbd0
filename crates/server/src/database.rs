//! Database operations and connection management

use anyhow::{Context, Result};
use config::DbConfig;
use sqlx::{
    migrate::Migrator,
    postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode},
};
use std::{path::Path, time::Duration};

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Database connection manager
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn new(config: &DbConfig) -> Result<Self> {
        let pool = Self::pool_options()
            .connect_with(connect_options(config)?)
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to database {} at {}:{}",
                    config.name, config.host, config.port
                )
            })?;

        Ok(Self { pool })
    }

    /// Create a pool that only connects on first use
    #[cfg(test)]
    pub fn new_lazy(config: &DbConfig) -> Result<Self> {
        let pool = Self::pool_options().connect_lazy_with(connect_options(config)?);
        Ok(Self { pool })
    }

    fn pool_options() -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
    }

    /// Run database migrations found in `dir`
    pub async fn migrate(&self, dir: &Path) -> Result<()> {
        let migrator = Migrator::new(dir)
            .await
            .with_context(|| format!("Failed to read migrations from {}", dir.display()))?;

        migrator
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;

        Ok(())
    }

    /// Close the database connection
    pub async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Translate the resolved settings into Postgres connection options
pub fn connect_options(config: &DbConfig) -> Result<PgConnectOptions> {
    let port: u16 = config
        .port
        .parse()
        .with_context(|| format!("Invalid database port: {}", config.port))?;

    let ssl_mode: PgSslMode = config
        .ssl_mode
        .parse()
        .with_context(|| format!("Invalid database ssl mode: {}", config.ssl_mode))?;

    Ok(PgConnectOptions::new()
        .host(&config.host)
        .port(port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.name)
        .ssl_mode(ssl_mode))
}
