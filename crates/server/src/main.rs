//! Shipinator - Main Application Entry Point

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config::{ConfigLoader, RuntimeConfig};
use pipeline::{PipelineLoader, PIPELINE_FILE_NAME};
use std::{
    env,
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};
use types::{utils, PipelineError};

mod api;
mod app;
mod database;

use app::Application;

type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[derive(Debug, Parser)]
#[command(name = "shipinator", version, about = "Shipinator build, test and deploy service")]
struct Cli {
    /// Runtime configuration file; searched for when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding SQL migrations
    #[arg(long, global = true, default_value = "migrations")]
    migrations_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Parse and validate a pipeline file
    CheckPipeline {
        #[arg(default_value = PIPELINE_FILE_NAME)]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env file is normal
    let dotenv_result = dotenv::dotenv();

    let filter = init_logging()?;

    match dotenv_result {
        Ok(path) => info!("Loaded environment variables from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Could not load .env file: {}", e),
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cli.config.as_deref(), &cli.migrations_dir, &filter).await,
        Command::CheckPipeline { path } => check_pipeline(&path),
    }
}

async fn serve(
    config_path: Option<&Path>,
    migrations_dir: &Path,
    filter: &FilterHandle,
) -> Result<()> {
    info!("Starting Shipinator v{}", env!("CARGO_PKG_VERSION"));

    let config = ConfigLoader::load(config_path).context("Failed to load configuration")?;
    apply_log_level(filter, &config)?;
    log_config(&config);

    let app = Application::new(config, migrations_dir)
        .await
        .context("Failed to create application")?;

    info!("Application starting...");
    if let Err(e) = app.run(shutdown_signal()).await {
        tracing::error!("Application error: {:#}", e);
        return Err(e);
    }

    info!("Shipinator shutdown complete");
    Ok(())
}

fn check_pipeline(path: &Path) -> Result<()> {
    match PipelineLoader::load_from_file(path) {
        Ok(doc) => {
            println!("{}: valid ({})", path.display(), doc.stages().join(", "));
            Ok(())
        }
        Err(PipelineError::Validation { issues }) => {
            for issue in &issues {
                eprintln!("  {}", issue);
            }
            bail!(
                "{}: {} validation error{}",
                path.display(),
                issues.len(),
                utils::plural(issues.len())
            )
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load {}", path.display())),
    }
}

/// Initialize logging from `RUST_LOG` and `LOG_FORMAT`.
///
/// The filter sits behind a reload layer so the configured level can take
/// over once the runtime configuration is resolved.
fn init_logging() -> Result<FilterHandle> {
    let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(env_filter);

    let registry = tracing_subscriber::registry().with(filter);

    match log_format.as_str() {
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("Failed to initialize pretty logging")?;
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("Failed to initialize JSON logging")?;
        }
    }

    Ok(handle)
}

/// Switch to the configured log level unless `RUST_LOG` already chose one
fn apply_log_level(filter: &FilterHandle, config: &RuntimeConfig) -> Result<()> {
    if env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return Ok(());
    }

    let level = config.log_level.to_ascii_lowercase();
    let env_filter = EnvFilter::try_new(&level)
        .with_context(|| format!("Invalid log level: {}", config.log_level))?;
    filter
        .reload(env_filter)
        .context("Failed to apply configured log level")?;

    info!("Log level: {}", level);
    Ok(())
}

fn log_config(config: &RuntimeConfig) {
    info!("Listen address: {}", config.listen_addr);
    info!(
        "Database: {}@{}:{}/{} (password {}, sslmode {})",
        config.db.user,
        config.db.host,
        config.db.port,
        config.db.name,
        utils::redact(&config.db.password),
        config.db.ssl_mode
    );
    info!("Artifact path: {}", config.artifact_path);
    if !config.kube_config_path.is_empty() {
        info!("Kubeconfig: {}", config.kube_config_path);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining in-flight requests");
}
