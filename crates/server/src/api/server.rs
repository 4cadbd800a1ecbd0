//! HTTP API server implementation

use crate::api::routes;
use crate::app::AppState;
use anyhow::{Context, Result};
use axum::Router;
use std::{future::Future, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, info, Level};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP API server
pub struct ApiServer {
    app: Router,
    addrs: Vec<String>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(state: Arc<AppState>) -> Result<Self> {
        let addrs = bind_addresses(&state.config.listen_addr)?;

        let app = routes::create_routes()
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
            .with_state(state);

        info!("API server configured for {}", addrs.join(" or "));

        Ok(Self { app, addrs })
    }

    /// Serve requests until `shutdown` resolves, letting in-flight requests finish
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = bind_first(&self.addrs).await?;

        info!("API server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("API server error")?;

        Ok(())
    }
}

/// Socket addresses to try, in order, for a configured listen address.
///
/// A bare `:port` prefers the IPv6 wildcard, which also accepts IPv4 on a
/// dual-stack host, and falls back to the IPv4 wildcard.
pub fn bind_addresses(listen_addr: &str) -> Result<Vec<String>> {
    let listen_addr = listen_addr.trim();
    let (host, port) = listen_addr
        .rsplit_once(':')
        .with_context(|| format!("Invalid listen address {listen_addr:?}: missing port"))?;

    port.parse::<u16>()
        .with_context(|| format!("Invalid listen address {listen_addr:?}: bad port {port:?}"))?;

    if host.is_empty() {
        Ok(vec![format!("[::]:{port}"), format!("0.0.0.0:{port}")])
    } else {
        Ok(vec![listen_addr.to_string()])
    }
}

async fn bind_first(addrs: &[String]) -> Result<TcpListener> {
    let mut last_error = None;
    for addr in addrs {
        match TcpListener::bind(addr.as_str()).await {
            Ok(listener) => return Ok(listener),
            Err(e) => {
                debug!("Could not bind to {}: {}", addr, e);
                let error = anyhow::Error::new(e).context(format!("Failed to bind to {addr}"));
                last_error = Some(error);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("No listen address configured")))
}
