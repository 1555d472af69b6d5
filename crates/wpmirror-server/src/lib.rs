//! HTTP server for wpmirror.
//!
//! Serves every configured route under the mirror prefix:
//! - `GET /<prefix>/<route>[/<slug>]?lg=<lang>`: a mirrored page wrapped in an
//!   HTML shell with its scripts re-inserted
//! - `GET /<prefix>/<route>/<kind>/<path>`: a proxied asset
//!
//! Anything else answers an empty `text/plain` 404.
//!
//! # Quick Start
//!
//! ```ignore
//! use wpmirror_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         host: "127.0.0.1".to_owned(),
//!         port: 7980,
//!         prefix: "/mirror".to_owned(),
//!     };
//!     run_server(config, mirrors).await.unwrap();
//! }
//! ```

mod app;
mod error;
mod handlers;
mod middleware;
mod shell;
mod state;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

pub use error::ServerError;
use state::AppState;
use wpmirror_site::Mirror;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// URL prefix of the mirror (empty or `/...`).
    pub prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7980,
            prefix: String::new(),
        }
    }
}

/// Run the server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address is invalid or the server fails to start.
pub async fn run_server(
    config: ServerConfig,
    mirrors: Vec<Arc<Mirror>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState {
        mirrors,
        prefix: config.prefix.trim_end_matches('/').to_owned(),
    });

    let app = app::create_router(state);

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(address = %addr, prefix = %config.prefix, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}
