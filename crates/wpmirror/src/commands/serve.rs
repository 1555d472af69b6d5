//! `wpmirror serve` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use wpmirror_config::{CliSettings, Config};
use wpmirror_server::{ServerConfig, run_server};

use super::build_mirrors;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Cache directory (overrides config).
    #[arg(long, env = "WPMIRROR_CACHE_DIR")]
    cache_dir: Option<PathBuf>,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(
        self,
        config_path: Option<&Path>,
        version: &str,
    ) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            cache_dir: self.cache_dir,
        };
        let config = Config::load(config_path, Some(&cli_settings))?;
        let mirrors = build_mirrors(&config, version, None)?;

        output.info(&format!(
            "Starting server on {}:{}",
            config.server.host, config.server.port
        ));
        for mirror in &mirrors {
            output.info(&format!(
                "Route: {}/{} -> {}",
                config.prefix,
                mirror.route(),
                mirror.post_type()
            ));
        }
        match &config.cache_resolved.directory {
            Some(directory) => output.info(&format!("Cache directory: {}", directory.display())),
            None => output.info("Cache: in memory"),
        }

        let server_config = ServerConfig {
            host: config.server.host.clone(),
            port: config.server.port,
            prefix: config.prefix.clone(),
        };
        run_server(server_config, mirrors)
            .await
            .map_err(|e| CliError::Server(e.to_string()))?;

        Ok(())
    }
}
