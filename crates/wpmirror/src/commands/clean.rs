//! `wpmirror clean` command implementation.

use std::path::Path;

use clap::Args;
use wpmirror_config::Config;

use super::build_mirrors;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the clean command.
#[derive(Args)]
pub(crate) struct CleanArgs {
    /// Only clean this route (default: all routes).
    #[arg(short, long)]
    route: Option<String>,
}

impl CleanArgs {
    /// Evict every cache entry of the selected routes.
    pub(crate) fn execute(self, config_path: Option<&Path>, version: &str) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(config_path, None)?;
        if config.cache_resolved.directory.is_none() {
            output.warning("No cache directory configured, nothing to clean");
            return Ok(());
        }

        for mirror in build_mirrors(&config, version, self.route.as_deref())? {
            mirror.clean_cache();
            output.success(&format!("Cleaned {}", mirror.route()));
        }
        Ok(())
    }
}
