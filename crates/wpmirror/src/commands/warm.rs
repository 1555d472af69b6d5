//! `wpmirror warm` command implementation.

use std::path::Path;

use clap::Args;
use wpmirror_config::Config;

use super::build_mirrors;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the warm command.
#[derive(Args)]
pub(crate) struct WarmArgs {
    /// Only warm this route (default: all routes).
    #[arg(short, long)]
    route: Option<String>,
}

impl WarmArgs {
    /// Rebuild the sitemap and every page and asset of the selected routes.
    pub(crate) fn execute(self, config_path: Option<&Path>, version: &str) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(config_path, None)?;
        if config.cache_resolved.directory.is_none() {
            output.warning("No cache directory configured, warmed entries will not persist");
        }

        for mirror in build_mirrors(&config, version, self.route.as_deref())? {
            let summary = mirror.warm_all(|event| output.progress(event))?;
            output.success(&format!(
                "Warmed {}: {} pages, {} assets",
                mirror.route(),
                summary.pages,
                summary.assets
            ));
        }
        Ok(())
    }
}
