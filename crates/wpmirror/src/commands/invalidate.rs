//! `wpmirror invalidate` command implementation.

use std::path::Path;

use clap::Args;
use wpmirror_config::Config;

use super::build_mirrors;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the invalidate command.
#[derive(Args)]
pub(crate) struct InvalidateArgs {
    /// Page path, e.g. `indicators/gdp` or `indicators` for the index page.
    path: String,

    /// Only refresh this language (default: every translation).
    #[arg(short, long)]
    lang: Option<String>,
}

impl InvalidateArgs {
    /// Re-render the translations of one page.
    pub(crate) fn execute(self, config_path: Option<&Path>, version: &str) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(config_path, None)?;

        let mut refreshed = 0;
        for mirror in build_mirrors(&config, version, None)? {
            refreshed += mirror.invalidate(&self.path, self.lang.as_deref(), |event| {
                output.progress(event);
            })?;
        }

        if refreshed == 0 {
            output.warning(&format!("No page found at {}", self.path));
        } else {
            output.success(&format!("Refreshed {refreshed} page(s)"));
        }
        Ok(())
    }
}
