//! `wpmirror pages` command implementation.

use std::path::Path;

use clap::Args;
use wpmirror_config::Config;

use super::build_mirrors;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the pages command.
#[derive(Args)]
pub(crate) struct PagesArgs {
    /// Route to list.
    route: String,
}

impl PagesArgs {
    /// Print every page slug of a route with its title.
    pub(crate) fn execute(self, config_path: Option<&Path>, version: &str) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(config_path, None)?;

        for mirror in build_mirrors(&config, version, Some(&self.route))? {
            for page in mirror.pages()? {
                output.line(&format!("{}/{}\t{}", mirror.route(), page.slug, page.title));
            }
        }
        Ok(())
    }
}
