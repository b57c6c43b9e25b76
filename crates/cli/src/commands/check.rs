//! Check command handler.
//!
//! Runs the load-time validation path from the terminal: parses the
//! site file, validates the library configuration, and compiles both
//! templates against the declared variables.

use clap::Args;
use librarian_core::{AppResult, SiteConfig};
use librarian_prompt::TemplateSet;
use std::path::PathBuf;

/// Validate a site configuration file
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Path to the site configuration file
    pub site: PathBuf,
}

impl CheckCommand {
    /// Execute the check command.
    pub async fn execute(&self) -> AppResult<()> {
        let site = SiteConfig::load(&self.site)?;
        TemplateSet::compile(&site)?;

        let mode = if site.is_weighted() {
            "weighted"
        } else {
            "unweighted"
        };

        println!(
            "Site '{}' is valid: {} libraries ({}), {} passages per question",
            site.site_id,
            site.libraries.len(),
            mode,
            site.source_count
        );

        Ok(())
    }
}
