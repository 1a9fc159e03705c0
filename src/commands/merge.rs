//! Command: rebuild the merged shader namespace.
use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::Layout;
use crate::logging::Logger;
use crate::shaders::{self, DEFAULT_REPOS, merge::MergeReport};

/// Run the merge command.
///
/// # Errors
///
/// Returns an error if configuration loading fails or the destination
/// cannot be written.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    merge_all(&setup.config.layout, log)?;
    Ok(())
}

/// Merge every tree under the shader root, configured repositories first,
/// with `External_shaders` as the override root.
///
/// # Errors
///
/// Returns an error if the destination cannot be written.
pub fn merge_all(layout: &Layout, log: &Logger) -> Result<MergeReport> {
    log.stage("Merging shaders");
    let sources = shaders::merge_sources(&layout.shaders_dir(), DEFAULT_REPOS);
    let report = shaders::merge::merge(&sources, &layout.external_shaders(), &layout.merged_dir())?;

    for skipped in &report.skipped_sources {
        log.debug(&format!("not present: {}", skipped.display()));
    }
    log.info(&format!(
        "{} file(s) linked, {} duplicate(s) ignored",
        report.linked, report.duplicates
    ));
    Ok(report)
}
