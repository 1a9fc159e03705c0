//! Command: classify an executable without installing anything.
use anyhow::Result;

use crate::classifier::{self, ClassificationSource};
use crate::cli::ClassifyOpts;
use crate::logging::Logger;

/// Run the classify command.
///
/// # Errors
///
/// Returns an error if the path is not a file.
pub fn run(opts: &ClassifyOpts, log: &Logger) -> Result<()> {
    if !opts.exe.is_file() {
        anyhow::bail!("not a file: {}", opts.exe.display());
    }

    let classification = classifier::classify(&opts.exe);
    log.stage(&opts.exe.display().to_string());
    log.info(&format!("architecture: {}", classification.architecture));
    log.info(&format!("graphics api: {}", classification.api));
    log.info(&format!(
        "override module: {} ({})",
        classification.module.file_name(),
        classification.module.description()
    ));
    match classification.source {
        ClassificationSource::Imports => {}
        ClassificationSource::RawHeader => {
            log.warn("import table unreadable; graphics API assumed from architecture");
        }
        ClassificationSource::Fallback => {
            log.warn("not a readable PE image; using defaults");
        }
    }
    Ok(())
}
