//! Command: remove the overlay from one game.
use anyhow::Result;

use crate::cli::{GlobalOpts, UninstallOpts};
use crate::install;
use crate::logging::Logger;

/// Run the uninstall command.
///
/// # Errors
///
/// Returns an error if configuration loading fails or a link or the store
/// cannot be written.
pub fn run(global: &GlobalOpts, opts: &UninstallOpts, log: &Logger) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    let mut store = setup.store();

    log.stage(&format!("Uninstalling from {}", opts.path.display()));
    let removed = install::uninstall(&opts.path, &setup.config.settings.global_ini, &mut store)?;
    if removed.is_empty() {
        log.info("nothing to remove");
    }
    for name in &removed {
        log.info(&format!("removed {name}"));
    }
    Ok(())
}
