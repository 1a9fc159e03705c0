//! Command: list stored targets.
use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::logging::Logger;

/// Run the list command.
///
/// # Errors
///
/// Returns an error if configuration loading fails.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    let store = setup.store();

    let records = store.list_all();
    if records.is_empty() {
        log.info("no games stored");
        return Ok(());
    }

    log.stage(&format!("{} stored game(s)", records.len()));
    for record in &records {
        log.info(&format!(
            "{record}: {} as {}",
            record.install_path.display(),
            record.dll_override.file_name()
        ));
        if let Some(exe) = &record.selected_exe {
            log.debug(&format!("  exe: {}", exe.display()));
        }
    }
    Ok(())
}
