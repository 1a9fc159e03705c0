//! Command: re-create the link set of stored games.
use anyhow::Result;

use crate::cli::{GlobalOpts, ReinstallOpts};
use crate::install;
use crate::logging::{EntryStatus, Logger};

/// Run the reinstall command.
///
/// With a path only that stored game is reinstalled; without one every
/// stored game is. A failing game is recorded and the rest continue.
///
/// # Errors
///
/// Returns an error if configuration loading fails, the path is not
/// stored, or any game failed.
pub fn run(global: &GlobalOpts, opts: &ReinstallOpts, log: &Logger) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    let mut store = setup.store();
    let sources = setup.install_sources();

    let records = match &opts.path {
        Some(path) => match store.get(path) {
            Some(record) => vec![record],
            None => anyhow::bail!(
                "{} is not a stored game; run install first",
                path.display()
            ),
        },
        None => store.list_all(),
    };
    if records.is_empty() {
        log.info("no games stored");
        return Ok(());
    }

    for record in records {
        log.stage(&record.to_string());
        match install::install(&record, &sources, &mut store) {
            Ok(report) => {
                super::install::report_links(&report, log);
                let skipped = report.skipped().count();
                if skipped == 0 {
                    log.record(&record.name, EntryStatus::Ok, None);
                } else {
                    let note = format!("{skipped} optional link(s) skipped");
                    log.record(&record.name, EntryStatus::Ok, Some(&note));
                }
            }
            Err(e) => {
                log.error(&e.to_string());
                log.record(&record.name, EntryStatus::Failed, Some(&e.to_string()));
            }
        }
    }

    super::finish(log)
}
