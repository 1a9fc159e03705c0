//! Command: install the overlay into one game.
use anyhow::Result;

use crate::cli::{GlobalOpts, InstallOpts};
use crate::error::InstallError;
use crate::install::{self, InstallReport, TargetRequest};
use crate::logging::Logger;
use crate::resources::ResourceChange;

/// Run the install command.
///
/// # Errors
///
/// Returns an error if configuration loading fails, the executable choice
/// is ambiguous, the overlay library or install directory is missing, or a
/// link cannot be created.
pub fn run(global: &GlobalOpts, opts: &InstallOpts, log: &Logger) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    let mut store = setup.store();

    log.stage(&format!("Resolving {}", opts.path.display()));
    let request = TargetRequest {
        path: opts.path.clone(),
        exe: opts.exe.clone(),
        module: opts.dll,
        name: opts.name.clone(),
    };
    let resolved = install::resolve_target(&request, &store).inspect_err(|e| {
        if let InstallError::AmbiguousExecutable { candidates, .. } = e {
            for candidate in candidates {
                log.info(&candidate.display().to_string());
            }
        }
    })?;

    match (&resolved.classification, &resolved.record.selected_exe) {
        (Some(classification), Some(exe)) => {
            log.info(&format!("classified {}", exe.display()));
            if classification.is_degraded() {
                log.warn("could not read the import table; check the graphics API");
            }
        }
        (None, Some(exe)) => log.debug(&format!("reusing stored choice {}", exe.display())),
        _ => log.warn("no executable found; using defaults (64-bit, DX11, dxgi)"),
    }
    log.info(&resolved.record.to_string());

    log.stage(&format!("Installing into {}", resolved.record.install_path.display()));
    let report = install::install(&resolved.record, &setup.install_sources(), &mut store)?;
    report_links(&report, log);

    log.stage("Launch options");
    log.info(&report.launch_options);
    Ok(())
}

/// Log what happened to each link of an install.
pub fn report_links(report: &InstallReport, log: &Logger) {
    for link in &report.links {
        match &link.change {
            ResourceChange::Applied => log.info(&format!("linked {}", link.name)),
            ResourceChange::AlreadyCorrect => log.debug(&format!("{} already linked", link.name)),
            ResourceChange::BackedUp { backup } => log.info(&format!(
                "linked {} (original moved to {})",
                link.name,
                backup.display()
            )),
            ResourceChange::Skipped { reason } => {
                log.warn(&format!("skipped {} ({}): {reason}", link.name, link.role));
            }
        }
    }
}
