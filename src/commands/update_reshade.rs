//! Command: download the newest overlay release and the shader compiler.
use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::logging::{EntryStatus, Logger};
use crate::sources::{
    self, OverlayUpdate,
    tools::SevenZip,
    web::{FirefoxCompiler, HttpClient, ReshadeWebsite},
};
use crate::target::Architecture;

/// Run the update-reshade command.
///
/// # Errors
///
/// Returns an error if configuration loading or the overlay update fails,
/// or if a compiler library could not be fetched.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    let layout = &setup.config.layout;
    let http = HttpClient::new();

    log.stage("Updating ReShade");
    let releases = ReshadeWebsite::new(http.clone());
    let update = sources::update_overlay(
        &releases,
        &SevenZip,
        layout,
        setup.config.settings.addon_support,
    )
    .context("updating ReShade")?;
    match &update {
        OverlayUpdate::Downloaded { version } => log.info(&format!("installed ReShade {version}")),
        OverlayUpdate::AlreadyPresent { version } => {
            log.info(&format!("ReShade {version} is up to date"));
        }
    }
    log.record("ReShade", EntryStatus::Ok, Some(update.version()));

    log.stage("Fetching d3dcompiler_47.dll");
    let compiler = FirefoxCompiler::new(http, SevenZip);
    for architecture in [Architecture::X86, Architecture::X64] {
        let name = format!("d3dcompiler_47 {architecture}");
        match sources::ensure_compiler(&compiler, layout, architecture) {
            Ok(true) => log.record(&name, EntryStatus::Ok, Some("downloaded")),
            Ok(false) => log.record(&name, EntryStatus::Skipped, Some("already present")),
            Err(e) => {
                log.error(&e.to_string());
                log.record(&name, EntryStatus::Failed, Some(&e.to_string()));
            }
        }
    }

    super::finish(log)
}
