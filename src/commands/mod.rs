//! Subcommand orchestration.
//!
//! Each submodule exposes a `run` function taking the global options, its
//! own options and the [`Logger`]; shared setup lives here.
pub mod classify;
pub mod install;
pub mod list;
pub mod merge;
pub mod reinstall;
pub mod uninstall;
pub mod update_reshade;
pub mod update_shaders;
pub mod version;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::{Config, TargetStore, reshade_ini};
use crate::install::InstallSources;
use crate::logging::Logger;

/// Shared state produced by the common command setup sequence.
#[derive(Debug)]
pub struct CommandSetup {
    /// Layout and settings.
    pub config: Config,
}

impl CommandSetup {
    /// Resolve the main path, load settings, and make sure the directory
    /// layout and the shared `ReShade.ini` exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the main path cannot be determined, the settings
    /// file is malformed, or the layout cannot be created.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let config = Config::load(global.root.as_deref()).context("loading configuration")?;
        log.debug(&format!("main path: {}", config.layout.main().display()));

        config
            .layout
            .ensure_dirs()
            .context("creating main path layout")?;
        if reshade_ini::ensure(&config.layout, &config.settings.global_ini)? {
            log.info(&format!("created {}", config.settings.global_ini));
        }

        Ok(Self { config })
    }

    /// Open the target store.
    #[must_use]
    pub fn store(&self) -> TargetStore {
        self.config.open_store()
    }

    /// Global link sources for the configured overlay version.
    #[must_use]
    pub fn install_sources(&self) -> InstallSources {
        InstallSources::new(
            &self.config.layout,
            &self.config.overlay_version(),
            &self.config.settings.global_ini,
        )
    }
}

/// Print the summary and bail if any recorded entry failed.
///
/// # Errors
///
/// Returns an error if one or more entries recorded a failure.
pub fn finish(log: &Logger) -> Result<()> {
    log.print_summary();

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} step(s) failed");
    }
    Ok(())
}
