//! Command: clone or update shader repositories.
use anyhow::Result;

use crate::cli::{GlobalOpts, UpdateShadersOpts};
use crate::logging::{EntryStatus, Logger};
use crate::shaders::{self, DEFAULT_REPOS, ShaderRepo};
use crate::sources::{self, SyncOutcome, tools::GitCli};

/// Select the repositories named in `names`; all of them when empty.
///
/// # Errors
///
/// Returns an error naming the first unknown repository.
pub fn select_repos(names: &[String]) -> Result<Vec<ShaderRepo>> {
    if names.is_empty() {
        return Ok(DEFAULT_REPOS.to_vec());
    }
    names
        .iter()
        .map(|name| {
            shaders::find_repo(name)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("unknown shader repository: {name}"))
        })
        .collect()
}

/// Run the update-shaders command.
///
/// # Errors
///
/// Returns an error if configuration loading fails, a repository name is
/// unknown, or any repository failed to sync.
pub fn run(global: &GlobalOpts, opts: &UpdateShadersOpts, log: &Logger) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    let repos = select_repos(&opts.repos)?;

    log.stage("Updating shader repositories");
    for (name, result) in sources::update_shaders(&GitCli, &setup.config.layout, &repos) {
        match result {
            Ok(SyncOutcome::Cloned) => log.record(name, EntryStatus::Ok, Some("cloned")),
            Ok(SyncOutcome::Updated) => log.record(name, EntryStatus::Ok, Some("updated")),
            Err(e) => log.record(name, EntryStatus::Failed, Some(&e.to_string())),
        }
    }

    if setup.config.settings.merge_shaders {
        super::merge::merge_all(&setup.config.layout, log)?;
    } else {
        log.debug("merge_shaders is off; not merging");
    }

    super::finish(log)
}
