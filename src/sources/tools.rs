//! Collaborators backed by external programs.
use std::path::Path;
use std::time::Duration;

use super::{ArchiveExtractor, SourceSync, SyncOutcome};
use crate::error::{ResourceError, SourceError};
use crate::exec;
use crate::shaders::ShaderRepo;

/// Extracts archives with `7z e -y`, flattening directory structure.
#[derive(Debug, Clone, Copy, Default)]
pub struct SevenZip;

impl ArchiveExtractor for SevenZip {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), SourceError> {
        exec::require("7z")?;
        std::fs::create_dir_all(dest).map_err(|e| ResourceError::io("create", dest, e))?;
        let archive = archive.to_string_lossy().into_owned();
        let output = format!("-o{}", dest.display());
        exec::run("7z", &["e", "-y", archive.as_str(), output.as_str()])?;
        Ok(())
    }
}

const CLONE_TIMEOUT: Duration = Duration::from_secs(120);
const PULL_TIMEOUT: Duration = Duration::from_secs(60);

/// Clones or fast-forwards shader repositories with the `git` CLI.
///
/// A clone is given two minutes and a pull one minute before git is killed.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

/// Arguments for a shallow clone of `repo` into `dest`.
#[must_use]
pub fn clone_args(repo: &ShaderRepo, dest: &str) -> Vec<String> {
    let mut args = vec!["clone".to_string(), "--depth".to_string(), "1".to_string()];
    if let Some(branch) = repo.branch {
        args.push("--branch".to_string());
        args.push(branch.to_string());
    }
    args.push(repo.url.to_string());
    args.push(dest.to_string());
    args
}

impl SourceSync for GitCli {
    fn sync(&self, repo: &ShaderRepo, dest: &Path) -> Result<SyncOutcome, SourceError> {
        exec::require("git")?;
        if dest.join(".git").is_dir() {
            exec::run_with_timeout(Some(dest), "git", &["pull", "--ff-only"], PULL_TIMEOUT)?;
            return Ok(SyncOutcome::Updated);
        }

        crate::resources::fs::ensure_parent_dir(dest)?;
        let dest = dest.to_string_lossy();
        let args = clone_args(repo, &dest);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        exec::run_with_timeout(None, "git", &args, CLONE_TIMEOUT)?;
        Ok(SyncOutcome::Cloned)
    }
}
