//! Symlink resource: create and remove links without destroying user data.
//!
//! The one rule this module never breaks: [`unlink`] only removes symlinks.
//! A regular file or directory sitting at a formerly linked path is left
//! alone, so uninstalling cannot delete a game's own files.
use std::path::{Path, PathBuf};

use super::fs::{ensure_parent_dir, is_symlink};
use super::{ResourceChange, ResourceState};
use crate::error::ResourceError;

/// What to do with a regular file or directory occupying a link target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// Rename it to `<name>.backup`.
    Backup,
    /// Delete it.
    Replace,
}

/// Create `target` as a symlink to the canonical form of `source`.
///
/// An existing symlink at `target` is always replaced. A regular entry is
/// moved to `<target>.backup` or deleted according to `conflict`; an older
/// backup at that name is overwritten.
///
/// # Errors
///
/// Returns an error if `source` does not exist or any filesystem call fails.
pub fn link(source: &Path, target: &Path, conflict: Conflict) -> Result<ResourceChange, ResourceError> {
    let resolved = dunce::canonicalize(source)
        .map_err(|_| ResourceError::NotFound(source.display().to_string()))?;
    ensure_parent_dir(target)?;

    let mut change = ResourceChange::Applied;
    if is_symlink(target) {
        std::fs::remove_file(target).map_err(|e| ResourceError::io("remove link", target, e))?;
    } else if target.exists() {
        match conflict {
            Conflict::Backup => {
                let backup = backup_path(target);
                if is_symlink(&backup) || backup.is_file() {
                    std::fs::remove_file(&backup)
                        .map_err(|e| ResourceError::io("remove old backup", &backup, e))?;
                } else if backup.is_dir() {
                    std::fs::remove_dir_all(&backup)
                        .map_err(|e| ResourceError::io("remove old backup", &backup, e))?;
                }
                std::fs::rename(target, &backup)
                    .map_err(|e| ResourceError::io("back up", target, e))?;
                tracing::debug!("backed up {} to {}", target.display(), backup.display());
                change = ResourceChange::BackedUp { backup };
            }
            Conflict::Replace => remove_entry(target)?,
        }
    }

    std::os::unix::fs::symlink(&resolved, target)
        .map_err(|e| ResourceError::io("create link", target, e))?;
    tracing::debug!("linked {} -> {}", target.display(), resolved.display());
    Ok(change)
}

/// Remove `target` if, and only if, it is a symlink.
///
/// Returns whether a link was removed.
///
/// # Errors
///
/// Returns an error if the symlink exists but cannot be removed.
pub fn unlink(target: &Path) -> Result<bool, ResourceError> {
    if !is_symlink(target) {
        return Ok(false);
    }
    std::fs::remove_file(target).map_err(|e| ResourceError::io("remove link", target, e))?;
    Ok(true)
}

/// Remove every symlink directly inside `dir`, leaving regular entries.
///
/// A missing directory counts as empty.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed or a link cannot be
/// removed.
pub fn clear_symlinks(dir: &Path) -> Result<usize, ResourceError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(ResourceError::io("read directory", dir, e)),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|e| ResourceError::io("read directory", dir, e))?;
        if unlink(&entry.path())? {
            removed += 1;
        }
    }
    Ok(removed)
}

/// `<target>.backup`, keeping any existing extension.
#[must_use]
pub fn backup_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".backup");
    PathBuf::from(name)
}

fn remove_entry(path: &Path) -> Result<(), ResourceError> {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    result.map_err(|e| ResourceError::io("remove existing", path, e))
}

/// A single link in an installed set.
#[derive(Debug, Clone)]
pub struct SymlinkResource {
    /// What the link points to.
    pub source: PathBuf,
    /// Where the link lives.
    pub target: PathBuf,
    /// Conflict policy for regular files at `target`.
    pub conflict: Conflict,
}

impl SymlinkResource {
    /// Create a new symlink resource.
    #[must_use]
    pub const fn new(source: PathBuf, target: PathBuf, conflict: Conflict) -> Self {
        Self {
            source,
            target,
            conflict,
        }
    }

    /// Check the link against its desired source.
    #[must_use]
    pub fn current_state(&self) -> ResourceState {
        let Ok(source) = dunce::canonicalize(&self.source) else {
            return ResourceState::Invalid {
                reason: format!("source does not exist: {}", self.source.display()),
            };
        };

        match std::fs::read_link(&self.target) {
            Ok(existing) if existing == source => ResourceState::Correct,
            Ok(existing) => ResourceState::Incorrect {
                current: format!("points to {}", existing.display()),
            },
            Err(_) if self.target.is_dir() => ResourceState::Incorrect {
                current: "target is a directory".to_string(),
            },
            Err(_) if self.target.exists() => ResourceState::Incorrect {
                current: "target is a regular file".to_string(),
            },
            Err(_) => ResourceState::Missing,
        }
    }

    /// Bring the link into its desired state. A link whose source is
    /// missing is reported as skipped, not created.
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be created.
    pub fn apply(&self) -> Result<ResourceChange, ResourceError> {
        match self.current_state() {
            ResourceState::Correct => Ok(ResourceChange::AlreadyCorrect),
            ResourceState::Invalid { reason } => Ok(ResourceChange::Skipped { reason }),
            ResourceState::Missing | ResourceState::Incorrect { .. } => {
                link(&self.source, &self.target, self.conflict)
            }
        }
    }
}
