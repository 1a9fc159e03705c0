//! File-system helpers shared by the link manager and the target store.
use std::path::{Component, Path, PathBuf};

use crate::error::ResourceError;

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<(), ResourceError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| ResourceError::io("create parent", parent, e))?;
    }
    Ok(())
}

/// Return `true` if `path` itself is a symlink (dangling or not).
#[must_use]
pub fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata().is_ok_and(|m| m.is_symlink())
}

/// Make `path` absolute against the current directory, dropping `.` and
/// `..` components. Symlinks are not resolved.
#[must_use]
pub fn absolute(path: &Path) -> PathBuf {
    std::env::current_dir().map_or_else(
        |_| normalize_lexically(path),
        |cwd| absolute_under(&cwd, path),
    )
}

/// `path` if it is absolute, otherwise `path` joined onto `base`, with `.`
/// and `..` components dropped either way.
#[must_use]
pub fn absolute_under(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_lexically(path)
    } else {
        normalize_lexically(&base.join(path))
    }
}

/// Resolve `path` to an absolute, symlink-free form that is stable whether
/// or not the path exists.
///
/// The longest existing ancestor is canonicalised and the remaining
/// components are appended after lexical `.`/`..` normalisation.
#[must_use]
pub fn resolve_path(path: &Path) -> PathBuf {
    let absolute = absolute(path);

    let mut existing = absolute.as_path();
    let mut rest: Vec<&std::ffi::OsStr> = Vec::new();
    loop {
        if let Ok(canonical) = dunce::canonicalize(existing) {
            return rest.iter().rev().fold(canonical, |acc, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name);
                existing = parent;
            }
            _ => return absolute,
        }
    }
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
