//! Merge many shader trees into one deduplicated namespace.
//!
//! Every `Shaders/` and `Textures/` directory found in a source tree
//! contributes its files. The first file to claim a name wins, across both
//! kinds; later files with the same name are skipped. Files are linked,
//! never copied, so the namespace is rebuilt from scratch on every run:
//! stale links are removed first and anything else a user placed in the
//! merged directories keeps its name.
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::ShaderKind;
use crate::error::ResourceError;
use crate::resources::link::{self, Conflict};

/// The deduplicated union of all merged files, by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeNamespace {
    shaders: BTreeMap<String, PathBuf>,
    textures: BTreeMap<String, PathBuf>,
}

impl MergeNamespace {
    fn map(&self, kind: ShaderKind) -> &BTreeMap<String, PathBuf> {
        match kind {
            ShaderKind::Shader => &self.shaders,
            ShaderKind::Texture => &self.textures,
        }
    }

    fn map_mut(&mut self, kind: ShaderKind) -> &mut BTreeMap<String, PathBuf> {
        match kind {
            ShaderKind::Shader => &mut self.shaders,
            ShaderKind::Texture => &mut self.textures,
        }
    }

    /// Source file linked under `name`.
    #[must_use]
    pub fn get(&self, kind: ShaderKind, name: &str) -> Option<&Path> {
        self.map(kind).get(name).map(PathBuf::as_path)
    }

}

/// Outcome of a merge run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// What ended up in the destination.
    pub namespace: MergeNamespace,
    /// Links created.
    pub linked: usize,
    /// Same-named files that lost to an earlier claim.
    pub duplicates: usize,
    /// Sources that were missing or unreadable.
    pub skipped_sources: Vec<PathBuf>,
}

struct Merger {
    destination: PathBuf,
    claimed: BTreeSet<String>,
    report: MergeReport,
}

impl Merger {
    fn new(destination: &Path) -> Self {
        Self {
            destination: destination.to_path_buf(),
            claimed: BTreeSet::new(),
            report: MergeReport::default(),
        }
    }

    fn dest_dir(&self, kind: ShaderKind) -> PathBuf {
        self.destination.join(kind.dir_name())
    }

    /// Remove stale links and reserve the names of every entry left over.
    fn prepare(&mut self) -> Result<(), ResourceError> {
        for kind in ShaderKind::ALL {
            let dir = self.dest_dir(kind);
            std::fs::create_dir_all(&dir).map_err(|e| ResourceError::io("create", &dir, e))?;
            let removed = link::clear_symlinks(&dir)?;
            tracing::debug!("cleared {removed} links from {}", dir.display());

            let entries =
                std::fs::read_dir(&dir).map_err(|e| ResourceError::io("read directory", &dir, e))?;
            for entry in entries.filter_map(Result::ok) {
                let name = entry.file_name().to_string_lossy().into_owned();
                tracing::debug!("keeping user entry {name} in {}", dir.display());
                self.claimed.insert(name);
            }
        }
        Ok(())
    }

    fn offer(&mut self, kind: ShaderKind, file: &Path) -> Result<(), ResourceError> {
        let Some(name) = file.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return Ok(());
        };
        if !self.claimed.insert(name.clone()) {
            tracing::debug!("skipping duplicate {}", file.display());
            self.report.duplicates += 1;
            return Ok(());
        }

        let target = self.dest_dir(kind).join(&name);
        match link::link(file, &target, Conflict::Replace) {
            Ok(_) => {
                self.report.namespace.map_mut(kind).insert(name, file.to_path_buf());
                self.report.linked += 1;
                Ok(())
            }
            Err(ResourceError::NotFound(source)) => {
                tracing::warn!("skipping broken file {source}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn offer_dir(&mut self, kind: ShaderKind, dir: &Path) -> Result<(), ResourceError> {
        for file in sorted_files(dir)? {
            self.offer(kind, &file)?;
        }
        Ok(())
    }

    fn merge_source(&mut self, source: &Path) -> Result<(), ResourceError> {
        if !source.is_dir() {
            tracing::debug!("shader source {} is missing, skipping", source.display());
            self.report.skipped_sources.push(source.to_path_buf());
            return Ok(());
        }

        let walker = WalkDir::new(source)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git");

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    tracing::warn!("cannot read shader source {}: {e}", source.display());
                    self.report.skipped_sources.push(source.to_path_buf());
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!("skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let kind = entry.file_name().to_str().and_then(ShaderKind::from_dir_name);
            if let Some(kind) = kind {
                self.offer_dir(kind, entry.path())?;
            }
        }
        Ok(())
    }

    fn merge_override(&mut self, root: &Path) -> Result<(), ResourceError> {
        if !root.is_dir() {
            return Ok(());
        }
        for kind in ShaderKind::ALL {
            let dir = root.join(kind.dir_name());
            if dir.is_dir() {
                self.offer_dir(kind, &dir)?;
            }
        }
        for file in sorted_files(root)? {
            if let Some(kind) = ShaderKind::from_path(&file) {
                self.offer(kind, &file)?;
            }
        }
        Ok(())
    }
}

/// Regular files (or links to them) directly inside `dir`, sorted by name.
fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>, ResourceError> {
    let entries = std::fs::read_dir(dir).map_err(|e| ResourceError::io("read directory", dir, e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// Rebuild the namespace under `destination` from `sources` (in order),
/// then `override_root`.
///
/// Missing or unreadable sources are skipped and listed in the report.
///
/// # Errors
///
/// Returns an error if the destination cannot be prepared or a link cannot
/// be created.
pub fn merge(
    sources: &[PathBuf],
    override_root: &Path,
    destination: &Path,
) -> Result<MergeReport, ResourceError> {
    let mut merger = Merger::new(destination);
    merger.prepare()?;
    for source in sources {
        merger.merge_source(source)?;
    }
    merger.merge_override(override_root)?;
    Ok(merger.report)
}
