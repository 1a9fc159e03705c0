//! External collaborators: overlay releases, archive extraction, shader
//! repository sync and the shader compiler download.
//!
//! Each collaborator is a trait so the update flows in this module can be
//! driven by test doubles; [`web`] and [`tools`] hold the real
//! implementations.
pub mod tools;
pub mod web;

use std::path::Path;

use crate::config::Layout;
use crate::error::{ResourceError, SourceError};
use crate::resources::link::{self, Conflict};
use crate::shaders::ShaderRepo;
use crate::target::Architecture;

/// A downloadable overlay release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Version string, including the `_Addon` suffix for add-on builds.
    pub version: String,
    /// Installer download URL.
    pub url: String,
}

/// Finds and downloads overlay releases.
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseSource {
    /// Newest available release.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NoRelease`] if no source yields a version.
    fn latest(&self, addon: bool) -> Result<Release, SourceError>;

    /// Download the installer of `release` to `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the download fails.
    fn download(&self, release: &Release, dest: &Path) -> Result<(), SourceError>;
}

/// Unpacks archives.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extract every file in `archive` directly into `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction fails.
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), SourceError>;
}

/// What a repository sync did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Fresh clone.
    Cloned,
    /// Existing checkout updated.
    Updated,
}

/// Keeps a local checkout of a shader repository current.
#[cfg_attr(test, mockall::automock)]
pub trait SourceSync {
    /// Clone `repo` into `dest`, or update it if already cloned.
    ///
    /// # Errors
    ///
    /// Returns an error if the clone or update fails.
    fn sync(&self, repo: &ShaderRepo, dest: &Path) -> Result<SyncOutcome, SourceError>;
}

/// Provides `d3dcompiler_47.dll`.
#[cfg_attr(test, mockall::automock)]
pub trait CompilerSource {
    /// Place the compiler library for `architecture` at `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the library cannot be obtained or verified.
    fn fetch(&self, architecture: Architecture, dest: &Path) -> Result<(), SourceError>;
}

/// Result of [`update_overlay`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayUpdate {
    /// A new version was downloaded and unpacked.
    Downloaded {
        /// Installed version.
        version: String,
    },
    /// The newest version was already unpacked.
    AlreadyPresent {
        /// Current version.
        version: String,
    },
}

impl OverlayUpdate {
    /// Version that `latest` now points at.
    #[must_use]
    pub fn version(&self) -> &str {
        match self {
            Self::Downloaded { version } | Self::AlreadyPresent { version } => version,
        }
    }
}

/// Fetch the newest overlay release into its version directory, then point
/// `reshade/latest` and `LVERS` at it. Older versions are left in place.
///
/// # Errors
///
/// Returns an error if lookup, download or extraction fails, if the unpacked
/// release lacks the 64-bit library, or if `latest`/`LVERS` cannot be
/// written.
pub fn update_overlay(
    releases: &dyn ReleaseSource,
    extractor: &dyn ArchiveExtractor,
    layout: &Layout,
    addon: bool,
) -> Result<OverlayUpdate, SourceError> {
    let release = releases.latest(addon)?;
    let version = release.version.clone();
    let version_dir = layout.version_dir(&version);
    let marker = layout.overlay_binary(&version, Architecture::X64);

    let update = if marker.is_file() {
        tracing::debug!("overlay {version} already unpacked");
        OverlayUpdate::AlreadyPresent { version }
    } else {
        let installer = layout
            .reshade_dir()
            .join(format!("ReShade_Setup_{version}.exe"));
        releases.download(&release, &installer)?;
        let extracted = extractor.extract(&installer, &version_dir);
        if let Err(e) = std::fs::remove_file(&installer) {
            tracing::debug!("cannot remove {}: {e}", installer.display());
        }
        extracted?;
        if !marker.is_file() {
            return Err(SourceError::MissingArtifact(
                marker
                    .file_name()
                    .map_or_else(String::new, |n| n.to_string_lossy().into_owned()),
            ));
        }
        OverlayUpdate::Downloaded { version }
    };

    link::link(&version_dir, &layout.latest_link(), Conflict::Replace)?;
    let lvers = layout.lvers_path();
    std::fs::write(&lvers, update.version())
        .map_err(|e| ResourceError::io("write", &lvers, e))?;
    Ok(update)
}

/// Fetch the compiler library for `architecture` unless it is cached.
/// Returns whether a fetch happened.
///
/// # Errors
///
/// Returns an error if the fetch fails.
pub fn ensure_compiler(
    source: &dyn CompilerSource,
    layout: &Layout,
    architecture: Architecture,
) -> Result<bool, SourceError> {
    let dest = layout.compiler_path(architecture);
    if dest.is_file() {
        return Ok(false);
    }
    source.fetch(architecture, &dest)?;
    Ok(true)
}

/// Sync each repository under the shader root. A failure for one
/// repository does not stop the others.
pub fn update_shaders(
    sync: &dyn SourceSync,
    layout: &Layout,
    repos: &[ShaderRepo],
) -> Vec<(&'static str, Result<SyncOutcome, SourceError>)> {
    let root = layout.shaders_dir();
    repos
        .iter()
        .map(|repo| {
            let result = sync.sync(repo, &root.join(repo.name));
            if let Err(e) = &result {
                tracing::warn!("failed to sync {}: {e}", repo.name);
            }
            (repo.name, result)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::shaders::DEFAULT_REPOS;

    fn layout() -> (tempfile::TempDir, Layout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        layout.ensure_dirs().unwrap();
        (dir, layout)
    }

    fn release(version: &str) -> Release {
        Release {
            version: version.to_string(),
            url: format!("https://reshade.me/downloads/ReShade_Setup_{version}.exe"),
        }
    }

    #[test]
    fn update_overlay_downloads_and_points_latest() {
        let (_dir, layout) = layout();

        let mut releases = MockReleaseSource::new();
        releases
            .expect_latest()
            .returning(|_| Ok(release("6.3.3")));
        releases
            .expect_download()
            .times(1)
            .returning(|_, dest| {
                std::fs::write(dest, b"installer").unwrap();
                Ok(())
            });

        let mut extractor = MockArchiveExtractor::new();
        extractor.expect_extract().times(1).returning(|_, dest| {
            std::fs::create_dir_all(dest).unwrap();
            std::fs::write(dest.join("ReShade64.dll"), b"64").unwrap();
            std::fs::write(dest.join("ReShade32.dll"), b"32").unwrap();
            Ok(())
        });

        let update = update_overlay(&releases, &extractor, &layout, false).unwrap();
        assert_eq!(
            update,
            OverlayUpdate::Downloaded {
                version: "6.3.3".to_string()
            }
        );
        assert!(layout.latest_link().join("ReShade64.dll").is_file());
        assert_eq!(layout.resolve_version("latest"), "6.3.3");
        assert!(!layout.reshade_dir().join("ReShade_Setup_6.3.3.exe").exists());
    }

    #[test]
    fn update_overlay_skips_download_when_present() {
        let (_dir, layout) = layout();
        let version_dir = layout.version_dir("6.3.3");
        std::fs::create_dir_all(&version_dir).unwrap();
        std::fs::write(version_dir.join("ReShade64.dll"), b"64").unwrap();

        let mut releases = MockReleaseSource::new();
        releases
            .expect_latest()
            .returning(|_| Ok(release("6.3.3")));
        releases.expect_download().never();
        let mut extractor = MockArchiveExtractor::new();
        extractor.expect_extract().never();

        let update = update_overlay(&releases, &extractor, &layout, false).unwrap();
        assert!(matches!(update, OverlayUpdate::AlreadyPresent { .. }));
        assert_eq!(
            std::fs::read_to_string(layout.lvers_path()).unwrap(),
            "6.3.3"
        );
    }

    #[test]
    fn update_overlay_moves_latest_to_new_version() {
        let (_dir, layout) = layout();
        for v in ["6.0.0", "6.1.0"] {
            let d = layout.version_dir(v);
            std::fs::create_dir_all(&d).unwrap();
            std::fs::write(d.join("ReShade64.dll"), v).unwrap();
        }
        link::link(&layout.version_dir("6.0.0"), &layout.latest_link(), Conflict::Replace).unwrap();

        let mut releases = MockReleaseSource::new();
        releases
            .expect_latest()
            .returning(|_| Ok(release("6.1.0")));
        let extractor = MockArchiveExtractor::new();

        update_overlay(&releases, &extractor, &layout, false).unwrap();
        assert_eq!(
            std::fs::read_to_string(layout.latest_link().join("ReShade64.dll")).unwrap(),
            "6.1.0"
        );
        assert!(layout.version_dir("6.0.0").is_dir());
    }

    #[test]
    fn update_overlay_fails_when_release_lookup_fails() {
        let (_dir, layout) = layout();
        let mut releases = MockReleaseSource::new();
        releases
            .expect_latest()
            .returning(|_| Err(SourceError::NoRelease));
        let extractor = MockArchiveExtractor::new();

        let err = update_overlay(&releases, &extractor, &layout, true).unwrap_err();
        assert!(matches!(err, SourceError::NoRelease));
        assert!(!layout.lvers_path().exists());
    }

    #[test]
    fn update_overlay_reports_missing_library_after_extraction() {
        let (_dir, layout) = layout();
        let mut releases = MockReleaseSource::new();
        releases
            .expect_latest()
            .returning(|_| Ok(release("6.3.3")));
        releases.expect_download().returning(|_, _| Ok(()));
        let mut extractor = MockArchiveExtractor::new();
        extractor.expect_extract().returning(|_, _| Ok(()));

        let err = update_overlay(&releases, &extractor, &layout, false).unwrap_err();
        assert!(matches!(err, SourceError::MissingArtifact(ref name) if name == "ReShade64.dll"));
    }

    #[test]
    fn ensure_compiler_fetches_once() {
        let (_dir, layout) = layout();
        let mut source = MockCompilerSource::new();
        source
            .expect_fetch()
            .times(1)
            .returning(|_, dest| {
                std::fs::write(dest, b"dll").unwrap();
                Ok(())
            });

        assert!(ensure_compiler(&source, &layout, Architecture::X64).unwrap());
        assert!(!ensure_compiler(&source, &layout, Architecture::X64).unwrap());
        assert!(layout.compiler_path(Architecture::X64).is_file());
    }

    #[test]
    fn update_shaders_continues_after_failure() {
        let (_dir, layout) = layout();
        let mut sync = MockSourceSync::new();
        sync.expect_sync().returning(|repo, _| {
            if repo.name == "sweetfx-shaders" {
                Err(SourceError::MissingTool("git".to_string()))
            } else {
                Ok(SyncOutcome::Cloned)
            }
        });

        let results = update_shaders(&sync, &layout, DEFAULT_REPOS);
        assert_eq!(results.len(), DEFAULT_REPOS.len());
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert!(results[2].1.is_ok());
    }
}
