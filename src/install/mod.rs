//! Install and uninstall transactions against one target.
//!
//! An installation is a fixed set of symlinks in the target's install
//! directory, derived from the [`TargetRecord`] and the main path layout.
//! Nothing else is written into the game, so uninstalling is a matter of
//! removing every managed name that is still a symlink.
use std::fmt;
use std::path::{Path, PathBuf};

use crate::classifier::{self, Classification};
use crate::config::{Layout, TargetStore};
use crate::error::{InstallError, ResourceError};
use crate::resources::ResourceChange;
use crate::resources::fs::{absolute, absolute_under};
use crate::resources::link::{self, Conflict, SymlinkResource};
use crate::target::discover::find_executables;
use crate::target::{Architecture, OverrideModule, TargetRecord};

/// File name of the shader compiler the overlay loads.
pub const COMPILER_DLL: &str = "d3dcompiler_47.dll";

/// Link to the shader root inside each game.
pub const SHADERS_LINK: &str = "ReShade_shaders";

/// Per-game state files the overlay writes next to itself.
pub const STATE_FILES: [&str; 2] = ["ReShade32.json", "ReShade64.json"];

/// Role of one link in an installed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    /// The overlay library under the override module's name.
    Overlay,
    /// `d3dcompiler_47.dll`.
    Compiler,
    /// `ReShade_shaders`.
    Shaders,
    /// The shared configuration file.
    Config,
}

impl LinkRole {
    /// Whether a missing source aborts the install.
    #[must_use]
    pub const fn is_required(self) -> bool {
        matches!(self, Self::Overlay | Self::Shaders)
    }

    const fn conflict(self) -> Conflict {
        match self {
            Self::Overlay => Conflict::Backup,
            Self::Compiler | Self::Shaders | Self::Config => Conflict::Replace,
        }
    }
}

impl fmt::Display for LinkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Overlay => "overlay",
            Self::Compiler => "shader compiler",
            Self::Shaders => "shaders",
            Self::Config => "config",
        })
    }
}

/// Global sources every installation links to.
#[derive(Debug, Clone)]
pub struct InstallSources {
    layout: Layout,
    version: String,
    config_name: String,
}

impl InstallSources {
    /// Sources for overlay `version` and config file `config_name`.
    #[must_use]
    pub fn new(layout: &Layout, version: &str, config_name: &str) -> Self {
        Self {
            layout: layout.clone(),
            version: version.to_string(),
            config_name: config_name.to_string(),
        }
    }

    /// Overlay library for `architecture`.
    #[must_use]
    pub fn overlay(&self, architecture: Architecture) -> PathBuf {
        self.layout.overlay_binary(&self.version, architecture)
    }

    /// Name of the shared configuration file.
    #[must_use]
    pub fn config_name(&self) -> &str {
        &self.config_name
    }
}

/// One planned link.
#[derive(Debug, Clone)]
pub struct PlannedLink {
    /// What the link is for.
    pub role: LinkRole,
    /// Source and target.
    pub resource: SymlinkResource,
}

impl PlannedLink {
    fn new(role: LinkRole, source: PathBuf, target: PathBuf) -> Self {
        Self {
            role,
            resource: SymlinkResource::new(source, target, role.conflict()),
        }
    }

    /// File name of the link inside the install directory.
    #[must_use]
    pub fn name(&self) -> String {
        self.resource
            .target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// The links an installation of `record` consists of.
#[must_use]
pub fn link_set(record: &TargetRecord, sources: &InstallSources) -> Vec<PlannedLink> {
    let dir = &record.install_path;
    let arch = record.architecture;
    vec![
        PlannedLink::new(
            LinkRole::Overlay,
            sources.overlay(arch),
            dir.join(record.dll_override.file_name()),
        ),
        PlannedLink::new(
            LinkRole::Compiler,
            sources.layout.compiler_path(arch),
            dir.join(COMPILER_DLL),
        ),
        PlannedLink::new(
            LinkRole::Shaders,
            sources.layout.shaders_dir(),
            dir.join(SHADERS_LINK),
        ),
        PlannedLink::new(
            LinkRole::Config,
            sources.layout.main().join(&sources.config_name),
            dir.join(&sources.config_name),
        ),
    ]
}

/// Every name uninstall removes, in removal order.
#[must_use]
pub fn managed_link_names(config_name: &str) -> Vec<String> {
    let mut names: Vec<String> = OverrideModule::ALL
        .iter()
        .map(|m| m.file_name())
        .collect();
    names.push(COMPILER_DLL.to_string());
    names.push(config_name.to_string());
    names.push(SHADERS_LINK.to_string());
    names.extend(STATE_FILES.iter().map(ToString::to_string));
    names
}

/// Wine launch options that make the game load the overlay.
#[must_use]
pub fn launch_options(module: OverrideModule) -> String {
    format!("WINEDLLOVERRIDES=\"d3dcompiler_47=n;{}=n,b\" %command%", module.as_str())
}

/// Result of one link in an install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    /// What the link is for.
    pub role: LinkRole,
    /// Link file name.
    pub name: String,
    /// What happened.
    pub change: ResourceChange,
}

/// Result of a successful install.
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// The record that was installed and stored.
    pub record: TargetRecord,
    /// One entry per planned link.
    pub links: Vec<LinkOutcome>,
    /// Wine launch options for the override module.
    pub launch_options: String,
}

impl InstallReport {
    /// Links that were skipped because their optional source is missing.
    pub fn skipped(&self) -> impl Iterator<Item = &LinkOutcome> {
        self.links
            .iter()
            .filter(|l| matches!(l.change, ResourceChange::Skipped { .. }))
    }
}

/// Create the link set for `record` and persist it.
///
/// Re-running an install repairs a partial link set and leaves correct
/// links untouched.
///
/// # Errors
///
/// Returns [`InstallError::MissingOverlayBinary`] if the overlay library
/// for the record's architecture is absent,
/// [`InstallError::MissingInstallDir`] if the install directory does not
/// exist, or an error if a link or the store cannot be written.
pub fn install(
    record: &TargetRecord,
    sources: &InstallSources,
    store: &mut TargetStore,
) -> Result<InstallReport, InstallError> {
    let overlay = sources.overlay(record.architecture);
    if !overlay.is_file() {
        return Err(InstallError::MissingOverlayBinary { path: overlay });
    }
    if !record.install_path.is_dir() {
        return Err(InstallError::MissingInstallDir {
            path: record.install_path.clone(),
        });
    }

    let mut links = Vec::new();
    for planned in link_set(record, sources) {
        let change = planned.resource.apply()?;
        if planned.role.is_required() && matches!(change, ResourceChange::Skipped { .. }) {
            let source = planned.resource.source.display().to_string();
            return Err(ResourceError::NotFound(source).into());
        }
        tracing::debug!("{}: {:?}", planned.name(), change);
        links.push(LinkOutcome {
            role: planned.role,
            name: planned.name(),
            change,
        });
    }

    store.save(record)?;

    Ok(InstallReport {
        record: record.clone(),
        links,
        launch_options: launch_options(record.dll_override),
    })
}

/// Remove every managed link from the target at `path` and forget it.
///
/// The install directory comes from the stored record when there is one,
/// otherwise `path` itself is used. Returns the names that were removed;
/// a target that was never installed yields an empty list.
///
/// # Errors
///
/// Returns an error if a link cannot be removed or the store cannot be
/// written.
pub fn uninstall(
    path: &Path,
    config_name: &str,
    store: &mut TargetStore,
) -> Result<Vec<String>, InstallError> {
    let install_dir = store
        .get(path)
        .map_or_else(|| absolute(path), |record| record.install_path);

    let mut removed = Vec::new();
    for name in managed_link_names(config_name) {
        if link::unlink(&install_dir.join(&name))? {
            removed.push(name);
        }
    }

    if store.remove(path)? {
        tracing::debug!("forgot {}", path.display());
    }
    Ok(removed)
}

/// How the target for an install should be chosen.
#[derive(Debug, Clone, Default)]
pub struct TargetRequest {
    /// Game directory or executable, absolute or relative to the current
    /// directory.
    pub path: PathBuf,
    /// Executable to classify, absolute or relative to `path`.
    pub exe: Option<PathBuf>,
    /// Explicit override module.
    pub module: Option<OverrideModule>,
    /// Display name.
    pub name: Option<String>,
}

/// A record ready to install, plus how it was classified.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    /// The record.
    pub record: TargetRecord,
    /// Classification of the selected executable, if one was classified.
    pub classification: Option<Classification>,
}

/// Build the record for `request`, reusing the stored record when nothing
/// in the request contradicts it.
///
/// Relative paths in the request are made absolute first, so the record
/// never depends on the directory the command ran in. A stored record is
/// reused as-is when no executable is requested and its selected executable
/// still exists. Otherwise the executable is taken from
/// the request or, if exactly one candidate exists under the path, chosen
/// automatically and classified. With no candidates the record keeps its
/// defaults.
///
/// # Errors
///
/// Returns [`InstallError::AmbiguousExecutable`] when several candidates
/// exist and none was requested.
pub fn resolve_target(
    request: &TargetRequest,
    store: &TargetStore,
) -> Result<ResolvedTarget, InstallError> {
    let path = absolute(&request.path);
    let (dir, requested_exe) = if path.is_file() {
        let dir = path.parent().map_or_else(|| path.clone(), Path::to_path_buf);
        (dir, Some(path))
    } else {
        let exe = request.exe.as_ref().map(|exe| absolute_under(&path, exe));
        (path, exe)
    };

    let stored = store.get(&dir);
    let mut record = stored
        .clone()
        .unwrap_or_else(|| TargetRecord::for_directory(&dir));
    record.exe_files = find_executables(&dir);

    let reuse_stored = requested_exe.is_none()
        && stored
            .as_ref()
            .and_then(|r| r.selected_exe.as_ref())
            .is_some_and(|exe| exe.is_file());

    let exe = if reuse_stored {
        None
    } else if requested_exe.is_some() {
        requested_exe
    } else {
        match record.exe_files.as_slice() {
            [] => None,
            [only] => Some(only.clone()),
            candidates => {
                return Err(InstallError::AmbiguousExecutable {
                    path: dir,
                    candidates: candidates.to_vec(),
                });
            }
        }
    };

    let classification = exe.map(|exe| {
        let classification = classifier::classify(&exe);
        record.apply_classification(&exe, &classification);
        classification
    });

    if let Some(module) = request.module {
        record.override_module(module);
    }
    if let Some(name) = &request.name {
        record.name.clone_from(name);
    }

    Ok(ResolvedTarget {
        record,
        classification,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::target::GraphicsApi;

    struct Fixture {
        _dir: tempfile::TempDir,
        layout: Layout,
        game: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path().join("main"));
        layout.ensure_dirs().unwrap();
        let version_dir = layout.version_dir("6.0.0");
        std::fs::create_dir_all(&version_dir).unwrap();
        std::fs::write(version_dir.join("ReShade64.dll"), b"64").unwrap();
        std::fs::write(version_dir.join("ReShade32.dll"), b"32").unwrap();
        let game = dir.path().join("Game");
        std::fs::create_dir(&game).unwrap();
        Fixture {
            _dir: dir,
            layout,
            game,
        }
    }

    fn sources(layout: &Layout) -> InstallSources {
        InstallSources::new(layout, "6.0.0", "ReShade.ini")
    }

    #[test]
    fn launch_options_name_the_module() {
        assert_eq!(
            launch_options(OverrideModule::D3d9),
            "WINEDLLOVERRIDES=\"d3dcompiler_47=n;d3d9=n,b\" %command%"
        );
    }

    #[test]
    fn managed_names_cover_every_module() {
        let names = managed_link_names("Custom.ini");
        assert_eq!(names.len(), 13);
        for module in OverrideModule::ALL {
            assert!(names.contains(&module.file_name()));
        }
        assert!(names.contains(&"Custom.ini".to_string()));
        assert!(!names.contains(&"ReShade.ini".to_string()));
    }

    #[test]
    fn link_set_uses_architecture_and_module() {
        let f = fixture();
        let mut record = TargetRecord::new("Game", &f.game);
        record.architecture = Architecture::X86;
        record.override_module(OverrideModule::D3d9);

        let set = link_set(&record, &sources(&f.layout));

        assert_eq!(set[0].name(), "d3d9.dll");
        assert!(set[0].resource.source.ends_with("6.0.0/ReShade32.dll"));
        assert!(set[1].resource.source.ends_with("d3dcompiler_47.dll.32"));
        assert_eq!(set[2].name(), "ReShade_shaders");
        assert_eq!(set[3].name(), "ReShade.ini");
        assert_eq!(set[0].resource.conflict, Conflict::Backup);
        assert_eq!(set[1].resource.conflict, Conflict::Replace);
    }

    #[test]
    fn install_requires_overlay_binary() {
        let f = fixture();
        let record = TargetRecord::new("Game", &f.game);
        let mut store = TargetStore::open(&f.layout.store_path());
        let missing = InstallSources::new(&f.layout, "9.9.9", "ReShade.ini");

        let err = install(&record, &missing, &mut store).unwrap_err();

        assert!(matches!(err, InstallError::MissingOverlayBinary { ref path } if path.ends_with("9.9.9/ReShade64.dll")));
        assert!(store.is_empty());
    }

    #[test]
    fn install_requires_install_dir() {
        let f = fixture();
        let record = TargetRecord::new("Gone", f.game.join("missing"));
        let mut store = TargetStore::open(&f.layout.store_path());

        let err = install(&record, &sources(&f.layout), &mut store).unwrap_err();

        assert!(matches!(err, InstallError::MissingInstallDir { .. }));
    }

    #[test]
    fn install_fails_when_shader_root_is_missing() {
        let f = fixture();
        std::fs::remove_dir_all(f.layout.shaders_dir()).unwrap();
        let record = TargetRecord::new("Game", &f.game);
        let mut store = TargetStore::open(&f.layout.store_path());

        let err = install(&record, &sources(&f.layout), &mut store).unwrap_err();

        assert!(matches!(err, InstallError::Resource(ResourceError::NotFound(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn install_links_and_skips_optional_sources() {
        let f = fixture();
        let record = TargetRecord::new("Game", &f.game);
        let mut store = TargetStore::open(&f.layout.store_path());

        let report = install(&record, &sources(&f.layout), &mut store).unwrap();

        assert!(f.game.join("dxgi.dll").symlink_metadata().unwrap().is_symlink());
        assert!(f.game.join("ReShade_shaders").is_dir());
        let skipped: Vec<LinkRole> = report.skipped().map(|l| l.role).collect();
        assert_eq!(skipped, vec![LinkRole::Compiler, LinkRole::Config]);
        assert_eq!(store.get(&f.game), Some(record));
    }

    #[test]
    fn install_backs_up_original_module_dll() {
        let f = fixture();
        std::fs::write(f.game.join("dxgi.dll"), b"game's own").unwrap();
        let record = TargetRecord::new("Game", &f.game);
        let mut store = TargetStore::open(&f.layout.store_path());

        let report = install(&record, &sources(&f.layout), &mut store).unwrap();

        assert!(matches!(
            report.links[0].change,
            ResourceChange::BackedUp { .. }
        ));
        assert_eq!(
            std::fs::read(f.game.join("dxgi.dll.backup")).unwrap(),
            b"game's own"
        );
        assert_eq!(std::fs::read(f.game.join("dxgi.dll")).unwrap(), b"64");
    }

    #[test]
    fn install_is_idempotent() {
        let f = fixture();
        std::fs::write(f.layout.compiler_path(Architecture::X64), b"c").unwrap();
        let record = TargetRecord::new("Game", &f.game);
        let mut store = TargetStore::open(&f.layout.store_path());

        install(&record, &sources(&f.layout), &mut store).unwrap();
        let second = install(&record, &sources(&f.layout), &mut store).unwrap();

        assert!(
            second
                .links
                .iter()
                .all(|l| matches!(l.change, ResourceChange::AlreadyCorrect | ResourceChange::Skipped { .. }))
        );
        assert!(!f.game.join("dxgi.dll.backup").exists());
        assert_eq!(std::fs::read(f.game.join("d3dcompiler_47.dll")).unwrap(), b"c");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn uninstall_twice_reports_then_succeeds_empty() {
        let f = fixture();
        let record = TargetRecord::new("Game", &f.game);
        let mut store = TargetStore::open(&f.layout.store_path());
        install(&record, &sources(&f.layout), &mut store).unwrap();

        let first = uninstall(&f.game, "ReShade.ini", &mut store).unwrap();
        let second = uninstall(&f.game, "ReShade.ini", &mut store).unwrap();

        assert_eq!(first, vec!["dxgi.dll", "ReShade_shaders"]);
        assert!(second.is_empty());
        assert!(store.get(&f.game).is_none());
    }

    #[test]
    fn uninstall_uses_stored_install_dir() {
        let f = fixture();
        let bin = f.game.join("bin");
        std::fs::create_dir(&bin).unwrap();
        let mut record = TargetRecord::new("Game", &f.game);
        record.install_path.clone_from(&bin);
        let mut store = TargetStore::open(&f.layout.store_path());
        install(&record, &sources(&f.layout), &mut store).unwrap();

        let removed = uninstall(&f.game, "ReShade.ini", &mut store).unwrap();

        assert_eq!(removed.len(), 2);
        assert!(bin.join("dxgi.dll").symlink_metadata().is_err());
    }

    #[test]
    fn uninstall_leaves_regular_files() {
        let f = fixture();
        std::fs::write(f.game.join("d3d9.dll"), b"real").unwrap();
        let mut store = TargetStore::open(&f.layout.store_path());

        let removed = uninstall(&f.game, "ReShade.ini", &mut store).unwrap();

        assert!(removed.is_empty());
        assert_eq!(std::fs::read(f.game.join("d3d9.dll")).unwrap(), b"real");
    }

    #[test]
    fn resolve_without_executables_keeps_defaults() {
        let f = fixture();
        let store = TargetStore::open(&f.layout.store_path());
        let request = TargetRequest {
            path: f.game.clone(),
            module: Some(OverrideModule::Dinput8),
            name: Some("Renamed".into()),
            ..TargetRequest::default()
        };

        let resolved = resolve_target(&request, &store).unwrap();

        assert!(resolved.classification.is_none());
        assert_eq!(resolved.record.name, "Renamed");
        assert_eq!(resolved.record.detected_api, GraphicsApi::Dx11);
        assert_eq!(resolved.record.dll_override, OverrideModule::Dinput8);
        assert_eq!(resolved.record.install_path, f.game);
    }

    #[test]
    fn resolve_with_several_executables_is_ambiguous() {
        let f = fixture();
        std::fs::write(f.game.join("a.exe"), b"").unwrap();
        std::fs::write(f.game.join("b.exe"), b"").unwrap();
        let store = TargetStore::open(&f.layout.store_path());
        let request = TargetRequest {
            path: f.game.clone(),
            ..TargetRequest::default()
        };

        let err = resolve_target(&request, &store).unwrap_err();

        assert!(matches!(err, InstallError::AmbiguousExecutable { ref candidates, .. } if candidates.len() == 2));
    }

    #[test]
    fn resolve_with_requested_relative_exe_classifies_it() {
        let f = fixture();
        let bin = f.game.join("bin");
        std::fs::create_dir(&bin).unwrap();
        std::fs::write(bin.join("game.exe"), b"not a pe").unwrap();
        std::fs::write(f.game.join("other.exe"), b"").unwrap();
        let store = TargetStore::open(&f.layout.store_path());
        let request = TargetRequest {
            path: f.game.clone(),
            exe: Some(PathBuf::from("bin/game.exe")),
            ..TargetRequest::default()
        };

        let resolved = resolve_target(&request, &store).unwrap();

        assert!(resolved.classification.unwrap().is_degraded());
        assert_eq!(resolved.record.install_path, bin);
        assert_eq!(resolved.record.exe_files.len(), 2);
    }
}
