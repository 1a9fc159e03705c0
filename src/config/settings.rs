//! Application settings and the directory layout under the main path.
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::target::Architecture;

/// Environment variable that relocates the main path.
pub const MAIN_PATH_ENV: &str = "RESHADE_PATH";

/// Version name that resolves through the `LVERS` file.
pub const LATEST: &str = "latest";

/// User-editable settings stored in `settings.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Overlay version to install, or `latest`.
    pub reshade_version: String,
    /// Prefer the add-on enabled overlay build.
    pub addon_support: bool,
    /// Rebuild the merged shader namespace after updating repositories.
    pub merge_shaders: bool,
    /// File name of the shared overlay configuration.
    pub global_ini: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reshade_version: LATEST.to_string(),
            addon_support: false,
            merge_shaders: true,
            global_ini: "ReShade.ini".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        toml::from_str(&content).map_err(|e| ConfigError::InvalidSyntax {
            file: path.display().to_string(),
            message: e.message().to_string(),
        })
    }
}

/// Fixed directory layout rooted at the main path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    main: PathBuf,
}

impl Layout {
    /// Use `main` as the main path.
    #[must_use]
    pub fn new(main: impl Into<PathBuf>) -> Self {
        Self { main: main.into() }
    }

    /// Resolve the main path from `--root`, then `$RESHADE_PATH`, then
    /// `$HOME/.local/reshade`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoMainPath`] if none of them is available.
    pub fn resolve(root: Option<&Path>) -> Result<Self, ConfigError> {
        main_path_from(
            root,
            std::env::var_os(MAIN_PATH_ENV),
            std::env::var_os("HOME"),
        )
        .map(Self::new)
        .ok_or(ConfigError::NoMainPath)
    }

    /// The main path itself.
    #[must_use]
    pub fn main(&self) -> &Path {
        &self.main
    }

    /// Directory holding one subdirectory per downloaded overlay version.
    #[must_use]
    pub fn reshade_dir(&self) -> PathBuf {
        self.main.join("reshade")
    }

    /// Directory of one overlay version.
    #[must_use]
    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.reshade_dir().join(version)
    }

    /// `reshade/latest`, pointing at the newest downloaded version.
    #[must_use]
    pub fn latest_link(&self) -> PathBuf {
        self.reshade_dir().join(LATEST)
    }

    /// Overlay library for `architecture` in `version`.
    #[must_use]
    pub fn overlay_binary(&self, version: &str, architecture: Architecture) -> PathBuf {
        self.version_dir(version)
            .join(format!("ReShade{}.dll", architecture.bits()))
    }

    /// Text file recording the last downloaded version.
    #[must_use]
    pub fn lvers_path(&self) -> PathBuf {
        self.main.join("LVERS")
    }

    /// Root of the shader repositories; linked into every game.
    #[must_use]
    pub fn shaders_dir(&self) -> PathBuf {
        self.main.join("ReShade_shaders")
    }

    /// Root of the merged namespace.
    #[must_use]
    pub fn merged_dir(&self) -> PathBuf {
        self.shaders_dir().join("Merged")
    }

    /// Merged shader directory.
    #[must_use]
    pub fn merged_shaders(&self) -> PathBuf {
        self.merged_dir().join("Shaders")
    }

    /// Merged texture directory.
    #[must_use]
    pub fn merged_textures(&self) -> PathBuf {
        self.merged_dir().join("Textures")
    }

    /// User-maintained shader tree merged last.
    #[must_use]
    pub fn external_shaders(&self) -> PathBuf {
        self.main.join("External_shaders")
    }

    /// Cached `d3dcompiler_47.dll` for `architecture`.
    #[must_use]
    pub fn compiler_path(&self, architecture: Architecture) -> PathBuf {
        self.main
            .join(format!("d3dcompiler_47.dll.{}", architecture.bits()))
    }

    /// Target store document.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        self.main.join("games.json")
    }

    /// Settings file.
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.main.join("settings.toml")
    }

    /// Create every directory of the layout.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        for dir in [
            self.main.clone(),
            self.reshade_dir(),
            self.shaders_dir(),
            self.merged_shaders(),
            self.merged_textures(),
            self.external_shaders(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|source| ConfigError::Io {
                path: dir.display().to_string(),
                source,
            })?;
        }
        Ok(())
    }

    /// Resolve a version setting: `latest` becomes the contents of `LVERS`
    /// when that file holds a non-empty value.
    #[must_use]
    pub fn resolve_version(&self, requested: &str) -> String {
        if requested != LATEST {
            return requested.to_string();
        }
        std::fs::read_to_string(self.lvers_path())
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| LATEST.to_string())
    }
}

fn main_path_from(
    root: Option<&Path>,
    env_path: Option<OsString>,
    home: Option<OsString>,
) -> Option<PathBuf> {
    if let Some(root) = root {
        return Some(root.to_path_buf());
    }
    if let Some(path) = env_path.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    home.filter(|h| !h.is_empty())
        .map(|h| PathBuf::from(h).join(".local").join("reshade"))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_settings_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("settings.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.reshade_version, "latest");
        assert!(settings.merge_shaders);
        assert!(!settings.addon_support);
        assert_eq!(settings.global_ini, "ReShade.ini");
    }

    #[test]
    fn partial_settings_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "addon_support = true\nreshade_version = \"6.1.0\"\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert!(settings.addon_support);
        assert_eq!(settings.reshade_version, "6.1.0");
        assert_eq!(settings.global_ini, "ReShade.ini");
    }

    #[test]
    fn malformed_settings_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "merge_shaders = [").unwrap();

        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSyntax { .. }));
    }

    #[test]
    fn root_flag_wins_over_environment() {
        let path = main_path_from(
            Some(Path::new("/flag")),
            Some("/env".into()),
            Some("/home/u".into()),
        );
        assert_eq!(path, Some(PathBuf::from("/flag")));
    }

    #[test]
    fn environment_wins_over_home() {
        let path = main_path_from(None, Some("/env".into()), Some("/home/u".into()));
        assert_eq!(path, Some(PathBuf::from("/env")));
    }

    #[test]
    fn home_default_is_local_reshade() {
        let path = main_path_from(None, Some(OsString::new()), Some("/home/u".into()));
        assert_eq!(path, Some(PathBuf::from("/home/u/.local/reshade")));
        assert_eq!(main_path_from(None, None, None), None);
    }

    #[test]
    fn layout_paths() {
        let layout = Layout::new("/m");
        assert_eq!(
            layout.overlay_binary("6.0.1", Architecture::X86),
            PathBuf::from("/m/reshade/6.0.1/ReShade32.dll")
        );
        assert_eq!(
            layout.compiler_path(Architecture::X64),
            PathBuf::from("/m/d3dcompiler_47.dll.64")
        );
        assert_eq!(
            layout.merged_textures(),
            PathBuf::from("/m/ReShade_shaders/Merged/Textures")
        );
        assert_eq!(layout.store_path(), PathBuf::from("/m/games.json"));
    }

    #[test]
    fn latest_resolves_through_lvers() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        assert_eq!(layout.resolve_version("latest"), "latest");

        std::fs::write(layout.lvers_path(), "6.3.0\n").unwrap();
        assert_eq!(layout.resolve_version("latest"), "6.3.0");
        assert_eq!(layout.resolve_version("5.9.2"), "5.9.2");
    }

    #[test]
    fn ensure_dirs_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path().join("main"));
        layout.ensure_dirs().unwrap();
        assert!(layout.merged_shaders().is_dir());
        assert!(layout.merged_textures().is_dir());
        assert!(layout.external_shaders().is_dir());
        assert!(layout.reshade_dir().is_dir());
    }
}
