//! Shader repositories and the merged shader/texture namespace.
pub mod merge;

use std::path::{Path, PathBuf};

/// File extensions linked into `Merged/Shaders`.
pub const SHADER_EXTENSIONS: &[&str] = &["fx", "fxh"];

/// File extensions linked into `Merged/Textures`.
pub const TEXTURE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "dds", "bmp", "tga"];

/// Name of the merged namespace directory under the shader root.
pub const MERGED_DIR: &str = "Merged";

/// Which half of the namespace a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderKind {
    /// Effect source (`Shaders/`).
    Shader,
    /// Texture asset (`Textures/`).
    Texture,
}

impl ShaderKind {
    /// Both kinds, shaders first.
    pub const ALL: [Self; 2] = [Self::Shader, Self::Texture];

    /// Directory name used in source trees and in the merged namespace.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Shader => "Shaders",
            Self::Texture => "Textures",
        }
    }

    /// Classify a loose file by extension, case-insensitively.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if SHADER_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Shader)
        } else if TEXTURE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Texture)
        } else {
            None
        }
    }

    /// Kind whose directory is named `name`.
    #[must_use]
    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.dir_name() == name)
    }
}

/// A git repository of shaders kept under the shader root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderRepo {
    /// Clone URL.
    pub url: &'static str,
    /// Directory name under the shader root.
    pub name: &'static str,
    /// Branch to clone, if not the default.
    pub branch: Option<&'static str>,
}

/// Repositories fetched by `update-shaders`, in merge order.
pub const DEFAULT_REPOS: &[ShaderRepo] = &[
    ShaderRepo {
        url: "https://github.com/crosire/reshade-shaders",
        name: "reshade-shaders",
        branch: Some("slim"),
    },
    ShaderRepo {
        url: "https://github.com/CeeJayDK/SweetFX",
        name: "sweetfx-shaders",
        branch: None,
    },
    ShaderRepo {
        url: "https://github.com/martymcmodding/qUINT",
        name: "qUINT-shaders",
        branch: None,
    },
    ShaderRepo {
        url: "https://github.com/BlueSkyDefender/AstrayFX",
        name: "astrayfx-shaders",
        branch: None,
    },
    ShaderRepo {
        url: "https://github.com/prod80/prod80-ReShade-Repository",
        name: "prod80-shaders",
        branch: None,
    },
];

/// Look up a default repository by directory name.
#[must_use]
pub fn find_repo(name: &str) -> Option<&'static ShaderRepo> {
    DEFAULT_REPOS.iter().find(|r| r.name.eq_ignore_ascii_case(name))
}

/// Merge order for the trees under `shader_root`: the configured
/// repositories as declared, then every other directory sorted by name.
/// The merged namespace itself is never a source.
#[must_use]
pub fn merge_sources(shader_root: &Path, repos: &[ShaderRepo]) -> Vec<PathBuf> {
    let mut sources: Vec<PathBuf> = repos.iter().map(|r| shader_root.join(r.name)).collect();

    let mut extra: Vec<PathBuf> = std::fs::read_dir(shader_root)
        .into_iter()
        .flatten()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter(|entry| {
            let name = entry.file_name();
            name != MERGED_DIR && !repos.iter().any(|r| name == r.name)
        })
        .map(|entry| entry.path())
        .collect();
    extra.sort();

    sources.extend(extra);
    sources
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension_is_case_insensitive() {
        assert_eq!(ShaderKind::from_path(Path::new("Bloom.FX")), Some(ShaderKind::Shader));
        assert_eq!(ShaderKind::from_path(Path::new("a.fxh")), Some(ShaderKind::Shader));
        assert_eq!(ShaderKind::from_path(Path::new("lut.PNG")), Some(ShaderKind::Texture));
        assert_eq!(ShaderKind::from_path(Path::new("noise.tga")), Some(ShaderKind::Texture));
        assert_eq!(ShaderKind::from_path(Path::new("README.md")), None);
        assert_eq!(ShaderKind::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn default_repos_start_with_slim_branch() {
        let first = DEFAULT_REPOS.first().unwrap();
        assert_eq!(first.name, "reshade-shaders");
        assert_eq!(first.branch, Some("slim"));
        assert_eq!(DEFAULT_REPOS.len(), 5);
        assert!(find_repo("SWEETFX-shaders").is_some());
    }

    #[test]
    fn merge_sources_puts_configured_repos_first() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zeta", "Merged", "alpha", "prod80-shaders"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("loose.fx"), "").unwrap();

        let sources = merge_sources(dir.path(), DEFAULT_REPOS);
        let names: Vec<String> = sources
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            names,
            vec![
                "reshade-shaders",
                "sweetfx-shaders",
                "qUINT-shaders",
                "astrayfx-shaders",
                "prod80-shaders",
                "alpha",
                "zeta",
            ]
        );
    }
}
