//! Candidate executable discovery under a game directory.
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Substrings that mark an executable as a tool rather than the game.
const EXE_BLACKLIST: &[&str] = &[
    "unins",
    "setup",
    "install",
    "crash",
    "report",
    "launcher",
    "updater",
    "vc_redist",
    "dxsetup",
    "dotnet",
    "directx",
    "easyanticheat",
    "battleye",
    "redist",
    "vcredist",
    "physx",
];

/// Return `true` if the file name does not look like an installer,
/// launcher, crash reporter or redistributable.
#[must_use]
pub fn is_game_executable(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    !EXE_BLACKLIST.iter().any(|b| name.contains(b))
}

/// List every `*.exe` under `dir` that passes [`is_game_executable`],
/// sorted by path. Unreadable subdirectories are skipped.
#[must_use]
pub fn find_executables(dir: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"))
        })
        .filter(|p| is_game_executable(p))
        .collect();
    found.sort();
    found
}
