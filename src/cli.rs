//! Command-line interface definition.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::target::OverrideModule;

/// Top-level CLI entry point.
#[derive(Parser, Debug)]
#[command(
    name = "reshade-linux",
    about = "Install ReShade into Wine and Proton games",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Override the main path (default: $RESHADE_PATH or ~/.local/reshade)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Link ReShade into a game directory
    Install(InstallOpts),
    /// Remove ReShade links from a game directory
    Uninstall(UninstallOpts),
    /// Re-create the links of one or all stored games
    Reinstall(ReinstallOpts),
    /// List stored games
    List,
    /// Detect architecture and graphics API of an executable
    Classify(ClassifyOpts),
    /// Rebuild the merged shader namespace
    Merge,
    /// Clone or update shader repositories, then merge
    UpdateShaders(UpdateShadersOpts),
    /// Download the newest ReShade release and shader compiler
    UpdateReshade,
    /// Print version information
    Version,
}

impl Command {
    /// Subcommand name, used to name the log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::Uninstall(_) => "uninstall",
            Self::Reinstall(_) => "reinstall",
            Self::List => "list",
            Self::Classify(_) => "classify",
            Self::Merge => "merge",
            Self::UpdateShaders(_) => "update-shaders",
            Self::UpdateReshade => "update-reshade",
            Self::Version => "version",
        }
    }
}

/// Options for the `install` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct InstallOpts {
    /// Game directory, or the game executable itself
    pub path: PathBuf,

    /// Executable to classify, absolute or relative to PATH
    #[arg(long)]
    pub exe: Option<PathBuf>,

    /// Override module to install as (dxgi, d3d9, d3d11, d3d10, opengl32, d3d8, ddraw, dinput8)
    #[arg(long)]
    pub dll: Option<OverrideModule>,

    /// Display name stored for the game
    #[arg(long)]
    pub name: Option<String>,
}

/// Options for the `uninstall` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct UninstallOpts {
    /// Game directory
    pub path: PathBuf,
}

/// Options for the `reinstall` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ReinstallOpts {
    /// Game directory; all stored games when omitted
    pub path: Option<PathBuf>,
}

/// Options for the `classify` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ClassifyOpts {
    /// Executable to inspect
    pub exe: PathBuf,
}

/// Options for the `update-shaders` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct UpdateShadersOpts {
    /// Only update these repositories (by directory name)
    #[arg(long = "repo", value_delimiter = ',')]
    pub repos: Vec<String>,
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_install_with_options() {
        let cli = Cli::parse_from([
            "reshade-linux",
            "install",
            "/games/Foo",
            "--exe",
            "bin/foo.exe",
            "--dll",
            "d3d9",
            "--name",
            "Foo",
        ]);
        assert!(
            matches!(&cli.command, Command::Install(_)),
            "Expected Install command"
        );
        if let Command::Install(opts) = cli.command {
            assert_eq!(opts.path, PathBuf::from("/games/Foo"));
            assert_eq!(opts.exe, Some(PathBuf::from("bin/foo.exe")));
            assert_eq!(opts.dll, Some(OverrideModule::D3d9));
            assert_eq!(opts.name.as_deref(), Some("Foo"));
        }
    }

    #[test]
    fn parse_install_accepts_dll_suffix() {
        let cli = Cli::parse_from(["reshade-linux", "install", "/g", "--dll", "DXGI.dll"]);
        if let Command::Install(opts) = cli.command {
            assert_eq!(opts.dll, Some(OverrideModule::Dxgi));
        }
    }

    #[test]
    fn parse_install_rejects_unknown_dll() {
        let result = Cli::try_parse_from(["reshade-linux", "install", "/g", "--dll", "vulkan"]);
        assert!(result.is_err());
    }

    #[test]
    fn install_requires_path() {
        assert!(Cli::try_parse_from(["reshade-linux", "install"]).is_err());
    }

    #[test]
    fn parse_reinstall_without_path() {
        let cli = Cli::parse_from(["reshade-linux", "reinstall"]);
        assert!(matches!(cli.command, Command::Reinstall(ReinstallOpts { path: None })));
    }

    #[test]
    fn parse_update_shaders_repos() {
        let cli = Cli::parse_from([
            "reshade-linux",
            "update-shaders",
            "--repo",
            "sweetfx-shaders,qUINT-shaders",
            "--repo",
            "prod80-shaders",
        ]);
        if let Command::UpdateShaders(opts) = cli.command {
            assert_eq!(
                opts.repos,
                vec!["sweetfx-shaders", "qUINT-shaders", "prod80-shaders"]
            );
        } else {
            panic!("Expected UpdateShaders command");
        }
    }

    #[test]
    fn parse_root_override_and_verbose() {
        let cli = Cli::parse_from(["reshade-linux", "list", "--root", "/tmp/rs", "-v"]);
        assert_eq!(cli.global.root, Some(PathBuf::from("/tmp/rs")));
        assert!(cli.verbose);
        assert_eq!(cli.command.name(), "list");
    }

    #[test]
    fn parse_simple_commands() {
        for (arg, name) in [
            ("merge", "merge"),
            ("update-reshade", "update-reshade"),
            ("version", "version"),
        ] {
            let cli = Cli::parse_from(["reshade-linux", arg]);
            assert_eq!(cli.command.name(), name);
        }
    }
}
