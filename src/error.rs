//! Domain-specific error types for the installer.
//!
//! Internal modules return typed errors (e.g., [`ConfigError`],
//! [`InstallError`]) while command handlers at the CLI boundary convert them
//! to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! ReshadeError
//! ├── Config(ConfigError): settings file, target store I/O
//! ├── Resource(ResourceError): symlink creation and removal
//! ├── Install(InstallError): install/uninstall transactions
//! └── Source(SourceError): release lookup, extraction, repo sync
//! ```
//!
//! Executable parsing has its own [`PeError`](crate::classifier::pe::PeError)
//! which never escapes the classifier: a parse failure selects the degraded
//! classification path instead.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the installer.
#[derive(Error, Debug)]
pub enum ReshadeError {
    /// Configuration-related error (settings, target store).
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Resource operation error (symlinks).
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Install or uninstall transaction error.
    #[error("Install error: {0}")]
    Install(#[from] InstallError),

    /// External collaborator error (download, extraction, repo sync).
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// Errors that arise from settings loading and target store persistence.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The settings file contains a syntax error.
    #[error("Invalid TOML in {file}: {message}")]
    InvalidSyntax {
        /// Path of the offending file.
        file: String,
        /// Parser message.
        message: String,
    },

    /// An I/O error occurred while reading or writing a config file.
    #[error("IO error on config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read or written.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The target store could not be serialized.
    #[error("Failed to serialize target store: {0}")]
    Serialize(#[from] serde_json::Error),

    /// No home directory could be determined for the default main path.
    #[error("Cannot determine main path: set RESHADE_PATH or pass --root")]
    NoMainPath,
}

/// Errors that arise from symlink operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The link source does not exist.
    #[error("Link source not found: {0}")]
    NotFound(String),

    /// A filesystem call failed.
    #[error("{op} {path}: {source}")]
    Io {
        /// Short description of the operation (e.g. `"create link"`).
        op: &'static str,
        /// Path the operation was applied to.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl ResourceError {
    /// Build an [`Io`](Self::Io) error for `path`.
    #[must_use]
    pub fn io(op: &'static str, path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.display().to_string(),
            source,
        }
    }
}

/// Errors that abort an install or uninstall.
#[derive(Error, Debug)]
pub enum InstallError {
    /// The overlay library for the target architecture is not present.
    #[error("ReShade DLL not found: {}", path.display())]
    MissingOverlayBinary {
        /// Expected location of the overlay library.
        path: PathBuf,
    },

    /// The target's install directory does not exist.
    #[error("Install directory does not exist: {}", path.display())]
    MissingInstallDir {
        /// The directory that was expected.
        path: PathBuf,
    },

    /// Several game executables were found and none was chosen.
    #[error(
        "Found {} executables under {}; choose one with --exe",
        candidates.len(),
        path.display()
    )]
    AmbiguousExecutable {
        /// Discovery path that was scanned.
        path: PathBuf,
        /// Executables found there.
        candidates: Vec<PathBuf>,
    },

    /// A link in the installed set could not be created or removed.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// The target store could not be updated.
    #[error(transparent)]
    Store(#[from] ConfigError),
}

/// Errors raised by the external collaborators.
#[derive(Error, Debug)]
pub enum SourceError {
    /// No release page yielded a version.
    #[error("Failed to fetch ReShade version from any source")]
    NoRelease,

    /// An HTTP request failed.
    #[error("HTTP request to {url} failed: {message}")]
    Http {
        /// Requested URL.
        url: String,
        /// Transport or status message.
        message: String,
    },

    /// A required external tool is not on `PATH`.
    #[error("Required tool '{0}' not found on PATH")]
    MissingTool(String),

    /// An external command exited unsuccessfully.
    #[error("{command} failed: {stderr}")]
    Command {
        /// Command line label.
        command: String,
        /// Captured standard error.
        stderr: String,
    },

    /// An external command did not finish in time and was killed.
    #[error("{command} timed out after {seconds}s")]
    Timeout {
        /// Command line label.
        command: String,
        /// Time limit that was exceeded.
        seconds: u64,
    },

    /// A downloaded file does not match its pinned digest.
    #[error("Checksum mismatch for {file}: expected {expected}, got {actual}")]
    Checksum {
        /// File that was verified.
        file: String,
        /// Pinned SHA-256.
        expected: String,
        /// Computed SHA-256.
        actual: String,
    },

    /// A download or extraction artifact was not where it should be.
    #[error("{0} not found after extraction")]
    MissingArtifact(String),

    /// A local file operation failed.
    #[error(transparent)]
    Resource(#[from] ResourceError),
}
