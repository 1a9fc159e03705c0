//! Idempotent filesystem primitives (check + apply pattern).
pub mod fs;
pub mod link;

use std::path::PathBuf;

/// State of a managed link.
///
/// # Examples
///
/// ```
/// use reshade_linux::resources::ResourceState;
///
/// let missing = ResourceState::Missing;
/// let wrong = ResourceState::Incorrect { current: "points to /elsewhere".into() };
///
/// assert_ne!(missing, ResourceState::Correct);
/// assert_ne!(wrong, ResourceState::Correct);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Nothing exists at the target path.
    Missing,
    /// The target is a symlink to the desired source.
    Correct,
    /// Something else occupies the target path.
    Incorrect {
        /// Description of what is there now.
        current: String,
    },
    /// The link cannot be created (e.g. its source is missing).
    Invalid {
        /// Reason the link cannot be created.
        reason: String,
    },
}

/// Result of applying a resource change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// The link was created or replaced.
    Applied,
    /// The link already pointed at the right place.
    AlreadyCorrect,
    /// The link was created after moving a real file out of the way.
    BackedUp {
        /// Where the previous entry now lives.
        backup: PathBuf,
    },
    /// Nothing was done.
    Skipped {
        /// Reason why the link was skipped.
        reason: String,
    },
}
