//! Settings, main path layout and the target store.
pub mod reshade_ini;
pub mod settings;
pub mod store;

use std::path::Path;

use crate::error::ConfigError;

pub use settings::{Layout, Settings};
pub use store::TargetStore;

/// Main path layout plus the settings loaded from it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory layout under the main path.
    pub layout: Layout,
    /// Contents of `settings.toml`.
    pub settings: Settings,
}

impl Config {
    /// Resolve the main path and load `settings.toml` from it.
    ///
    /// # Errors
    ///
    /// Returns an error if no main path can be determined or the settings
    /// file is unreadable.
    pub fn load(root: Option<&Path>) -> Result<Self, ConfigError> {
        let layout = Layout::resolve(root)?;
        let settings = Settings::load(&layout.settings_path())?;
        Ok(Self { layout, settings })
    }

    /// Overlay version selected by the settings, with `latest` resolved.
    #[must_use]
    pub fn overlay_version(&self) -> String {
        self.layout.resolve_version(&self.settings.reshade_version)
    }

    /// Open the target store under the main path.
    #[must_use]
    pub fn open_store(&self) -> TargetStore {
        TargetStore::open(&self.layout.store_path())
    }
}
