//! Persistent per-target configuration (`games.json`).
//!
//! The document maps the resolved discovery path of each target to its
//! record. It is read once when the store is opened and rewritten after
//! every mutation. Individual entries are parsed leniently: a bad field
//! falls back to its default, and an entry without a usable `name` or
//! `path` is skipped on read but kept verbatim when the file is rewritten.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::ConfigError;
use crate::resources::fs::{absolute_under, resolve_path};
use crate::target::{Architecture, GraphicsApi, OverrideModule, TargetRecord};

/// Stored form of a [`TargetRecord`].
#[derive(Debug, Serialize)]
struct StoredRecord<'a> {
    name: &'a str,
    path: String,
    architecture: Architecture,
    detected_api: GraphicsApi,
    dll_override: OverrideModule,
    install_path: Option<String>,
    selected_exe: Option<String>,
}

impl<'a> From<&'a TargetRecord> for StoredRecord<'a> {
    fn from(record: &'a TargetRecord) -> Self {
        Self {
            name: &record.name,
            path: record.path.display().to_string(),
            architecture: record.architecture,
            detected_api: record.detected_api,
            dll_override: record.dll_override,
            install_path: Some(record.install_path.display().to_string()),
            selected_exe: record
                .selected_exe
                .as_ref()
                .map(|p| p.display().to_string()),
        }
    }
}

/// Outcome of reading one stored entry.
#[derive(Debug)]
enum ParsedEntry {
    Record(TargetRecord),
    Skip(&'static str),
}

/// Parse the entry stored under `key`. Relative paths in the entry are
/// anchored at the discovery path, which falls back to `key` itself.
fn parse_entry(key: &str, value: &Value) -> ParsedEntry {
    let Some(object) = value.as_object() else {
        return ParsedEntry::Skip("entry is not an object");
    };
    let Some(name) = object.get("name").and_then(Value::as_str) else {
        return ParsedEntry::Skip("missing name");
    };
    let Some(path) = object.get("path").and_then(Value::as_str) else {
        return ParsedEntry::Skip("missing path");
    };

    let path = Path::new(path);
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        PathBuf::from(key)
    };

    let mut record = TargetRecord::new(name, path);
    record.architecture = object
        .get("architecture")
        .and_then(Value::as_u64)
        .and_then(Architecture::from_bits)
        .unwrap_or_default();
    record.detected_api = object
        .get("detected_api")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or_default();
    record.dll_override = object
        .get("dll_override")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| record.detected_api.default_module());
    if let Some(install_path) = non_empty_path(object.get("install_path")) {
        record.install_path = absolute_under(&record.path, &install_path);
    }
    record.selected_exe =
        non_empty_path(object.get("selected_exe")).map(|exe| absolute_under(&record.path, &exe));

    ParsedEntry::Record(record)
}

fn non_empty_path(value: Option<&Value>) -> Option<PathBuf> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

/// Key-value store of [`TargetRecord`]s backed by one JSON document.
#[derive(Debug)]
pub struct TargetStore {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl TargetStore {
    /// Open the store at `path`.
    ///
    /// A missing, unreadable or malformed document yields an empty store;
    /// the problem is logged and the next write replaces the file.
    #[must_use]
    pub fn open(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => map.into_iter().collect(),
                Ok(_) => {
                    tracing::warn!(
                        "target store {} is not a JSON object, starting empty",
                        path.display()
                    );
                    BTreeMap::new()
                }
                Err(e) => {
                    tracing::warn!(
                        "target store {} is corrupt ({e}), starting empty",
                        path.display()
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(
                    "cannot read target store {} ({e}), starting empty",
                    path.display()
                );
                BTreeMap::new()
            }
        };

        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    /// Store key for a discovery path.
    #[must_use]
    pub fn key(path: &Path) -> String {
        resolve_path(path).display().to_string()
    }

    /// Location of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the record stored for `path`.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<TargetRecord> {
        let key = Self::key(path);
        match parse_entry(&key, self.entries.get(&key)?) {
            ParsedEntry::Record(record) => Some(record),
            ParsedEntry::Skip(reason) => {
                tracing::debug!("ignoring stored entry {key}: {reason}");
                None
            }
        }
    }

    /// Insert or replace the record for `record.path` and flush.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    pub fn save(&mut self, record: &TargetRecord) -> Result<(), ConfigError> {
        let value = serde_json::to_value(StoredRecord::from(record))?;
        self.entries.insert(Self::key(&record.path), value);
        self.flush()
    }

    /// Remove the record for `path`, flushing only if one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    pub fn remove(&mut self, path: &Path) -> Result<bool, ConfigError> {
        if self.entries.remove(&Self::key(path)).is_none() {
            return Ok(false);
        }
        self.flush()?;
        Ok(true)
    }

    /// Every readable record, ordered by key.
    #[must_use]
    pub fn list_all(&self) -> Vec<TargetRecord> {
        self.entries
            .iter()
            .filter_map(|(key, value)| match parse_entry(key, value) {
                ParsedEntry::Record(record) => Some(record),
                ParsedEntry::Skip(reason) => {
                    tracing::debug!("ignoring stored entry {key}: {reason}");
                    None
                }
            })
            .collect()
    }

    /// Number of stored entries, readable or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn flush(&self) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: self.path.display().to_string(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let mut json = serde_json::to_string_pretty(&self.entries)?;
        json.push('\n');
        std::fs::write(&self.path, json).map_err(io_error)
    }
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

    fn sample(path: &Path) -> TargetRecord {
        let mut record = TargetRecord::new("Game", path);
        record.architecture = Architecture::X86;
        record.detected_api = GraphicsApi::Dx9;
        record.dll_override = OverrideModule::D3d9;
        record.install_path = path.join("bin");
        record.selected_exe = Some(path.join("bin").join("game.exe"));
        record
    }

    #[test]
    fn missing_document_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TargetStore::open(&dir.path().join("games.json"));
        assert!(store.is_empty());
        assert!(store.list_all().is_empty());
    }

    #[test]
    fn corrupt_document_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("games.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(TargetStore::open(&path).is_empty());

        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(TargetStore::open(&path).is_empty());
    }

    #[test]
    fn save_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let game = dir.path().join("Game");
        std::fs::create_dir(&game).unwrap();
        let mut store = TargetStore::open(&dir.path().join("games.json"));

        store.save(&sample(&game)).unwrap();

        assert_eq!(store.get(&game), Some(sample(&game)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn key_is_resolved_path() {
        let dir = tempfile::tempdir().unwrap();
        let game = dir.path().join("Game");
        std::fs::create_dir(&game).unwrap();
        let dotted = dir.path().join(".").join("Game");
        assert_eq!(TargetStore::key(&game), TargetStore::key(&dotted));
    }

    #[test]
    fn remove_reports_presence() {
        let dir = tempfile::tempdir().unwrap();
        let game = dir.path().join("Game");
        let mut store = TargetStore::open(&dir.path().join("games.json"));
        store.save(&sample(&game)).unwrap();

        assert!(store.remove(&game).unwrap());
        assert!(!store.remove(&game).unwrap());
        assert!(store.get(&game).is_none());
    }

    #[test]
    fn bad_fields_fall_back_to_defaults() {
        let value = serde_json::json!({
            "name": "Old",
            "path": "/games/old",
            "architecture": "sixty-four",
            "detected_api": "vulkan",
            "dll_override": null,
            "install_path": null,
        });
        let ParsedEntry::Record(record) = parse_entry("/games/old", &value) else {
            panic!("entry should parse");
        };
        assert_eq!(record.architecture, Architecture::X64);
        assert_eq!(record.detected_api, GraphicsApi::Dx11);
        assert_eq!(record.dll_override, OverrideModule::Dxgi);
        assert_eq!(record.install_path, PathBuf::from("/games/old"));
        assert_eq!(record.selected_exe, None);
    }

    #[test]
    fn override_defaults_to_api_module() {
        let value = serde_json::json!({
            "name": "Old",
            "path": "/games/old",
            "detected_api": "opengl",
        });
        let ParsedEntry::Record(record) = parse_entry("/games/old", &value) else {
            panic!("entry should parse");
        };
        assert_eq!(record.dll_override, OverrideModule::Opengl32);
    }

    #[test]
    fn relative_paths_are_anchored_at_the_discovery_path() {
        let value = serde_json::json!({
            "name": ".",
            "path": ".",
            "install_path": "./bin",
            "selected_exe": "bin/game.exe",
        });
        let ParsedEntry::Record(record) = parse_entry("/games/RelGame", &value) else {
            panic!("entry should parse");
        };
        assert_eq!(record.path, PathBuf::from("/games/RelGame"));
        assert_eq!(record.install_path, PathBuf::from("/games/RelGame/bin"));
        assert_eq!(
            record.selected_exe,
            Some(PathBuf::from("/games/RelGame/bin/game.exe"))
        );
    }

    #[test]
    fn entries_without_name_are_skipped_but_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("games.json");
        std::fs::write(
            &path,
            r#"{ "/games/broken": { "path": "/games/broken", "architecture": 32 } }"#,
        )
        .unwrap();

        let mut store = TargetStore::open(&path);
        assert!(store.list_all().is_empty());
        assert!(store.get(Path::new("/games/broken")).is_none());

        store.save(&sample(&dir.path().join("Game"))).unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["/games/broken"]["architecture"], 32);
        assert_eq!(raw.as_object().unwrap().len(), 2);
    }

    #[test]
    fn document_uses_numeric_architecture_and_lowercase_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("games.json");
        let game = dir.path().join("Game");
        let mut store = TargetStore::open(&path);
        store.save(&sample(&game)).unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let entry = &raw[TargetStore::key(&game).as_str()];
        assert_eq!(entry["architecture"], 32);
        assert_eq!(entry["detected_api"], "dx9");
        assert_eq!(entry["dll_override"], "d3d9");
    }
}
