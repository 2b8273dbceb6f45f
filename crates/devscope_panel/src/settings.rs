//! DevTools settings
//!
//! Settings are stored as camelCase JSON under [`SETTINGS_KEY`]. Hosts may
//! supply partial defaults; stored settings are merged over those per field
//! and every numeric value is clamped into its accepted range.

use std::fs;
use std::io;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use devscope_core::{Error, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Storage key of the persisted settings.
pub const SETTINGS_KEY: &str = "zustandDevtoolsSettings";

pub const MAX_HISTORY_RANGE: RangeInclusive<usize> = 10..=1000;
pub const PLAYBACK_MS_RANGE: RangeInclusive<u64> = 100..=5000;
pub const MAX_DEPTH_RANGE: RangeInclusive<usize> = 1..=10;

/// All DevTools settings
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevtoolsSettings {
    pub history: HistorySettings,
    pub graph: GraphSettings,
    pub json: JsonSettings,
}

/// History recording and playback
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySettings {
    /// Entries kept per store
    pub max_history: usize,
    /// Delay between playback steps
    pub playback_ms: u64,
    pub recording: bool,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_history: 100,
            playback_ms: 1200,
            recording: true,
        }
    }
}

/// Graph view
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSettings {
    /// Depth below which nodes start expanded
    pub max_depth: usize,
    /// Scale the drawing to the panel width
    pub fit_width: bool,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            max_depth: 3,
            fit_width: true,
        }
    }
}

/// JSON view
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSettings {
    /// Open the root of the outline
    pub expand_by_default: bool,
}

impl Default for JsonSettings {
    fn default() -> Self {
        Self {
            expand_by_default: true,
        }
    }
}

impl DevtoolsSettings {
    /// Copy with every numeric field clamped into its range.
    pub fn clamped(mut self) -> Self {
        self.history.max_history = clamp(self.history.max_history, &MAX_HISTORY_RANGE);
        self.history.playback_ms = clamp(self.history.playback_ms, &PLAYBACK_MS_RANGE);
        self.graph.max_depth = clamp(self.graph.max_depth, &MAX_DEPTH_RANGE);
        self
    }

    /// Defaults with `partial` merged over them.
    pub fn with_overrides(partial: &PartialSettings) -> Self {
        partial.apply(Self::default())
    }
}

fn clamp<T: Ord + Copy>(value: T, range: &RangeInclusive<T>) -> T {
    value.clamp(*range.start(), *range.end())
}

/// Settings where any field may be missing
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSettings {
    #[serde(default)]
    pub history: Option<PartialHistory>,
    #[serde(default)]
    pub graph: Option<PartialGraph>,
    #[serde(default)]
    pub json: Option<PartialJson>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialHistory {
    #[serde(default)]
    pub max_history: Option<usize>,
    #[serde(default)]
    pub playback_ms: Option<u64>,
    #[serde(default)]
    pub recording: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialGraph {
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub fit_width: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialJson {
    #[serde(default)]
    pub expand_by_default: Option<bool>,
}

impl PartialSettings {
    /// Overwrite the fields of `base` that are present here.
    pub fn apply(&self, mut base: DevtoolsSettings) -> DevtoolsSettings {
        if let Some(history) = &self.history {
            if let Some(v) = history.max_history {
                base.history.max_history = v;
            }
            if let Some(v) = history.playback_ms {
                base.history.playback_ms = v;
            }
            if let Some(v) = history.recording {
                base.history.recording = v;
            }
        }
        if let Some(graph) = &self.graph {
            if let Some(v) = graph.max_depth {
                base.graph.max_depth = v;
            }
            if let Some(v) = graph.fit_width {
                base.graph.fit_width = v;
            }
        }
        if let Some(json) = &self.json {
            if let Some(v) = json.expand_by_default {
                base.json.expand_by_default = v;
            }
        }
        base
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Key/value persistence for settings
pub trait SettingsStorage {
    /// Stored text for `key`, or `None` if nothing is stored.
    fn load(&self, key: &str) -> Result<Option<String>>;

    fn save(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Storage that lives as long as the process
#[derive(Clone, Debug, Default)]
pub struct MemorySettingsStorage {
    entries: FxHashMap<String, String>,
}

impl MemorySettingsStorage {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl SettingsStorage for MemorySettingsStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory
#[derive(Clone, Debug)]
pub struct FileSettingsStorage {
    dir: PathBuf,
}

impl FileSettingsStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SettingsStorage for FileSettingsStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::Io(err)),
        }
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::Io(err)),
        }
    }
}

// ============================================================================
// Manager
// ============================================================================

/// Current settings plus their persistence.
///
/// Storage failures never reach the caller: they are logged and the manager
/// keeps working from memory.
#[derive(Debug)]
pub struct SettingsManager<S> {
    storage: S,
    defaults: DevtoolsSettings,
    current: DevtoolsSettings,
}

impl<S: SettingsStorage> SettingsManager<S> {
    /// Load settings from `storage`, falling back to `defaults`.
    pub fn new(storage: S, defaults: DevtoolsSettings) -> Self {
        let defaults = defaults.clamped();
        let current = match Self::read(&storage) {
            Ok(Some(stored)) => stored.apply(defaults.clone()).clamped(),
            Ok(None) => defaults.clone(),
            Err(err) => {
                warn!(%err, "stored settings unreadable; using defaults");
                defaults.clone()
            }
        };
        Self {
            storage,
            defaults,
            current,
        }
    }

    fn read(storage: &S) -> Result<Option<PartialSettings>> {
        let Some(raw) = storage.load(SETTINGS_KEY)? else {
            return Ok(None);
        };
        let partial = serde_json::from_str(&raw)
            .map_err(|e| Error::Settings(format!("invalid settings JSON: {e}")))?;
        Ok(Some(partial))
    }

    pub fn get(&self) -> &DevtoolsSettings {
        &self.current
    }

    pub fn defaults(&self) -> &DevtoolsSettings {
        &self.defaults
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Replace the settings (clamped) and persist them.
    pub fn set(&mut self, next: DevtoolsSettings) -> &DevtoolsSettings {
        self.current = next.clamped();
        self.persist();
        &self.current
    }

    /// Edit the settings in place, then clamp and persist.
    pub fn update(&mut self, edit: impl FnOnce(&mut DevtoolsSettings)) -> &DevtoolsSettings {
        let mut next = self.current.clone();
        edit(&mut next);
        self.set(next)
    }

    /// Drop the stored settings and go back to the defaults.
    pub fn reset(&mut self) -> &DevtoolsSettings {
        if let Err(err) = self.storage.remove(SETTINGS_KEY) {
            warn!(%err, "failed to remove stored settings");
        }
        self.current = self.defaults.clone();
        debug!("settings reset");
        &self.current
    }

    fn persist(&mut self) {
        let result = serde_json::to_string(&self.current)
            .map_err(Error::from)
            .and_then(|text| self.storage.save(SETTINGS_KEY, &text));
        match result {
            Ok(()) => debug!("settings saved"),
            Err(err) => warn!(%err, "failed to save settings"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_serialize_camel_case() {
        let json = serde_json::to_value(DevtoolsSettings::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "history": { "maxHistory": 100, "playbackMs": 1200, "recording": true },
                "graph": { "maxDepth": 3, "fitWidth": true },
                "json": { "expandByDefault": true }
            })
        );
    }

    #[test]
    fn test_partial_overrides_per_field() {
        let partial: PartialSettings =
            serde_json::from_str(r#"{"history": {"playbackMs": 400}, "json": {}}"#).unwrap();
        let settings = DevtoolsSettings::with_overrides(&partial);

        assert_eq!(settings.history.playback_ms, 400);
        assert_eq!(settings.history.max_history, 100);
        assert!(settings.history.recording);
        assert_eq!(settings.graph, GraphSettings::default());
    }

    #[test]
    fn test_clamping() {
        let mut settings = DevtoolsSettings::default();
        settings.history.max_history = 5;
        settings.history.playback_ms = 60_000;
        settings.graph.max_depth = 0;

        let clamped = settings.clamped();
        assert_eq!(clamped.history.max_history, 10);
        assert_eq!(clamped.history.playback_ms, 5000);
        assert_eq!(clamped.graph.max_depth, 1);
    }

    #[test]
    fn test_manager_loads_and_clamps_stored() {
        let mut storage = MemorySettingsStorage::default();
        storage
            .save(SETTINGS_KEY, r#"{"history": {"maxHistory": 5000}, "graph": {"fitWidth": false}}"#)
            .unwrap();

        let manager = SettingsManager::new(storage, DevtoolsSettings::default());
        assert_eq!(manager.get().history.max_history, 1000);
        assert!(!manager.get().graph.fit_width);
        assert_eq!(manager.get().history.playback_ms, 1200);
    }

    #[test]
    fn test_manager_falls_back_on_garbage() {
        let mut storage = MemorySettingsStorage::default();
        storage.save(SETTINGS_KEY, "{not json").unwrap();

        let mut defaults = DevtoolsSettings::default();
        defaults.graph.max_depth = 6;
        let manager = SettingsManager::new(storage, defaults.clone());
        assert_eq!(manager.get(), &defaults);
    }

    #[test]
    fn test_update_persists_and_reset_removes() {
        let mut manager =
            SettingsManager::new(MemorySettingsStorage::default(), DevtoolsSettings::default());

        manager.update(|s| s.history.recording = false);
        let stored = manager.storage().get(SETTINGS_KEY).unwrap_or_default();
        assert!(stored.contains(r#""recording":false"#));

        manager.reset();
        assert_eq!(manager.storage().get(SETTINGS_KEY), None);
        assert!(manager.get().history.recording);
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSettingsStorage::new(dir.path().join("devscope"));
        assert_eq!(storage.load(SETTINGS_KEY).unwrap(), None);

        let mut manager = SettingsManager::new(storage, DevtoolsSettings::default());
        manager.update(|s| s.graph.max_depth = 7);
        assert!(manager.storage().path_for(SETTINGS_KEY).exists());

        let reloaded = SettingsManager::new(
            FileSettingsStorage::new(dir.path().join("devscope")),
            DevtoolsSettings::default(),
        );
        assert_eq!(reloaded.get().graph.max_depth, 7);

        let mut reloaded = reloaded;
        reloaded.reset();
        assert!(!reloaded.storage().path_for(SETTINGS_KEY).exists());
    }
}
