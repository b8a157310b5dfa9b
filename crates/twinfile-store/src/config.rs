use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SlotId, StoreError, StoreResult};

/// Flush/sync strategy applied when a write handle is finished.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Flush and `fsync` the slot file at the end of every write.
    #[default]
    EveryWrite,
    /// Flush to the OS only; durability is left to the page cache.
    OsDefault,
}

/// Configuration for a [`DualSlotStore`](crate::DualSlotStore).
///
/// ```toml
/// base_path = "state/data"
/// extension = "txt"
/// sync_mode = "every_write"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the logical file, without the numeric suffix or extension.
    pub base_path: PathBuf,
    /// Extension of both physical files, without the leading dot.
    pub extension: String,
    #[serde(default)]
    pub sync_mode: SyncMode,
}

impl StoreConfig {
    pub fn new(base_path: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            extension: extension.into(),
            sync_mode: SyncMode::default(),
        }
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parse and validate a TOML configuration.
    pub fn from_toml(text: &str) -> StoreResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.base_path.as_os_str().is_empty() {
            return Err(StoreError::Config("base_path must not be empty".into()));
        }
        if self.extension.is_empty() {
            return Err(StoreError::Config("extension must not be empty".into()));
        }
        if self.extension.starts_with('.') {
            return Err(StoreError::Config(format!(
                "extension must not start with a dot: {}",
                self.extension
            )));
        }
        Ok(())
    }

    /// Physical path of one slot: `<base><suffix>.<extension>`.
    pub fn slot_path(&self, id: SlotId) -> PathBuf {
        let mut name = self.base_path.clone().into_os_string();
        name.push(format!("{}.{}", id.suffix(), self.extension));
        PathBuf::from(name)
    }

    /// Physical paths of slot A and slot B.
    pub fn slot_paths(&self) -> (PathBuf, PathBuf) {
        (self.slot_path(SlotId::A), self.slot_path(SlotId::B))
    }
}
