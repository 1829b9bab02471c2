//! Persisted record - settings identities declared as of the last apply
//!
//! The record is the only state that outlives a run. It exists so a setting
//! that was removed from the configuration can be told apart from a key this
//! tool never touched.

use crate::desired::{DesiredConfig, SettingKey};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Record
// ============================================================================

/// On-disk shape: `{ "settings": [{ "domain": .., "key": .. }] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecord {
    #[serde(default)]
    pub settings: Vec<SettingKey>,

    /// Last time the record was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PersistedRecord {
    pub fn new(settings: Vec<SettingKey>) -> Self {
        Self {
            settings,
            updated_at: None,
        }
    }

    /// Record built from the settings currently declared.
    pub fn from_desired(desired: &DesiredConfig) -> Self {
        Self::new(desired.setting_keys())
    }

    pub fn contains(&self, key: &SettingKey) -> bool {
        self.settings.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

// ============================================================================
// Store
// ============================================================================

/// File-backed store for the [`PersistedRecord`].
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record. A missing or unreadable file yields an empty record.
    pub fn load(&self) -> PersistedRecord {
        if !self.path.exists() {
            log::debug!("Record file does not exist, using empty record");
            return PersistedRecord::default();
        }

        let parsed = fs::read_to_string(&self.path)
            .map_err(Error::from)
            .and_then(|content| serde_json::from_str(&content).map_err(Error::from));

        match parsed {
            Ok(record) => {
                log::debug!("Loaded record from {}", self.path.display());
                record
            }
            Err(e) => {
                log::warn!("Ignoring unreadable record {}: {e}", self.path.display());
                PersistedRecord::default()
            }
        }
    }

    /// Write the record, creating the parent directory as needed.
    pub fn save(&self, record: &PersistedRecord) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                self.error(format!("failed to create directory {}: {e}", dir.display()))
            })?;
        }

        let content = serde_json::to_string_pretty(record)?;
        fs::write(&self.path, content + "\n")
            .map_err(|e| self.error(format!("failed to write: {e}")))?;

        log::debug!("Saved record to {}", self.path.display());
        Ok(())
    }

    /// Overwrite the record wholesale with the currently desired settings.
    pub fn replace_with(&self, desired: &DesiredConfig) -> Result<PersistedRecord> {
        let record = PersistedRecord {
            updated_at: Some(Utc::now()),
            ..PersistedRecord::from_desired(desired)
        };
        self.save(&record)?;
        Ok(record)
    }

    fn error(&self, message: String) -> Error {
        Error::Record {
            path: self.path.clone(),
            message,
        }
    }
}
