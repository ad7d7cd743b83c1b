//! Best-effort snapshot persistence with a tri-state health status.
//!
//! Nothing in here returns an error. Every failure is logged, folded into
//! [`StorageStatus`], and the in-memory conversation carries on.

use crate::backend::{MemoryBackend, SnapshotBackend};
use notebot_types::{Snapshot, StorageError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot size above which a save still succeeds but logs a warning.
pub const DEFAULT_WARN_KB: f64 = 50.0;

/// Snapshot size above which a save is refused.
pub const DEFAULT_REJECT_KB: f64 = 500.0;

/// Health of the persistence layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageStatus {
    /// Fully operational.
    #[default]
    Active,
    /// Operating, but a past read or write failed non-fatally.
    Degraded,
    /// The last write was refused for being too large.
    Unavailable,
}

impl StorageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageStatus::Active => "active",
            StorageStatus::Degraded => "degraded",
            StorageStatus::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for StorageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Size thresholds applied to serialized snapshots, in KB (bytes / 1024).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageLimits {
    pub warn_kb: f64,
    pub reject_kb: f64,
}

impl Default for StorageLimits {
    fn default() -> Self {
        Self {
            warn_kb: DEFAULT_WARN_KB,
            reject_kb: DEFAULT_REJECT_KB,
        }
    }
}

/// What happened to a snapshot handed to [`StorageHandler::save_to_storage`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SaveOutcome {
    /// Persisted.
    Saved { size_kb: f64 },
    /// Persisted, but past the warning threshold.
    SavedOversized { size_kb: f64 },
    /// Not persisted: past the hard threshold.
    Rejected { size_kb: f64 },
    /// Not persisted: serialization or the backend failed.
    Failed,
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(
            self,
            SaveOutcome::Saved { .. } | SaveOutcome::SavedOversized { .. }
        )
    }

    /// Whether a size warning was emitted for this save.
    pub fn is_oversized(&self) -> bool {
        matches!(self, SaveOutcome::SavedOversized { .. })
    }
}

/// Persistence adapter for one session's snapshot.
pub struct StorageHandler {
    backend: Box<dyn SnapshotBackend>,
    limits: StorageLimits,
    status: StorageStatus,
}

impl StorageHandler {
    pub fn new(backend: Box<dyn SnapshotBackend>, limits: StorageLimits) -> Self {
        Self {
            backend,
            limits,
            status: StorageStatus::Active,
        }
    }

    /// Session-local storage with default limits.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()), StorageLimits::default())
    }

    /// Load the last stored snapshot as a raw JSON object.
    ///
    /// Returns an empty map if nothing is stored or anything goes wrong.
    pub fn load_from_storage(&mut self) -> serde_json::Map<String, serde_json::Value> {
        match self.read_snapshot() {
            Ok(Some(map)) => map,
            Ok(None) => serde_json::Map::new(),
            Err(e) => {
                tracing::warn!(
                    "Storage unavailable ({} backend): {}",
                    self.backend.name(),
                    e
                );
                self.status = StorageStatus::Degraded;
                serde_json::Map::new()
            }
        }
    }

    fn read_snapshot(
        &self,
    ) -> Result<Option<serde_json::Map<String, serde_json::Value>>, StorageError> {
        let Some(data) = self.backend.read()? else {
            return Ok(None);
        };
        match serde_json::from_str::<serde_json::Value>(&data)? {
            serde_json::Value::Object(map) => Ok(Some(map)),
            other => Err(StorageError::Malformed(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Serialize and persist a snapshot, subject to the size limits.
    pub fn save_to_storage(&mut self, snapshot: &Snapshot) -> SaveOutcome {
        let json = match serde_json::to_string(snapshot) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Could not serialize snapshot: {}", e);
                self.status = StorageStatus::Degraded;
                return SaveOutcome::Failed;
            }
        };

        let size_kb = json.len() as f64 / 1024.0;
        if size_kb > self.limits.reject_kb {
            tracing::error!(
                "Snapshot is {:.1}KB, over the {:.0}KB limit; not persisted. Clear the chat history.",
                size_kb,
                self.limits.reject_kb
            );
            self.status = StorageStatus::Unavailable;
            return SaveOutcome::Rejected { size_kb };
        }

        if let Err(e) = self.backend.write(&json) {
            tracing::warn!(
                "Could not save to storage ({} backend): {}",
                self.backend.name(),
                e
            );
            self.status = StorageStatus::Degraded;
            return SaveOutcome::Failed;
        }
        self.status = StorageStatus::Active;

        if size_kb > self.limits.warn_kb {
            tracing::warn!(
                "Chat history is large ({:.1}KB). Consider clearing old messages.",
                size_kb
            );
            SaveOutcome::SavedOversized { size_kb }
        } else {
            tracing::debug!(
                "Saved {} messages ({:.1}KB)",
                snapshot.chat_history.len(),
                size_kb
            );
            SaveOutcome::Saved { size_kb }
        }
    }

    /// Remove any persisted snapshot. Returns whether the removal succeeded.
    pub fn clear_storage(&mut self) -> bool {
        match self.backend.remove() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Could not clear storage: {}", e);
                false
            }
        }
    }

    pub fn get_storage_status(&self) -> StorageStatus {
        self.status
    }
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
