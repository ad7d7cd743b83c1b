//! Multi-tier TOML configuration for NoteBot.
//!
//! Reads configuration from multiple sources with precedence:
//! CLI flags > env vars > config file > defaults

use notebot_session::{
    DEFAULT_MAX_MESSAGES, FileBackend, MemoryBackend, SnapshotBackend, StorageLimits,
};
use notebot_types::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Exchanges included in a conversation context by default.
pub const DEFAULT_CONTEXT_EXCHANGES: usize = 5;

/// Snapshot file name used by the file backend when no path is configured.
pub const DEFAULT_SNAPSHOT_FILE: &str = "session.json";

/// Where session snapshots are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    /// Lives as long as the process, like a browser tab's session storage.
    #[default]
    Memory,
    /// A JSON file that survives restarts.
    File,
}

impl FromStr for StorageBackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => Err(ConfigError::InvalidValue {
                key: "storage.backend".into(),
                message: format!("expected 'memory' or 'file', got '{other}'"),
            }),
        }
    }
}

/// Resolved configuration for a NoteBot session.
#[derive(Debug, Clone)]
pub struct NotebotConfig {
    pub config_dir: PathBuf,
    pub backend: StorageBackendKind,
    pub snapshot_path: PathBuf,
    pub limits: StorageLimits,
    pub max_messages: usize,
    pub context_exchanges: usize,
}

/// Settings that can be read from a TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub history: HistorySettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistorySettings {
    pub max_messages: Option<usize>,
    pub context_exchanges: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    pub backend: Option<StorageBackendKind>,
    pub path: Option<PathBuf>,
    pub warn_kb: Option<f64>,
    pub reject_kb: Option<f64>,
}

/// CLI overrides that take highest precedence.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub backend: Option<StorageBackendKind>,
    pub snapshot_path: Option<PathBuf>,
    pub context_exchanges: Option<usize>,
}

impl NotebotConfig {
    /// Load configuration from all sources, applying precedence rules.
    ///
    /// Precedence (highest to lowest):
    /// 1. CLI flags
    /// 2. Environment variables (`NOTEBOT_STORAGE`)
    /// 3. Config file (~/.notebot/config.toml)
    /// 4. Defaults
    pub fn load(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let config_dir = config_dir();
        let settings = load_settings_file(&config_dir.join("config.toml"));
        let env_backend = std::env::var("NOTEBOT_STORAGE").ok();
        Self::resolve(overrides, env_backend.as_deref(), settings, config_dir)
    }

    /// Merge the already-gathered sources and validate the result.
    pub fn resolve(
        overrides: CliOverrides,
        env_backend: Option<&str>,
        settings: SettingsFile,
        config_dir: PathBuf,
    ) -> Result<Self, ConfigError> {
        let env_backend = env_backend.map(StorageBackendKind::from_str).transpose()?;
        let backend = overrides
            .backend
            .or(env_backend)
            .or(settings.storage.backend)
            .unwrap_or_default();

        let snapshot_path = overrides
            .snapshot_path
            .or(settings.storage.path)
            .unwrap_or_else(|| config_dir.join(DEFAULT_SNAPSHOT_FILE));

        let defaults = StorageLimits::default();
        let limits = StorageLimits {
            warn_kb: settings.storage.warn_kb.unwrap_or(defaults.warn_kb),
            reject_kb: settings.storage.reject_kb.unwrap_or(defaults.reject_kb),
        };
        if limits.warn_kb.is_nan() || limits.warn_kb <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "storage.warn_kb".into(),
                message: format!("must be positive, got {}", limits.warn_kb),
            });
        }
        if limits.reject_kb.is_nan() || limits.reject_kb <= limits.warn_kb {
            return Err(ConfigError::InvalidValue {
                key: "storage.reject_kb".into(),
                message: format!(
                    "must exceed warn_kb ({}), got {}",
                    limits.warn_kb, limits.reject_kb
                ),
            });
        }

        let max_messages = settings
            .history
            .max_messages
            .unwrap_or(DEFAULT_MAX_MESSAGES);
        if max_messages < 2 {
            return Err(ConfigError::InvalidValue {
                key: "history.max_messages".into(),
                message: format!("must hold at least one exchange (2), got {max_messages}"),
            });
        }

        let context_exchanges = overrides
            .context_exchanges
            .or(settings.history.context_exchanges)
            .unwrap_or(DEFAULT_CONTEXT_EXCHANGES);

        Ok(NotebotConfig {
            config_dir,
            backend,
            snapshot_path,
            limits,
            max_messages,
            context_exchanges,
        })
    }

    /// Build the storage backend this configuration selects.
    pub fn snapshot_backend(&self) -> Box<dyn SnapshotBackend> {
        match self.backend {
            StorageBackendKind::Memory => Box::new(MemoryBackend::new()),
            StorageBackendKind::File => Box::new(FileBackend::new(&self.snapshot_path)),
        }
    }
}

/// Get the NoteBot config directory path (~/.notebot/).
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("NOTEBOT_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".notebot")
}

/// Load and parse a TOML settings file, returning defaults on any error.
pub fn load_settings_file(path: &Path) -> SettingsFile {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Failed to parse {}: {}", path.display(), e);
            SettingsFile::default()
        }),
        Err(_) => SettingsFile::default(),
    }
}
