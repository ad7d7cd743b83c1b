//! Bounded chat history, snapshot persistence and session coordination for NoteBot.

pub mod backend;
pub mod context;
pub mod history;
pub mod manager;
pub mod storage;

pub use backend::{FileBackend, MemoryBackend, SnapshotBackend};
pub use context::{ConversationContext, DocumentContext, Exchange};
pub use history::{ChatHistoryManager, DEFAULT_MAX_MESSAGES};
pub use manager::{DocumentMetadata, PrivacyStatus, SessionManager, SessionStatus};
pub use storage::{SaveOutcome, StorageHandler, StorageLimits, StorageStatus};
