//! Session coordination: identity, document state and history lifecycle.

use crate::backend::SnapshotBackend;
use crate::context::ConversationContext;
use crate::history::{ChatHistoryManager, DEFAULT_MAX_MESSAGES};
use crate::storage::{SaveOutcome, StorageHandler, StorageLimits, StorageStatus};
use chrono::{DateTime, Utc};
use notebot_types::{Message, ValidationError};
use serde::Serialize;
use std::cell::OnceCell;

/// The source document the conversation is currently about.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    pub processed_at: DateTime<Utc>,
}

/// Point-in-time status for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub storage_status: StorageStatus,
    pub message_count: usize,
    pub document_loaded: bool,
    pub vector_store_ready: bool,
}

/// Where conversation data lives and how it is protected.
///
/// Fixed for every session; this is a published contract, not a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrivacyStatus {
    pub server_storage: bool,
    pub browser_only: bool,
    pub auto_cleanup: bool,
    pub session_isolated: bool,
    pub encryption: bool,
}

const PRIVACY_STATUS: PrivacyStatus = PrivacyStatus {
    server_storage: false,
    browser_only: true,
    auto_cleanup: true,
    session_isolated: true,
    encryption: false,
};

/// One per interactive session. Owns the chat history and the document
/// state it is scoped to.
pub struct SessionManager {
    session_id: OnceCell<String>,
    document: Option<DocumentMetadata>,
    vector_store_ready: bool,
    chat: ChatHistoryManager,
}

impl SessionManager {
    /// Start a session over `backend`, restoring any history stored there.
    pub fn new(
        backend: Box<dyn SnapshotBackend>,
        limits: StorageLimits,
        max_messages: usize,
    ) -> Self {
        let storage = StorageHandler::new(backend, limits);
        let mut chat = ChatHistoryManager::new(storage, max_messages);
        chat.initialize();

        Self {
            session_id: OnceCell::new(),
            document: None,
            vector_store_ready: false,
            chat,
        }
    }

    /// Session-local storage with default limits.
    pub fn in_memory() -> Self {
        Self::new(
            Box::new(crate::backend::MemoryBackend::new()),
            StorageLimits::default(),
            DEFAULT_MAX_MESSAGES,
        )
    }

    /// The session id, generated on first call and stable afterwards.
    pub fn get_session_id(&self) -> &str {
        self.session_id.get_or_init(generate_session_id)
    }

    pub fn get_session_status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.get_session_id().to_string(),
            storage_status: self.chat.get_storage_status(),
            message_count: self.chat.get_message_count(),
            document_loaded: self.document.is_some(),
            vector_store_ready: self.vector_store_ready,
        }
    }

    /// Switch the session to a new source document.
    ///
    /// Clears the history and resets vector-store readiness so neither can
    /// outlive the document they belonged to. Callers decide whether `name`
    /// is actually new; re-uploading the same name resets all the same.
    pub fn handle_new_document_upload(&mut self, name: &str, size_bytes: Option<u64>) {
        self.chat.clear_history();
        self.document = Some(DocumentMetadata {
            name: name.to_string(),
            size_bytes,
            processed_at: Utc::now(),
        });
        self.vector_store_ready = false;
        tracing::info!("Loaded document '{}'; chat history cleared", name);
    }

    pub fn mark_vector_store_ready(&mut self) {
        self.vector_store_ready = true;
    }

    pub fn is_vector_store_ready(&self) -> bool {
        self.vector_store_ready
    }

    pub fn get_document_name(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.name.as_str())
    }

    pub fn document_metadata(&self) -> Option<&DocumentMetadata> {
        self.document.as_ref()
    }

    pub fn is_storage_active(&self) -> bool {
        self.chat.get_storage_status() == StorageStatus::Active
    }

    pub fn get_privacy_status(&self) -> PrivacyStatus {
        PRIVACY_STATUS
    }

    /// Record a chat turn. See [`ChatHistoryManager::add_message`].
    pub fn add_message(
        &mut self,
        role: &str,
        content: &str,
        metadata: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<SaveOutcome, ValidationError> {
        self.chat.add_message(role, content, metadata)
    }

    pub fn get_chat_history(&self) -> Vec<Message> {
        self.chat.get_chat_history()
    }

    /// Recent exchanges, labelled with the loaded document's name.
    pub fn get_conversation_context(&self, last_n: usize) -> ConversationContext {
        self.chat
            .get_conversation_context(last_n, self.get_document_name())
    }

    pub fn chat(&self) -> &ChatHistoryManager {
        &self.chat
    }

    pub fn chat_mut(&mut self) -> &mut ChatHistoryManager {
        &mut self.chat
    }
}

/// `session_<YYYYMMDDHHMMSS>_<8 hex chars>`, UTC.
fn generate_session_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let suffix: u32 = rand::random();
    format!("session_{timestamp}_{suffix:08x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    #[test]
    fn session_id_format() {
        let session = SessionManager::in_memory();
        let id = session.get_session_id();
        let parts: Vec<&str> = id.split('_').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "session");
        assert_eq!(parts[1].len(), 14);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
        assert!(
            parts[2]
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        );
    }

    #[test]
    fn session_id_is_stable() {
        let session = SessionManager::in_memory();
        let first = session.get_session_id().to_string();
        assert_eq!(session.get_session_id(), first);
        assert_eq!(session.get_session_status().session_id, first);
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let a = SessionManager::in_memory();
        let b = SessionManager::in_memory();
        assert_ne!(a.get_session_id(), b.get_session_id());
    }

    #[test]
    fn fresh_session_status() {
        let session = SessionManager::in_memory();
        let status = session.get_session_status();
        assert_eq!(status.storage_status, StorageStatus::Active);
        assert_eq!(status.message_count, 0);
        assert!(!status.document_loaded);
        assert!(!status.vector_store_ready);
        assert!(session.is_storage_active());
        assert!(session.get_document_name().is_none());
    }

    #[test]
    fn document_upload_resets_history_and_readiness() {
        let mut session = SessionManager::in_memory();
        session.handle_new_document_upload("first.pdf", None);
        session.mark_vector_store_ready();
        session.add_message("user", "What is it?", None).unwrap();
        session.add_message("assistant", "A report.", None).unwrap();

        session.handle_new_document_upload("doc.pdf", Some(1024));

        assert_eq!(session.chat().get_message_count(), 0);
        assert!(!session.is_vector_store_ready());
        assert_eq!(session.get_document_name(), Some("doc.pdf"));
        let meta = session.document_metadata().unwrap();
        assert_eq!(meta.size_bytes, Some(1024));

        let status = session.get_session_status();
        assert!(status.document_loaded);
        assert!(!status.vector_store_ready);
    }

    #[test]
    fn same_name_upload_still_resets() {
        let mut session = SessionManager::in_memory();
        session.handle_new_document_upload("doc.pdf", None);
        session.add_message("user", "hello", None).unwrap();
        session.mark_vector_store_ready();

        session.handle_new_document_upload("doc.pdf", None);
        assert_eq!(session.chat().get_message_count(), 0);
        assert!(!session.is_vector_store_ready());
    }

    #[test]
    fn mark_ready_leaves_history_alone() {
        let mut session = SessionManager::in_memory();
        session.add_message("user", "hello", None).unwrap();
        session.mark_vector_store_ready();
        assert!(session.get_session_status().vector_store_ready);
        assert_eq!(session.get_session_status().message_count, 1);
    }

    #[test]
    fn context_uses_document_name() {
        let mut session = SessionManager::in_memory();
        session.handle_new_document_upload("energy.pdf", Some(2048));
        session.add_message("user", "What about solar?", None).unwrap();
        session.add_message("assistant", "Solar is...", None).unwrap();

        let ctx = session.get_conversation_context(5);
        assert_eq!(ctx.document_context.document_name, "energy.pdf");
        assert_eq!(ctx.recent_exchanges.len(), 1);
    }

    #[test]
    fn privacy_status_is_fixed() {
        let session = SessionManager::in_memory();
        let privacy = session.get_privacy_status();
        assert!(!privacy.server_storage);
        assert!(privacy.browser_only);
        assert!(privacy.auto_cleanup);
        assert!(privacy.session_isolated);
        assert!(!privacy.encryption);
    }

    #[test]
    fn restores_history_from_backend() {
        let mut backend = MemoryBackend::new();
        backend
            .write(r#"{"chat_history":[{"role":"user","content":"earlier"}]}"#)
            .unwrap();
        let session = SessionManager::new(
            Box::new(backend),
            StorageLimits::default(),
            DEFAULT_MAX_MESSAGES,
        );
        assert_eq!(session.get_session_status().message_count, 1);
        assert_eq!(session.get_chat_history()[0].content(), "earlier");
    }

    #[test]
    fn status_serializes_for_display() {
        let session = SessionManager::in_memory();
        let value = serde_json::to_value(session.get_session_status()).unwrap();
        assert_eq!(value["storage_status"], "active");
        assert_eq!(value["message_count"], 0);
        assert_eq!(value["document_loaded"], false);
    }
}
