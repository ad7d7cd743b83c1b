//! Bounded chat history with pair-wise eviction and snapshot persistence.

use crate::context::{self, ConversationContext};
use crate::storage::{SaveOutcome, StorageHandler, StorageStatus, json_kind};
use chrono::{DateTime, NaiveDateTime, Utc};
use notebot_types::{Message, MessageMetadata, Role, Snapshot, ValidationError};
use serde_json::{Map, Value};

/// Longest history kept before the oldest messages are evicted.
pub const DEFAULT_MAX_MESSAGES: usize = 50;

/// Snapshot key holding the message list.
const HISTORY_KEY: &str = "chat_history";

/// Owns the ordered message log for one session.
///
/// Every successful mutation is followed by a full-snapshot save. Save
/// failures only show up in [`ChatHistoryManager::get_storage_status`].
pub struct ChatHistoryManager {
    messages: Vec<Message>,
    storage: StorageHandler,
    max_messages: usize,
}

impl ChatHistoryManager {
    /// Create an empty history. Call [`ChatHistoryManager::initialize`] to
    /// pick up a previously stored snapshot.
    pub fn new(storage: StorageHandler, max_messages: usize) -> Self {
        Self {
            messages: Vec::new(),
            storage,
            max_messages,
        }
    }

    /// Replace the in-memory history with whatever valid records storage holds.
    ///
    /// Never fails: unreadable storage or a malformed payload leaves the
    /// history empty, and individual bad records are dropped.
    pub fn initialize(&mut self) {
        let mut stored = self.storage.load_from_storage();
        self.messages = match stored.remove(HISTORY_KEY) {
            Some(Value::Array(records)) => restore_records(records),
            Some(other) => {
                tracing::warn!(
                    "Stored chat history is {}, not a list; starting fresh",
                    json_kind(&other)
                );
                Vec::new()
            }
            None => Vec::new(),
        };

        let evicted = self.enforce_limit();
        tracing::debug!(
            "Restored {} messages ({} evicted)",
            self.messages.len(),
            evicted
        );
    }

    /// Validate and append a message, evict if over the limit, then persist.
    ///
    /// A validation failure leaves the history untouched. The returned
    /// [`SaveOutcome`] is informational; the append stands either way.
    pub fn add_message(
        &mut self,
        role: &str,
        content: &str,
        metadata: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<SaveOutcome, ValidationError> {
        let message = Message::parse(role, content, metadata)?;
        self.messages.push(message);

        let evicted = self.enforce_limit();
        if evicted > 0 {
            tracing::debug!("Evicted {} oldest messages", evicted);
        }

        Ok(self.persist())
    }

    /// Drop the oldest messages, two at a time, until within the limit.
    ///
    /// Always removes an even count. Whether the removed messages really
    /// formed a (user, assistant) pair is not checked.
    fn enforce_limit(&mut self) -> usize {
        if self.messages.len() <= self.max_messages {
            return 0;
        }
        let excess = self.messages.len() - self.max_messages;
        let to_remove = (excess.div_ceil(2) * 2).min(self.messages.len());
        self.messages.drain(..to_remove);
        to_remove
    }

    fn persist(&mut self) -> SaveOutcome {
        let snapshot = Snapshot {
            chat_history: self.messages.clone(),
        };
        self.storage.save_to_storage(&snapshot)
    }

    /// An owned copy of the history, oldest first.
    pub fn get_chat_history(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Borrowed view of the history, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Empty the history and forget the stored snapshot.
    pub fn clear_history(&mut self) {
        self.messages.clear();
        if !self.storage.clear_storage() {
            tracing::warn!("Chat history cleared in memory only; stored snapshot remains");
        }
    }

    /// Summarize up to `last_n` recent exchanges for answer generation.
    pub fn get_conversation_context(
        &self,
        last_n: usize,
        document_name: Option<&str>,
    ) -> ConversationContext {
        context::build(&self.messages, last_n, document_name)
    }

    pub fn get_message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn get_storage_status(&self) -> StorageStatus {
        self.storage.get_storage_status()
    }
}

/// Keep the stored records that carry a readable `role` and `content`.
///
/// Only those two fields are strict. A missing or unreadable timestamp
/// becomes the load time and unusable metadata gets a fresh id.
fn restore_records(records: Vec<Value>) -> Vec<Message> {
    let total = records.len();
    let loaded_at = Utc::now();
    let messages: Vec<Message> = records
        .into_iter()
        .filter_map(|record| match record {
            Value::Object(obj) if obj.contains_key("role") && obj.contains_key("content") => {
                Some(obj)
            }
            _ => None,
        })
        .filter_map(|record| match restore_record(record, loaded_at) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::warn!("Dropping unreadable stored message: {}", e);
                None
            }
        })
        .collect();

    if messages.len() < total {
        tracing::warn!(
            "Dropped {} of {} stored messages",
            total - messages.len(),
            total
        );
    }
    messages
}

fn restore_record(
    mut record: Map<String, Value>,
    loaded_at: DateTime<Utc>,
) -> Result<Message, serde_json::Error> {
    let role: Role = serde_json::from_value(record.remove("role").unwrap_or_default())?;
    let content: String = serde_json::from_value(record.remove("content").unwrap_or_default())?;
    let timestamp = record
        .remove("timestamp")
        .and_then(|v| v.as_str().and_then(parse_timestamp))
        .unwrap_or(loaded_at);
    let metadata = match record.remove("metadata") {
        Some(Value::Object(extra)) => restore_metadata(extra),
        _ => MessageMetadata::default(),
    };
    Ok(Message::from_parts(role, content, timestamp, metadata))
}

/// RFC 3339, or a naive ISO 8601 datetime read as UTC.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    s.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())
}

fn restore_metadata(mut extra: Map<String, Value>) -> MessageMetadata {
    match extra.remove("message_id") {
        Some(Value::String(message_id)) => MessageMetadata { message_id, extra },
        _ => MessageMetadata::with_extra(extra),
    }
}
