//! Chat message types shared by the session core and its collaborators.

use crate::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Maximum message length, in characters, after trimming.
pub const MAX_CONTENT_CHARS: usize = 10_000;

/// Role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(ValidationError::InvalidRole {
                role: other.to_string(),
            }),
        }
    }
}

/// Per-message metadata: a reserved unique id plus opaque caller data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default = "new_message_id")]
    pub message_id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MessageMetadata {
    /// Wrap caller-supplied data, assigning a fresh id.
    ///
    /// A `message_id` key in `extra` is discarded; the id is always ours.
    pub fn with_extra(mut extra: serde_json::Map<String, serde_json::Value>) -> Self {
        extra.remove("message_id");
        Self {
            message_id: new_message_id(),
            extra,
        }
    }
}

impl Default for MessageMetadata {
    fn default() -> Self {
        Self::with_extra(serde_json::Map::new())
    }
}

fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

/// A single chat turn.
///
/// Role and content are fixed once constructed; there are no setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
    #[serde(default)]
    metadata: MessageMetadata,
}

impl Message {
    /// Validate and build a message stamped with the current UTC time.
    pub fn new(
        role: Role,
        content: &str,
        extra: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<Self, ValidationError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        let len = trimmed.chars().count();
        if len > MAX_CONTENT_CHARS {
            return Err(ValidationError::ContentTooLong {
                len,
                max: MAX_CONTENT_CHARS,
            });
        }

        Ok(Self {
            role,
            content: trimmed.to_string(),
            timestamp: Utc::now(),
            metadata: MessageMetadata::with_extra(extra.unwrap_or_default()),
        })
    }

    /// Like [`Message::new`], but with the role given as its wire string.
    pub fn parse(
        role: &str,
        content: &str,
        extra: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<Self, ValidationError> {
        Self::new(role.parse()?, content, extra)
    }

    /// Reassemble a previously stored message. Content is taken as stored.
    pub fn from_parts(
        role: Role,
        content: String,
        timestamp: DateTime<Utc>,
        metadata: MessageMetadata,
    ) -> Self {
        Self {
            role,
            content,
            timestamp,
            metadata,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn metadata(&self) -> &MessageMetadata {
        &self.metadata
    }

    pub fn message_id(&self) -> &str {
        &self.metadata.message_id
    }
}

/// Serialized form of a whole chat history, persisted in one piece.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub chat_history: Vec<Message>,
}
