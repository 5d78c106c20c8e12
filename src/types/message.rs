//! Chat messages as a tagged variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

/// Present only on user messages sent with enhancement enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementInfo {
    pub original_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_prompt: Option<String>,
}

/// A message in a conversation, tagged by `sender` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sender", rename_all = "lowercase")]
pub enum Message {
    User {
        id: String,
        content: String,
        timestamp: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        enhanced: Option<EnhancementInfo>,
    },
    Ai {
        id: String,
        content: String,
        timestamp: DateTime<Utc>,
    },
}

fn new_id(suffix: &str) -> String {
    format!("{}-{}", Uuid::new_v4().simple(), suffix)
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            id: new_id("user"),
            content: content.into(),
            timestamp: Utc::now(),
            enhanced: None,
        }
    }

    pub fn user_enhanced(content: impl Into<String>, enhanced: EnhancementInfo) -> Self {
        Message::User {
            id: new_id("user"),
            content: content.into(),
            timestamp: Utc::now(),
            enhanced: Some(enhanced),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Message::Ai {
            id: new_id("ai"),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Message::User { id, .. } | Message::Ai { id, .. } => id,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Message::User { content, .. } | Message::Ai { content, .. } => content,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Message::User { timestamp, .. } | Message::Ai { timestamp, .. } => *timestamp,
        }
    }

    pub fn sender(&self) -> Sender {
        match self {
            Message::User { .. } => Sender::User,
            Message::Ai { .. } => Sender::Ai,
        }
    }

    pub fn enhancement(&self) -> Option<&EnhancementInfo> {
        match self {
            Message::User { enhanced, .. } => enhanced.as_ref(),
            Message::Ai { .. } => None,
        }
    }

    pub fn is_enhanced(&self) -> bool {
        self.enhancement().is_some()
    }

    /// Same message with its content replaced (used while a reply streams in).
    pub fn with_content(mut self, text: impl Into<String>) -> Self {
        match &mut self {
            Message::User { content, .. } | Message::Ai { content, .. } => *content = text.into(),
        }
        self
    }
}

/// The reduced form of a message sent to the backend as history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub content: String,
    pub sender: Sender,
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id().to_string(),
            content: message.content().to_string(),
            sender: message.sender(),
        }
    }
}

/// The most recent `limit` messages, oldest first.
pub fn recent_history(messages: &[Message], limit: usize) -> Vec<HistoryEntry> {
    let start = messages.len().saturating_sub(limit);
    messages[start..].iter().map(HistoryEntry::from).collect()
}

/// A conversation export, written as pretty-printed JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatExport {
    pub messages: Vec<Message>,
    #[serde(rename = "exportedAt")]
    pub exported_at: DateTime<Utc>,
    pub user_id: Option<String>,
}

impl ChatExport {
    pub fn new(messages: Vec<Message>, user_id: Option<String>) -> Self {
        Self {
            messages,
            exported_at: Utc::now(),
            user_id,
        }
    }

    pub fn file_name(&self) -> String {
        format!("chat-export-{}.json", self.exported_at.format("%Y-%m-%d"))
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
