//! Conversation list and the currently open conversation, as immutable snapshots.

use super::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const TITLE_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub last_message: String,
    #[serde(default)]
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ConversationSummary {
    /// Archive `messages` as a new conversation. Returns `None` for an empty slice.
    pub fn from_messages(messages: &[Message]) -> Option<Self> {
        let first = messages.first()?;
        let now = Utc::now();
        let title: String = first.content().chars().take(TITLE_CHARS).collect();
        Some(Self {
            id: format!("conv_{}", Uuid::new_v4().simple()),
            title: format!("{title}..."),
            last_message: last_content(messages),
            message_count: messages.len(),
            created_at: now,
            updated_at: now,
            messages: messages.to_vec(),
        })
    }

    fn refreshed(&self, messages: &[Message]) -> Self {
        Self {
            last_message: last_content(messages),
            message_count: messages.len(),
            updated_at: Utc::now(),
            messages: messages.to_vec(),
            ..self.clone()
        }
    }
}

fn last_content(messages: &[Message]) -> String {
    messages
        .last()
        .map(|m| m.content().to_string())
        .unwrap_or_default()
}

/// Every operation returns a new snapshot and leaves `self` untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    pub current_id: Option<String>,
    /// Newest first.
    pub conversations: Vec<ConversationSummary>,
    pub current_messages: Vec<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&ConversationSummary> {
        let id = self.current_id.as_deref()?;
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Unsaved messages become a new conversation at the front of the list.
    /// Messages of an already-listed conversation are kept in sync by
    /// [`with_current_messages`](Self::with_current_messages), so they are not archived twice.
    fn archived(&self) -> Vec<ConversationSummary> {
        let mut conversations = self.conversations.clone();
        if self.current_id.is_none() {
            if let Some(summary) = ConversationSummary::from_messages(&self.current_messages) {
                conversations.insert(0, summary);
            }
        }
        conversations
    }

    /// Archive the open messages and start from an empty conversation.
    pub fn start_new(&self) -> Self {
        Self {
            current_id: None,
            conversations: self.archived(),
            current_messages: Vec::new(),
        }
    }

    /// Open conversation `id`, or clear the current one with `None`.
    ///
    /// An unknown id leaves the selection as it was, after archiving unsaved messages.
    pub fn select(&self, id: Option<&str>) -> Self {
        let Some(id) = id else {
            return Self {
                current_id: None,
                conversations: self.conversations.clone(),
                current_messages: Vec::new(),
            };
        };

        let conversations = self.archived();
        match conversations.iter().find(|c| c.id == id) {
            Some(found) => Self {
                current_id: Some(found.id.clone()),
                current_messages: found.messages.clone(),
                conversations: conversations.clone(),
            },
            None => Self {
                current_id: self.current_id.clone(),
                current_messages: self.current_messages.clone(),
                conversations,
            },
        }
    }

    /// Remove conversation `id`; deleting the open conversation clears it.
    pub fn delete(&self, id: &str) -> Self {
        let conversations = self
            .conversations
            .iter()
            .filter(|c| c.id != id)
            .cloned()
            .collect();
        let next = Self {
            conversations,
            ..self.clone()
        };
        if self.current_id.as_deref() == Some(id) {
            next.select(None)
        } else {
            next
        }
    }

    pub fn with_conversations(&self, conversations: Vec<ConversationSummary>) -> Self {
        Self {
            conversations,
            ..self.clone()
        }
    }

    /// Replace the open messages, refreshing the matching summary when one is selected.
    pub fn with_current_messages(&self, messages: Vec<Message>) -> Self {
        let conversations = match self.current_id.as_deref() {
            Some(id) => self
                .conversations
                .iter()
                .map(|c| if c.id == id { c.refreshed(&messages) } else { c.clone() })
                .collect(),
            None => self.conversations.clone(),
        };
        Self {
            current_id: self.current_id.clone(),
            conversations,
            current_messages: messages,
        }
    }
}
