use crate::stream::StreamState;
use crate::types::{recent_history, HistoryEntry, Message, UserProfile};
use serde::Serialize;

/// Caller-held state a chat send depends on.
///
/// The client keeps no conversation state of its own; pass the messages
/// shown so far and the identity to send under.
#[derive(Debug, Clone, Default)]
pub struct ChatContext {
    /// Prior messages, oldest first. The new message is appended by the client.
    pub history: Vec<Message>,
    pub user_id: Option<String>,
    pub selected_category: Option<String>,
    /// Overrides the configured default model.
    pub model: Option<String>,
    /// Mark the message as enhanced; the original prompt is recorded on it.
    pub enhance: bool,
}

impl ChatContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity, category and model preference taken from `user`.
    pub fn for_user(user: &UserProfile) -> Self {
        Self {
            user_id: Some(user.id.clone()),
            selected_category: user.preferences.selected_category.clone(),
            model: Some(user.preferences.model_preference.clone()),
            ..Self::default()
        }
    }

    pub fn history(mut self, messages: Vec<Message>) -> Self {
        self.history = messages;
        self
    }

    pub fn user_id(mut self, id: impl Into<String>) -> Self {
        self.user_id = Some(id.into());
        self
    }

    pub fn selected_category(mut self, category: impl Into<String>) -> Self {
        self.selected_category = Some(category.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn enhance(mut self, enable: bool) -> Self {
        self.enhance = enable;
        self
    }
}

/// Body of `POST /api/message`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub content: String,
    pub is_enhanced: bool,
    pub history: Vec<HistoryEntry>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_category: Option<String>,
}

impl ChatRequest {
    pub(crate) fn build(
        user_message: &Message,
        context: &ChatContext,
        default_model: &str,
        history_limit: usize,
    ) -> Self {
        let mut messages = context.history.clone();
        messages.push(user_message.clone());
        Self {
            content: user_message.content().to_string(),
            is_enhanced: user_message.is_enhanced(),
            history: recent_history(&messages, history_limit),
            model: context
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
            user_id: context.user_id.clone(),
            selected_category: context.selected_category.clone(),
        }
    }
}

/// Result of a completed or cancelled send.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub user_message: Message,
    /// The reply as far as it was received; partial when `state` is `Cancelled`.
    pub ai_message: Message,
    /// User id announced by the backend in the stream's control line.
    pub extracted_user_id: Option<String>,
    pub state: StreamState,
}

impl SendOutcome {
    pub fn is_complete(&self) -> bool {
        self.state == StreamState::Completed
    }

    /// The caller's messages with this exchange appended.
    pub fn append_to(&self, messages: &[Message]) -> Vec<Message> {
        let mut next = messages.to_vec();
        next.push(self.user_message.clone());
        next.push(self.ai_message.clone());
        next
    }
}
