//! # Types Module
//!
//! Data carried between the chat client, its persisted state and the backend.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | User or AI message, tagged by `sender` |
//! | [`HistoryEntry`] | Reduced message form sent to the backend |
//! | [`PromptTemplate`] | Template offered in the picker |
//! | [`UserProfile`] | Identity and preferences, from the backend or a local fallback |
//! | [`ConversationState`] | Conversation list plus the open conversation |
//! | [`ChatExport`] | Exported conversation document |
//!
//! ## Example
//!
//! ```rust
//! use chat_stream_client::types::{ConversationState, Message};
//!
//! let state = ConversationState::new()
//!     .with_current_messages(vec![Message::user("hi"), Message::ai("hello")])
//!     .start_new();
//! assert_eq!(state.conversations.len(), 1);
//! assert!(state.current_messages.is_empty());
//! ```

pub mod conversation;
pub mod message;
pub mod template;
pub mod user;

pub use conversation::{ConversationState, ConversationSummary};
pub use message::{recent_history, ChatExport, EnhancementInfo, HistoryEntry, Message, Sender};
pub use template::{builtin_templates, group_by_category, PromptTemplate};
pub use user::{ProfileSource, UserPreferences, UserProfile};
