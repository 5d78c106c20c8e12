//! Chat client facade.
//!
//! [`ChatClient`] ties the transport, the response cache, the stream ingestor
//! and persisted state together. Conversation state itself stays with the
//! caller as [`crate::types::ConversationState`] snapshots.

pub mod builder;
pub mod chat;
pub mod core;

pub use builder::ChatClientBuilder;
pub use chat::{ChatContext, ChatRequest, SendOutcome};
pub use core::ChatClient;
