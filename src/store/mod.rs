//! Local persisted state.
//!
//! [`LocalStore`] is a string key-value store in the spirit of browser local
//! storage. [`PersistedState`] layers typed accessors for the client's fixed
//! keys on top of any store; values are JSON-encoded.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::types::{ConversationSummary, Message};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

pub const MESSAGES_KEY: &str = "chat-messages";
pub const DARK_MODE_KEY: &str = "chat-dark-mode";
pub const USER_ID_KEY: &str = "chat-user-id";
pub const CONVERSATIONS_KEY: &str = "chat-conversations";

pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Typed view over a [`LocalStore`].
///
/// Loads never fail: a missing, unreadable or malformed value yields the
/// empty/default value and is logged. Saves propagate store errors.
#[derive(Clone)]
pub struct PersistedState {
    store: Arc<dyn LocalStore>,
}

impl std::fmt::Debug for PersistedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedState").finish_non_exhaustive()
    }
}

impl PersistedState {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn LocalStore> {
        &self.store
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "failed to read persisted value");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "discarding malformed persisted value");
                None
            }
        }
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.store.set(key, &serde_json::to_string(value)?)
    }

    pub fn load_messages(&self) -> Vec<Message> {
        self.load(MESSAGES_KEY).unwrap_or_default()
    }

    pub fn save_messages(&self, messages: &[Message]) -> Result<()> {
        self.save(MESSAGES_KEY, messages)
    }

    pub fn clear_messages(&self) -> Result<()> {
        self.store.remove(MESSAGES_KEY)
    }

    pub fn dark_mode(&self) -> bool {
        self.load(DARK_MODE_KEY).unwrap_or(false)
    }

    pub fn set_dark_mode(&self, enabled: bool) -> Result<()> {
        self.save(DARK_MODE_KEY, &enabled)
    }

    pub fn user_id(&self) -> Option<String> {
        self.load::<String>(USER_ID_KEY).filter(|id| !id.is_empty())
    }

    pub fn set_user_id(&self, id: &str) -> Result<()> {
        self.save(USER_ID_KEY, id)
    }

    pub fn load_conversations(&self) -> Vec<ConversationSummary> {
        self.load(CONVERSATIONS_KEY).unwrap_or_default()
    }

    pub fn save_conversations(&self, conversations: &[ConversationSummary]) -> Result<()> {
        self.save(CONVERSATIONS_KEY, conversations)
    }
}
