use super::chat::{ChatContext, ChatRequest, SendOutcome};
use crate::config::ClientConfig;
use crate::store::PersistedState;
use crate::stream::{CancelHandle, ControlPrefix, ResponseStreamIngestor, StreamSink};
use crate::transport::{CachedFetcher, FetchOptions, HttpTransport, TransportError};
use crate::types::{
    builtin_templates, ChatExport, ConversationSummary, EnhancementInfo, Message, PromptTemplate,
    UserProfile,
};
use crate::{Error, ErrorContext, Result};
use futures::TryStreamExt;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub(crate) const MESSAGE_PATH: &str = "/api/message";
pub(crate) const USER_PATH: &str = "/api/user";
pub(crate) const TEMPLATES_PATH: &str = "/api/prompt-templates";
pub(crate) const CONVERSATIONS_PATH: &str = "/api/conversations";
pub(crate) const ENHANCE_PATH: &str = "/api/enhance-prompt";

/// Chat client facade: streamed sends, cached reads with offline fallbacks,
/// and the persisted state they share.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct ChatClient {
    pub(crate) config: ClientConfig,
    pub(crate) transport: Arc<HttpTransport>,
    pub(crate) fetcher: CachedFetcher,
    pub(crate) persisted: PersistedState,
    pub(crate) control: ControlPrefix,
}

impl ChatClient {
    /// Client configured from defaults and `CHAT_*` environment variables,
    /// with in-memory persisted state and the process-wide cache.
    pub fn new() -> Result<Self> {
        super::builder::ChatClientBuilder::new().build()
    }

    pub fn builder() -> super::builder::ChatClientBuilder {
        super::builder::ChatClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn persisted(&self) -> &PersistedState {
        &self.persisted
    }

    pub fn fetcher(&self) -> &CachedFetcher {
        &self.fetcher
    }

    /// Send `content` and stream the reply into `sink`.
    ///
    /// Each chunk that adds text emits the full reply so far; a control line
    /// announcing a user id is emitted once, before any text. Cancelling via
    /// `cancel` stops reading and returns the partial reply with state
    /// `Cancelled`. Errors after streaming began leave whatever was already
    /// emitted with the sink; a user id announced before the failure is
    /// still persisted.
    pub async fn send_message<S: StreamSink>(
        &self,
        content: &str,
        context: &ChatContext,
        sink: S,
        cancel: &CancelHandle,
    ) -> Result<SendOutcome> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::validation_with_context(
                "message content must not be empty",
                ErrorContext::new().with_field_path("content"),
            ));
        }

        let user_message = if context.enhance {
            Message::user_enhanced(
                content,
                EnhancementInfo {
                    original_prompt: content.to_string(),
                    enhanced_prompt: None,
                },
            )
        } else {
            Message::user(content)
        };
        let request = ChatRequest::build(
            &user_message,
            context,
            &self.config.default_model,
            self.config.history_limit,
        );
        debug!(
            model = request.model.as_str(),
            history = request.history.len(),
            enhanced = request.is_enhanced,
            "sending chat message"
        );

        let response = self
            .transport
            .post_stream(MESSAGE_PATH, &request, cancel)
            .await?;
        let body = response
            .bytes_stream()
            .map_err(|e| Error::Transport(TransportError::Http(e)));

        let mut ingestor = ResponseStreamIngestor::new(sink).with_control_prefix(self.control.clone());
        let outcome = ingestor.run(body, cancel).await;
        let session = ingestor.into_session();

        // The control line may have arrived before the stream failed.
        let extracted_user_id = session.extracted_control_value().map(str::to_string);
        if let (Some(id), None) = (&extracted_user_id, &context.user_id) {
            match self.persisted.set_user_id(id) {
                Ok(()) => info!(user_id = id.as_str(), "stored user id assigned by backend"),
                Err(e) => warn!(error = %e, "failed to persist assigned user id"),
            }
        }
        let state = match outcome {
            Ok(state) => state,
            Err(e) => {
                info!(
                    chunks = session.chunks_received(),
                    error = %e,
                    "chat message stream failed"
                );
                return Err(e);
            }
        };

        info!(
            state = ?state,
            chunks = session.chunks_received(),
            model = request.model.as_str(),
            "chat message finished"
        );
        Ok(SendOutcome {
            user_message,
            ai_message: Message::ai(session.into_text()),
            extracted_user_id,
            state,
        })
    }

    async fn cached_json<T: DeserializeOwned>(&self, url: Url, ttl: Duration) -> Result<T> {
        self.fetcher
            .fetch_url(url, &FetchOptions::get(), ttl)
            .await?
            .json()
            .await
    }

    fn url_with_user(&self, path: &str, user_id: &str) -> Result<Url> {
        let mut url = self.transport.resolve(path)?;
        url.query_pairs_mut().append_pair("user_id", user_id);
        Ok(url)
    }

    /// The backend's profile for the stored user, or a local fallback profile
    /// (`is_online() == false`) when the backend cannot be reached.
    pub async fn load_user(&self) -> UserProfile {
        let known_id = self.persisted.user_id();
        let loaded = match self.transport.resolve(USER_PATH) {
            Ok(url) => self.cached_json::<UserProfile>(url, self.config.user_ttl).await,
            Err(e) => Err(e),
        };

        let profile = match loaded {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, "user profile unavailable; running offline");
                UserProfile::fallback(known_id.clone())
            }
        };
        if known_id.as_deref() != Some(profile.id.as_str()) {
            if let Err(e) = self.persisted.set_user_id(&profile.id) {
                warn!(error = %e, "failed to persist user id");
            }
        }
        profile
    }

    /// Templates from the backend, or the built-in set when it has none or is unreachable.
    pub async fn load_templates(&self) -> Vec<PromptTemplate> {
        let loaded = match self.transport.resolve(TEMPLATES_PATH) {
            Ok(url) => {
                self.cached_json::<Vec<PromptTemplate>>(url, self.config.templates_ttl)
                    .await
            }
            Err(e) => Err(e),
        };
        match loaded {
            Ok(templates) if !templates.is_empty() => templates,
            Ok(_) => {
                debug!("backend returned no templates; using built-in set");
                builtin_templates()
            }
            Err(e) => {
                warn!(error = %e, "prompt templates unavailable; using built-in set");
                builtin_templates()
            }
        }
    }

    /// Conversations for `user_id`. A successful load is mirrored to the store;
    /// when the backend is unreachable the stored list is returned instead.
    pub async fn load_conversations(&self, user_id: &str) -> Vec<ConversationSummary> {
        let loaded = match self.url_with_user(CONVERSATIONS_PATH, user_id) {
            Ok(url) => {
                self.cached_json::<Vec<ConversationSummary>>(url, self.config.conversations_ttl)
                    .await
            }
            Err(e) => Err(e),
        };
        match loaded {
            Ok(conversations) => {
                if let Err(e) = self.persisted.save_conversations(&conversations) {
                    warn!(error = %e, "failed to persist conversations");
                }
                conversations
            }
            Err(e) => {
                warn!(error = %e, "conversations unavailable; using stored list");
                self.persisted.load_conversations()
            }
        }
    }

    /// Drop cached conversation lists so the next load hits the backend.
    pub fn invalidate_conversations(&self) -> usize {
        let removed = self.fetcher.invalidate(CONVERSATIONS_PATH);
        debug!(removed, "invalidated cached conversations");
        removed
    }

    /// Ask the backend to rewrite `prompt`. Not cached.
    pub async fn enhance_prompt(&self, prompt: &str) -> Result<EnhancementInfo> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::validation_with_context(
                "prompt must not be empty",
                ErrorContext::new().with_field_path("prompt"),
            ));
        }
        self.transport
            .post_json(ENHANCE_PATH, &json!({ "prompt": prompt }))
            .await
    }

    /// Export `messages`; without an explicit id the stored user id is used.
    pub fn export_chat(&self, messages: &[Message], user_id: Option<&str>) -> ChatExport {
        let user_id = user_id
            .map(str::to_string)
            .or_else(|| self.persisted.user_id());
        ChatExport::new(messages.to_vec(), user_id)
    }

    /// Insert `template`'s text through `insert_text` and return `user` with
    /// the template's category selected.
    pub fn select_template<F>(
        &self,
        template: &PromptTemplate,
        user: &UserProfile,
        insert_text: F,
    ) -> UserProfile
    where
        F: FnOnce(&str),
    {
        debug!(template = template.id.as_str(), "template selected");
        insert_text(&template.template);
        user.with_selected_category(template.category.clone())
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.transport.base_url().as_str())
            .field("default_model", &self.config.default_model)
            .finish_non_exhaustive()
    }
}
