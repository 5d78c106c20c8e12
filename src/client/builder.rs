use crate::cache::{self, TtlCache};
use crate::client::core::ChatClient;
use crate::config::ClientConfig;
use crate::store::{FileStore, LocalStore, MemoryStore, PersistedState};
use crate::stream::ControlPrefix;
use crate::transport::{CachedFetcher, HttpTransport};
use crate::Result;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`ChatClient`].
///
/// Starts from [`ClientConfig::from_env`], so `CHAT_*` variables apply unless
/// overridden here. Defaults to in-memory persisted state and the
/// process-wide response cache.
pub struct ChatClientBuilder {
    config: ClientConfig,
    store: Option<Arc<dyn LocalStore>>,
    store_path: Option<PathBuf>,
    cache: Option<Arc<TtlCache<Value>>>,
}

impl Default for ChatClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::from_env(),
            store: None,
            store_path: None,
            cache: None,
        }
    }

    /// Replace the whole configuration, including anything read from the environment.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.config.history_limit = limit;
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.config.default_model = model.into();
        self
    }

    pub fn user_ttl(mut self, ttl: Duration) -> Self {
        self.config.user_ttl = ttl;
        self
    }

    pub fn templates_ttl(mut self, ttl: Duration) -> Self {
        self.config.templates_ttl = ttl;
        self
    }

    pub fn conversations_ttl(mut self, ttl: Duration) -> Self {
        self.config.conversations_ttl = ttl;
        self
    }

    /// First-chunk control markers. An empty list disables control line parsing,
    /// so replies starting with `USER_ID:` are shown verbatim.
    pub fn control_markers<I, M>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        self.config.control_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    pub fn store(mut self, store: Arc<dyn LocalStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Persist state in a JSON file at `path`, opened at build time.
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    /// Use a private response cache instead of the process-wide one.
    pub fn cache(mut self, cache: Arc<TtlCache<Value>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Result<ChatClient> {
        let transport = Arc::new(HttpTransport::new(&self.config)?);

        let store: Arc<dyn LocalStore> = match (self.store, self.store_path) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(FileStore::open(path)?),
            (None, None) => Arc::new(MemoryStore::new()),
        };
        let cache = self.cache.unwrap_or_else(cache::shared);
        let fetcher = CachedFetcher::new(transport.clone()).with_cache(cache);
        let control = ControlPrefix::new(self.config.control_markers.iter().cloned());

        Ok(ChatClient {
            config: self.config,
            transport,
            fetcher,
            persisted: PersistedState::new(store),
            control,
        })
    }
}
