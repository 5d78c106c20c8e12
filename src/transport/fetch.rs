//! Read-through cached fetch for idempotent backend reads.

use super::http::{read_body, remote_error, HttpTransport};
use crate::cache::{self, CacheKey, TtlCache};
use crate::stream::CancelHandle;
use crate::{Error, ErrorContext, Result};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Request options. Everything serialized here is part of the cache key;
/// `force`, `timeout` and `cancel` only affect how the call is made.
#[derive(Debug, Clone, Serialize)]
pub struct FetchOptions {
    pub method: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Skip the cache read; a successful response still refreshes the entry.
    #[serde(skip)]
    pub force: bool,
    #[serde(skip)]
    pub timeout: Option<Duration>,
    #[serde(skip)]
    pub cancel: Option<CancelHandle>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            headers: BTreeMap::new(),
            body: None,
            force: false,
            timeout: None,
            cancel: None,
        }
    }
}

impl FetchOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_with(mut self, cancel: CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn http_method(&self) -> Result<Method> {
        Method::from_bytes(self.method.to_uppercase().as_bytes()).map_err(|_| {
            Error::validation_with_context(
                "invalid HTTP method",
                ErrorContext::new()
                    .with_field_path("options.method")
                    .with_details(self.method.clone()),
            )
        })
    }
}

/// Outcome of a cached fetch.
#[derive(Debug)]
pub enum FetchResponse {
    /// Served from cache; no network I/O happened.
    Cached(Value),
    /// 2xx from the network; the payload was stored in the cache.
    Fresh { status: StatusCode, payload: Value },
    /// Non-2xx from the network, returned untouched. Nothing was cached.
    /// The request's timeout and abort handle still bound reading its body.
    Unsuccessful {
        response: Response,
        timeout: Option<Duration>,
        cancel: Option<CancelHandle>,
    },
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        !matches!(self, FetchResponse::Unsuccessful { .. })
    }

    pub fn from_cache(&self) -> bool {
        matches!(self, FetchResponse::Cached(_))
    }

    /// Cached payloads report `200 OK`.
    pub fn status(&self) -> StatusCode {
        match self {
            FetchResponse::Cached(_) => StatusCode::OK,
            FetchResponse::Fresh { status, .. } => *status,
            FetchResponse::Unsuccessful { response, .. } => response.status(),
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            FetchResponse::Cached(payload) | FetchResponse::Fresh { payload, .. } => Some(payload),
            FetchResponse::Unsuccessful { .. } => None,
        }
    }

    /// The decoded payload, or [`crate::Error::Remote`] for a non-2xx response.
    pub async fn into_payload(self) -> Result<Value> {
        match self {
            FetchResponse::Cached(payload) | FetchResponse::Fresh { payload, .. } => Ok(payload),
            FetchResponse::Unsuccessful {
                response,
                timeout,
                cancel,
            } => Err(remote_error(response, timeout, cancel.as_ref()).await),
        }
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.into_payload().await?)?)
    }
}

/// Read-through cache in front of [`HttpTransport`].
///
/// - Hit: zero network calls.
/// - Miss: exactly one network call; a 2xx body is decoded once and cached.
/// - Non-2xx and transport failures never populate the cache and are never retried.
#[derive(Clone)]
pub struct CachedFetcher {
    transport: Arc<HttpTransport>,
    cache: Arc<TtlCache<Value>>,
}

impl CachedFetcher {
    /// Uses the process-wide cache.
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self {
            transport,
            cache: cache::shared(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<TtlCache<Value>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<TtlCache<Value>> {
        &self.cache
    }

    pub fn transport(&self) -> &Arc<HttpTransport> {
        &self.transport
    }

    pub async fn fetch(
        &self,
        path: &str,
        options: &FetchOptions,
        ttl: Duration,
    ) -> Result<FetchResponse> {
        let url = self.transport.resolve(path)?;
        self.fetch_url(url, options, ttl).await
    }

    pub async fn fetch_url(
        &self,
        url: Url,
        options: &FetchOptions,
        ttl: Duration,
    ) -> Result<FetchResponse> {
        let method = options.http_method()?;
        let key = CacheKey::for_request(url.as_str(), options);

        if !options.force {
            if let Some(payload) = self.cache.get(&key) {
                debug!(url = url.as_str(), "cache hit");
                return Ok(FetchResponse::Cached(payload));
            }
        }
        debug!(url = url.as_str(), force = options.force, "cache miss");

        let mut request = self.transport.request(method, url);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        let timeout = options.timeout.or(Some(self.transport.timeout()));
        let cancel = options.cancel.as_ref();
        let response = self.transport.send(request, timeout, cancel).await?;

        let status = response.status();
        if !status.is_success() {
            debug!(http_status = status.as_u16(), "fetch unsuccessful; not cached");
            return Ok(FetchResponse::Unsuccessful {
                response,
                timeout,
                cancel: options.cancel.clone(),
            });
        }

        let bytes = read_body(response, timeout, cancel).await?;
        let payload: Value = serde_json::from_slice(&bytes)?;
        self.cache.set(key, payload.clone(), ttl);
        Ok(FetchResponse::Fresh { status, payload })
    }

    /// Drop every cached read whose key contains `pattern`.
    pub fn invalidate(&self, pattern: &str) -> usize {
        self.cache.invalidate(pattern)
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}
