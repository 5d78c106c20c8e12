use crate::config::ClientConfig;
use crate::stream::CancelHandle;
use crate::{Error, ErrorContext, Result};
use reqwest::{Method, Proxy, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::info;
use url::Url;

/// Thin reqwest wrapper bound to the backend origin.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            Error::configuration_with_context(
                e.to_string(),
                ErrorContext::new().with_field_path("config.base_url"),
            )
        })?;

        // No whole-request timeout on the client: streamed bodies may legitimately
        // run long. Per-request bounds are applied in `guarded`.
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Some(proxy_url) = &config.proxy_url {
            if let Ok(proxy) = Proxy::all(proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url,
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Absolute `http(s)` URLs are used as-is; anything else is joined onto the base URL.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        let resolved = if path.starts_with("http://") || path.starts_with("https://") {
            Url::parse(path)
        } else {
            self.base_url.join(path)
        };
        resolved.map_err(|e| Error::Transport(TransportError::InvalidUrl(format!("{}: {}", path, e))))
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("accept", "application/json")
    }

    /// Send `request`, bounded by `timeout` and aborted by `cancel`.
    pub async fn send(
        &self,
        request: RequestBuilder,
        timeout: Option<Duration>,
        cancel: Option<&CancelHandle>,
    ) -> Result<Response> {
        guarded(
            async {
                request
                    .send()
                    .await
                    .map_err(|e| Error::Transport(TransportError::Http(e)))
            },
            timeout,
            cancel,
        )
        .await
    }

    /// POST a JSON body and return the response once headers arrive, leaving the
    /// body unread for streaming. Non-2xx responses become [`Error::Remote`].
    pub async fn post_stream<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancelHandle,
    ) -> Result<Response> {
        let url = self.resolve(path)?;
        let request = self
            .client
            .post(url.clone())
            .header("accept", "text/plain")
            .json(body);
        let response = self.send(request, Some(self.timeout), Some(cancel)).await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            info!(
                http_status = status,
                url = url.as_str(),
                "streaming request failed"
            );
            return Err(remote_error(response, Some(self.timeout), Some(cancel)).await);
        }
        Ok(response)
    }

    /// POST a JSON body and decode a JSON response. Not cached.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.resolve(path)?;
        let request = self.request(Method::POST, url).json(body);
        let response = self.send(request, Some(self.timeout), None).await?;
        if !response.status().is_success() {
            return Err(remote_error(response, Some(self.timeout), None).await);
        }
        let bytes = read_body(response, Some(self.timeout), None).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Read a full response body under the same timeout/abort rules as the request.
pub(crate) async fn read_body(
    response: Response,
    timeout: Option<Duration>,
    cancel: Option<&CancelHandle>,
) -> Result<bytes::Bytes> {
    guarded(
        async {
            response
                .bytes()
                .await
                .map_err(|e| Error::Transport(TransportError::Http(e)))
        },
        timeout,
        cancel,
    )
    .await
}

/// Turn a non-2xx response into [`Error::Remote`]. The error body is read
/// under the same timeout/abort rules as the request; if that read times out
/// or is aborted, the transport error is returned instead.
pub(crate) async fn remote_error(
    response: Response,
    timeout: Option<Duration>,
    cancel: Option<&CancelHandle>,
) -> Error {
    let status = response.status().as_u16();
    let body = guarded(
        async {
            response
                .text()
                .await
                .map_err(|e| Error::Transport(TransportError::Http(e)))
        },
        timeout,
        cancel,
    )
    .await;
    match body {
        Ok(message) => Error::Remote { status, message },
        Err(Error::Transport(TransportError::Http(_))) => Error::Remote {
            status,
            message: String::new(),
        },
        Err(e) => e,
    }
}

/// Run `fut`, failing with a transport error on timeout or abort.
pub(crate) async fn guarded<F, T>(
    fut: F,
    timeout: Option<Duration>,
    cancel: Option<&CancelHandle>,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let aborted = async {
        match cancel {
            Some(handle) => handle.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    };
    let bounded = async {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => Err(Error::Transport(TransportError::Timeout(limit))),
            },
            None => fut.await,
        }
    };
    tokio::select! {
        biased;
        _ = aborted => Err(Error::Transport(TransportError::Aborted)),
        result = bounded => result,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request aborted")]
    Aborted,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Other(String),
}
