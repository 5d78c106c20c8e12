//! Client configuration with environment overrides.

use crate::stream::{is_valid_marker, USER_ID_MARKER};
use crate::{Error, ErrorContext, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_MODEL: &str = "phi4";

/// Models the backend accepts, as `(id, display label)`.
pub const AVAILABLE_MODELS: &[(&str, &str)] = &[("phi4", "Phi-4"), ("deepseek", "DeepSeek")];

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin; relative request paths are joined onto it.
    pub base_url: String,
    /// Bound on non-streaming requests and on receiving response headers for streams.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub proxy_url: Option<String>,
    /// Number of most recent messages sent as history with each chat request.
    pub history_limit: usize,
    pub default_model: String,
    pub user_ttl: Duration,
    pub templates_ttl: Duration,
    pub conversations_ttl: Duration,
    /// First-chunk control markers. Empty disables control prefix recognition.
    pub control_markers: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            proxy_url: None,
            history_limit: 10,
            default_model: DEFAULT_MODEL.to_string(),
            user_ttl: Duration::from_secs(5 * 60),
            templates_ttl: Duration::from_secs(10 * 60),
            conversations_ttl: Duration::from_secs(2 * 60),
            control_markers: vec![USER_ID_MARKER.to_string()],
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by environment variables:
    /// - `CHAT_BASE_URL`
    /// - `CHAT_HTTP_TIMEOUT_SECS`
    /// - `CHAT_PROXY_URL`
    /// - `CHAT_HISTORY_LIMIT`
    /// - `CHAT_DEFAULT_MODEL`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(url) = env::var("CHAT_BASE_URL") {
            cfg.base_url = url;
        }
        if let Some(secs) = env::var("CHAT_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|s| *s > 0)
        {
            cfg.timeout = Duration::from_secs(secs);
        }
        cfg.proxy_url = env::var("CHAT_PROXY_URL").ok();
        if let Some(n) = env::var("CHAT_HISTORY_LIMIT")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            cfg.history_limit = n;
        }
        if let Ok(model) = env::var("CHAT_DEFAULT_MODEL") {
            cfg.default_model = model;
        }
        cfg
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base URL: {}", e),
                ErrorContext::new()
                    .with_field_path("config.base_url")
                    .with_details(self.base_url.clone()),
            )
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::configuration_with_context(
                "base URL must use http or https",
                ErrorContext::new()
                    .with_field_path("config.base_url")
                    .with_details(self.base_url.clone()),
            ));
        }
        if self.history_limit == 0 {
            return Err(Error::configuration_with_context(
                "history limit must be at least 1",
                ErrorContext::new().with_field_path("config.history_limit"),
            ));
        }
        if let Some(marker) = self.control_markers.iter().find(|m| !is_valid_marker(m)) {
            return Err(Error::configuration_with_context(
                "control markers must be non-empty and contain no ':' or line breaks",
                ErrorContext::new()
                    .with_field_path("config.control_markers")
                    .with_details(format!("{:?}", marker)),
            ));
        }
        if self.default_model.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "default model must not be empty",
                ErrorContext::new().with_field_path("config.default_model"),
            ));
        }
        Ok(())
    }
}
