//! # chat-stream-client
//!
//! Core of an AI chat client: streamed replies decoded into an incrementally
//! growing message, and cached backend reads with offline fallbacks.
//!
//! ## Overview
//!
//! - **Streaming**: [`stream::ResponseStreamIngestor`] turns a chunked HTTP body
//!   into text updates, strips a first-chunk control line (`USER_ID: ...`) and
//!   decodes UTF-8 across chunk boundaries.
//! - **Caching**: [`cache::TtlCache`] and [`transport::CachedFetcher`] give
//!   read-through caching for idempotent reads, with substring invalidation.
//! - **Client**: [`ChatClient`] wires both to the backend endpoints and to
//!   [`store::PersistedState`], degrading to local data when offline.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chat_stream_client::stream::{CancelHandle, StreamUpdate};
//! use chat_stream_client::{ChatClient, ChatContext};
//!
//! #[tokio::main]
//! async fn main() -> chat_stream_client::Result<()> {
//!     let client = ChatClient::builder()
//!         .base_url("http://localhost:5000")
//!         .build()?;
//!
//!     let user = client.load_user().await;
//!     let context = ChatContext::for_user(&user);
//!     let outcome = client
//!         .send_message(
//!             "Explain borrowing",
//!             &context,
//!             |update: StreamUpdate| println!("{update:?}"),
//!             &CancelHandle::new(),
//!         )
//!         .await?;
//!     println!("{}", outcome.ai_message.content());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | TTL cache with hit/miss statistics |
//! | [`stream`] | Response stream ingestor, control prefix, UTF-8 decoding, cancellation |
//! | [`transport`] | HTTP transport and read-through cached fetch |
//! | [`client`] | Chat client facade and builder |
//! | [`types`] | Messages, templates, user profile, conversation snapshots |
//! | [`store`] | Local key-value store and typed persisted state |
//! | [`config`] | Client configuration and environment overrides |

pub mod cache;
pub mod client;
pub mod config;
pub mod store;
pub mod stream;
pub mod transport;
pub mod types;

pub use cache::TtlCache;
pub use client::{ChatClient, ChatClientBuilder, ChatContext, SendOutcome};
pub use config::ClientConfig;
pub use stream::{CancelHandle, StreamUpdate};
pub use types::Message;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
