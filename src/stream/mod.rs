//! # Response Stream Ingestion
//!
//! Turns a chunked HTTP response body into an incrementally growing text
//! message, publishing every update to a caller-supplied sink.
//!
//! ```text
//! bytes ──► Utf8StreamDecoder ──► first chunk? ──► ControlPrefix ──► ControlValue
//!                                     │                  │
//!                                     ▼                  ▼ (rest of line)
//!                                  raw_buffer ◄──────────┘ ──► Text(full buffer)
//! ```
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ResponseStreamIngestor`] | State machine driving one response |
//! | [`StreamSession`] | Buffer, control value and state for one response |
//! | [`ControlPrefix`] | First-chunk metadata line recognition (`USER_ID:`) |
//! | [`Utf8StreamDecoder`] | Decoding with partial characters carried across chunks |
//! | [`CancelHandle`] | Consumer-side abort signal |
//!
//! ## Example
//!
//! ```rust
//! use chat_stream_client::stream::{ResponseStreamIngestor, StreamUpdate};
//!
//! let mut updates = Vec::new();
//! let mut ingestor = ResponseStreamIngestor::new(|u: StreamUpdate| updates.push(u));
//! ingestor.push_chunk(b"USER_ID: abc123\n")?;
//! ingestor.push_chunk(b"Hello ")?;
//! ingestor.push_chunk(b"world")?;
//! ingestor.finish()?;
//! assert_eq!(ingestor.buffer(), "Hello world");
//! drop(ingestor);
//! assert_eq!(updates[0], StreamUpdate::ControlValue("abc123".into()));
//! # Ok::<(), chat_stream_client::Error>(())
//! ```

mod cancel;
pub mod control;
mod ingest;
mod session;
pub mod utf8;


pub use cancel::CancelHandle;
pub use control::{is_valid_marker, ControlLine, ControlPrefix, USER_ID_MARKER};
pub use ingest::ResponseStreamIngestor;
pub use session::{StreamSession, StreamState};
pub use utf8::Utf8StreamDecoder;

/// One update published by the ingestor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdate {
    /// Value of a recognized first-chunk control line. Emitted at most once.
    ControlValue(String),
    /// The full visible text received so far.
    Text(String),
}

/// Receives ingestor updates in chunk arrival order.
pub trait StreamSink {
    fn emit(&mut self, update: StreamUpdate);
}

impl<F> StreamSink for F
where
    F: FnMut(StreamUpdate),
{
    fn emit(&mut self, update: StreamUpdate) {
        self(update)
    }
}
