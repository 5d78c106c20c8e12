//! Chunked response body -> incrementally growing text message.

use super::cancel::CancelHandle;
use super::control::ControlPrefix;
use super::session::{StreamSession, StreamState};
use super::utf8::Utf8StreamDecoder;
use super::{StreamSink, StreamUpdate};
use crate::{Error, ErrorContext, Result};
use futures::{Stream, StreamExt};
use tracing::{debug, info};

/// Reconstructs a text message from a chunked response body.
///
/// State machine:
/// - `AwaitingFirstChunk -> Streaming` on the first chunk, after the one-time
///   control prefix check.
/// - `Streaming -> Streaming` per chunk; the full buffer is emitted whenever a
///   chunk contributed text.
/// - `Streaming -> Completed` when the source ends and the decoder flushes cleanly.
/// - `-> Cancelled` on consumer abort; nothing is emitted afterwards.
/// - `-> Failed` on a source or decode error; the partial buffer stays readable.
///
/// Emissions preserve chunk arrival order and are never coalesced.
pub struct ResponseStreamIngestor<S> {
    session: StreamSession,
    decoder: Utf8StreamDecoder,
    control: ControlPrefix,
    sink: S,
}

impl<S: StreamSink> ResponseStreamIngestor<S> {
    pub fn new(sink: S) -> Self {
        Self {
            session: StreamSession::new(),
            decoder: Utf8StreamDecoder::new(),
            control: ControlPrefix::default(),
            sink,
        }
    }

    pub fn with_control_prefix(mut self, control: ControlPrefix) -> Self {
        self.control = control;
        self
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    pub fn state(&self) -> StreamState {
        self.session.state
    }

    pub fn buffer(&self) -> &str {
        &self.session.raw_buffer
    }

    pub fn into_session(self) -> StreamSession {
        self.session
    }

    pub fn into_parts(self) -> (StreamSession, S) {
        (self.session, self.sink)
    }

    /// Process one chunk.
    ///
    /// A cancelled session ignores further chunks. Pushing into a completed or
    /// failed session is an error.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        match self.session.state {
            StreamState::Cancelled => return Ok(()),
            StreamState::Completed | StreamState::Failed => {
                return Err(Error::runtime_with_context(
                    "chunk received after stream finished",
                    ErrorContext::new()
                        .with_details(format!("state: {:?}", self.session.state))
                        .with_source("stream_ingestor"),
                ))
            }
            StreamState::AwaitingFirstChunk | StreamState::Streaming => {}
        }

        let text = match self.decoder.decode(chunk) {
            Ok(text) => text,
            Err(e) => {
                self.session.state = StreamState::Failed;
                return Err(e);
            }
        };
        self.session.chunks_received += 1;
        debug!(
            chunk = self.session.chunks_received,
            bytes = chunk.len(),
            "stream chunk received"
        );

        if self.session.state == StreamState::AwaitingFirstChunk {
            self.session.control_prefix_consumed = true;
            self.session.state = StreamState::Streaming;
            if let Some(line) = self.control.split(&text) {
                debug!(marker = line.marker.as_str(), "control prefix extracted");
                self.session.extracted_control_value = Some(line.value.clone());
                self.sink.emit(StreamUpdate::ControlValue(line.value));
                self.append(line.rest);
                return Ok(());
            }
        }
        self.append(&text);
        Ok(())
    }

    fn append(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.session.raw_buffer.push_str(text);
        self.sink
            .emit(StreamUpdate::Text(self.session.raw_buffer.clone()));
    }

    /// Source signalled end of data: flush the decoder and complete.
    pub fn finish(&mut self) -> Result<()> {
        match self.session.state {
            StreamState::Cancelled | StreamState::Completed => return Ok(()),
            StreamState::Failed => {
                return Err(Error::runtime_with_context(
                    "cannot complete a failed stream",
                    ErrorContext::new().with_source("stream_ingestor"),
                ))
            }
            StreamState::AwaitingFirstChunk | StreamState::Streaming => {}
        }
        if let Err(e) = self.decoder.finish() {
            self.session.state = StreamState::Failed;
            return Err(e);
        }
        self.session.state = StreamState::Completed;
        Ok(())
    }

    /// Abandon the session. Already-emitted updates are not retracted.
    pub fn cancel(&mut self) {
        if !self.session.state.is_terminal() {
            self.session.state = StreamState::Cancelled;
        }
    }

    /// Drive the ingestor over `source` until it ends, errors, or `cancel` fires.
    ///
    /// On cancellation the source is dropped before returning, which releases
    /// the underlying response body. Source errors leave the session `Failed`
    /// and are returned to the caller.
    pub async fn run<St, B>(&mut self, source: St, cancel: &CancelHandle) -> Result<StreamState>
    where
        St: Stream<Item = Result<B>>,
        B: AsRef<[u8]>,
    {
        let mut source = Box::pin(source);
        loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Cancelled,
                next = source.next() => Step::Next(next),
            };
            match step {
                Step::Cancelled => {
                    drop(source);
                    self.cancel();
                    info!(
                        chunks = self.session.chunks_received,
                        "response stream cancelled"
                    );
                    return Ok(self.session.state);
                }
                Step::Next(Some(Ok(chunk))) => self.push_chunk(chunk.as_ref())?,
                Step::Next(Some(Err(e))) => {
                    self.session.state = StreamState::Failed;
                    return Err(e);
                }
                Step::Next(None) => {
                    self.finish()?;
                    info!(
                        chunks = self.session.chunks_received,
                        bytes = self.session.raw_buffer.len(),
                        "response stream completed"
                    );
                    return Ok(self.session.state);
                }
            }
        }
    }
}

enum Step<T> {
    Cancelled,
    Next(Option<T>),
}
