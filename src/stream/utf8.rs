//! Incremental UTF-8 decoding across chunk boundaries.

use crate::{Error, ErrorContext, Result};

/// Decodes a byte stream chunk by chunk, carrying an incomplete trailing
/// character over to the next call.
///
/// Invalid sequences are fatal. A character still incomplete when the stream
/// ends is reported by [`Utf8StreamDecoder::finish`].
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
    consumed: usize,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `pending + chunk` as forms complete characters.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<String> {
        self.pending.extend_from_slice(chunk);
        let complete = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            // error_len() == None: the input ends mid-character; keep the tail.
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => {
                return Err(Error::decode_with_context(
                    "invalid UTF-8 sequence",
                    ErrorContext::new()
                        .with_details(format!("byte {}", self.consumed + e.valid_up_to()))
                        .with_source("utf8_stream_decoder"),
                ))
            }
        };
        let tail = self.pending.split_off(complete);
        let head = std::mem::replace(&mut self.pending, tail);
        self.consumed += head.len();
        String::from_utf8(head).map_err(|e| {
            Error::decode_with_context(
                e.to_string(),
                ErrorContext::new().with_source("utf8_stream_decoder"),
            )
        })
    }

    /// Flush at end of stream. Fails if a partial character is left over.
    pub fn finish(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let dangling = self.pending.len();
        self.pending.clear();
        Err(Error::decode_with_context(
            "incomplete UTF-8 sequence at end of stream",
            ErrorContext::new()
                .with_details(format!("{} dangling byte(s) at byte {}", dangling, self.consumed))
                .with_source("utf8_stream_decoder"),
        ))
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
