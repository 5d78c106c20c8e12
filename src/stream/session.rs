/// Lifecycle of a single streamed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    AwaitingFirstChunk,
    Streaming,
    Completed,
    Cancelled,
    /// Stopped by a source or decode error. Never reached from `Completed`.
    Failed,
}

impl StreamState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StreamState::Completed | StreamState::Cancelled | StreamState::Failed
        )
    }
}

/// Accumulated state for one in-flight response. Owned by exactly one request.
#[derive(Debug, Clone)]
pub struct StreamSession {
    pub(crate) raw_buffer: String,
    pub(crate) control_prefix_consumed: bool,
    pub(crate) extracted_control_value: Option<String>,
    pub(crate) state: StreamState,
    pub(crate) chunks_received: usize,
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            raw_buffer: String::new(),
            control_prefix_consumed: false,
            extracted_control_value: None,
            state: StreamState::AwaitingFirstChunk,
            chunks_received: 0,
        }
    }

    /// Visible text decoded so far (control line excluded).
    pub fn raw_buffer(&self) -> &str {
        &self.raw_buffer
    }

    pub fn control_prefix_consumed(&self) -> bool {
        self.control_prefix_consumed
    }

    pub fn extracted_control_value(&self) -> Option<&str> {
        self.extracted_control_value.as_deref()
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn chunks_received(&self) -> usize {
        self.chunks_received
    }

    pub fn into_text(self) -> String {
        self.raw_buffer
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}
