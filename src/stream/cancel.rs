use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Handle used to abandon an in-flight stream or fetch.
///
/// Clones share the same signal. Cancelling is not an error: the operation
/// stops, releases its byte source, and reports a cancelled outcome.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once [`CancelHandle::cancel`] has been called on any clone.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// A handle cancelled together with this one, but cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }
}
