//! Units of work flowing through the dispatcher.
//!
//! A [`QueuedRow`] pairs an assembled request with the channel its result is
//! reported on. The matching [`PendingRow`] is the receiving half, a future that
//! resolves to that row's [`RowResult`].

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::adapter::CompletionRequest;
use crate::error::RowError;
use crate::result::RowResult;

/// A row waiting for a concurrency slot.
pub(crate) struct QueuedRow {
    index: usize,
    request: CompletionRequest,
    sender: oneshot::Sender<RowResult>,
}

impl QueuedRow {
    /// Creates the queued row together with the future its result arrives on.
    pub fn channel(index: usize, request: CompletionRequest) -> (Self, PendingRow) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                index,
                request,
                sender,
            },
            PendingRow { index, receiver },
        )
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn request(&self) -> &CompletionRequest {
        &self.request
    }

    /// Reports the outcome. A receiver that already gave up is ignored.
    pub fn complete(self, outcome: Result<String, RowError>) {
        let _ = self.sender.send(RowResult {
            index: self.index,
            outcome,
        });
    }
}

/// Receiving half of a [`QueuedRow`].
///
/// Resolves to [`RowError::Abandoned`] if the row's task ends without reporting,
/// for example because it was aborted.
pub(crate) struct PendingRow {
    index: usize,
    receiver: oneshot::Receiver<RowResult>,
}

impl PendingRow {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Future for PendingRow {
    type Output = RowResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.receiver).poll(cx).map(|received| {
            received.unwrap_or_else(|_| RowResult::failed(this.index, RowError::Abandoned))
        })
    }
}
