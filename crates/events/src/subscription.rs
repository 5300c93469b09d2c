use std::time::Duration;

use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::AbortHandle;
use tokio::time::error::Elapsed;

/// A cancellable stream of messages.
///
/// A subscription owns the receiving end of a channel and, optionally, the
/// task that feeds it. Dropping the subscription (or calling [`cancel`])
/// closes the channel and aborts that task, so producers see the consumer
/// is gone on their next send and release it.
///
/// [`cancel`]: Subscription::cancel
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: mpsc::UnboundedReceiver<M>,
    task: Option<AbortHandle>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: mpsc::UnboundedReceiver<M>) -> Self {
        Self {
            receiver,
            task: None,
        }
    }

    /// Tie the lifetime of a producer task to this subscription.
    pub fn with_task(receiver: mpsc::UnboundedReceiver<M>, task: AbortHandle) -> Self {
        Self {
            receiver,
            task: Some(task),
        }
    }

    /// Wait for the next message. `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<M> {
        self.receiver.recv().await
    }

    /// Try to receive a message without waiting.
    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Wait up to `timeout` for the next message.
    ///
    /// `Ok(None)` means the stream ended.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<M>, Elapsed> {
        tokio::time::timeout(timeout, self.receiver.recv()).await
    }

    /// Whether the producer side is still connected.
    pub fn is_active(&self) -> bool {
        !self.receiver.is_closed()
            && self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(true)
    }

    /// Stop receiving and release the producer.
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.receiver.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<M> Drop for Subscription<M> {
    fn drop(&mut self) {
        self.release();
    }
}
