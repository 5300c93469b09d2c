//! Callback-style consumption of a subscription.

use tokio::task::JoinHandle;
use tracing::debug;

use crate::subscription::Subscription;

/// Handle to a running observer task.
///
/// Dropping the handle or calling [`unsubscribe`](SubscriptionHandle::unsubscribe)
/// stops the callbacks and releases the underlying subscription.
#[derive(Debug)]
pub struct SubscriptionHandle {
    name: &'static str,
    join: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether callbacks may still fire.
    pub fn is_active(&self) -> bool {
        self.join.as_ref().map(|j| !j.is_finished()).unwrap_or(false)
    }

    /// Stop the observer and wait until it has exited.
    pub async fn unsubscribe(mut self) {
        if let Some(join) = self.join.take() {
            join.abort();
            let _ = join.await;
        }
        debug!(observer = self.name, "observer unsubscribed");
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            join.abort();
        }
    }
}

/// Drive `subscription` on a background task, routing `Ok` items to
/// `on_next` and `Err` items to `on_error`.
///
/// Must be called from within a tokio runtime.
pub fn observe<T, E, N, R>(
    name: &'static str,
    mut subscription: Subscription<Result<T, E>>,
    mut on_next: N,
    mut on_error: R,
) -> SubscriptionHandle
where
    T: Send + 'static,
    E: Send + 'static,
    N: FnMut(T) + Send + 'static,
    R: FnMut(E) + Send + 'static,
{
    let join = tokio::spawn(async move {
        while let Some(item) = subscription.recv().await {
            match item {
                Ok(value) => on_next(value),
                Err(err) => on_error(err),
            }
        }
        debug!(observer = name, "observed stream ended");
    });

    SubscriptionHandle {
        name,
        join: Some(join),
    }
}
