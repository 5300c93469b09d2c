//! Publish/subscribe abstraction (mechanics only).
//!
//! A feed fans every published message out to all live subscribers
//! (broadcast semantics). It is for distribution, not storage: the document
//! store remains the source of truth and a late subscriber only sees what is
//! published after it subscribed.
//!
//! Delivery is at-least-once from the consumer's point of view: snapshot
//! consumers recompute from whatever they receive, so duplicates are
//! harmless.

use std::sync::Arc;

use crate::subscription::Subscription;

/// Transport-agnostic fan-out feed.
pub trait Feed<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    /// Publish to every live subscriber. Returns how many received it.
    fn publish(&self, message: M) -> Result<usize, Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, F> Feed<M> for Arc<F>
where
    F: Feed<M> + ?Sized,
{
    type Error = F::Error;

    fn publish(&self, message: M) -> Result<usize, Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
