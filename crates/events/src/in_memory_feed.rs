//! In-memory fan-out feed.

use std::sync::Mutex;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::feed::Feed;
use crate::subscription::Subscription;

#[derive(Debug, Error)]
pub enum InMemoryFeedError {
    /// Publish failed due to internal lock poisoning.
    #[error("feed lock poisoned")]
    Poisoned,
}

/// In-memory pub/sub feed.
///
/// - Non-blocking publish (unbounded channels)
/// - Dead subscribers are pruned on publish
#[derive(Debug)]
pub struct InMemoryFeed<M> {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<M>>>,
}

impl<M> InMemoryFeed<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subscribers that have not been released yet.
    pub fn subscriber_count(&self) -> usize {
        match self.subscribers.lock() {
            Ok(mut subs) => {
                subs.retain(|tx| !tx.is_closed());
                subs.len()
            }
            Err(_) => 0,
        }
    }
}

impl<M> Default for InMemoryFeed<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> Feed<M> for InMemoryFeed<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryFeedError;

    fn publish(&self, message: M) -> Result<usize, Self::Error> {
        let mut subs = self.subscribers.lock().map_err(|_| InMemoryFeedError::Poisoned)?;

        subs.retain(|tx| tx.send(message.clone()).is_ok());

        Ok(subs.len())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::unbounded_channel();

        // A poisoned lock still yields a subscription; it just never fires.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publishes_to_every_subscriber() {
        let feed = InMemoryFeed::<u32>::new();
        let mut a = feed.subscribe();
        let mut b = feed.subscribe();

        assert_eq!(feed.publish(5).unwrap(), 2);
        assert_eq!(a.recv().await, Some(5));
        assert_eq!(b.recv().await, Some(5));
    }

    #[tokio::test]
    async fn released_subscribers_are_pruned() {
        let feed = InMemoryFeed::<u32>::new();
        let keep = feed.subscribe();
        let gone = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 2);

        gone.cancel();
        assert_eq!(feed.publish(1).unwrap(), 1);
        assert_eq!(feed.subscriber_count(), 1);
        drop(keep);
        assert_eq!(feed.subscriber_count(), 0);
    }
}
