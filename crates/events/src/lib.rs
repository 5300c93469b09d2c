//! Change-feed mechanics: fan-out feeds and cancellable subscriptions.
//!
//! Nothing here knows about products or movements. The document store and
//! the live projections build on these pieces to push snapshots to
//! consumers, and consumers release them by dropping or cancelling.

pub mod feed;
pub mod in_memory_feed;
pub mod observer;
pub mod subscription;

pub use feed::Feed;
pub use in_memory_feed::{InMemoryFeed, InMemoryFeedError};
pub use observer::{SubscriptionHandle, observe};
pub use subscription::Subscription;
