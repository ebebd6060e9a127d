//! Subscriber interface for pipeline notifications.
//!
//! The coordinator pushes three kinds of notification to every attached
//! subscriber: a result was enriched, the run completed, a provider failed.

mod set;
mod subscriber;

pub use set::{Notification, SubscriberSet, SubscriptionId};
pub use subscriber::{
    ChannelSubscriber, CollectingSubscriber, EnrichmentSubscriber, LoggingSubscriber,
    NoOpSubscriber,
};
