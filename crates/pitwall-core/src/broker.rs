//! Topic-keyed publish/subscribe.
//!
//! A [`Broker`] is instantiated once per value type and handed to every
//! producer and consumer that needs it. Each subscription owns its own
//! unbounded queue, so publishing never waits on a consumer and a slow
//! consumer never delays its siblings.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use anyhow::{Result, bail};
use futures_util::Stream;
use tokio::sync::mpsc;
use tracing::debug;

pub type SubscriptionId = u64;

type Senders<T> = Vec<(SubscriptionId, mpsc::UnboundedSender<T>)>;

struct Shared<T> {
    topics: Mutex<HashMap<String, Senders<T>>>,
    next_id: AtomicU64,
}

impl<T> Shared<T> {
    fn topics(&self) -> MutexGuard<'_, HashMap<String, Senders<T>>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, topic: &str, id: SubscriptionId) {
        let mut topics = self.topics();
        if let Some(senders) = topics.get_mut(topic) {
            senders.retain(|(sub_id, _)| *sub_id != id);
        }
    }
}

/// Fan-out broker for values of type `T`.
///
/// Cloning a broker yields another handle to the same topic map.
pub struct Broker<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Broker<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for Broker<T> {
    fn default() -> Self {
        Self {
            shared: Arc::new(Shared {
                topics: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }
}

impl<T: Clone + Send + 'static> Broker<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscription on `topic`.
    ///
    /// Only values published after this call are delivered.
    pub fn subscribe(&self, topic: &str) -> Result<Subscription<T>> {
        if topic.is_empty() {
            bail!("topic must not be empty");
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.shared
            .topics()
            .entry(topic.to_string())
            .or_default()
            .push((id, sender));

        debug!(topic, id, "subscription created");

        Ok(Subscription {
            id,
            topic: topic.to_string(),
            receiver,
            broker: Arc::downgrade(&self.shared),
        })
    }

    /// Offers `value` to every live subscription of `topic`.
    ///
    /// Returns how many subscriptions received it. Zero subscribers is not
    /// an error; the value is dropped.
    pub fn publish(&self, topic: &str, value: T) -> usize {
        if topic.is_empty() {
            debug!("dropping value published to empty topic");
            return 0;
        }

        let mut topics = self.shared.topics();
        let senders = topics.entry(topic.to_string()).or_default();

        senders.retain(|(_, sender)| sender.send(value.clone()).is_ok());
        let delivered = senders.len();

        if delivered == 0 {
            debug!(topic, "published with no subscribers");
        }
        delivered
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.shared
            .topics()
            .get(topic)
            .map_or(0, |senders| {
                senders.iter().filter(|(_, s)| !s.is_closed()).count()
            })
    }

    pub fn topic_count(&self) -> usize {
        self.shared.topics().len()
    }
}

/// One consumer's view of a topic.
///
/// A lazy, non-restartable sequence of values. Dropping it (or calling
/// [`Subscription::unsubscribe`]) removes it from the broker so nothing
/// more is queued for it.
pub struct Subscription<T> {
    id: SubscriptionId,
    topic: String,
    receiver: mpsc::UnboundedReceiver<T>,
    broker: Weak<Shared<T>>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Waits for the next value.
    ///
    /// Returns `None` once the broker is gone and the queue is drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Returns the next queued value without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.receiver.close();
        if let Some(shared) = self.broker.upgrade() {
            shared.remove(&self.topic, self.id);
        }
        debug!(topic = %self.topic, id = self.id, "subscription dropped");
    }
}

impl<T> Unpin for Subscription<T> {}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::StreamExt;
    use tokio::time::timeout;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Standings(&'static str);

    async fn next<T>(sub: &mut Subscription<T>) -> T {
        timeout(Duration::from_millis(200), sub.recv())
            .await
            .expect("timeout")
            .expect("value")
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_silent() {
        let broker = Broker::new();
        assert_eq!(broker.publish("standings-S1", Standings("v1")), 0);
        assert_eq!(broker.topic_count(), 1);
    }

    #[tokio::test]
    async fn fans_out_to_every_subscription_in_order() {
        let broker = Broker::new();
        let mut sub1 = broker.subscribe("standings-S1").unwrap();
        let mut sub2 = broker.subscribe("standings-S1").unwrap();

        assert_eq!(broker.publish("standings-S1", Standings("v1")), 2);
        assert_eq!(next(&mut sub1).await, Standings("v1"));
        assert_eq!(next(&mut sub2).await, Standings("v1"));

        broker.publish("standings-S1", Standings("v2"));
        assert_eq!(next(&mut sub1).await, Standings("v2"));
        assert_eq!(next(&mut sub2).await, Standings("v2"));
    }

    #[tokio::test]
    async fn slow_subscriber_does_not_hold_back_others() {
        let broker = Broker::new();
        let mut slow = broker.subscribe("t").unwrap();
        let mut fast = broker.subscribe("t").unwrap();

        for n in 0..100 {
            broker.publish("t", n);
        }
        for n in 0..100 {
            assert_eq!(next(&mut fast).await, n);
        }
        assert_eq!(slow.try_recv(), Some(0));
    }

    #[tokio::test]
    async fn no_replay_for_late_subscriptions() {
        let broker = Broker::new();
        let mut early = broker.subscribe("t").unwrap();
        broker.publish("t", 1);

        let mut late = broker.subscribe("t").unwrap();
        assert_eq!(late.try_recv(), None);

        broker.publish("t", 2);
        assert_eq!(next(&mut early).await, 1);
        assert_eq!(next(&mut early).await, 2);
        assert_eq!(next(&mut late).await, 2);
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let broker = Broker::new();
        let mut s1 = broker.subscribe("sessionInfo-S1").unwrap();
        let mut s2 = broker.subscribe("sessionInfo-S2").unwrap();

        broker.publish("sessionInfo-S2", "only s2");
        assert_eq!(s1.try_recv(), None);
        assert_eq!(next(&mut s2).await, "only s2");
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let broker = Broker::new();
        let sub = broker.subscribe("t").unwrap();
        let _other = broker.subscribe("t").unwrap();
        assert_eq!(broker.subscriber_count("t"), 2);

        sub.unsubscribe();
        assert_eq!(broker.subscriber_count("t"), 1);
        assert_eq!(broker.publish("t", 7), 1);
    }

    #[tokio::test]
    async fn empty_topic_is_rejected() {
        let broker: Broker<u8> = Broker::new();
        assert!(broker.subscribe("").is_err());
        assert_eq!(broker.publish("", 1), 0);
        assert_eq!(broker.topic_count(), 0);
    }

    #[tokio::test]
    async fn subscription_is_a_stream() {
        let broker = Broker::new();
        let sub = broker.subscribe("t").unwrap();
        broker.publish("t", 1);
        broker.publish("t", 2);
        drop(broker);

        let values: Vec<i32> = sub.collect().await;
        assert_eq!(values, vec![1, 2]);
    }
}
