//! Topic-based event bus.
//!
//! Each topic owns a broadcast channel. A subscription is a delivery task
//! that invokes the handler once per event published on its topic, for as
//! long as the caller's cancellation token is live. Events are not
//! persisted: a subscriber registered after a publish never sees it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::event::Event;

/// Default per-topic channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// A published event together with its routing information.
#[derive(Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub payload: Event,
    pub published_at: DateTime<Utc>,
}

/// A registration on one topic, owned by the caller.
///
/// The registration is live from creation and is removed from the bus the
/// moment the value is dropped.
pub struct Subscription {
    topic: String,
    rx: broadcast::Receiver<Message>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next event on the topic. Returns `None` once the topic is closed.
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            match self.rx.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(topic = %self.topic, skipped, "subscriber lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Event bus for Raybot.
#[derive(Clone)]
pub struct EventBus {
    topics: Arc<DashMap<String, broadcast::Sender<Message>>>,
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with the specified per-topic capacity.
    ///
    /// The capacity determines how many events are buffered for slow subscribers.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            capacity,
        }
    }

    /// Number of live subscriptions on a topic.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Publish an event on a topic.
    ///
    /// Returns the number of subscriptions the event was delivered to. With no
    /// subscribers the event is discarded.
    pub fn publish(&self, topic: &str, payload: Event) -> usize {
        let Some(tx) = self.topics.get(topic) else {
            tracing::trace!(topic, "publish without subscribers");
            return 0;
        };
        let message = Message {
            topic: topic.to_string(),
            payload,
            published_at: Utc::now(),
        };
        tx.send(message).unwrap_or(0)
    }

    /// Register on a topic and hand the registration to the caller.
    ///
    /// Events published after this returns are buffered for the
    /// subscription until it is dropped.
    pub fn subscription(&self, topic: &str) -> Subscription {
        Subscription {
            topic: topic.to_string(),
            rx: self.sender(topic).subscribe(),
        }
    }

    /// Subscribe a handler to a topic for the lifetime of `token`.
    ///
    /// The subscription is registered before this returns, so any event
    /// published afterwards reaches the handler. The handler runs on a
    /// delivery task, which drops the registration once it observes the
    /// cancelled token. Callers that need the registration gone at a known
    /// point should own a [`Subscription`] instead. Must be called from
    /// within a tokio runtime.
    pub fn subscribe<F>(&self, token: &CancellationToken, topic: &str, mut handler: F)
    where
        F: FnMut(Message) + Send + 'static,
    {
        if token.is_cancelled() {
            return;
        }

        let mut subscription = self.subscription(topic);
        let token = token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    received = subscription.recv() => match received {
                        Some(message) => handler(message),
                        None => break,
                    },
                }
            }
            tracing::trace!(topic = %subscription.topic(), "subscription closed");
        });
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<Message> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
