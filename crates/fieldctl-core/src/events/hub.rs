// ── Broadcast hub ──
//
// Each subscriber owns a bounded queue. Publishing never waits: a
// subscriber whose queue is full is evicted on the spot and its transport
// is told to close through the eviction token.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{Event, EventPublisher};
use crate::config::EventStreamConfig;

struct SubscriberHandle {
    tx: mpsc::Sender<Arc<str>>,
    evict: CancellationToken,
}

struct Shared {
    queue_depth: usize,
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, SubscriberHandle>>,
}

/// Fan-out hub for [`Event`]s. Clones share the same subscriber set.
#[derive(Clone)]
pub struct EventHub {
    shared: Arc<Shared>,
}

impl EventHub {
    pub fn new(config: &EventStreamConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue_depth: config.queue_depth.max(1),
                next_id: AtomicU64::new(0),
                subscribers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register a subscriber. It stays registered until it is evicted or
    /// the returned [`Subscription`] is dropped.
    pub fn subscribe(&self) -> Subscription {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.shared.queue_depth);
        let evict = CancellationToken::new();
        self.shared.subscribers.lock().insert(
            id,
            SubscriberHandle {
                tx,
                evict: evict.clone(),
            },
        );
        debug!(subscriber = id, "event subscriber registered");
        Subscription {
            id,
            rx,
            evict,
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.lock().len()
    }

    /// Deliver a pre-encoded message to every subscriber without blocking.
    pub fn broadcast(&self, message: Arc<str>) {
        let mut subscribers = self.shared.subscribers.lock();
        subscribers.retain(|id, sub| match sub.tx.try_send(Arc::clone(&message)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(subscriber = *id, "evicting event subscriber: connection too slow to keep up with messages");
                sub.evict.cancel();
                false
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }
}

impl EventPublisher for EventHub {
    fn publish(&self, event: Event) {
        match serde_json::to_string(&event) {
            Ok(json) => self.broadcast(Arc::from(json)),
            Err(e) => warn!(error = %e, kind = ?event.kind(), "failed to encode event"),
        }
    }
}

/// Receiving end of one hub subscriber.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<Arc<str>>,
    evict: CancellationToken,
    shared: Arc<Shared>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next message, or `None` once this subscriber has been evicted.
    /// Messages still queued at eviction are discarded.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        tokio::select! {
            biased;
            () = self.evict.cancelled() => None,
            msg = self.rx.recv() => msg,
        }
    }

    pub fn try_recv(&mut self) -> Option<Arc<str>> {
        if self.is_evicted() {
            return None;
        }
        self.rx.try_recv().ok()
    }

    pub fn is_evicted(&self) -> bool {
        self.evict.is_cancelled()
    }

    /// Token cancelled when the hub evicts this subscriber.
    pub fn eviction_token(&self) -> CancellationToken {
        self.evict.clone()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shared.subscribers.lock().remove(&self.id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn hub(depth: usize) -> EventHub {
        EventHub::new(&EventStreamConfig {
            queue_depth: depth,
            write_timeout: Duration::from_secs(5),
        })
    }

    fn line(n: usize) -> Event {
        Event::LogLine {
            message: format!("line {n}"),
        }
    }

    #[test]
    fn fifth_undelivered_message_evicts_depth_four_subscriber() {
        let hub = hub(4);
        let sub = hub.subscribe();

        for n in 0..4 {
            hub.publish(line(n));
        }
        assert!(!sub.is_evicted());
        assert_eq!(hub.subscriber_count(), 1);

        hub.publish(line(4));
        assert!(sub.is_evicted());
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn evicted_subscriber_stops_receiving() {
        let hub = hub(1);
        let mut sub = hub.subscribe();
        hub.publish(line(0));
        hub.publish(line(1));

        assert_eq!(sub.recv().await, None);
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test]
    async fn slow_subscriber_does_not_stall_fast_one() {
        let hub = hub(4);
        let _stalled = hub.subscribe();
        let mut fast = hub.subscribe();

        let reader = tokio::spawn(async move {
            let mut got = Vec::new();
            while got.len() < 50 {
                match fast.recv().await {
                    Some(msg) => got.push(msg),
                    None => break,
                }
            }
            got
        });

        for n in 0..50 {
            hub.publish(line(n));
            tokio::task::yield_now().await;
        }

        let got = tokio::time::timeout(Duration::from_secs(5), reader)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.len(), 50);
        assert!(got[0].contains("line 0"));
        assert!(got[49].contains("line 49"));
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let hub = hub(4);
        let sub = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);
        drop(sub);
        assert_eq!(hub.subscriber_count(), 0);
        // Publishing with nobody listening is fine.
        hub.publish(line(0));
    }

    #[tokio::test]
    async fn messages_arrive_in_order() {
        let hub = hub(8);
        let mut sub = hub.subscribe();
        hub.publish_log_line("a");
        hub.publish_action_start("remap", "b");

        let first: Event = serde_json::from_str(&sub.recv().await.unwrap()).unwrap();
        let second: Event = serde_json::from_str(&sub.recv().await.unwrap()).unwrap();
        assert_eq!(first, Event::LogLine { message: "a".into() });
        assert_eq!(second.kind(), crate::events::EventType::ActionStart);
    }
}
