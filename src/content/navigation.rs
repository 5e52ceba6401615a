use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::debug;
use url::Url;

/// Something that should re-trigger a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    /// In-page navigation to a new location
    PushState(Url),
    /// Back/forward to a location
    PopState(Url),
    /// Explicit rescan of the current location
    Rescan,
}

pub type SubscriptionId = u64;

pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<NavigationEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next event; `None` once unsubscribed
    pub async fn recv(&mut self) -> Option<NavigationEvent> {
        self.rx.recv().await
    }
}

/// Fans navigation events out to subscribers.
#[derive(Default)]
pub struct NavigationObserver {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<SubscriptionId, mpsc::UnboundedSender<NavigationEvent>>>,
}

impl NavigationObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers().insert(id, tx);
        Subscription { id, rx }
    }

    /// Stop delivering to `id`; false if it was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers().remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    pub fn push_state(&self, url: Url) -> usize {
        self.publish(NavigationEvent::PushState(url))
    }

    pub fn pop_state(&self, url: Url) -> usize {
        self.publish(NavigationEvent::PopState(url))
    }

    pub fn request_rescan(&self) -> usize {
        self.publish(NavigationEvent::Rescan)
    }

    /// Deliver to every live subscriber; returns how many received it
    fn publish(&self, event: NavigationEvent) -> usize {
        let mut subscribers = self.subscribers();
        subscribers.retain(|_, tx| !tx.is_closed());

        let delivered = subscribers
            .values()
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count();
        debug!("{:?} delivered to {} subscriber(s)", event, delivered);
        delivered
    }

    fn subscribers(&self) -> MutexGuard<'_, HashMap<SubscriptionId, mpsc::UnboundedSender<NavigationEvent>>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse("https://www.amazon.in/").unwrap().join(path).unwrap()
    }

    #[tokio::test]
    async fn test_events_reach_subscribers_in_order() {
        let observer = NavigationObserver::new();
        let mut a = observer.subscribe();
        let mut b = observer.subscribe();

        assert_eq!(observer.push_state(url("/s?k=atta")), 2);
        assert_eq!(observer.request_rescan(), 2);

        assert_eq!(a.recv().await, Some(NavigationEvent::PushState(url("/s?k=atta"))));
        assert_eq!(a.recv().await, Some(NavigationEvent::Rescan));
        assert_eq!(b.recv().await, Some(NavigationEvent::PushState(url("/s?k=atta"))));
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let observer = NavigationObserver::new();
        let mut sub = observer.subscribe();

        assert!(observer.unsubscribe(sub.id()));
        assert!(!observer.unsubscribe(sub.id()));
        assert_eq!(observer.pop_state(url("/dp/B0")), 0);
        assert_eq!(sub.recv().await, None);
    }

    #[test]
    fn test_recv_waits_for_an_event() {
        let observer = NavigationObserver::new();
        let mut sub = observer.subscribe();

        let mut next = tokio_test::task::spawn(sub.recv());
        tokio_test::assert_pending!(next.poll());

        observer.request_rescan();
        assert!(next.is_woken());
        assert_eq!(
            tokio_test::assert_ready!(next.poll()),
            Some(NavigationEvent::Rescan)
        );
    }

    #[test]
    fn test_dropped_subscriptions_are_pruned() {
        let observer = NavigationObserver::new();
        let kept = observer.subscribe();
        drop(observer.subscribe());

        assert_eq!(observer.request_rescan(), 1);
        assert_eq!(observer.subscriber_count(), 1);
        drop(kept);
    }
}
