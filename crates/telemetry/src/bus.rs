//! Bounded tool-log with snapshot + incremental fan-out.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use {
    async_stream::stream,
    futures::Stream,
    tokio::sync::mpsc::{self, error::TrySendError},
    tracing::{debug, warn},
};

use crate::entry::TelemetryEntry;

/// Entries retained in the window.
pub const DEFAULT_CAPACITY: usize = 30;

/// Events buffered per subscriber before it counts as slow.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

/// Delay before [`follow`] re-subscribes after being dropped.
const RESUBSCRIBE_BACKOFF: Duration = Duration::from_secs(3);

/// What a subscriber receives.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    /// The full window, newest first. Always the first event.
    Snapshot(Vec<TelemetryEntry>),
    /// A single appended or finalized entry.
    Entry(TelemetryEntry),
}

struct Inner {
    /// Oldest first.
    entries: VecDeque<TelemetryEntry>,
    subscribers: Vec<mpsc::Sender<BusEvent>>,
}

pub struct TelemetryBus {
    inner: Mutex<Inner>,
    capacity: usize,
    subscriber_buffer: usize,
}

impl Default for TelemetryBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_SUBSCRIBER_BUFFER)
    }
}

impl TelemetryBus {
    pub fn new(capacity: usize, subscriber_buffer: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: VecDeque::with_capacity(capacity + 1),
                subscribers: Vec::new(),
            }),
            capacity: capacity.max(1),
            subscriber_buffer: subscriber_buffer.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a new entry, or replace the in-flight entry with the same id.
    ///
    /// Terminal entries are immutable: a second update to one is ignored.
    pub fn append_or_update(&self, entry: TelemetryEntry) {
        let mut inner = self.lock();
        match inner.entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) if existing.is_terminal() => {
                debug!(id = entry.id, "ignoring update to finalized entry");
                return;
            },
            Some(existing) => *existing = entry.clone(),
            None => inner.entries.push_back(entry.clone()),
        }
        inner.evict(self.capacity);
        inner.fan_out(BusEvent::Entry(entry));
    }

    /// Current window, newest first.
    pub fn snapshot(&self) -> Vec<TelemetryEntry> {
        self.lock().entries.iter().rev().cloned().collect()
    }

    /// Register a subscriber. The first event received is always a
    /// [`BusEvent::Snapshot`]; every later append or update follows in
    /// publish order. The receiver closes if the subscriber falls behind.
    pub fn subscribe(&self) -> mpsc::Receiver<BusEvent> {
        let (tx, rx) = mpsc::channel(self.subscriber_buffer);
        let mut inner = self.lock();
        let snapshot = inner.entries.iter().rev().cloned().collect();
        if tx.try_send(BusEvent::Snapshot(snapshot)).is_ok() {
            inner.subscribers.push(tx);
        }
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Inner {
    /// Drop the oldest finalized entries until the window fits. In-flight
    /// entries are never evicted, so the window exceeds capacity only until
    /// enough of them finalize.
    fn evict(&mut self, capacity: usize) {
        while self.entries.len() > capacity {
            match self.entries.iter().position(TelemetryEntry::is_terminal) {
                Some(idx) => {
                    self.entries.remove(idx);
                },
                None => break,
            }
        }
    }

    fn fan_out(&mut self, event: BusEvent) {
        self.subscribers
            .retain(|tx| match tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!("telemetry subscriber too slow, disconnecting");
                    false
                },
                Err(TrySendError::Closed(_)) => false,
            });
    }
}

/// Endless event stream over `bus`. After being dropped as a slow
/// subscriber it waits 3 s and re-subscribes, starting from a fresh snapshot.
pub fn follow(bus: Arc<TelemetryBus>) -> impl Stream<Item = BusEvent> + Send + 'static {
    follow_with_backoff(bus, RESUBSCRIBE_BACKOFF)
}

pub fn follow_with_backoff(
    bus: Arc<TelemetryBus>,
    backoff: Duration,
) -> impl Stream<Item = BusEvent> + Send + 'static {
    stream! {
        loop {
            let mut rx = bus.subscribe();
            while let Some(event) = rx.recv().await {
                yield event;
            }
            debug!(backoff_ms = backoff.as_millis() as u64, "telemetry subscription lost, resubscribing");
            tokio::time::sleep(backoff).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use {chatnest_common::Platform, futures::StreamExt};

    use {
        super::*,
        crate::entry::{TelemetryEntry, ToolStatus},
    };

    fn done(id: u64) -> TelemetryEntry {
        TelemetryEntry::calling(id, "fetch_messages", None).finished(
            ToolStatus::Done,
            1,
            "ok".into(),
        )
    }

    fn ids(entries: &[TelemetryEntry]) -> Vec<u64> {
        entries.iter().map(|e| e.id).collect()
    }

    #[test]
    fn window_keeps_thirty_newest_first() {
        let bus = TelemetryBus::default();
        for id in 1..=31 {
            bus.append_or_update(done(id));
        }
        let snap = bus.snapshot();
        assert_eq!(snap.len(), 30);
        assert_eq!(snap[0].id, 31);
        assert_eq!(snap[29].id, 2);
    }

    #[test]
    fn in_flight_entries_survive_eviction() {
        let bus = TelemetryBus::new(3, 8);
        bus.append_or_update(TelemetryEntry::calling(1, "send_reply", Some(Platform::Gmail)));
        for id in 2..=5 {
            bus.append_or_update(done(id));
        }
        assert_eq!(ids(&bus.snapshot()), vec![5, 4, 1]);

        // Nothing terminal to evict: the window overflows rather than drop 1.
        let bus = TelemetryBus::new(1, 8);
        bus.append_or_update(TelemetryEntry::calling(1, "a", None));
        bus.append_or_update(TelemetryEntry::calling(2, "b", None));
        assert_eq!(bus.len(), 2);
    }

    #[test]
    fn window_shrinks_back_once_in_flight_entries_finish() {
        let bus = TelemetryBus::new(2, 8);
        let calls: Vec<_> = (1..=3)
            .map(|id| TelemetryEntry::calling(id, "fetch_messages", None))
            .collect();
        for call in &calls {
            bus.append_or_update(call.clone());
        }
        assert_eq!(bus.len(), 3);

        for call in &calls {
            bus.append_or_update(call.finished(ToolStatus::Done, 1, "ok".into()));
        }
        assert_eq!(ids(&bus.snapshot()), vec![3, 2]);
    }

    #[test]
    fn update_replaces_in_place_once() {
        let bus = TelemetryBus::default();
        let entry = TelemetryEntry::calling(7, "mark_read", Some(Platform::Slack));
        bus.append_or_update(entry.clone());
        bus.append_or_update(done(8));
        bus.append_or_update(entry.finished(ToolStatus::Error, 5, "boom".into()));
        bus.append_or_update(entry.finished(ToolStatus::Done, 9, "late".into()));

        let snap = bus.snapshot();
        assert_eq!(ids(&snap), vec![8, 7]);
        assert_eq!(snap[1].status, ToolStatus::Error);
        assert_eq!(snap[1].result, "boom");
    }

    #[tokio::test]
    async fn subscriber_gets_snapshot_then_increments() {
        let bus = TelemetryBus::default();
        bus.append_or_update(done(1));
        let mut rx = bus.subscribe();
        bus.append_or_update(done(2));

        match rx.recv().await {
            Some(BusEvent::Snapshot(entries)) => assert_eq!(ids(&entries), vec![1]),
            other => panic!("expected snapshot, got {other:?}"),
        }
        match rx.recv().await {
            Some(BusEvent::Entry(entry)) => assert_eq!(entry.id, 2),
            other => panic!("expected entry, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_subscriber_is_dropped_without_blocking() {
        let bus = TelemetryBus::new(30, 2);
        let mut rx = bus.subscribe();
        bus.append_or_update(done(1));
        assert_eq!(bus.subscriber_count(), 1);
        bus.append_or_update(done(2));
        assert_eq!(bus.subscriber_count(), 0);

        assert!(matches!(rx.recv().await, Some(BusEvent::Snapshot(_))));
        assert!(matches!(rx.recv().await, Some(BusEvent::Entry(e)) if e.id == 1));
        assert!(rx.recv().await.is_none());
        assert_eq!(bus.len(), 2);
    }

    #[tokio::test]
    async fn closed_subscribers_are_pruned() {
        let bus = TelemetryBus::default();
        drop(bus.subscribe());
        bus.append_or_update(done(1));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn follow_resubscribes_with_fresh_snapshot() {
        let bus = Arc::new(TelemetryBus::new(30, 1));
        let mut events = Box::pin(follow_with_backoff(
            Arc::clone(&bus),
            Duration::from_millis(10),
        ));

        assert_eq!(events.next().await, Some(BusEvent::Snapshot(Vec::new())));
        bus.append_or_update(done(1));
        bus.append_or_update(done(2));

        assert!(matches!(events.next().await, Some(BusEvent::Entry(e)) if e.id == 1));
        match events.next().await {
            Some(BusEvent::Snapshot(entries)) => assert_eq!(ids(&entries), vec![2, 1]),
            other => panic!("expected fresh snapshot, got {other:?}"),
        }
    }
}
