//! In-memory event bus.
//!
//! Suitable for single-process operation and tests; distributed deployments
//! put a broker-backed implementation behind the same traits. Envelopes with
//! the same group are funneled through one worker task regardless of topic,
//! so everything targeting one aggregate is handled strictly in publish
//! order while distinct groups proceed in parallel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bib_common::EventEnvelope;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::{BusError, EventBus, EventHandler, EventPublisher, Result};

type HandlerMap = Arc<DashMap<String, Vec<Arc<dyn EventHandler>>>>;

pub struct InMemoryEventBus {
    /// Handlers by topic.
    handlers: HandlerMap,

    /// Group worker inboxes, keyed by group.
    groups: DashMap<String, mpsc::UnboundedSender<(String, EventEnvelope)>>,

    /// Total envelopes accepted for delivery.
    published: Arc<AtomicU64>,

    /// Envelopes accepted but not yet fully handled.
    in_flight: Arc<AtomicU64>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(DashMap::new()),
            groups: DashMap::new(),
            published: Arc::new(AtomicU64::new(0)),
            in_flight: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Total envelopes accepted for delivery.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Wait until every accepted envelope has been handled.
    pub async fn quiesce(&self) {
        while self.in_flight.load(Ordering::Acquire) > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
    }

    fn group_sender(&self, group: &str) -> mpsc::UnboundedSender<(String, EventEnvelope)> {
        self.groups
            .entry(group.to_string())
            .or_insert_with(|| {
                spawn_group_worker(
                    group.to_string(),
                    self.handlers.clone(),
                    self.in_flight.clone(),
                )
            })
            .clone()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, topic: &str, envelope: EventEnvelope) -> Result<()> {
        let has_handlers = self
            .handlers
            .get(topic)
            .map(|h| !h.is_empty())
            .unwrap_or(false);

        self.published.fetch_add(1, Ordering::Relaxed);

        if !has_handlers {
            warn!(
                topic,
                event_type = %envelope.event_type,
                "Event dropped (no subscribers)"
            );
            return Ok(());
        }

        let sender = self.group_sender(envelope.group_key());
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        if sender.send((topic.to_string(), envelope)).is_err() {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            return Err(BusError::Closed);
        }
        Ok(())
    }
}

impl EventBus for InMemoryEventBus {
    fn subscribe(&self, topic: &str, handler: Arc<dyn EventHandler>) {
        self.handlers
            .entry(topic.to_string())
            .or_default()
            .push(handler);
        debug!(topic, "Subscription registered");
    }
}

/// One worker per group: drains its inbox sequentially, giving FIFO ordering
/// for everything targeting the group's aggregate. A failing handler is
/// logged and skipped so one poisoned envelope never blocks the rest of the
/// group's traffic.
fn spawn_group_worker(
    group: String,
    handlers: HandlerMap,
    in_flight: Arc<AtomicU64>,
) -> mpsc::UnboundedSender<(String, EventEnvelope)> {
    let (tx, mut rx) = mpsc::unbounded_channel::<(String, EventEnvelope)>();

    tokio::spawn(async move {
        while let Some((topic, envelope)) = rx.recv().await {
            let snapshot: Vec<Arc<dyn EventHandler>> = handlers
                .get(&topic)
                .map(|h| h.value().clone())
                .unwrap_or_default();

            for handler in snapshot {
                if let Err(e) = handler.handle(envelope.clone()).await {
                    error!(
                        topic = %topic,
                        group = %group,
                        event_id = %envelope.id,
                        event_type = %envelope.event_type,
                        error = %e,
                        "Event handler failed, dropping event"
                    );
                }
            }

            in_flight.fetch_sub(1, Ordering::AcqRel);
        }
    });

    tx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingHandler {
        seen: Mutex<Vec<String>>,
    }

    impl RecordingHandler {
        fn new() -> Arc<Self> {
            Arc::new(Self { seen: Mutex::new(Vec::new()) })
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        async fn handle(&self, envelope: EventEnvelope) -> Result<()> {
            self.seen.lock().unwrap().push(envelope.id.clone());
            Ok(())
        }
    }

    struct FailingHandler {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl EventHandler for FailingHandler {
        async fn handle(&self, envelope: EventEnvelope) -> Result<()> {
            *self.calls.lock().unwrap() += 1;
            if envelope.data["poison"].as_bool().unwrap_or(false) {
                return Err(BusError::handler("boom"));
            }
            Ok(())
        }
    }

    fn envelope(group: &str) -> EventEnvelope {
        EventEnvelope::new("test:event", "test", serde_json::json!({}))
            .with_group(group)
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_drops() {
        let bus = InMemoryEventBus::new();
        bus.publish("orphan-topic", envelope("g")).await.unwrap();
        assert_eq!(bus.published(), 1);
        bus.quiesce().await;
    }

    #[tokio::test]
    async fn test_fifo_within_group() {
        let bus = InMemoryEventBus::new();
        let handler = RecordingHandler::new();
        bus.subscribe("t", handler.clone());

        let mut ids = Vec::new();
        for _ in 0..20 {
            let env = envelope("subscriber:1");
            ids.push(env.id.clone());
            bus.publish("t", env).await.unwrap();
        }
        bus.quiesce().await;

        assert_eq!(handler.seen(), ids);
    }

    #[tokio::test]
    async fn test_fifo_spans_topics_for_one_group() {
        let bus = InMemoryEventBus::new();
        let handler = RecordingHandler::new();
        bus.subscribe("t1", handler.clone());
        bus.subscribe("t2", handler.clone());

        let mut ids = Vec::new();
        for i in 0..10 {
            let env = envelope("subscriber:1");
            ids.push(env.id.clone());
            let topic = if i % 2 == 0 { "t1" } else { "t2" };
            bus.publish(topic, env).await.unwrap();
        }
        bus.quiesce().await;

        assert_eq!(handler.seen(), ids);
    }

    #[tokio::test]
    async fn test_distinct_groups_all_delivered() {
        let bus = InMemoryEventBus::new();
        let handler = RecordingHandler::new();
        bus.subscribe("t", handler.clone());

        for i in 0..10 {
            bus.publish("t", envelope(&format!("subscriber:{}", i % 3)))
                .await
                .unwrap();
        }
        bus.quiesce().await;

        assert_eq!(handler.seen().len(), 10);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_block_group() {
        let bus = InMemoryEventBus::new();
        let failing = Arc::new(FailingHandler { calls: Mutex::new(0) });
        bus.subscribe("t", failing.clone());

        let poison = EventEnvelope::new("test:event", "test", serde_json::json!({ "poison": true }))
            .with_group("g");
        bus.publish("t", poison).await.unwrap();
        bus.publish("t", envelope("g")).await.unwrap();
        bus.quiesce().await;

        // Both envelopes were handled despite the first one failing.
        assert_eq!(*failing.calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_multiple_handlers_receive_each_envelope() {
        let bus = InMemoryEventBus::new();
        let first = RecordingHandler::new();
        let second = RecordingHandler::new();
        bus.subscribe("t", first.clone());
        bus.subscribe("t", second.clone());

        bus.publish("t", envelope("g")).await.unwrap();
        bus.quiesce().await;

        assert_eq!(first.seen().len(), 1);
        assert_eq!(second.seen().len(), 1);
    }
}
