//! Unit of Work
//!
//! Atomic commit of the subscriber state change, its domain event record and
//! the audit entry. The bus publish happens strictly after the durable
//! commit, so an event is never observed for a write that was rolled back.
//! Delivery is at-least-once: a publish failure after a successful commit is
//! logged and not retried here.

use async_trait::async_trait;
use bib_bus::EventPublisher;
use bib_common::EventEnvelope;
use mongodb::{
    bson::{doc, to_document, Document},
    Client, Database,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

use super::domain_event::DomainEvent;
use super::error::UseCaseError;
use super::execution_context::ExecutionContext;
use super::result::UseCaseResult;
use crate::audit::AuditLog;
use crate::subscriber::entity::Subscriber;
use crate::subscriber::repository::SubscriberStore;

/// Atomic commit for subscriber operations.
///
/// **This is the only way to mint a successful `UseCaseResult`** (the
/// idempotent no-op aside), which guarantees that a state change can never
/// skip its event and audit path.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Persist the subscriber, record the domain event and the audit entry
    /// atomically, then publish the event to the bus.
    async fn commit<E, C>(
        &self,
        subscriber: &Subscriber,
        event: E,
        command: &C,
    ) -> UseCaseResult<E>
    where
        E: DomainEvent + Serialize + Send + 'static,
        C: Serialize + Send + Sync;

    /// Persist the subscriber and the audit entry without emitting an event.
    /// Used by mutations that did not flip any externally visible status.
    async fn commit_quiet<C>(
        &self,
        subscriber: &Subscriber,
        command: &C,
        ctx: &ExecutionContext,
    ) -> UseCaseResult<()>
    where
        C: Serialize + Send + Sync;
}

/// Build the wire envelope for a committed domain event.
pub fn envelope_for<E: DomainEvent>(event: &E) -> EventEnvelope {
    let data: serde_json::Value =
        serde_json::from_str(&event.to_data_json()).unwrap_or(serde_json::json!({}));

    EventEnvelope {
        id: event.event_id().to_string(),
        event_type: event.event_type().to_string(),
        source: event.source().to_string(),
        subject: Some(event.subject().to_string()),
        time: event.time(),
        group: Some(event.message_group().to_string()),
        correlation_id: event.correlation_id().to_string(),
        causation_id: event.causation_id().map(String::from),
        data,
    }
}

async fn publish_committed(publisher: &dyn EventPublisher, topic: &str, envelope: EventEnvelope) {
    let event_id = envelope.id.clone();
    if let Err(e) = publisher.publish(topic, envelope).await {
        // The write is already durable; at-least-once delivery with no
        // outbox means this event is lost to downstream consumers.
        error!(
            event_id = %event_id,
            topic,
            error = %e,
            "Failed to publish committed event"
        );
    }
}

/// MongoDB implementation using multi-document transactions.
///
/// Requires a replica set deployment (transactions need one).
#[derive(Clone)]
pub struct MongoUnitOfWork {
    client: Client,
    database: Database,
    publisher: Arc<dyn EventPublisher>,
}

impl MongoUnitOfWork {
    pub fn new(client: Client, database: Database, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { client, database, publisher }
    }

    const SUBSCRIBERS: &'static str = "subscribers";
    const EVENTS: &'static str = "events";
    const AUDIT_LOGS: &'static str = "audit_logs";
}

#[async_trait]
impl UnitOfWork for MongoUnitOfWork {
    async fn commit<E, C>(
        &self,
        subscriber: &Subscriber,
        event: E,
        command: &C,
    ) -> UseCaseResult<E>
    where
        E: DomainEvent + Serialize + Send + 'static,
        C: Serialize + Send + Sync,
    {
        let mut session = match self.client.start_session().await {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to start MongoDB session: {}", e);
                return UseCaseResult::failure(UseCaseError::commit(format!(
                    "Failed to start session: {}",
                    e
                )));
            }
        };

        if let Err(e) = session.start_transaction().await {
            error!("Failed to start transaction: {}", e);
            return UseCaseResult::failure(UseCaseError::commit(format!(
                "Failed to start transaction: {}",
                e
            )));
        }

        // 1. Persist subscriber (upsert)
        let collection = self.database.collection::<Document>(Self::SUBSCRIBERS);
        let subscriber_doc = match to_document(subscriber) {
            Ok(d) => d,
            Err(e) => {
                let _ = session.abort_transaction().await;
                return UseCaseResult::failure(UseCaseError::commit(format!(
                    "Failed to serialize subscriber: {}",
                    e
                )));
            }
        };

        if let Err(e) = collection
            .update_one(doc! { "_id": &subscriber.id }, doc! { "$set": &subscriber_doc })
            .upsert(true)
            .session(&mut session)
            .await
        {
            let _ = session.abort_transaction().await;
            error!("Failed to persist subscriber: {}", e);
            return UseCaseResult::failure(UseCaseError::commit(format!(
                "Failed to persist subscriber: {}",
                e
            )));
        }

        // 2. Record domain event
        let envelope = envelope_for(&event);
        let events_collection = self.database.collection::<EventEnvelope>(Self::EVENTS);
        if let Err(e) = events_collection
            .insert_one(&envelope)
            .session(&mut session)
            .await
        {
            let _ = session.abort_transaction().await;
            error!("Failed to insert event: {}", e);
            return UseCaseResult::failure(UseCaseError::commit(format!(
                "Failed to insert event: {}",
                e
            )));
        }

        // 3. Record audit entry
        let audit_log = AuditLog::from_command(
            "Subscriber",
            &subscriber.id,
            command,
            Some(event.principal_id().to_string()),
        )
        .with_performed_at(event.time());
        let audit_collection = self.database.collection::<AuditLog>(Self::AUDIT_LOGS);
        if let Err(e) = audit_collection
            .insert_one(&audit_log)
            .session(&mut session)
            .await
        {
            let _ = session.abort_transaction().await;
            error!("Failed to insert audit log: {}", e);
            return UseCaseResult::failure(UseCaseError::commit(format!(
                "Failed to insert audit log: {}",
                e
            )));
        }

        if let Err(e) = session.commit_transaction().await {
            error!("Failed to commit transaction: {}", e);
            return UseCaseResult::failure(UseCaseError::commit(format!(
                "Failed to commit transaction: {}",
                e
            )));
        }

        debug!(
            event_id = event.event_id(),
            event_type = event.event_type(),
            subscriber_id = %subscriber.id,
            "Committed subscriber change with event"
        );

        publish_committed(self.publisher.as_ref(), event.topic(), envelope).await;

        UseCaseResult::success(event)
    }

    async fn commit_quiet<C>(
        &self,
        subscriber: &Subscriber,
        command: &C,
        ctx: &ExecutionContext,
    ) -> UseCaseResult<()>
    where
        C: Serialize + Send + Sync,
    {
        let mut session = match self.client.start_session().await {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to start MongoDB session: {}", e);
                return UseCaseResult::failure(UseCaseError::commit(format!(
                    "Failed to start session: {}",
                    e
                )));
            }
        };

        if let Err(e) = session.start_transaction().await {
            error!("Failed to start transaction: {}", e);
            return UseCaseResult::failure(UseCaseError::commit(format!(
                "Failed to start transaction: {}",
                e
            )));
        }

        let collection = self.database.collection::<Document>(Self::SUBSCRIBERS);
        let subscriber_doc = match to_document(subscriber) {
            Ok(d) => d,
            Err(e) => {
                let _ = session.abort_transaction().await;
                return UseCaseResult::failure(UseCaseError::commit(format!(
                    "Failed to serialize subscriber: {}",
                    e
                )));
            }
        };

        if let Err(e) = collection
            .update_one(doc! { "_id": &subscriber.id }, doc! { "$set": &subscriber_doc })
            .upsert(true)
            .session(&mut session)
            .await
        {
            let _ = session.abort_transaction().await;
            error!("Failed to persist subscriber: {}", e);
            return UseCaseResult::failure(UseCaseError::commit(format!(
                "Failed to persist subscriber: {}",
                e
            )));
        }

        let audit_log = AuditLog::from_command(
            "Subscriber",
            &subscriber.id,
            command,
            Some(ctx.principal_id.clone()),
        );
        let audit_collection = self.database.collection::<AuditLog>(Self::AUDIT_LOGS);
        if let Err(e) = audit_collection
            .insert_one(&audit_log)
            .session(&mut session)
            .await
        {
            let _ = session.abort_transaction().await;
            error!("Failed to insert audit log: {}", e);
            return UseCaseResult::failure(UseCaseError::commit(format!(
                "Failed to insert audit log: {}",
                e
            )));
        }

        if let Err(e) = session.commit_transaction().await {
            error!("Failed to commit transaction: {}", e);
            return UseCaseResult::failure(UseCaseError::commit(format!(
                "Failed to commit transaction: {}",
                e
            )));
        }

        debug!(subscriber_id = %subscriber.id, "Committed subscriber change");

        UseCaseResult::success(())
    }
}

/// Embedded implementation over the in-memory store, for single-process
/// operation and tests. Commits are not transactional across the three
/// records; within one process the store write is the only observable one.
pub struct InMemoryUnitOfWork {
    store: Arc<dyn SubscriberStore>,
    publisher: Arc<dyn EventPublisher>,
    events: parking_lot::Mutex<Vec<EventEnvelope>>,
    audit_logs: parking_lot::Mutex<Vec<AuditLog>>,
}

impl InMemoryUnitOfWork {
    pub fn new(store: Arc<dyn SubscriberStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            store,
            publisher,
            events: parking_lot::Mutex::new(Vec::new()),
            audit_logs: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Event records committed so far, oldest first.
    pub fn committed_events(&self) -> Vec<EventEnvelope> {
        self.events.lock().clone()
    }

    /// Audit records committed so far, oldest first.
    pub fn committed_audit_logs(&self) -> Vec<AuditLog> {
        self.audit_logs.lock().clone()
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit<E, C>(
        &self,
        subscriber: &Subscriber,
        event: E,
        command: &C,
    ) -> UseCaseResult<E>
    where
        E: DomainEvent + Serialize + Send + 'static,
        C: Serialize + Send + Sync,
    {
        if let Err(e) = self.store.save(subscriber).await {
            return UseCaseResult::failure(UseCaseError::commit(format!(
                "Failed to persist subscriber: {}",
                e
            )));
        }

        let envelope = envelope_for(&event);
        self.events.lock().push(envelope.clone());
        self.audit_logs.lock().push(AuditLog::from_command(
            "Subscriber",
            &subscriber.id,
            command,
            Some(event.principal_id().to_string()),
        ));

        publish_committed(self.publisher.as_ref(), event.topic(), envelope).await;

        UseCaseResult::success(event)
    }

    async fn commit_quiet<C>(
        &self,
        subscriber: &Subscriber,
        command: &C,
        ctx: &ExecutionContext,
    ) -> UseCaseResult<()>
    where
        C: Serialize + Send + Sync,
    {
        if let Err(e) = self.store.save(subscriber).await {
            return UseCaseResult::failure(UseCaseError::commit(format!(
                "Failed to persist subscriber: {}",
                e
            )));
        }

        self.audit_logs.lock().push(AuditLog::from_command(
            "Subscriber",
            &subscriber.id,
            command,
            Some(ctx.principal_id.clone()),
        ));

        UseCaseResult::success(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriber::entity::{Gender, Subscriber};
    use crate::subscriber::operations::events::SubscriberRegistered;
    use crate::subscriber::repository::InMemorySubscriberStore;
    use bib_bus::InMemoryEventBus;
    use serde::Serialize;

    #[derive(Serialize)]
    struct FakeCommand {
        note: &'static str,
    }

    fn subscriber() -> Subscriber {
        Subscriber::new(
            "Marie",
            "Curie",
            "marie@bibliotheque.org",
            "+33100000001",
            34,
            Gender::Female,
        )
    }

    #[tokio::test]
    async fn test_commit_persists_and_publishes() {
        let store = Arc::new(InMemorySubscriberStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let uow = InMemoryUnitOfWork::new(store.clone(), bus.clone());

        let subscriber = subscriber();
        let ctx = ExecutionContext::create("test");
        let event = SubscriberRegistered::new(&ctx, &subscriber);

        let result = uow
            .commit(&subscriber, event, &FakeCommand { note: "register" })
            .await;
        assert!(result.is_success());

        assert!(store.find_by_id(&subscriber.id).await.unwrap().is_some());
        assert_eq!(uow.committed_events().len(), 1);
        assert_eq!(uow.committed_audit_logs().len(), 1);
        assert_eq!(bus.published(), 1);
        bus.quiesce().await;
    }

    #[tokio::test]
    async fn test_commit_quiet_emits_nothing() {
        let store = Arc::new(InMemorySubscriberStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let uow = InMemoryUnitOfWork::new(store.clone(), bus.clone());

        let subscriber = subscriber();
        let ctx = ExecutionContext::create("test");

        let result = uow
            .commit_quiet(&subscriber, &FakeCommand { note: "quiet" }, &ctx)
            .await;
        assert!(result.is_success());

        assert!(uow.committed_events().is_empty());
        assert_eq!(uow.committed_audit_logs().len(), 1);
        assert_eq!(bus.published(), 0);
    }

    #[test]
    fn test_envelope_for_carries_ordering_group() {
        let subscriber = subscriber();
        let ctx = ExecutionContext::create("test");
        let event = SubscriberRegistered::new(&ctx, &subscriber);

        let envelope = envelope_for(&event);
        assert_eq!(
            envelope.group.as_deref(),
            Some(format!("subscriber:{}", subscriber.id).as_str())
        );
        assert_eq!(envelope.id, event.event_id());
        assert_eq!(envelope.correlation_id, ctx.correlation_id);
    }
}
