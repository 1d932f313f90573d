//! Domain Event Trait
//!
//! Domain events are facts about what happened (past tense):
//! `SubscriberRegistered`, not `RegisterSubscriber`.
//!
//! # Conventions
//!
//! - Event type: `{app}:{aggregate}:{action}`, e.g.
//!   `bibliotheque:subscriber:registered`
//! - Subject: `{app}.{aggregate}.{id}`, e.g. `bibliotheque.subscriber.<id>`
//! - Message group: `{aggregate}:{id}`. Events in the same group are
//!   delivered in order, which is how per-subscriber ordering reaches the
//!   transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::execution_context::ExecutionContext;

pub trait DomainEvent: Send + Sync {
    /// Unique identifier for this event.
    fn event_id(&self) -> &str;

    /// Event type code: `{app}:{aggregate}:{action}`.
    fn event_type(&self) -> &str;

    /// Source system that generated the event.
    fn source(&self) -> &str;

    /// Qualified aggregate identifier: `{app}.{aggregate}.{id}`.
    fn subject(&self) -> &str;

    /// When the event occurred.
    fn time(&self) -> DateTime<Utc>;

    /// Execution that produced the event.
    fn execution_id(&self) -> &str;

    /// Correlation id for distributed tracing.
    fn correlation_id(&self) -> &str;

    /// Id of the event that caused this one, if any.
    fn causation_id(&self) -> Option<&str>;

    /// Principal who initiated the action that produced this event.
    fn principal_id(&self) -> &str;

    /// Ordering key; carries the subscriber id.
    fn message_group(&self) -> &str;

    /// Bus topic the event is published to.
    fn topic(&self) -> &'static str;

    /// Serialize the event-specific payload to JSON.
    fn to_data_json(&self) -> String;
}

/// Common metadata for domain events. Event structs embed this as a field
/// named `metadata` and delegate the trait methods to it via
/// [`impl_domain_event!`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    pub event_id: String,
    pub event_type: String,
    pub source: String,
    pub subject: String,
    pub time: DateTime<Utc>,
    pub execution_id: String,
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<String>,
    pub principal_id: String,
    pub message_group: String,
}

impl EventMetadata {
    pub fn new(
        event_type: &str,
        source: &str,
        subject: String,
        message_group: String,
        ctx: &ExecutionContext,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            event_type: event_type.to_string(),
            source: source.to_string(),
            subject,
            time: Utc::now(),
            execution_id: ctx.execution_id.clone(),
            correlation_id: ctx.correlation_id.clone(),
            causation_id: ctx.causation_id.clone(),
            principal_id: ctx.principal_id.clone(),
            message_group,
        }
    }
}

/// Implements [`DomainEvent`] by delegating to an `EventMetadata` field named
/// `metadata`, binding the event to its bus topic.
///
/// ```ignore
/// pub struct SubscriberRegistered {
///     metadata: EventMetadata,
///     pub subscriber_id: String,
/// }
///
/// impl_domain_event!(SubscriberRegistered, TOPIC_SUBSCRIBER_REGISTERED);
/// ```
#[macro_export]
macro_rules! impl_domain_event {
    ($event_type:ty, $topic:expr) => {
        impl $crate::usecase::DomainEvent for $event_type {
            fn event_id(&self) -> &str {
                &self.metadata.event_id
            }

            fn event_type(&self) -> &str {
                &self.metadata.event_type
            }

            fn source(&self) -> &str {
                &self.metadata.source
            }

            fn subject(&self) -> &str {
                &self.metadata.subject
            }

            fn time(&self) -> chrono::DateTime<chrono::Utc> {
                self.metadata.time
            }

            fn execution_id(&self) -> &str {
                &self.metadata.execution_id
            }

            fn correlation_id(&self) -> &str {
                &self.metadata.correlation_id
            }

            fn causation_id(&self) -> Option<&str> {
                self.metadata.causation_id.as_deref()
            }

            fn principal_id(&self) -> &str {
                &self.metadata.principal_id
            }

            fn message_group(&self) -> &str {
                &self.metadata.message_group
            }

            fn topic(&self) -> &'static str {
                $topic
            }

            fn to_data_json(&self) -> String {
                serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct TestEvent {
        metadata: EventMetadata,
        pub test_field: String,
    }

    impl_domain_event!(TestEvent, "test-topic");

    fn test_event() -> TestEvent {
        let ctx = ExecutionContext::create("tester");
        TestEvent {
            metadata: EventMetadata::new(
                "bibliotheque:subscriber:tested",
                "bibliotheque:subscribers",
                "bibliotheque.subscriber.123".to_string(),
                "subscriber:123".to_string(),
                &ctx,
            ),
            test_field: "test value".to_string(),
        }
    }

    #[test]
    fn test_metadata_delegation() {
        let event = test_event();

        assert_eq!(event.event_type(), "bibliotheque:subscriber:tested");
        assert_eq!(event.subject(), "bibliotheque.subscriber.123");
        assert_eq!(event.message_group(), "subscriber:123");
        assert_eq!(event.topic(), "test-topic");
        assert_eq!(event.principal_id(), "tester");
        assert!(event.causation_id().is_none());
    }

    #[test]
    fn test_to_data_json() {
        let event = test_event();
        let json = event.to_data_json();
        assert!(json.contains("test_field"));
        assert!(json.contains("test value"));
    }
}
