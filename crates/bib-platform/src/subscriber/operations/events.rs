//! Subscriber Domain Events
//!
//! Outbound events published by this service and the payloads of the inbound
//! events it consumes. All envelopes are keyed by subscriber id (the message
//! group), which is what gives the transport its per-subscriber ordering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_domain_event;
use crate::subscriber::entity::Subscriber;
use crate::usecase::{EventMetadata, ExecutionContext};

// Outbound topics
pub const TOPIC_SUBSCRIBER_REGISTERED: &str = "subscriber-registered";
pub const TOPIC_LOYALTY_STATUS_CHANGED: &str = "loyalty-status-changed";

// Inbound topics
pub const TOPIC_PENALTY_REPORTED: &str = "penalty-reported";
pub const TOPIC_INCREMENT_REQUESTED: &str = "increment-requested";

// Inbound event type codes, as produced by the collaborating services
pub const EVENT_TYPE_PENALTY_REPORTED: &str = "bibliotheque:loan:penalty:reported";
pub const EVENT_TYPE_INCREMENT_REQUESTED: &str =
    "bibliotheque:subscription:increment:requested";

const SOURCE: &str = "bibliotheque:subscribers";

fn subject_for(subscriber_id: &str) -> String {
    format!("bibliotheque.subscriber.{}", subscriber_id)
}

fn group_for(subscriber_id: &str) -> String {
    format!("subscriber:{}", subscriber_id)
}

/// Emitted once per successful registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberRegistered {
    #[serde(flatten)]
    pub metadata: EventMetadata,

    pub subscriber_id: String,
    pub email: String,
    pub full_name: String,
}

impl_domain_event!(SubscriberRegistered, TOPIC_SUBSCRIBER_REGISTERED);

impl SubscriberRegistered {
    const EVENT_TYPE: &'static str = "bibliotheque:subscriber:registered";

    pub fn new(ctx: &ExecutionContext, subscriber: &Subscriber) -> Self {
        Self {
            metadata: EventMetadata::new(
                Self::EVENT_TYPE,
                SOURCE,
                subject_for(&subscriber.id),
                group_for(&subscriber.id),
                ctx,
            ),
            subscriber_id: subscriber.id.clone(),
            email: subscriber.email.clone(),
            full_name: subscriber.full_name(),
        }
    }
}

/// Emitted only on an actual flip of the derived loyalty value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyStatusChanged {
    #[serde(flatten)]
    pub metadata: EventMetadata,

    pub subscriber_id: String,
    pub is_loyal: bool,
    pub consecutive_subscriptions: u32,
}

impl_domain_event!(LoyaltyStatusChanged, TOPIC_LOYALTY_STATUS_CHANGED);

impl LoyaltyStatusChanged {
    const EVENT_TYPE: &'static str = "bibliotheque:subscriber:loyalty-changed";

    pub fn new(ctx: &ExecutionContext, subscriber: &Subscriber) -> Self {
        Self {
            metadata: EventMetadata::new(
                Self::EVENT_TYPE,
                SOURCE,
                subject_for(&subscriber.id),
                group_for(&subscriber.id),
                ctx,
            ),
            subscriber_id: subscriber.id.clone(),
            is_loyal: subscriber.is_loyal,
            consecutive_subscriptions: subscriber.consecutive_subscriptions,
        }
    }
}

/// Inbound: penalty report from the loan-management service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyReported {
    pub subscriber_id: String,
    pub has_penalty: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Inbound: a successful renewal asks for one streak increment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementRequested {
    pub subscriber_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriber::entity::Gender;
    use crate::usecase::DomainEvent;

    fn subscriber() -> Subscriber {
        Subscriber::new(
            "George",
            "Sand",
            "george@bibliotheque.org",
            "+33100000004",
            40,
            Gender::Other,
        )
    }

    #[test]
    fn test_registered_event() {
        let ctx = ExecutionContext::create("api");
        let s = subscriber();
        let event = SubscriberRegistered::new(&ctx, &s);

        assert_eq!(event.event_type(), "bibliotheque:subscriber:registered");
        assert_eq!(event.topic(), TOPIC_SUBSCRIBER_REGISTERED);
        assert_eq!(event.message_group(), format!("subscriber:{}", s.id));
        assert_eq!(event.full_name, "George Sand");
    }

    #[test]
    fn test_loyalty_changed_carries_both_inputs() {
        let ctx = ExecutionContext::create("api");
        let mut s = subscriber();
        s.consecutive_subscriptions = 3;
        s.is_loyal = true;

        let event = LoyaltyStatusChanged::new(&ctx, &s);
        assert!(event.is_loyal);
        assert_eq!(event.consecutive_subscriptions, 3);
        assert_eq!(event.topic(), TOPIC_LOYALTY_STATUS_CHANGED);
    }

    #[test]
    fn test_inbound_payload_wire_format() {
        let json = r#"{"subscriberId":"abc","hasPenalty":true,"reason":"late return"}"#;
        let event: PenaltyReported = serde_json::from_str(json).unwrap();

        assert_eq!(event.subscriber_id, "abc");
        assert!(event.has_penalty);
        assert_eq!(event.reason.as_deref(), Some("late return"));
        assert!(event.timestamp.is_none());
    }
}
