use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod logging;

// ============================================================================
// Event Envelope
// ============================================================================

/// The unit that crosses the event bus.
///
/// Field names are camelCase on the wire for compatibility with the other
/// services on the bus. The `group` field carries the ordering key: envelopes
/// sharing a group are delivered to a subscriber strictly in publish order,
/// envelopes in different groups may be delivered concurrently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// Unique event identifier.
    pub id: String,

    /// Event type code, e.g. `bibliotheque:subscriber:registered`.
    pub event_type: String,

    /// Source system that produced the event.
    pub source: String,

    /// Qualified aggregate identifier, e.g. `bibliotheque.subscriber.<id>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// When the event occurred.
    pub time: DateTime<Utc>,

    /// Ordering key (the aggregate id for subscriber events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Distributed tracing correlation id.
    pub correlation_id: String,

    /// Id of the event that caused this one, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<String>,

    /// Event-specific JSON payload.
    pub data: serde_json::Value,
}

impl EventEnvelope {
    pub fn new(
        event_type: impl Into<String>,
        source: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        Self {
            id: id.clone(),
            event_type: event_type.into(),
            source: source.into(),
            subject: None,
            time: Utc::now(),
            group: None,
            correlation_id: id,
            causation_id: None,
            data,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_correlation(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    pub fn with_causation(mut self, causation_id: impl Into<String>) -> Self {
        self.causation_id = Some(causation_id.into());
        self
    }

    /// Deserialize the payload into a typed event.
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }

    /// The ordering key, or the envelope id when none was set.
    pub fn group_key(&self) -> &str {
        self.group.as_deref().unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_defaults() {
        let env = EventEnvelope::new(
            "bibliotheque:subscriber:registered",
            "bibliotheque:subscribers",
            serde_json::json!({ "subscriberId": "abc" }),
        );

        assert_eq!(env.event_type, "bibliotheque:subscriber:registered");
        // correlation starts as the event id for fresh envelopes
        assert_eq!(env.correlation_id, env.id);
        assert!(env.group.is_none());
        assert_eq!(env.group_key(), env.id);
    }

    #[test]
    fn test_envelope_builders() {
        let env = EventEnvelope::new("t", "s", serde_json::json!({}))
            .with_subject("bibliotheque.subscriber.abc")
            .with_group("subscriber:abc")
            .with_correlation("corr-1")
            .with_causation("evt-0");

        assert_eq!(env.subject.as_deref(), Some("bibliotheque.subscriber.abc"));
        assert_eq!(env.group_key(), "subscriber:abc");
        assert_eq!(env.correlation_id, "corr-1");
        assert_eq!(env.causation_id.as_deref(), Some("evt-0"));
    }

    #[test]
    fn test_payload_round_trip() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        #[serde(rename_all = "camelCase")]
        struct Ping {
            subscriber_id: String,
        }

        let env = EventEnvelope::new(
            "t",
            "s",
            serde_json::to_value(Ping { subscriber_id: "abc".into() }).unwrap(),
        );

        let ping: Ping = env.payload().unwrap();
        assert_eq!(ping.subscriber_id, "abc");
    }

    #[test]
    fn test_wire_naming_is_camel_case() {
        let env = EventEnvelope::new("t", "s", serde_json::json!({}));
        let json = serde_json::to_string(&env).unwrap();
        assert!(json.contains("eventType"));
        assert!(json.contains("correlationId"));
    }
}
