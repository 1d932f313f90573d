//! Execution Context
//!
//! Carries tracing ids and the acting principal through the execution of an
//! operation. The context populates domain event metadata, so events caused
//! by an inbound event keep the originating correlation chain.

use bib_common::EventEnvelope;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Unique id for this execution.
    pub execution_id: String,
    /// Id for distributed tracing, usually from the original request.
    pub correlation_id: String,
    /// Id of the event that caused this execution, if any.
    pub causation_id: Option<String>,
    /// Principal performing the action.
    pub principal_id: String,
    /// When the execution was initiated.
    pub initiated_at: DateTime<Utc>,
}

impl ExecutionContext {
    /// Context for a fresh request. The correlation id starts as the
    /// execution id; use [`with_correlation`] when an upstream id exists.
    pub fn create(principal_id: impl Into<String>) -> Self {
        let exec_id = format!("exec-{}", uuid::Uuid::new_v4());
        Self {
            execution_id: exec_id.clone(),
            correlation_id: exec_id,
            causation_id: None,
            principal_id: principal_id.into(),
            initiated_at: Utc::now(),
        }
    }

    /// Context carrying an existing correlation id from an upstream system.
    pub fn with_correlation(
        principal_id: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            execution_id: format!("exec-{}", uuid::Uuid::new_v4()),
            correlation_id: correlation_id.into(),
            causation_id: None,
            principal_id: principal_id.into(),
            initiated_at: Utc::now(),
        }
    }

    /// Context for reacting to an inbound envelope: the envelope's id becomes
    /// the causation id and its correlation id is preserved.
    pub fn from_envelope(envelope: &EventEnvelope, principal_id: impl Into<String>) -> Self {
        Self {
            execution_id: format!("exec-{}", uuid::Uuid::new_v4()),
            correlation_id: envelope.correlation_id.clone(),
            causation_id: Some(envelope.id.clone()),
            principal_id: principal_id.into(),
            initiated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_context() {
        let ctx = ExecutionContext::create("api");

        assert!(ctx.execution_id.starts_with("exec-"));
        assert_eq!(ctx.correlation_id, ctx.execution_id);
        assert!(ctx.causation_id.is_none());
        assert_eq!(ctx.principal_id, "api");
    }

    #[test]
    fn test_with_correlation() {
        let ctx = ExecutionContext::with_correlation("api", "corr-456");
        assert_eq!(ctx.correlation_id, "corr-456");
        assert_ne!(ctx.execution_id, ctx.correlation_id);
    }

    #[test]
    fn test_from_envelope_chains_causation() {
        let envelope = EventEnvelope::new("t", "s", serde_json::json!({}))
            .with_correlation("corr-1");
        let ctx = ExecutionContext::from_envelope(&envelope, "system");

        assert_eq!(ctx.correlation_id, "corr-1");
        assert_eq!(ctx.causation_id.as_deref(), Some(envelope.id.as_str()));
    }
}
