//! Subscriber Event Listener
//!
//! Consumes penalty reports from the loan-management service and increment
//! requests from the renewal flow. A failing event is logged and dropped:
//! the transport owns any retry policy, and one bad event must not block the
//! rest of the stream. Per-subscriber ordering comes from the bus's group
//! key, which inbound producers set to the subscriber id.

use async_trait::async_trait;
use bib_bus::{EventBus, EventHandler};
use bib_common::EventEnvelope;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::operations::events::{
    IncrementRequested, PenaltyReported, EVENT_TYPE_INCREMENT_REQUESTED,
    EVENT_TYPE_PENALTY_REPORTED, TOPIC_INCREMENT_REQUESTED, TOPIC_PENALTY_REPORTED,
};
use super::operations::{IncrementSubscriptionsCommand, MarkPenaltyCommand};
use super::service::SubscriberService;
use crate::usecase::{ExecutionContext, UnitOfWork, UseCaseError};

const CONSUMER_PRINCIPAL: &str = "event-consumer";

pub struct SubscriberEventListener<U: UnitOfWork> {
    service: Arc<SubscriberService<U>>,
}

impl<U: UnitOfWork + 'static> SubscriberEventListener<U> {
    pub fn new(service: Arc<SubscriberService<U>>) -> Arc<Self> {
        Arc::new(Self { service })
    }

    /// Register this listener on both inbound topics.
    pub fn attach(self: Arc<Self>, bus: &dyn EventBus) {
        bus.subscribe(TOPIC_PENALTY_REPORTED, self.clone());
        bus.subscribe(TOPIC_INCREMENT_REQUESTED, self);
    }

    async fn on_penalty_reported(&self, envelope: &EventEnvelope) {
        let event: PenaltyReported = match envelope.payload() {
            Ok(e) => e,
            Err(e) => {
                error!(event_id = %envelope.id, error = %e, "Malformed penalty report, dropping");
                return;
            }
        };

        info!(
            subscriber_id = %event.subscriber_id,
            has_penalty = event.has_penalty,
            "Received penalty report"
        );

        let ctx = ExecutionContext::from_envelope(envelope, CONSUMER_PRINCIPAL);
        let command = MarkPenaltyCommand {
            subscriber_id: event.subscriber_id.clone(),
            has_penalty: event.has_penalty,
            reason: event.reason,
        };

        if let Err(e) = self.service.mark_penalty(command, ctx).await {
            log_dropped(envelope, &event.subscriber_id, &e);
        }
    }

    async fn on_increment_requested(&self, envelope: &EventEnvelope) {
        // The renewal service publishes either the full payload or, from its
        // older versions, a bare JSON string carrying the subscriber id.
        let subscriber_id = match envelope.payload::<IncrementRequested>() {
            Ok(event) => event.subscriber_id,
            Err(_) => match envelope.payload::<String>() {
                Ok(id) => id,
                Err(e) => {
                    error!(
                        event_id = %envelope.id,
                        error = %e,
                        "Malformed increment request, dropping"
                    );
                    return;
                }
            },
        };

        info!(subscriber_id = %subscriber_id, "Received increment request");

        let ctx = ExecutionContext::from_envelope(envelope, CONSUMER_PRINCIPAL);
        let command = IncrementSubscriptionsCommand {
            subscriber_id: subscriber_id.clone(),
        };

        if let Err(e) = self
            .service
            .increment_consecutive_subscriptions(command, ctx)
            .await
        {
            log_dropped(envelope, &subscriber_id, &e);
        }
    }
}

fn log_dropped(envelope: &EventEnvelope, subscriber_id: &str, error: &UseCaseError) {
    // Unknown ids are expected when collaborators race registration; anything
    // else is worth a louder signal. Either way the event is dropped.
    match error {
        UseCaseError::NotFoundError { .. } => warn!(
            event_id = %envelope.id,
            subscriber_id,
            error = %error,
            "Inbound event for unknown subscriber, dropping"
        ),
        _ => error!(
            event_id = %envelope.id,
            subscriber_id,
            error = %error,
            "Failed to process inbound event, dropping"
        ),
    }
}

#[async_trait]
impl<U: UnitOfWork + 'static> EventHandler for SubscriberEventListener<U> {
    async fn handle(&self, envelope: EventEnvelope) -> bib_bus::Result<()> {
        match envelope.event_type.as_str() {
            EVENT_TYPE_PENALTY_REPORTED => self.on_penalty_reported(&envelope).await,
            EVENT_TYPE_INCREMENT_REQUESTED => self.on_increment_requested(&envelope).await,
            other => {
                debug!(event_type = other, event_id = %envelope.id, "Ignoring event type");
            }
        }
        // Failures are handled above; the bus never retries on our behalf.
        Ok(())
    }
}
