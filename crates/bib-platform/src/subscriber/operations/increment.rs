//! Increment Consecutive Subscriptions Use Case
//!
//! Counts one successful renewal. The counter moves by exactly 1 per call;
//! loyalty is recomputed afterwards and `LoyaltyStatusChanged` is emitted
//! only when the derived value flips (the crossing from 2 to 3 without a
//! penalty).

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::events::LoyaltyStatusChanged;
use crate::subscriber::entity::Subscriber;
use crate::subscriber::loyalty;
use crate::subscriber::repository::SubscriberStore;
use crate::usecase::{ExecutionContext, UnitOfWork, UseCaseError, UseCaseResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementSubscriptionsCommand {
    pub subscriber_id: String,
}

pub struct IncrementSubscriptionsUseCase<U: UnitOfWork> {
    store: Arc<dyn SubscriberStore>,
    unit_of_work: Arc<U>,
}

impl<U: UnitOfWork> IncrementSubscriptionsUseCase<U> {
    pub fn new(store: Arc<dyn SubscriberStore>, unit_of_work: Arc<U>) -> Self {
        Self { store, unit_of_work }
    }

    pub async fn execute(
        &self,
        command: IncrementSubscriptionsCommand,
        ctx: ExecutionContext,
    ) -> UseCaseResult<Subscriber> {
        if command.subscriber_id.trim().is_empty() {
            return UseCaseResult::failure(UseCaseError::validation(
                "SUBSCRIBER_ID_REQUIRED",
                "Subscriber ID is required",
            ));
        }

        let mut subscriber = match self.store.find_by_id(&command.subscriber_id).await {
            Ok(Some(s)) => s,
            Ok(None) => {
                return UseCaseResult::failure(UseCaseError::not_found(
                    "SUBSCRIBER_NOT_FOUND",
                    format!("Subscriber with ID '{}' not found", command.subscriber_id),
                ));
            }
            Err(e) => {
                return UseCaseResult::failure(UseCaseError::commit(format!(
                    "Failed to fetch subscriber: {}",
                    e
                )));
            }
        };

        if !subscriber.is_active() {
            return UseCaseResult::failure(UseCaseError::invalid_state(
                "SUBSCRIBER_INACTIVE",
                "Deactivated subscribers cannot accrue subscriptions",
            ));
        }

        subscriber.record_renewal();

        info!(
            subscriber_id = %subscriber.id,
            consecutive_subscriptions = subscriber.consecutive_subscriptions,
            "Recorded consecutive subscription"
        );

        match loyalty::evaluate(&subscriber) {
            Some(status) => {
                subscriber.set_loyalty(status.is_loyal());
                info!(
                    subscriber_id = %subscriber.id,
                    is_loyal = subscriber.is_loyal,
                    "Loyalty status changed"
                );
                let event = LoyaltyStatusChanged::new(&ctx, &subscriber);
                self.unit_of_work
                    .commit(&subscriber, event, &command)
                    .await
                    .map(|_| subscriber)
            }
            None => self
                .unit_of_work
                .commit_quiet(&subscriber, &command, &ctx)
                .await
                .map(|_| subscriber),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_serialization() {
        let cmd = IncrementSubscriptionsCommand { subscriber_id: "sub-1".to_string() };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, r#"{"subscriberId":"sub-1"}"#);
    }
}
