//! Mark Penalty Use Case
//!
//! Sets or clears the penalty flag. Setting it resets the streak to zero;
//! clearing it does not restore the prior streak. Loyalty is recomputed after
//! the mutation and `LoyaltyStatusChanged` is emitted only when the derived
//! value actually flips, so repeating the same call commits quietly.

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
pub struct MarkPenaltyCommand {
    pub subscriber_id: String,
    pub has_penalty: bool,

    /// Carried for audit and logging only; not part of the loyalty rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub struct MarkPenaltyUseCase<U: UnitOfWork> {
    store: Arc<dyn SubscriberStore>,
    unit_of_work: Arc<U>,
}

impl<U: UnitOfWork> MarkPenaltyUseCase<U> {
    pub fn new(store: Arc<dyn SubscriberStore>, unit_of_work: Arc<U>) -> Self {
        Self { store, unit_of_work }
    }

    pub async fn execute(
        &self,
        command: MarkPenaltyCommand,
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
                "Deactivated subscribers cannot be penalized",
            ));
        }

        info!(
            subscriber_id = %subscriber.id,
            has_penalty = command.has_penalty,
            reason = command.reason.as_deref().unwrap_or("-"),
            "Marking penalty"
        );

        subscriber.record_penalty(command.has_penalty);

        self.commit_with_loyalty(subscriber, &command, ctx).await
    }

    async fn commit_with_loyalty(
        &self,
        mut subscriber: Subscriber,
        command: &MarkPenaltyCommand,
        ctx: ExecutionContext,
    ) -> UseCaseResult<Subscriber> {
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
                    .commit(&subscriber, event, command)
                    .await
                    .map(|_| subscriber)
            }
            None => self
                .unit_of_work
                .commit_quiet(&subscriber, command, &ctx)
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
        let cmd = MarkPenaltyCommand {
            subscriber_id: "sub-1".to_string(),
            has_penalty: true,
            reason: Some("late return".to_string()),
        };

        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"hasPenalty\":true"));
        assert!(json.contains("late return"));
    }
}
