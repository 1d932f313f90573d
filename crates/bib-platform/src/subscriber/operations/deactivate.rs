//! Deactivate Subscriber Use Case
//!
//! Soft delete: the record stays in storage with `active = false`. The
//! operation is idempotent - deactivating an already-inactive subscriber is
//! a no-op success.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::subscriber::repository::SubscriberStore;
use crate::usecase::{ExecutionContext, UnitOfWork, UseCaseError, UseCaseResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeactivateSubscriberCommand {
    pub subscriber_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub struct DeactivateSubscriberUseCase<U: UnitOfWork> {
    store: Arc<dyn SubscriberStore>,
    unit_of_work: Arc<U>,
}

impl<U: UnitOfWork> DeactivateSubscriberUseCase<U> {
    pub fn new(store: Arc<dyn SubscriberStore>, unit_of_work: Arc<U>) -> Self {
        Self { store, unit_of_work }
    }

    pub async fn execute(
        &self,
        command: DeactivateSubscriberCommand,
        ctx: ExecutionContext,
    ) -> UseCaseResult<()> {
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

        // Idempotent: nothing changed, nothing to commit or audit.
        if !subscriber.is_active() {
            return UseCaseResult::success(());
        }

        subscriber.deactivate();

        info!(
            subscriber_id = %subscriber.id,
            reason = command.reason.as_deref().unwrap_or("-"),
            "Deactivating subscriber"
        );

        self.unit_of_work
            .commit_quiet(&subscriber, &command, &ctx)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_serialization() {
        let cmd = DeactivateSubscriberCommand {
            subscriber_id: "sub-1".to_string(),
            reason: Some("Moved away".to_string()),
        };

        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("subscriberId"));
        assert!(json.contains("Moved away"));
    }

    #[test]
    fn test_reason_is_optional_on_the_wire() {
        let cmd: DeactivateSubscriberCommand =
            serde_json::from_str(r#"{"subscriberId":"sub-1"}"#).unwrap();
        assert!(cmd.reason.is_none());
    }
}
