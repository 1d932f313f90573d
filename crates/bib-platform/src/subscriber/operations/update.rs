//! Update Subscriber Use Case
//!
//! Overwrites the identity and profile fields. Never touches the counter,
//! penalty or loyalty fields - those move only through the penalty
//! operations.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::subscriber::entity::{Gender, Subscriber};
use crate::subscriber::repository::SubscriberStore;
use crate::usecase::{ExecutionContext, UnitOfWork, UseCaseError, UseCaseResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriberCommand {
    pub subscriber_id: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub age: u8,
    pub gender: Gender,
}

pub struct UpdateSubscriberUseCase<U: UnitOfWork> {
    store: Arc<dyn SubscriberStore>,
    unit_of_work: Arc<U>,
}

impl<U: UnitOfWork> UpdateSubscriberUseCase<U> {
    pub fn new(store: Arc<dyn SubscriberStore>, unit_of_work: Arc<U>) -> Self {
        Self { store, unit_of_work }
    }

    pub async fn execute(
        &self,
        command: UpdateSubscriberCommand,
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
                "Deactivated subscribers cannot be updated",
            ));
        }

        // Identity rules only apply when the value actually changes.
        if command.email != subscriber.email {
            match self.store.find_by_email(&command.email).await {
                Ok(Some(other)) if other.id != subscriber.id => {
                    return UseCaseResult::failure(UseCaseError::business_rule(
                        "EMAIL_EXISTS",
                        format!("A subscriber with email '{}' already exists", command.email),
                    ));
                }
                Ok(_) => {}
                Err(e) => {
                    return UseCaseResult::failure(UseCaseError::commit(format!(
                        "Failed to check email uniqueness: {}",
                        e
                    )));
                }
            }
        }

        if command.phone != subscriber.phone {
            match self.store.find_by_phone(&command.phone).await {
                Ok(Some(other)) if other.id != subscriber.id => {
                    return UseCaseResult::failure(UseCaseError::business_rule(
                        "PHONE_EXISTS",
                        format!("A subscriber with phone '{}' already exists", command.phone),
                    ));
                }
                Ok(_) => {}
                Err(e) => {
                    return UseCaseResult::failure(UseCaseError::commit(format!(
                        "Failed to check phone uniqueness: {}",
                        e
                    )));
                }
            }
        }

        subscriber.name = command.name.trim().to_string();
        subscriber.surname = command.surname.trim().to_string();
        subscriber.email = command.email.clone();
        subscriber.phone = command.phone.clone();
        subscriber.age = command.age;
        subscriber.gender = command.gender;
        subscriber.updated_at = chrono::Utc::now();

        info!(subscriber_id = %subscriber.id, "Updating subscriber");

        self.unit_of_work
            .commit_quiet(&subscriber, &command, &ctx)
            .await
            .map(|_| subscriber)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_serialization() {
        let cmd = UpdateSubscriberCommand {
            subscriber_id: "sub-1".to_string(),
            name: "Simone".to_string(),
            surname: "Beauvoir".to_string(),
            email: "simone@bibliotheque.org".to_string(),
            phone: "+33100000006".to_string(),
            age: 35,
            gender: Gender::Female,
        };

        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("subscriberId"));
        assert!(json.contains("Beauvoir"));
    }
}
