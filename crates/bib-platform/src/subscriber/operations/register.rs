//! Register Subscriber Use Case

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::events::SubscriberRegistered;
use crate::subscriber::entity::{Gender, Subscriber};
use crate::subscriber::repository::SubscriberStore;
use crate::usecase::{ExecutionContext, UnitOfWork, UseCaseError, UseCaseResult};

/// Command for registering a new subscriber. Field-level validation (format,
/// length, age range) runs upstream; only identity rules are enforced here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSubscriberCommand {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub age: u8,
    pub gender: Gender,
}

pub struct RegisterSubscriberUseCase<U: UnitOfWork> {
    store: Arc<dyn SubscriberStore>,
    unit_of_work: Arc<U>,
}

impl<U: UnitOfWork> RegisterSubscriberUseCase<U> {
    pub fn new(store: Arc<dyn SubscriberStore>, unit_of_work: Arc<U>) -> Self {
        Self { store, unit_of_work }
    }

    pub async fn execute(
        &self,
        command: RegisterSubscriberCommand,
        ctx: ExecutionContext,
    ) -> UseCaseResult<Subscriber> {
        let name = command.name.trim();
        let surname = command.surname.trim();
        if name.is_empty() || surname.is_empty() {
            return UseCaseResult::failure(UseCaseError::validation(
                "NAME_REQUIRED",
                "Subscriber name and surname are required",
            ));
        }

        // Identity rule: email unique (exact match)
        match self.store.find_by_email(&command.email).await {
            Ok(Some(_)) => {
                return UseCaseResult::failure(UseCaseError::business_rule(
                    "EMAIL_EXISTS",
                    format!("A subscriber with email '{}' already exists", command.email),
                ));
            }
            Ok(None) => {}
            Err(e) => {
                return UseCaseResult::failure(UseCaseError::commit(format!(
                    "Failed to check email uniqueness: {}",
                    e
                )));
            }
        }

        // Identity rule: phone unique (exact match)
        match self.store.find_by_phone(&command.phone).await {
            Ok(Some(_)) => {
                return UseCaseResult::failure(UseCaseError::business_rule(
                    "PHONE_EXISTS",
                    format!("A subscriber with phone '{}' already exists", command.phone),
                ));
            }
            Ok(None) => {}
            Err(e) => {
                return UseCaseResult::failure(UseCaseError::commit(format!(
                    "Failed to check phone uniqueness: {}",
                    e
                )));
            }
        }

        let subscriber = Subscriber::new(
            name,
            surname,
            &command.email,
            &command.phone,
            command.age,
            command.gender,
        );

        info!(subscriber_id = %subscriber.id, email = %subscriber.email, "Registering subscriber");

        let event = SubscriberRegistered::new(&ctx, &subscriber);

        self.unit_of_work
            .commit(&subscriber, event, &command)
            .await
            .map(|_| subscriber)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_serialization() {
        let cmd = RegisterSubscriberCommand {
            name: "Emile".to_string(),
            surname: "Zola".to_string(),
            email: "emile@bibliotheque.org".to_string(),
            phone: "+33100000005".to_string(),
            age: 42,
            gender: Gender::Male,
        };

        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"surname\":\"Zola\""));
        assert!(json.contains("\"gender\":\"MALE\""));
    }
}
