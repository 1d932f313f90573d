//! Subscriber Service
//!
//! Facade over the store and the operation use cases, exposed to the
//! transport-facing collaborators. Mutations on the same subscriber are
//! serialized through a per-id lock held across the whole
//! read-recompute-commit cycle, so concurrent penalty/increment calls can
//! neither lose an update nor compute loyalty from a stale field pair.
//! Operations on different ids proceed in parallel.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::entity::Subscriber;
use super::operations::{
    DeactivateSubscriberCommand, DeactivateSubscriberUseCase, IncrementSubscriptionsCommand,
    IncrementSubscriptionsUseCase, MarkPenaltyCommand, MarkPenaltyUseCase,
    RegisterSubscriberCommand, RegisterSubscriberUseCase, UpdateSubscriberCommand,
    UpdateSubscriberUseCase,
};
use super::repository::SubscriberStore;
use crate::shared::error::{PlatformError, Result};
use crate::usecase::{ExecutionContext, UnitOfWork, UseCaseError};

pub struct SubscriberService<U: UnitOfWork> {
    store: Arc<dyn SubscriberStore>,
    register: RegisterSubscriberUseCase<U>,
    update: UpdateSubscriberUseCase<U>,
    deactivate: DeactivateSubscriberUseCase<U>,
    mark_penalty: MarkPenaltyUseCase<U>,
    increment: IncrementSubscriptionsUseCase<U>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<U: UnitOfWork> SubscriberService<U> {
    pub fn new(store: Arc<dyn SubscriberStore>, unit_of_work: Arc<U>) -> Self {
        Self {
            register: RegisterSubscriberUseCase::new(store.clone(), unit_of_work.clone()),
            update: UpdateSubscriberUseCase::new(store.clone(), unit_of_work.clone()),
            deactivate: DeactivateSubscriberUseCase::new(store.clone(), unit_of_work.clone()),
            mark_penalty: MarkPenaltyUseCase::new(store.clone(), unit_of_work.clone()),
            increment: IncrementSubscriptionsUseCase::new(store.clone(), unit_of_work),
            store,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // ------------------------------------------------------------------
    // Registry operations
    // ------------------------------------------------------------------

    pub async fn register(
        &self,
        command: RegisterSubscriberCommand,
        ctx: ExecutionContext,
    ) -> std::result::Result<Subscriber, UseCaseError> {
        self.register.execute(command, ctx).await.into_result()
    }

    pub async fn get(&self, id: &str) -> Result<Subscriber> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| PlatformError::not_found("Subscriber", id))
    }

    pub async fn list_all(&self) -> Result<Vec<Subscriber>> {
        self.store.find_all().await
    }

    pub async fn list_active(&self) -> Result<Vec<Subscriber>> {
        self.store.find_active().await
    }

    pub async fn list_loyal(&self) -> Result<Vec<Subscriber>> {
        self.store.find_loyal().await
    }

    pub async fn list_penalized(&self) -> Result<Vec<Subscriber>> {
        self.store.find_penalized().await
    }

    pub async fn search(&self, keyword: &str) -> Result<Vec<Subscriber>> {
        self.store.search(keyword).await
    }

    pub async fn count_loyal(&self) -> Result<u64> {
        self.store.count_loyal().await
    }

    pub async fn update(
        &self,
        command: UpdateSubscriberCommand,
        ctx: ExecutionContext,
    ) -> std::result::Result<Subscriber, UseCaseError> {
        let lock = self.lock_for(&command.subscriber_id);
        let _guard = lock.lock().await;
        self.update.execute(command, ctx).await.into_result()
    }

    pub async fn deactivate(
        &self,
        command: DeactivateSubscriberCommand,
        ctx: ExecutionContext,
    ) -> std::result::Result<(), UseCaseError> {
        let lock = self.lock_for(&command.subscriber_id);
        let _guard = lock.lock().await;
        self.deactivate.execute(command, ctx).await.into_result()
    }

    // ------------------------------------------------------------------
    // Penalty operations
    // ------------------------------------------------------------------

    pub async fn mark_penalty(
        &self,
        command: MarkPenaltyCommand,
        ctx: ExecutionContext,
    ) -> std::result::Result<(), UseCaseError> {
        let lock = self.lock_for(&command.subscriber_id);
        let _guard = lock.lock().await;
        self.mark_penalty
            .execute(command, ctx)
            .await
            .into_result()
            .map(|_| ())
    }

    pub async fn increment_consecutive_subscriptions(
        &self,
        command: IncrementSubscriptionsCommand,
        ctx: ExecutionContext,
    ) -> std::result::Result<(), UseCaseError> {
        let lock = self.lock_for(&command.subscriber_id);
        let _guard = lock.lock().await;
        self.increment
            .execute(command, ctx)
            .await
            .into_result()
            .map(|_| ())
    }
}
