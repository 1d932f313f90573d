//! Subscriber Operations
//!
//! Use cases for subscriber lifecycle and loyalty management.

pub mod deactivate;
pub mod events;
pub mod increment;
pub mod mark_penalty;
pub mod register;
pub mod update;

pub use deactivate::{DeactivateSubscriberCommand, DeactivateSubscriberUseCase};
pub use events::*;
pub use increment::{IncrementSubscriptionsCommand, IncrementSubscriptionsUseCase};
pub use mark_penalty::{MarkPenaltyCommand, MarkPenaltyUseCase};
pub use register::{RegisterSubscriberCommand, RegisterSubscriberUseCase};
pub use update::{UpdateSubscriberCommand, UpdateSubscriberUseCase};
