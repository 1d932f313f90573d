//! Bibliotheque Subscriber Platform
//!
//! Core domain for library subscriber management:
//! - Subscriber registry (registration, lookup, update, search, soft delete)
//! - Loyalty state machine deriving the loyal status from the streak counter
//!   and the penalty flag
//! - Penalty operations driven by the API layer or by inbound events
//! - Domain events published per subscriber id for ordered consumption
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - Domain entities
//! - `repository` - Data access
//! - `operations` - Use case operations (where applicable)
//!
//! The HTTP surface and the message broker are external collaborators; they
//! consume [`SubscriberService`] and the `bib-bus` contracts.

// Core aggregates
pub mod audit;
pub mod subscriber;

// Shared infrastructure
pub mod shared;

// Cross-cutting concerns
pub mod usecase;

// Re-export common types from shared
pub use shared::error::{PlatformError, Result};

// Re-export use case infrastructure
pub use usecase::{
    DomainEvent, ExecutionContext, InMemoryUnitOfWork, MongoUnitOfWork, UnitOfWork,
    UseCaseError, UseCaseResult,
};
// Note: impl_domain_event! macro is exported at crate root via #[macro_export]

// Re-export main entity types for convenience
pub use audit::AuditLog;
pub use subscriber::{Gender, LoyaltyStatus, Subscriber, LOYALTY_THRESHOLD};

// Re-export repositories and services
pub use subscriber::{
    InMemorySubscriberStore, MongoSubscriberStore, SubscriberEventListener, SubscriberService,
    SubscriberStore,
};
