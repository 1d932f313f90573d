//! Use Case Infrastructure
//!
//! Foundational patterns for implementing operations:
//! - `UseCaseResult<T>` - sealed result type for operation outcomes
//! - `UseCaseError` - categorized error types for consistent handling
//! - `DomainEvent` - trait for domain events carrying ordering metadata
//! - `ExecutionContext` - tracing context for an operation execution
//! - `UnitOfWork` - atomic commit of entity + event + audit record

pub mod domain_event;
pub mod error;
pub mod execution_context;
pub mod result;
pub mod unit_of_work;

pub use domain_event::{DomainEvent, EventMetadata};
pub use error::UseCaseError;
pub use execution_context::ExecutionContext;
pub use result::UseCaseResult;
pub use unit_of_work::{InMemoryUnitOfWork, MongoUnitOfWork, UnitOfWork};
