//! Event bus contract for the subscriber platform.
//!
//! Services communicate through topics carrying [`EventEnvelope`]s. The
//! transport guarantees FIFO delivery per envelope group (the aggregate id)
//! and at-least-once semantics; handler failures are logged by the bus and
//! never retried here, retry policy belongs to the transport behind a
//! non-embedded implementation.

use std::sync::Arc;

use async_trait::async_trait;
use bib_common::EventEnvelope;

pub mod error;
pub mod memory;

pub use error::BusError;
pub use memory::InMemoryEventBus;

pub type Result<T> = std::result::Result<T, BusError>;

/// Publishing side of the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an envelope to a topic.
    ///
    /// Ordering is guaranteed relative to other envelopes with the same
    /// `group` on the same topic.
    async fn publish(&self, topic: &str, envelope: EventEnvelope) -> Result<()>;
}

/// A subscriber callback invoked once per delivered envelope.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, envelope: EventEnvelope) -> Result<()>;
}

/// Combined publish/subscribe contract for embedded deployments.
pub trait EventBus: EventPublisher {
    /// Register a handler for a topic. All registered handlers receive every
    /// envelope published to the topic.
    fn subscribe(&self, topic: &str, handler: Arc<dyn EventHandler>);
}
