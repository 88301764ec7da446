//! Event subscriber contract.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::message::Event;

/// Result type for subscriber invocations.
pub type Result<T> = std::result::Result<T, SubscriberError>;

/// Errors from event subscribers.
///
/// These never reach the publisher: the fan-out supervisor logs and counts
/// them per subscriber.
#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error("subscriber failed: {0}")]
    Failed(String),

    #[error("subscriber observed cancellation")]
    Cancelled,
}

/// Consumes events of one type.
///
/// Subscribers are long-lived: the route table holds the `Arc` for the
/// facade's lifetime and every publish reuses it, so implementations must
/// use interior mutability (`RwLock`, `Mutex`, atomics) for any state.
///
/// Subscribers of the same event run as independent tasks; no ordering is
/// guaranteed between them, and a fault in one never prevents the others
/// from running.
#[async_trait]
pub trait EventSubscriber<E: Event>: Send + Sync {
    /// Process one published event.
    async fn handle(&self, event: Arc<E>, cancel: CancellationToken) -> Result<()>;
}
