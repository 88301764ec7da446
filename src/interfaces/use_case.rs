//! Use case handler contract.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::message::UseCase;

/// Executes one use case type.
///
/// Same single-instance lifetime as a command handler, but dispatched
/// without a behavior chain.
#[async_trait]
pub trait UseCaseHandler<U: UseCase>: Send + Sync {
    /// Produce the use case's output.
    async fn execute(&self, use_case: U, cancel: CancellationToken) -> U::Output;
}
