//! Command handler and behavior contracts.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::message::Command;

/// Handles one command type.
///
/// One long-lived instance per command type: the compiled pipeline holds the
/// `Arc` and reuses it for every dispatch, so implementations must be
/// stateless or internally synchronized.
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    /// Produce the command's response.
    ///
    /// The cancellation token is the one passed into `send`; honoring it is
    /// the handler's responsibility.
    async fn handle(&self, command: C, cancel: CancellationToken) -> C::Response;
}

/// Middleware wrapped around a command's handler.
///
/// Behaviors run outermost-first in registration order. Each receives the
/// rest of the chain as [`Next`]; running it continues toward the handler,
/// dropping it short-circuits: the handler and any inner behaviors are
/// never invoked.
///
/// # Example
///
/// ```ignore
/// struct Timing;
///
/// #[async_trait]
/// impl Behavior<CreateOrder> for Timing {
///     async fn handle(
///         &self,
///         command: CreateOrder,
///         next: Next<CreateOrder>,
///         cancel: CancellationToken,
///     ) -> OrderOutcome {
///         let started = Instant::now();
///         let response = next.run(command, cancel).await;
///         debug!(elapsed = ?started.elapsed(), "create order handled");
///         response
///     }
/// }
/// ```
#[async_trait]
pub trait Behavior<C: Command>: Send + Sync {
    /// Wrap the remainder of the chain.
    async fn handle(&self, command: C, next: Next<C>, cancel: CancellationToken) -> C::Response;
}

/// The remainder of a command's chain: the behaviors inward of the current
/// one, terminating in the handler.
///
/// One-shot by construction: a behavior can run it at most once, and not
/// running it is the short-circuit path.
pub struct Next<C: Command> {
    handler: Arc<dyn CommandHandler<C>>,
    behaviors: Arc<[Arc<dyn Behavior<C>>]>,
    index: usize,
}

impl<C: Command> Next<C> {
    pub(crate) fn new(
        handler: Arc<dyn CommandHandler<C>>,
        behaviors: Arc<[Arc<dyn Behavior<C>>]>,
    ) -> Self {
        Self {
            handler,
            behaviors,
            index: 0,
        }
    }

    /// Run the rest of the chain to completion.
    pub async fn run(self, command: C, cancel: CancellationToken) -> C::Response {
        let Next {
            handler,
            behaviors,
            index,
        } = self;
        match behaviors.get(index).cloned() {
            Some(behavior) => {
                let rest = Next {
                    handler,
                    behaviors,
                    index: index + 1,
                };
                behavior.handle(command, rest, cancel).await
            }
            None => handler.handle(command, cancel).await,
        }
    }
}
