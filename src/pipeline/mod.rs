//! Compiled command pipelines.
//!
//! A pipeline is the reusable invocation chain for one command type: the
//! ordered behaviors wrapping the single handler. Every instance is
//! resolved when the pipeline is compiled, so invoking it afterwards
//! touches no registry; only per-call chain state is allocated.

mod cache;

pub(crate) use cache::PipelineCache;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::interfaces::{Behavior, CommandHandler, Next};
use crate::message::Command;

/// Immutable invocation chain for one command type.
///
/// Compiled once per command type, cached by the dispatcher for the
/// facade's lifetime, never mutated.
pub struct Pipeline<C: Command> {
    handler: Arc<dyn CommandHandler<C>>,
    behaviors: Arc<[Arc<dyn Behavior<C>>]>,
}

impl<C: Command> Pipeline<C> {
    /// Compile a chain from the resolved handler and ordered behaviors.
    ///
    /// The first behavior is outermost (it wraps everything else); the last
    /// sits directly around the handler. An empty list yields a chain that
    /// calls the handler directly.
    pub fn new(
        handler: Arc<dyn CommandHandler<C>>,
        behaviors: Vec<Arc<dyn Behavior<C>>>,
    ) -> Self {
        Self {
            handler,
            behaviors: behaviors.into(),
        }
    }

    /// Run the chain: behaviors outermost-first, handler last.
    ///
    /// A behavior that drops its `Next` short-circuits the rest of the
    /// chain; its return value becomes the response.
    pub async fn invoke(&self, command: C, cancel: CancellationToken) -> C::Response {
        Next::new(Arc::clone(&self.handler), Arc::clone(&self.behaviors))
            .run(command, cancel)
            .await
    }

    /// Number of behaviors wrapped around the handler.
    pub fn behavior_count(&self) -> usize {
        self.behaviors.len()
    }
}
