//! Command dispatch.
//!
//! `send` resolves the command's compiled pipeline through the cache,
//! building it on first dispatch, and invokes it. Pipelines are keyed by
//! the command's `TypeId`; the response type is fixed by the `Command`
//! associated type, so the command type alone identifies the chain.

use std::any::{Any, TypeId};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::message::Command;
use crate::pipeline::{Pipeline, PipelineCache};
use crate::registry::HandlerRegistry;

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, SendError>;

/// Errors that can occur while dispatching a command.
///
/// Faults raised by the handler or a behavior are not represented here;
/// they pass through `send` unmodified, whether as error-valued responses
/// or as panics.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// No handler registered for the command type.
    #[error("no handler registered for command '{command}'")]
    HandlerNotFound { command: &'static str },

    /// A registration slot held an instance of an unexpected type.
    #[error("registration for command '{command}' does not match its dispatch type")]
    RegistrationMismatch { command: &'static str },
}

pub(crate) struct CommandDispatcher {
    registry: Arc<HandlerRegistry>,
    pipelines: PipelineCache,
}

impl CommandDispatcher {
    pub(crate) fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            pipelines: PipelineCache::new(),
        }
    }

    /// Dispatch `command` through its behavior chain to its handler.
    pub(crate) async fn send<C: Command>(
        &self,
        command: C,
        cancel: CancellationToken,
    ) -> Result<C::Response> {
        let pipeline = self.pipeline_for::<C>()?;
        Ok(pipeline.invoke(command, cancel).await)
    }

    /// Fetch the compiled pipeline for `C`, building it on first dispatch.
    ///
    /// Concurrent first dispatches may each compile a chain; the cache
    /// retains exactly one and every caller invokes that one.
    fn pipeline_for<C: Command>(&self) -> Result<Arc<Pipeline<C>>> {
        let key = TypeId::of::<C>();
        let slot = match self.pipelines.get(key) {
            Some(hit) => hit,
            None => {
                let built: Arc<dyn Any + Send + Sync> =
                    Arc::new(self.registry.build_pipeline::<C>()?);
                debug!(command = %std::any::type_name::<C>(), "Compiled command pipeline");
                self.pipelines.insert_or_retained(key, built)
            }
        };
        slot.downcast::<Pipeline<C>>()
            .map_err(|_| SendError::RegistrationMismatch {
                command: std::any::type_name::<C>(),
            })
    }
}
