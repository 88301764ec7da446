//! Handler registry.
//!
//! Maps command types to their single handler, their ordered behaviors, and
//! use case types to their handler. Populated while the facade is being
//! built and frozen afterwards; the dispatcher reads it without locks.
//!
//! Instances are stored type-erased (`Box<dyn Any>` around the concrete
//! `Arc<dyn ...>`) and keyed by the target message's `TypeId`; the pipeline
//! builder downcasts them back at the typed entry point.

use std::any::{Any, TypeId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::dispatch::SendError;
use crate::interfaces::{Behavior, CommandHandler, UseCaseHandler};
use crate::message::{Command, UseCase};
use crate::pipeline::Pipeline;

/// Errors from registration.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A second handler was registered for a command type that already has
    /// one. Configuration error; never resolved by silently picking one.
    #[error("ambiguous handler for command '{command}': '{existing}' and '{duplicate}'")]
    AmbiguousHandler {
        command: &'static str,
        existing: &'static str,
        duplicate: &'static str,
    },

    /// Same, for use case types.
    #[error("ambiguous handler for use case '{use_case}': '{existing}' and '{duplicate}'")]
    AmbiguousUseCaseHandler {
        use_case: &'static str,
        existing: &'static str,
        duplicate: &'static str,
    },
}

struct HandlerSlot {
    handler_name: &'static str,
    /// `Arc<dyn CommandHandler<C>>` for the keyed `C`.
    instance: Box<dyn Any + Send + Sync>,
}

struct BehaviorSlot {
    name: &'static str,
    order: i32,
    seq: usize,
    /// `Arc<dyn Behavior<C>>` for the keyed `C`.
    instance: Box<dyn Any + Send + Sync>,
}

pub(crate) struct UseCaseSlot {
    pub(crate) handler_name: &'static str,
    /// `Arc<dyn UseCaseHandler<U>>` for the keyed `U`.
    pub(crate) instance: Box<dyn Any + Send + Sync>,
}

#[derive(Default)]
pub(crate) struct HandlerRegistry {
    handlers: HashMap<TypeId, HandlerSlot>,
    behaviors: HashMap<TypeId, Vec<BehaviorSlot>>,
    behavior_seq: usize,
    use_cases: HashMap<TypeId, UseCaseSlot>,
}

impl HandlerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register the single handler for command type `C`.
    pub(crate) fn register_command_handler<C, H>(&mut self, handler: H) -> Result<(), RegistryError>
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let command = std::any::type_name::<C>();
        let handler_name = std::any::type_name::<H>();
        match self.handlers.entry(TypeId::of::<C>()) {
            Entry::Occupied(slot) => Err(RegistryError::AmbiguousHandler {
                command,
                existing: slot.get().handler_name,
                duplicate: handler_name,
            }),
            Entry::Vacant(slot) => {
                let instance: Arc<dyn CommandHandler<C>> = Arc::new(handler);
                slot.insert(HandlerSlot {
                    handler_name,
                    instance: Box::new(instance),
                });
                info!(command = %command, handler = %handler_name, "Registered command handler");
                Ok(())
            }
        }
    }

    /// Append a behavior to `C`'s chain.
    ///
    /// Lower `order` groups wrap higher ones; within a group, registration
    /// order is kept. First in the resulting list is outermost.
    pub(crate) fn register_behavior<C, B>(&mut self, behavior: B, order: i32)
    where
        C: Command,
        B: Behavior<C> + 'static,
    {
        let name = std::any::type_name::<B>();
        let seq = self.behavior_seq;
        self.behavior_seq += 1;
        let instance: Arc<dyn Behavior<C>> = Arc::new(behavior);
        self.behaviors
            .entry(TypeId::of::<C>())
            .or_default()
            .push(BehaviorSlot {
                name,
                order,
                seq,
                instance: Box::new(instance),
            });
        info!(
            command = %std::any::type_name::<C>(),
            behavior = %name,
            order = order,
            "Registered behavior"
        );
    }

    /// Register the single handler for use case type `U`.
    pub(crate) fn register_use_case_handler<U, H>(&mut self, handler: H) -> Result<(), RegistryError>
    where
        U: UseCase,
        H: UseCaseHandler<U> + 'static,
    {
        let use_case = std::any::type_name::<U>();
        let handler_name = std::any::type_name::<H>();
        match self.use_cases.entry(TypeId::of::<U>()) {
            Entry::Occupied(slot) => Err(RegistryError::AmbiguousUseCaseHandler {
                use_case,
                existing: slot.get().handler_name,
                duplicate: handler_name,
            }),
            Entry::Vacant(slot) => {
                let instance: Arc<dyn UseCaseHandler<U>> = Arc::new(handler);
                slot.insert(UseCaseSlot {
                    handler_name,
                    instance: Box::new(instance),
                });
                info!(use_case = %use_case, handler = %handler_name, "Registered use case handler");
                Ok(())
            }
        }
    }

    /// Compile the pipeline for `C`: resolve its handler and ordered
    /// behaviors into a self-contained chain.
    ///
    /// Fails with `HandlerNotFound` when nothing is registered for `C`.
    pub(crate) fn build_pipeline<C: Command>(&self) -> Result<Pipeline<C>, SendError> {
        let command = std::any::type_name::<C>();
        let slot = self
            .handlers
            .get(&TypeId::of::<C>())
            .ok_or(SendError::HandlerNotFound { command })?;
        let handler = slot
            .instance
            .downcast_ref::<Arc<dyn CommandHandler<C>>>()
            .cloned()
            .ok_or(SendError::RegistrationMismatch { command })?;

        let mut slots: Vec<&BehaviorSlot> = self
            .behaviors
            .get(&TypeId::of::<C>())
            .map(|list| list.iter().collect())
            .unwrap_or_default();
        slots.sort_by_key(|slot| (slot.order, slot.seq));

        let mut behaviors = Vec::with_capacity(slots.len());
        for slot in slots {
            let behavior = slot
                .instance
                .downcast_ref::<Arc<dyn Behavior<C>>>()
                .cloned()
                .ok_or(SendError::RegistrationMismatch { command })?;
            behaviors.push(behavior);
        }

        Ok(Pipeline::new(handler, behaviors))
    }

    pub(crate) fn use_case_slot(&self, key: TypeId) -> Option<&UseCaseSlot> {
        self.use_cases.get(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct Add(i64);

    impl Command for Add {
        type Response = i64;
    }

    struct AddHandler;

    #[async_trait]
    impl CommandHandler<Add> for AddHandler {
        async fn handle(&self, command: Add, _cancel: CancellationToken) -> i64 {
            command.0 + 1
        }
    }

    struct OtherAddHandler;

    #[async_trait]
    impl CommandHandler<Add> for OtherAddHandler {
        async fn handle(&self, command: Add, _cancel: CancellationToken) -> i64 {
            command.0 + 2
        }
    }

    #[test]
    fn test_second_handler_for_same_command_is_ambiguous() {
        let mut registry = HandlerRegistry::new();
        registry.register_command_handler::<Add, _>(AddHandler).unwrap();

        let result = registry.register_command_handler::<Add, _>(OtherAddHandler);

        match result {
            Err(RegistryError::AmbiguousHandler {
                existing,
                duplicate,
                ..
            }) => {
                assert!(existing.contains("AddHandler"));
                assert!(duplicate.contains("OtherAddHandler"));
            }
            other => panic!("Expected AmbiguousHandler, got {other:?}"),
        }
    }

    #[test]
    fn test_build_pipeline_without_handler_is_handler_not_found() {
        let registry = HandlerRegistry::new();

        let result = registry.build_pipeline::<Add>();

        match result {
            Err(SendError::HandlerNotFound { command }) => {
                assert!(command.contains("Add"));
            }
            _ => panic!("Expected HandlerNotFound"),
        }
    }

    #[tokio::test]
    async fn test_build_pipeline_resolves_registered_handler() {
        let mut registry = HandlerRegistry::new();
        registry.register_command_handler::<Add, _>(AddHandler).unwrap();

        let pipeline = registry.build_pipeline::<Add>().unwrap();

        assert_eq!(pipeline.invoke(Add(41), CancellationToken::new()).await, 42);
        assert_eq!(pipeline.behavior_count(), 0);
    }
}
