//! Use case execution.
//!
//! One-step resolve-and-invoke: the handler registered for the use case
//! type is looked up and called directly, with no behavior chain.

use std::any::TypeId;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::interfaces::UseCaseHandler;
use crate::message::UseCase;
use crate::registry::HandlerRegistry;

/// Errors that can occur while running a use case.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// No handler registered for the use case type.
    #[error("no handler registered for use case '{use_case}'")]
    HandlerNotFound { use_case: &'static str },

    /// A registration slot held an instance of an unexpected type.
    #[error("registration for use case '{use_case}' does not match its dispatch type")]
    RegistrationMismatch { use_case: &'static str },
}

pub(crate) struct UseCaseRunner {
    registry: Arc<HandlerRegistry>,
}

impl UseCaseRunner {
    pub(crate) fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    /// Execute `use_case` with its registered handler.
    pub(crate) async fn run<U: UseCase>(
        &self,
        use_case: U,
        cancel: CancellationToken,
    ) -> Result<U::Output, RunError> {
        let name = std::any::type_name::<U>();
        let slot = self
            .registry
            .use_case_slot(TypeId::of::<U>())
            .ok_or(RunError::HandlerNotFound { use_case: name })?;
        let handler = slot
            .instance
            .downcast_ref::<Arc<dyn UseCaseHandler<U>>>()
            .cloned()
            .ok_or(RunError::RegistrationMismatch { use_case: name })?;
        Ok(handler.execute(use_case, cancel).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Greet {
        name: String,
    }

    impl UseCase for Greet {
        type Output = String;
    }

    struct GreetHandler;

    #[async_trait]
    impl UseCaseHandler<Greet> for GreetHandler {
        async fn execute(&self, use_case: Greet, _cancel: CancellationToken) -> String {
            format!("hello {}", use_case.name)
        }
    }

    #[tokio::test]
    async fn test_run_invokes_registered_handler() {
        let mut registry = HandlerRegistry::new();
        registry
            .register_use_case_handler::<Greet, _>(GreetHandler)
            .unwrap();
        let runner = UseCaseRunner::new(Arc::new(registry));

        let output = runner
            .run(
                Greet {
                    name: "world".to_string(),
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(output, "hello world");
    }

    #[tokio::test]
    async fn test_run_without_handler_is_handler_not_found() {
        let runner = UseCaseRunner::new(Arc::new(HandlerRegistry::new()));

        let result = runner
            .run(
                Greet {
                    name: "nobody".to_string(),
                },
                CancellationToken::new(),
            )
            .await;

        match result {
            Err(RunError::HandlerNotFound { use_case }) => {
                assert!(use_case.contains("Greet"));
            }
            _ => panic!("Expected HandlerNotFound"),
        }
    }
}
