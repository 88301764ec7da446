//! Contract traits for the dispatch surface.
//!
//! These traits define what applications implement:
//! - Command handling (single handler per command type)
//! - Behaviors (ordered middleware around command handling)
//! - Event subscription (independent fan-out consumers)
//! - Use case execution (one-step, chain-less dispatch)

pub mod command_handler;
pub mod subscriber;
pub mod use_case;

pub use command_handler::{Behavior, CommandHandler, Next};
pub use subscriber::{EventSubscriber, SubscriberError};
pub use use_case::UseCaseHandler;
