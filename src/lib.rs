//! Herald - in-process command and event dispatch.
//!
//! Routes typed commands to a single handler through cached behavior
//! pipelines, and fans typed events out to independent subscribers with
//! per-subscriber fault isolation.

pub mod bootstrap;
pub mod bus;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod facade;
pub mod interfaces;
pub mod message;
pub mod pipeline;
pub mod registry;
pub mod runner;

pub use bus::{Delivery, DeliveryReport};
pub use config::Config;
pub use discovery::Discovered;
pub use dispatch::SendError;
pub use facade::{BuildError, Herald, HeraldBuilder};
pub use interfaces::{
    Behavior, CommandHandler, EventSubscriber, Next, SubscriberError, UseCaseHandler,
};
pub use message::{Command, Event, UseCase};
pub use registry::RegistryError;
pub use runner::RunError;
