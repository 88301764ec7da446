//! Dispatch facade for in-process library usage.
//!
//! Provides a single object exposing `send`, `publish`, `subscribe`, and
//! `run` by delegating to the command dispatcher, event publisher, and use
//! case runner. All dispatch state (the pipeline cache and the route
//! table) is owned by the instance, so tests and embedded hosts can hold
//! several isolated facades in one process.
//!
//! # Example
//!
//! ```ignore
//! use herald::Herald;
//!
//! let herald = Herald::builder()
//!     .command_handler(CreateOrderHandler::new(store))
//!     .behavior::<CreateOrder, _>(ValidateOrder::default())
//!     .subscriber::<OrderCreated, _>(OrderProjector::default())
//!     .build()?;
//!
//! let order_id = herald.send(CreateOrder { customer }).await?;
//! herald.publish(OrderCreated { order_id });
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::bus::publish::EventPublisher;
use crate::bus::routes::RouteTable;
use crate::bus::Delivery;
use crate::config::Config;
use crate::discovery;
use crate::dispatch::{CommandDispatcher, SendError};
use crate::interfaces::{Behavior, CommandHandler, EventSubscriber, UseCaseHandler};
use crate::message::{Command, Event, UseCase};
use crate::registry::{HandlerRegistry, RegistryError};
use crate::runner::{RunError, UseCaseRunner};

/// Errors surfaced when assembling a [`Herald`].
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Builder for a [`Herald`] instance.
///
/// Registration defects (ambiguous handlers) are collected as they happen
/// and surfaced from [`build`](HeraldBuilder::build), keeping registration
/// chainable.
pub struct HeraldBuilder {
    config: Config,
    registry: HandlerRegistry,
    routes: Arc<RouteTable>,
    defects: Vec<RegistryError>,
}

impl HeraldBuilder {
    fn new() -> Self {
        Self {
            config: Config::default(),
            registry: HandlerRegistry::new(),
            routes: Arc::new(RouteTable::new()),
            defects: Vec::new(),
        }
    }

    /// Replace the default configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Register the single handler for command type `C`.
    ///
    /// The instance is shared by every dispatch for the facade's lifetime;
    /// it must be stateless or internally synchronized. A second handler
    /// for the same command type fails `build()`.
    pub fn command_handler<C, H>(mut self, handler: H) -> Self
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        if let Err(defect) = self.registry.register_command_handler::<C, H>(handler) {
            self.defects.push(defect);
        }
        self
    }

    /// Append a behavior to `C`'s chain in order group 0.
    ///
    /// First registered is outermost.
    pub fn behavior<C, B>(self, behavior: B) -> Self
    where
        C: Command,
        B: Behavior<C> + 'static,
    {
        self.behavior_with_order(behavior, 0)
    }

    /// Append a behavior with an explicit order group.
    ///
    /// Lower groups wrap higher ones; within a group, registration order
    /// is kept.
    pub fn behavior_with_order<C, B>(mut self, behavior: B, order: i32) -> Self
    where
        C: Command,
        B: Behavior<C> + 'static,
    {
        self.registry.register_behavior::<C, B>(behavior, order);
        self
    }

    /// Subscribe `subscriber` to event type `E`.
    ///
    /// Appends: subscribing the same instance twice fans out twice.
    pub fn subscriber<E, S>(self, subscriber: S) -> Self
    where
        E: Event,
        S: EventSubscriber<E> + 'static,
    {
        subscribe_route(&self.routes, subscriber);
        self
    }

    /// Register the single handler for use case type `U`.
    pub fn use_case_handler<U, H>(mut self, handler: H) -> Self
    where
        U: UseCase,
        H: UseCaseHandler<U> + 'static,
    {
        if let Err(defect) = self.registry.register_use_case_handler::<U, H>(handler) {
            self.defects.push(defect);
        }
        self
    }

    /// Assemble the facade.
    ///
    /// Installs discovered registrations first when the config asks for
    /// it, then fails on the first collected registration defect.
    pub fn build(mut self) -> Result<Herald, BuildError> {
        if self.config.auto_discover {
            self = discovery::install_all(self);
        }

        let HeraldBuilder {
            registry,
            routes,
            defects,
            ..
        } = self;

        if let Some(defect) = defects.into_iter().next() {
            return Err(defect.into());
        }

        let registry = Arc::new(registry);
        Ok(Herald {
            commands: CommandDispatcher::new(Arc::clone(&registry)),
            use_cases: UseCaseRunner::new(registry),
            events: EventPublisher::new(Arc::clone(&routes)),
            routes,
        })
    }
}

fn subscribe_route<E, S>(routes: &RouteTable, subscriber: S)
where
    E: Event,
    S: EventSubscriber<E> + 'static,
{
    let name = std::any::type_name::<S>();
    let count = routes.subscribe::<E>(name, Arc::new(subscriber));
    info!(
        event = %std::any::type_name::<E>(),
        subscriber = %name,
        subscribers = count,
        "Registered subscriber"
    );
}

/// Unified dispatch entry point.
///
/// Pure delegation: commands go to the pipeline dispatcher, events to the
/// fan-out publisher, use cases to the runner.
pub struct Herald {
    commands: CommandDispatcher,
    events: EventPublisher,
    use_cases: UseCaseRunner,
    routes: Arc<RouteTable>,
}

impl Herald {
    /// Create a builder with default configuration.
    pub fn builder() -> HeraldBuilder {
        HeraldBuilder::new()
    }

    /// Dispatch `command` to its handler through its behavior chain.
    ///
    /// Returns the handler's (possibly behavior-modified) response, or
    /// `HandlerNotFound` when nothing is registered for the command type.
    /// Handler and behavior faults pass through unmodified.
    pub async fn send<C: Command>(&self, command: C) -> Result<C::Response, SendError> {
        self.commands.send(command, CancellationToken::new()).await
    }

    /// [`send`](Herald::send) with a caller-owned cancellation token.
    ///
    /// The token is cloned into every behavior and the handler; honoring
    /// it is their responsibility; dispatch never force-aborts.
    pub async fn send_with<C: Command>(
        &self,
        command: C,
        cancel: CancellationToken,
    ) -> Result<C::Response, SendError> {
        self.commands.send(command, cancel).await
    }

    /// Fan `event` out to its subscribers.
    ///
    /// Returns once the subscriber snapshot is taken and the work is
    /// scheduled; subscriber faults never surface here. Await the returned
    /// [`Delivery`] to observe the aggregate outcome, or drop it for
    /// fire-and-forget.
    pub fn publish<E: Event>(&self, event: E) -> Delivery {
        self.events.publish(event, CancellationToken::new())
    }

    /// [`publish`](Herald::publish) with a caller-owned cancellation token.
    pub fn publish_with<E: Event>(&self, event: E, cancel: CancellationToken) -> Delivery {
        self.events.publish(event, cancel)
    }

    /// Subscribe to `E` after construction.
    ///
    /// Append-only; publishes already in flight keep the snapshot they
    /// took.
    pub fn subscribe<E, S>(&self, subscriber: S)
    where
        E: Event,
        S: EventSubscriber<E> + 'static,
    {
        subscribe_route(&self.routes, subscriber);
    }

    /// Execute a use case: one-step resolve-and-invoke, no behavior chain.
    pub async fn run<U: UseCase>(&self, use_case: U) -> Result<U::Output, RunError> {
        self.use_cases.run(use_case, CancellationToken::new()).await
    }

    /// [`run`](Herald::run) with a caller-owned cancellation token.
    pub async fn run_with<U: UseCase>(
        &self,
        use_case: U,
        cancel: CancellationToken,
    ) -> Result<U::Output, RunError> {
        self.use_cases.run(use_case, cancel).await
    }
}
