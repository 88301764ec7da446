//! Event fan-out delivery.
//!
//! This module contains:
//! - `RouteTable`: per-event-type subscriber lists, copy-on-write
//! - `EventPublisher`: snapshot-then-schedule fan-out under a supervisor
//! - `Delivery` / `DeliveryReport`: out-of-band completion observation

pub(crate) mod publish;
pub(crate) mod routes;

pub use publish::{Delivery, DeliveryReport};
