//! Event fan-out.
//!
//! A publish snapshots the subscriber list for the event's type, schedules
//! every subscriber on its own task under a supervisor, and returns. The
//! supervisor owns fault isolation: per-subscriber errors and panics are
//! logged and counted, never propagated to the publisher and never allowed
//! to starve sibling subscribers.

use std::sync::Arc;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::routes::RouteTable;
use crate::interfaces::SubscriberError;
use crate::message::Event;

/// Aggregate outcome of one publish's fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Subscribers that completed without error.
    pub delivered: usize,
    /// Subscribers that returned an error or panicked.
    pub faulted: usize,
}

/// Handle on an in-flight fan-out.
///
/// Dropping it detaches the fan-out (fire-and-forget); awaiting
/// [`completed`](Delivery::completed) observes the aggregate outcome
/// out-of-band. Either way the publisher never blocks on subscribers.
pub struct Delivery {
    supervisor: Option<JoinHandle<DeliveryReport>>,
}

impl Delivery {
    fn detached() -> Self {
        Self { supervisor: None }
    }

    fn supervised(handle: JoinHandle<DeliveryReport>) -> Self {
        Self {
            supervisor: Some(handle),
        }
    }

    /// Wait until every subscriber of this publish has finished.
    pub async fn completed(self) -> DeliveryReport {
        match self.supervisor {
            None => DeliveryReport::default(),
            Some(handle) => handle.await.unwrap_or_default(),
        }
    }
}

pub(crate) struct EventPublisher {
    routes: Arc<RouteTable>,
}

impl EventPublisher {
    pub(crate) fn new(routes: Arc<RouteTable>) -> Self {
        Self { routes }
    }

    /// Fan `event` out to the subscribers registered at this moment.
    ///
    /// Returns once the snapshot is taken and the work is scheduled; a
    /// racing subscribe does not join an in-flight publish. Zero
    /// subscribers is a no-op. Must be called from within a tokio runtime.
    pub(crate) fn publish<E: Event>(&self, event: E, cancel: CancellationToken) -> Delivery {
        let event_name = std::any::type_name::<E>();
        let Some(route) = self.routes.snapshot::<E>() else {
            debug!(event = %event_name, "No subscribers, publish is a no-op");
            return Delivery::detached();
        };

        let event = Arc::new(event);
        debug!(
            event = %event_name,
            subscribers = route.entries.len(),
            "Scheduling event fan-out"
        );

        // One task per subscriber: a fault or panic in one cannot prevent
        // the others from running or being reported.
        let mut names: Vec<&'static str> = Vec::with_capacity(route.entries.len());
        let mut tasks: Vec<JoinHandle<Result<(), SubscriberError>>> =
            Vec::with_capacity(route.entries.len());
        for entry in &route.entries {
            let subscriber = Arc::clone(&entry.subscriber);
            let event = Arc::clone(&event);
            let cancel = cancel.clone();
            names.push(entry.name);
            tasks.push(tokio::spawn(
                async move { subscriber.handle(event, cancel).await },
            ));
        }

        let supervisor = tokio::spawn(async move {
            let mut report = DeliveryReport::default();
            let outcomes = join_all(tasks).await;
            for (name, outcome) in names.into_iter().zip(outcomes) {
                match outcome {
                    Ok(Ok(())) => report.delivered += 1,
                    Ok(Err(e)) => {
                        report.faulted += 1;
                        warn!(
                            subscriber = %name,
                            event = %event_name,
                            error = %e,
                            "Subscriber faulted"
                        );
                    }
                    Err(e) => {
                        report.faulted += 1;
                        warn!(
                            subscriber = %name,
                            event = %event_name,
                            error = %e,
                            "Subscriber task aborted"
                        );
                    }
                }
            }
            report
        });

        Delivery::supervised(supervisor)
    }
}
