//! Type-indexed subscriber route table.
//!
//! One append-only subscriber list per event type. Readers (publishes) take
//! no lock: the table lives behind an `ArcSwap` and a publish clones out
//! the current list for its event type as an immutable snapshot. Writers
//! (subscribes) replace the list wholesale with a compare-and-swap retry
//! loop. Lists only ever grow.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::interfaces::EventSubscriber;
use crate::message::Event;

/// One subscriber registration: display name plus callback.
pub(crate) struct RouteEntry<E: Event> {
    pub(crate) name: &'static str,
    pub(crate) subscriber: Arc<dyn EventSubscriber<E>>,
}

impl<E: Event> Clone for RouteEntry<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            subscriber: Arc::clone(&self.subscriber),
        }
    }
}

/// Immutable subscriber list for one event type, in registration order.
pub(crate) struct Route<E: Event> {
    pub(crate) entries: Vec<RouteEntry<E>>,
}

pub(crate) struct RouteTable {
    routes: ArcSwap<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl RouteTable {
    pub(crate) fn new() -> Self {
        Self {
            routes: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Append a subscriber to `E`'s list; returns the new list length.
    ///
    /// Copy-on-write: the list is re-built with the entry appended and the
    /// table swapped atomically, retrying on contention. In-flight
    /// publishes keep the snapshot they already took.
    pub(crate) fn subscribe<E: Event>(
        &self,
        name: &'static str,
        subscriber: Arc<dyn EventSubscriber<E>>,
    ) -> usize {
        let key = TypeId::of::<E>();
        let mut current = self.routes.load();
        loop {
            let mut entries: Vec<RouteEntry<E>> = match current.get(&key) {
                Some(slot) => slot
                    .downcast_ref::<Route<E>>()
                    .map(|route| route.entries.clone())
                    .unwrap_or_default(),
                None => Vec::new(),
            };
            entries.push(RouteEntry {
                name,
                subscriber: Arc::clone(&subscriber),
            });
            let len = entries.len();

            let mut next = HashMap::clone(&**current);
            next.insert(key, Arc::new(Route { entries }) as Arc<dyn Any + Send + Sync>);

            let prev = self.routes.compare_and_swap(&*current, Arc::new(next));
            if Arc::ptr_eq(&*current, &*prev) {
                return len;
            }
            current = prev;
        }
    }

    /// Snapshot `E`'s subscriber list, fixed at this moment.
    ///
    /// Returns `None` when nothing has ever subscribed to `E`.
    pub(crate) fn snapshot<E: Event>(&self) -> Option<Arc<Route<E>>> {
        let slot = self.routes.load().get(&TypeId::of::<E>()).cloned()?;
        slot.downcast::<Route<E>>().ok()
    }
}
