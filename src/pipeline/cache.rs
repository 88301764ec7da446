//! Type-indexed cache of compiled pipelines.
//!
//! Reads take no lock: the whole map lives behind an `ArcSwap` and lookups
//! clone one `Arc` out of the current snapshot. Writes are copy-on-write
//! with a compare-and-swap retry loop. Entries are never evicted.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

/// Type-erased compiled pipeline. The dispatcher downcasts back to
/// `Pipeline<C>` at the typed entry point.
pub(crate) type CachedPipeline = Arc<dyn Any + Send + Sync>;

pub(crate) struct PipelineCache {
    entries: ArcSwap<HashMap<TypeId, CachedPipeline>>,
}

impl PipelineCache {
    pub(crate) fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Lock-free lookup of the cached pipeline for `key`.
    pub(crate) fn get(&self, key: TypeId) -> Option<CachedPipeline> {
        self.entries.load().get(&key).cloned()
    }

    /// Insert `built` unless a racing caller got there first.
    ///
    /// Returns the retained entry either way: concurrent first dispatches
    /// may each compile a pipeline, but exactly one survives and every
    /// caller ends up invoking that one.
    pub(crate) fn insert_or_retained(&self, key: TypeId, built: CachedPipeline) -> CachedPipeline {
        let mut current = self.entries.load();
        loop {
            if let Some(existing) = current.get(&key) {
                return Arc::clone(existing);
            }
            let mut next = HashMap::clone(&**current);
            next.insert(key, Arc::clone(&built));
            let prev = self.entries.compare_and_swap(&*current, Arc::new(next));
            if Arc::ptr_eq(&*current, &*prev) {
                return built;
            }
            current = prev;
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.load().len()
    }
}
