//! Process-wide cache of reflectors, keyed by DoFn type.
//!
//! Each type gets a slot holding the outcome of its analysis, success or
//! failure. Analysis runs at most once per type per cache: the map lock is
//! held only to find or insert a slot, and concurrent first lookups of the
//! same type block on that slot until the single build finishes.

use crate::dofn::DoFn;
use crate::errors::InvalidDoFn;
use crate::reflector::DoFnReflector;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace};

type Outcome<F> = Result<Arc<DoFnReflector<F>>, InvalidDoFn>;
type Slot<F> = OnceLock<Outcome<F>>;

static GLOBAL_CACHE: OnceLock<ReflectorCache> = OnceLock::new();

/// Cache lookup counters (thread-safe).
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    /// Lookups answered from an existing slot
    pub hits: Arc<AtomicU64>,
    /// Analyses run
    pub builds: Arc<AtomicU64>,
    /// Analyses that rejected the type
    pub failures: Arc<AtomicU64>,
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self {
            hits: Arc::new(AtomicU64::new(0)),
            builds: Arc::new(AtomicU64::new(0)),
            failures: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl CacheMetrics {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_build(&self) {
        self.builds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`CacheMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub builds: u64,
    pub failures: u64,
}

/// Map from DoFn type to its analysis outcome.
pub struct ReflectorCache {
    slots: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    metrics: CacheMetrics,
}

impl Default for ReflectorCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ReflectorCache {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            metrics: CacheMetrics::default(),
        }
    }

    /// The cache behind [`DoFnReflector::of`].
    pub fn global() -> &'static ReflectorCache {
        GLOBAL_CACHE.get_or_init(ReflectorCache::new)
    }

    /// Reflector for `F`, analyzing the type on first request.
    pub fn get_or_build<F: DoFn>(&self) -> Result<Arc<DoFnReflector<F>>, InvalidDoFn> {
        let slot = self.slot::<F>();

        let mut built = false;
        let outcome = slot.get_or_init(|| {
            built = true;
            self.metrics.record_build();
            debug!(dofn = std::any::type_name::<F>(), "analyzing DoFn type");
            let outcome = DoFnReflector::<F>::analyze().map(Arc::new);
            if outcome.is_err() {
                self.metrics.record_failure();
            }
            outcome
        });

        if !built {
            self.metrics.record_hit();
            match outcome {
                Ok(_) => trace!(dofn = std::any::type_name::<F>(), "reflector cache hit"),
                Err(err) => debug!(
                    dofn = std::any::type_name::<F>(),
                    code = %err.code.code_string(),
                    "reusing cached DoFn analysis failure"
                ),
            }
        }

        outcome.clone()
    }

    /// Whether `F` has been analyzed by this cache.
    pub fn contains<F: DoFn>(&self) -> bool {
        self.slots
            .read()
            .get(&TypeId::of::<F>())
            .and_then(|slot| slot.downcast_ref::<Slot<F>>())
            .is_some_and(|slot| slot.get().is_some())
    }

    /// Number of types with a slot.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot()
    }

    fn slot<F: DoFn>(&self) -> Arc<Slot<F>> {
        let key = TypeId::of::<F>();

        if let Some(slot) = self.slots.read().get(&key) {
            return downcast_slot::<F>(Arc::clone(slot));
        }

        let mut slots = self.slots.write();
        let slot = slots
            .entry(key)
            .or_insert_with(|| Arc::new(Slot::<F>::new()) as Arc<dyn Any + Send + Sync>);
        downcast_slot::<F>(Arc::clone(slot))
    }
}

fn downcast_slot<F: DoFn>(slot: Arc<dyn Any + Send + Sync>) -> Arc<Slot<F>> {
    match slot.downcast::<Slot<F>>() {
        Ok(slot) => slot,
        Err(_) => unreachable!("reflector slot keyed by TypeId holds another type"),
    }
}
