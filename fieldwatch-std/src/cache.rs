//! Source-to-registry store.
//!
//! [`RegistryCache`] maps each live source to its single
//! [`SubscriptionRegistry`]. It is an explicit value with its own lifecycle,
//! not process-wide state: create one, share it, and drop or
//! [`clear`](RegistryCache::clear) it to tear every registry down.
//!
//! Sources are keyed by [`SourceKey`] and only referenced weakly through
//! their registries, so caching never keeps a source alive. An entry leaves
//! the cache as soon as its source drops the registry's handler. Entries
//! that outlive that (a source that keeps its handler after detaching, say)
//! are swept when new registries are created, or on
//! [`purge`](RegistryCache::purge).

use crate::registry::{ReleaseHook, SubscriptionRegistry};
use fieldwatch_core::{NotifySource, ObjectId, SourceKey};
use std::{
    any::Any,
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

/// Type-erased view of a cached registry.
trait CachedRegistry: Send + Sync {
    fn is_live(&self) -> bool;
    fn teardown(&self) -> bool;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<S: NotifySource> CachedRegistry for SubscriptionRegistry<S> {
    fn is_live(&self) -> bool {
        SubscriptionRegistry::is_live(self)
    }

    fn teardown(&self) -> bool {
        SubscriptionRegistry::teardown(self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

type Entries = HashMap<SourceKey, Arc<dyn CachedRegistry>>;

/// At most one [`SubscriptionRegistry`] per live source.
///
/// All lookups and insertions are serialized by one lock, so concurrent
/// first-time callers for the same source get the same registry. The lock
/// is never held while listeners run or while sources attach and detach
/// handlers.
pub struct RegistryCache {
    entries: Arc<Mutex<Entries>>,
    sweep_on_create: bool,
}

impl RegistryCache {
    /// Create an empty cache that sweeps dead entries when it creates registries.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            sweep_on_create: true,
        }
    }

    /// Set whether dead entries are swept each time a registry is created.
    pub fn with_sweep_on_create(mut self, sweep: bool) -> Self {
        self.sweep_on_create = sweep;
        self
    }

    /// Return the registry for `source`, creating and attaching one if needed.
    pub fn get_or_create<S: NotifySource>(
        &self,
        source: &Arc<S>,
    ) -> Arc<SubscriptionRegistry<S>> {
        let key = SourceKey::of(source);
        let mut stale = Vec::new();

        let registry = {
            let mut entries = self.lock();
            match lookup::<S>(&entries, &key) {
                Some(registry) => registry,
                None => {
                    if let Some(old) = entries.remove(&key) {
                        stale.push(old);
                    }
                    if self.sweep_on_create {
                        stale.extend(sweep(&mut entries));
                    }

                    let registry =
                        SubscriptionRegistry::unattached(source, Some(self.release_hook(key)));
                    entries.insert(key, Arc::clone(&registry) as Arc<dyn CachedRegistry>);
                    registry
                }
            }
        };

        retire(stale);
        registry.ensure_attached(source);
        registry
    }

    /// Return the registry for `source` without creating one.
    pub fn try_get<S: NotifySource>(
        &self,
        source: &Arc<S>,
    ) -> Option<Arc<SubscriptionRegistry<S>>> {
        let registry = lookup::<S>(&self.lock(), &SourceKey::of(source))?;
        registry.ensure_attached(source);
        Some(registry)
    }

    /// Remove and tear down the registry for `source`.
    ///
    /// Returns whether an entry existed.
    pub fn remove<S: NotifySource>(&self, source: &Arc<S>) -> bool {
        let removed = self.lock().remove(&SourceKey::of(source));
        match removed {
            Some(registry) => {
                registry.teardown();
                true
            }
            None => false,
        }
    }

    /// Drop entries whose source is gone or whose registry was torn down.
    ///
    /// Returns how many entries were dropped.
    pub fn purge(&self) -> usize {
        let stale = sweep(&mut self.lock());
        let count = stale.len();
        retire(stale);
        count
    }

    /// Tear down every registry and empty the cache.
    pub fn clear(&self) {
        let all: Vec<_> = self.lock().drain().map(|(_, registry)| registry).collect();

        #[cfg(feature = "tracing")]
        {
            if !all.is_empty() {
                tracing::debug!(registries = all.len(), "clearing registry cache");
            }
        }

        for registry in all {
            registry.teardown();
        }
    }

    /// Number of entries, including ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache has no entries.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops the entry for `key` once its registry is released, unless a
    /// newer registry took its place.
    fn release_hook(&self, key: SourceKey) -> ReleaseHook {
        let entries: Weak<Mutex<Entries>> = Arc::downgrade(&self.entries);
        Box::new(move |registry: ObjectId| {
            let Some(entries) = entries.upgrade() else {
                return;
            };
            let removed = {
                let mut entries = entries.lock().unwrap_or_else(PoisonError::into_inner);
                match entries.get(&key) {
                    Some(entry) if ObjectId::of(entry) == registry => entries.remove(&key),
                    _ => None,
                }
            };
            drop(removed);
        })
    }
}

impl Default for RegistryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RegistryCache {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for RegistryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCache")
            .field("entries", &self.len())
            .field("sweep_on_create", &self.sweep_on_create)
            .finish()
    }
}

fn lookup<S: NotifySource>(
    entries: &Entries,
    key: &SourceKey,
) -> Option<Arc<SubscriptionRegistry<S>>> {
    let registry = entries.get(key)?;
    if !registry.is_live() {
        return None;
    }
    Arc::clone(registry)
        .into_any()
        .downcast::<SubscriptionRegistry<S>>()
        .ok()
}

fn sweep(entries: &mut Entries) -> Vec<Arc<dyn CachedRegistry>> {
    let dead: Vec<SourceKey> = entries
        .iter()
        .filter(|(_, registry)| !registry.is_live())
        .map(|(key, _)| *key)
        .collect();
    let stale: Vec<_> = dead.iter().filter_map(|key| entries.remove(key)).collect();

    #[cfg(feature = "tracing")]
    {
        if !stale.is_empty() {
            tracing::debug!(swept = stale.len(), "swept dead registry cache entries");
        }
    }

    stale
}

/// Tear down registries taken out of the cache, after its lock is released.
fn retire(stale: Vec<Arc<dyn CachedRegistry>>) {
    for registry in stale {
        registry.teardown();
    }
}
