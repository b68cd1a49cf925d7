//! Per-source subscription registry.
//!
//! A [`SubscriptionRegistry`] owns, for one source, a table from field name to
//! an ordered list of [`Listener`]s. It installs itself as the source's
//! field-change handler and dispatches every signal to the listeners of the
//! named field.
//!
//! # Locking
//!
//! - the field table has its own lock, held only to look up or create lists
//! - every listener list has its own lock, held only to copy or edit it
//! - no lock is held while user callbacks run, so callbacks may subscribe,
//!   unsubscribe (themselves included) or tear the registry down
//! - no lock is held while the source attaches or detaches the handler
//!
//! # Release
//!
//! The handler installed on the source carries a guard. When the source
//! drops the handler (the source itself is dropped, the handler is detached
//! or replaced) the registry closes and drops every listener.

use fieldwatch_core::{Listener, NotifySource, ObjectId, Result, SourceKey, WatchError};
use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex, MutexGuard, Once, PoisonError, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

/// Called with the registry's identity once its source lets go of it.
pub(crate) type ReleaseHook = Box<dyn FnOnce(ObjectId) + Send + Sync>;

/// Outcome of the initial delivery requested by [`SubscriptionRegistry::add_listener`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priming {
    /// No initial delivery was requested.
    Skipped,
    /// The listener received the current value.
    Delivered,
    /// The listener's owner was already gone; nothing was invoked.
    OwnerDead,
    /// The source was already gone; nothing was invoked.
    SourceGone,
}

/// The listeners of one field, in registration order.
struct ListenerList<S: NotifySource> {
    listeners: Mutex<Vec<Arc<Listener<S>>>>,
}

impl<S: NotifySource> ListenerList<S> {
    fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<Listener<S>>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Vec<Arc<Listener<S>>> {
        self.lock().clone()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    /// Remove every listener in `doomed`, returning the ones actually removed.
    ///
    /// The caller drops the returned listeners after the lock is released.
    fn remove_all(&self, doomed: &[Arc<Listener<S>>]) -> Vec<Arc<Listener<S>>> {
        let mut removed = Vec::new();
        self.lock().retain(|listener| {
            if doomed.iter().any(|d| Arc::ptr_eq(d, listener)) {
                removed.push(Arc::clone(listener));
                false
            } else {
                true
            }
        });
        removed
    }

    fn drain(&self) -> Vec<Arc<Listener<S>>> {
        std::mem::take(&mut *self.lock())
    }
}

/// Releases the registry when the source drops its handler.
///
/// The handler is dropped when the source itself is dropped, when it is
/// detached, or when another handler replaces it. In every case the registry
/// can no longer receive signals, so its listeners are let go.
struct HandlerGuard<S: NotifySource> {
    registry: Weak<SubscriptionRegistry<S>>,
}

impl<S: NotifySource> HandlerGuard<S> {
    fn registry(&self) -> Option<Arc<SubscriptionRegistry<S>>> {
        self.registry.upgrade()
    }
}

impl<S: NotifySource> Drop for HandlerGuard<S> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry() {
            registry.release();
        }
    }
}

/// The subscription table of one notifying source.
///
/// Holds the source weakly; the source in turn only holds a weak reference
/// to the registry through its field-change handler. Keep the returned `Arc`
/// (or let a [`RegistryCache`](crate::RegistryCache) keep it) for as long as
/// the subscriptions should stay active.
///
/// Once the source is dropped, every listener is dropped with it, along with
/// whatever state the listeners captured.
pub struct SubscriptionRegistry<S: NotifySource> {
    source: Weak<S>,
    key: SourceKey,
    fields: Mutex<HashMap<String, Arc<ListenerList<S>>>>,
    torn_down: AtomicBool,
    attached: Once,
    on_release: Mutex<Option<ReleaseHook>>,
}

impl<S: NotifySource> SubscriptionRegistry<S> {
    /// Create a registry for `source` and attach it to the source's signal.
    pub fn attach(source: &Arc<S>) -> Arc<Self> {
        let registry = Self::unattached(source, None);
        registry.ensure_attached(source);
        registry
    }

    /// Create a registry without touching the source yet.
    pub(crate) fn unattached(source: &Arc<S>, on_release: Option<ReleaseHook>) -> Arc<Self> {
        Arc::new(Self {
            source: Arc::downgrade(source),
            key: SourceKey::of(source),
            fields: Mutex::new(HashMap::new()),
            torn_down: AtomicBool::new(false),
            attached: Once::new(),
            on_release: Mutex::new(on_release),
        })
    }

    /// Install the field-change handler on `source`, once.
    ///
    /// Concurrent callers wait until the handler is in place. Does nothing
    /// after [`teardown`](Self::teardown).
    pub(crate) fn ensure_attached(self: &Arc<Self>, source: &Arc<S>) {
        self.attached.call_once(|| {
            if self.is_torn_down() {
                return;
            }
            let guard = HandlerGuard {
                registry: Arc::downgrade(self),
            };
            source.attach_field_handler(Arc::new(move |field: &str| {
                if let Some(registry) = guard.registry() {
                    registry.on_field_changed(field);
                }
            }));

            #[cfg(feature = "tracing")]
            tracing::debug!(source = ?self.key, "attached subscription registry");
        });
    }

    /// Append `listener` to the list for `field`.
    ///
    /// With `deliver_initial_value`, the listener is then invoked once with
    /// the source's current value, outside any lock. A dead owner reported by
    /// that call is returned as [`Priming::OwnerDead`] and is not purged here.
    ///
    /// # Errors
    ///
    /// - [`WatchError::InvalidArgument`] if `field` is empty
    /// - [`WatchError::RegistryClosed`] after [`teardown`](Self::teardown)
    ///
    /// Nothing is registered when an error is returned.
    pub fn add_listener(
        &self,
        field: &str,
        listener: Arc<Listener<S>>,
        deliver_initial_value: bool,
    ) -> Result<Priming> {
        if field.is_empty() {
            return Err(WatchError::InvalidArgument(
                "field name must not be empty".into(),
            ));
        }

        {
            let mut fields = self.lock_fields();
            if self.is_torn_down() {
                return Err(WatchError::RegistryClosed);
            }
            let list = fields
                .entry(field.to_owned())
                .or_insert_with(|| Arc::new(ListenerList::new()));
            list.lock().push(Arc::clone(&listener));
        }

        if !deliver_initial_value {
            return Ok(Priming::Skipped);
        }

        let Some(source) = self.source.upgrade() else {
            return Ok(Priming::SourceGone);
        };
        let mut dead = Vec::new();
        listener.dispatch(&source, &mut dead);
        if dead.is_empty() {
            Ok(Priming::Delivered)
        } else {
            Ok(Priming::OwnerDead)
        }
    }

    /// Remove one specific listener from `field`. Returns whether it was found.
    pub fn remove_listener(&self, field: &str, listener: &Arc<Listener<S>>) -> bool {
        let Some(list) = self.list(field) else {
            return false;
        };
        let removed = list.remove_all(std::slice::from_ref(listener));
        !removed.is_empty()
    }

    /// Remove every listener owned by `candidate`, and every dead listener.
    ///
    /// With `None`, only dead listeners are removed. Returns how many
    /// listeners were removed.
    pub fn remove_all_for(&self, candidate: Option<ObjectId>) -> usize {
        let lists: Vec<(String, Arc<ListenerList<S>>)> = self
            .lock_fields()
            .iter()
            .map(|(field, list)| (field.clone(), Arc::clone(list)))
            .collect();

        let mut total = 0;
        for (_field, list) in lists {
            // Owners are upgraded here, outside the list lock.
            let doomed: Vec<_> = list
                .snapshot()
                .into_iter()
                .filter(|listener| listener.is_target_or_dead(candidate))
                .collect();
            if doomed.is_empty() {
                continue;
            }
            let removed = list.remove_all(&doomed);
            total += removed.len();

            #[cfg(feature = "tracing")]
            tracing::trace!(
                source = ?self.key,
                field = %_field,
                removed = removed.len(),
                "removed listeners"
            );
        }
        total
    }

    /// Remove dead listeners from every field.
    pub fn purge_dead(&self) -> usize {
        self.remove_all_for(None)
    }

    /// Dispatch a change of `field` to its listeners.
    ///
    /// Listeners are taken from a point-in-time copy of the list, so changes
    /// made by callbacks affect the next pass, not this one. Dead listeners
    /// found during the pass are removed once it completes.
    pub fn on_field_changed(&self, field: &str) {
        if self.is_torn_down() {
            return;
        }
        let Some(list) = self.list(field) else {
            return;
        };
        let Some(source) = self.source.upgrade() else {
            return;
        };

        let snapshot = list.snapshot();
        let mut dead = Vec::new();
        for listener in &snapshot {
            listener.dispatch(&source, &mut dead);
        }

        if !dead.is_empty() {
            let _removed = list.remove_all(&dead);

            #[cfg(feature = "tracing")]
            tracing::debug!(
                source = ?self.key,
                field,
                purged = _removed.len(),
                "purged dead listeners"
            );
        }
    }

    /// Detach from the source and drop every listener.
    ///
    /// Idempotent: returns `true` only for the call that performed the
    /// teardown. Safe to call while a dispatch is in flight; that pass
    /// finishes on its own copy of the listeners.
    pub fn teardown(&self) -> bool {
        // Waits out an attach in progress, or keeps a later one from happening.
        self.attached.call_once(|| {});

        let Some(lists) = self.close() else {
            return false;
        };
        if let Some(source) = self.source.upgrade() {
            source.detach_field_handler();
        }
        let _dropped = drain(lists);

        #[cfg(feature = "tracing")]
        tracing::debug!(source = ?self.key, listeners = _dropped, "tore down subscription registry");

        true
    }

    /// Let go of every listener after the source dropped the handler.
    fn release(&self) {
        if let Some(lists) = self.close() {
            let _dropped = drain(lists);

            #[cfg(feature = "tracing")]
            tracing::debug!(source = ?self.key, listeners = _dropped, "released subscription registry");
        }

        let hook = self
            .on_release
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(hook) = hook {
            hook(ObjectId::from_ref(self));
        }
    }

    /// Mark the registry torn down and take its table, unless already done.
    fn close(&self) -> Option<HashMap<String, Arc<ListenerList<S>>>> {
        let mut fields = self.lock_fields();
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(std::mem::take(&mut *fields))
    }

    /// Whether [`teardown`](Self::teardown) has run.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Whether the registry still serves a live source.
    pub fn is_live(&self) -> bool {
        !self.is_torn_down() && self.source.strong_count() > 0
    }

    /// The source, if it is still alive.
    pub fn source(&self) -> Option<Arc<S>> {
        self.source.upgrade()
    }

    /// Key of the source this registry belongs to.
    pub fn key(&self) -> SourceKey {
        self.key
    }

    /// Number of listeners registered for `field`.
    pub fn listener_count(&self, field: &str) -> usize {
        self.list(field).map_or(0, |list| list.len())
    }

    /// Number of listeners across all fields.
    pub fn len(&self) -> usize {
        self.lock_fields().values().map(|list| list.len()).sum()
    }

    /// Whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of fields that have at least one listener, sorted.
    pub fn fields(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock_fields()
            .iter()
            .filter(|(_, list)| list.len() > 0)
            .map(|(field, _)| field.clone())
            .collect();
        names.sort();
        names
    }

    fn list(&self, field: &str) -> Option<Arc<ListenerList<S>>> {
        self.lock_fields().get(field).cloned()
    }

    fn lock_fields(&self) -> MutexGuard<'_, HashMap<String, Arc<ListenerList<S>>>> {
        self.fields.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Empty every list, dropping the listeners outside any lock.
fn drain<S: NotifySource>(lists: HashMap<String, Arc<ListenerList<S>>>) -> usize {
    lists.into_values().map(|list| list.drain().len()).sum()
}

impl<S: NotifySource> fmt::Debug for SubscriptionRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("source", &self.key)
            .field("fields", &self.fields())
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::FieldSignal;
    use crate::testing::{RecordingOwner, TestSource, ValueLog};

    fn flag(source: &TestSource) -> bool {
        source.flag()
    }

    fn bound(owner: &Arc<RecordingOwner<bool>>) -> Arc<Listener<TestSource>> {
        Arc::new(Listener::bound(owner, flag, RecordingOwner::record))
    }

    fn unbound(log: &ValueLog<bool>) -> Arc<Listener<TestSource>> {
        Arc::new(Listener::unbound(flag, log.sink()))
    }

    #[test]
    fn test_attach_installs_handler() {
        let source = Arc::new(TestSource::new());
        let registry = SubscriptionRegistry::attach(&source);

        assert!(source.is_attached());
        assert_eq!(source.attach_count(), 1);
        assert!(registry.is_live());
        assert_eq!(registry.key(), SourceKey::of(&source));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dispatch_reaches_listeners_in_order() {
        let source = Arc::new(TestSource::new());
        let registry = SubscriptionRegistry::attach(&source);
        let order = ValueLog::new();

        for id in 0..3 {
            let sink = order.sink();
            let listener = Arc::new(Listener::unbound(flag, move |_| sink(id)));
            registry.add_listener("flag", listener, false).unwrap();
        }

        source.set_flag(true);
        assert_eq!(order.values(), vec![0, 1, 2]);
    }

    #[test]
    fn test_dispatch_only_for_named_field() {
        let source = Arc::new(TestSource::new());
        let registry = SubscriptionRegistry::attach(&source);
        let log = ValueLog::new();
        registry.add_listener("flag", unbound(&log), false).unwrap();

        source.set_count(3);
        assert!(log.is_empty());

        source.set_flag(true);
        assert_eq!(log.values(), vec![true]);
    }

    #[test]
    fn test_add_listener_rejects_empty_field() {
        let source = Arc::new(TestSource::new());
        let registry = SubscriptionRegistry::attach(&source);
        let log = ValueLog::new();

        let err = registry.add_listener("", unbound(&log), false).unwrap_err();
        assert!(matches!(err, WatchError::InvalidArgument(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_initial_value_delivered_once() {
        let source = Arc::new(TestSource::new());
        source.set_flag(true);
        let registry = SubscriptionRegistry::attach(&source);
        let log = ValueLog::new();

        let priming = registry.add_listener("flag", unbound(&log), true).unwrap();
        assert_eq!(priming, Priming::Delivered);
        assert_eq!(log.values(), vec![true]);

        source.set_flag(false);
        assert_eq!(log.values(), vec![true, false]);
    }

    #[test]
    fn test_priming_reports_dead_owner_without_purging() {
        let source = Arc::new(TestSource::new());
        let registry = SubscriptionRegistry::attach(&source);
        let owner = Arc::new(RecordingOwner::new());
        let listener = bound(&owner);
        drop(owner);

        let priming = registry.add_listener("flag", listener, true).unwrap();
        assert_eq!(priming, Priming::OwnerDead);
        assert_eq!(registry.listener_count("flag"), 1);
    }

    #[test]
    fn test_dead_listener_purged_on_dispatch() {
        let source = Arc::new(TestSource::new());
        let registry = SubscriptionRegistry::attach(&source);
        let owner = Arc::new(RecordingOwner::new());
        registry.add_listener("flag", bound(&owner), false).unwrap();

        source.set_flag(true);
        assert_eq!(owner.values(), vec![true]);

        let log = owner.log();
        drop(owner);
        source.set_flag(false);

        assert_eq!(log.values(), vec![true]);
        assert_eq!(registry.listener_count("flag"), 0);
    }

    #[test]
    fn test_remove_all_for_target_and_dead() {
        let source = Arc::new(TestSource::new());
        let registry = SubscriptionRegistry::attach(&source);
        let keep = Arc::new(RecordingOwner::new());
        let target = Arc::new(RecordingOwner::new());
        let doomed = Arc::new(RecordingOwner::new());
        let log = ValueLog::new();

        registry.add_listener("flag", bound(&keep), false).unwrap();
        registry.add_listener("flag", bound(&target), false).unwrap();
        registry.add_listener("flag", bound(&doomed), false).unwrap();
        registry.add_listener("flag", unbound(&log), false).unwrap();
        drop(doomed);

        let removed = registry.remove_all_for(Some(ObjectId::of(&target)));
        assert_eq!(removed, 2);
        assert_eq!(registry.listener_count("flag"), 2);

        source.set_flag(true);
        assert_eq!(keep.values(), vec![true]);
        assert!(target.values().is_empty());
        assert_eq!(log.values(), vec![true]);
    }

    #[test]
    fn test_purge_dead_keeps_unbound() {
        let source = Arc::new(TestSource::new());
        let registry = SubscriptionRegistry::attach(&source);
        let owner = Arc::new(RecordingOwner::new());
        let log = ValueLog::new();
        registry.add_listener("flag", bound(&owner), false).unwrap();
        registry.add_listener("flag", unbound(&log), false).unwrap();

        assert_eq!(registry.purge_dead(), 0);
        drop(owner);
        assert_eq!(registry.purge_dead(), 1);
        assert_eq!(registry.listener_count("flag"), 1);
    }

    #[test]
    fn test_remove_listener() {
        let source = Arc::new(TestSource::new());
        let registry = SubscriptionRegistry::attach(&source);
        let log = ValueLog::new();
        let listener = unbound(&log);
        registry
            .add_listener("flag", Arc::clone(&listener), false)
            .unwrap();

        assert!(registry.remove_listener("flag", &listener));
        assert!(!registry.remove_listener("flag", &listener));
        assert!(!registry.remove_listener("count", &listener));

        source.set_flag(true);
        assert!(log.is_empty());
    }

    #[test]
    fn test_unbound_listener_persists() {
        let source = Arc::new(TestSource::new());
        let registry = SubscriptionRegistry::attach(&source);
        let log = ValueLog::new();
        registry.add_listener("flag", unbound(&log), false).unwrap();

        for i in 0..100 {
            source.set_flag(i % 2 == 0);
        }
        assert_eq!(log.len(), 100);
        assert_eq!(registry.listener_count("flag"), 1);
    }

    #[test]
    fn test_teardown_idempotent() {
        let source = Arc::new(TestSource::new());
        let registry = SubscriptionRegistry::attach(&source);
        let log = ValueLog::new();
        registry.add_listener("flag", unbound(&log), false).unwrap();

        assert!(registry.teardown());
        assert!(!registry.teardown());
        assert!(!source.is_attached());
        assert_eq!(source.detach_count(), 1);
        assert!(registry.is_empty());
        assert!(!registry.is_live());

        source.set_flag(true);
        assert!(log.is_empty());

        let err = registry.add_listener("flag", unbound(&log), false).unwrap_err();
        assert_eq!(err, WatchError::RegistryClosed);
    }

    #[test]
    fn test_teardown_before_any_subscription() {
        let source = Arc::new(TestSource::new());
        let registry = SubscriptionRegistry::attach(&source);
        assert!(registry.teardown());
        assert!(!registry.teardown());
        assert_eq!(source.detach_count(), 1);
    }

    #[test]
    fn test_callback_removes_itself_during_dispatch() {
        let source = Arc::new(TestSource::new());
        let registry = SubscriptionRegistry::attach(&source);
        let owner = Arc::new(RecordingOwner::new());

        let weak_registry = Arc::downgrade(&registry);
        let listener = Arc::new(Listener::bound(
            &owner,
            flag,
            move |owner: &RecordingOwner<bool>, value| {
                owner.record(value);
                if let Some(registry) = weak_registry.upgrade() {
                    registry.remove_all_for(Some(ObjectId::from_ref(owner)));
                }
            },
        ));
        registry.add_listener("flag", listener, false).unwrap();

        source.set_flag(true);
        source.set_flag(false);

        assert_eq!(owner.values(), vec![true]);
        assert_eq!(registry.listener_count("flag"), 0);
    }

    #[test]
    fn test_listener_added_during_dispatch_fires_next_pass() {
        let source = Arc::new(TestSource::new());
        let registry = SubscriptionRegistry::attach(&source);
        let late = ValueLog::new();

        let weak_registry = Arc::downgrade(&registry);
        let late_sink = late.clone();
        let added = Arc::new(AtomicBool::new(false));
        let adder = Arc::new(Listener::unbound(flag, move |_| {
            if added.swap(true, Ordering::SeqCst) {
                return;
            }
            if let Some(registry) = weak_registry.upgrade() {
                let listener = Arc::new(Listener::unbound(flag, late_sink.sink()));
                registry.add_listener("flag", listener, false).unwrap();
            }
        }));
        registry.add_listener("flag", adder, false).unwrap();

        source.set_flag(true);
        assert!(late.is_empty());

        source.set_flag(false);
        assert_eq!(late.values(), vec![false]);
    }

    #[test]
    fn test_teardown_from_inside_callback() {
        let source = Arc::new(TestSource::new());
        let registry = SubscriptionRegistry::attach(&source);
        let log = ValueLog::new();

        let weak_registry = Arc::downgrade(&registry);
        let sink = log.sink();
        let listener = Arc::new(Listener::unbound(flag, move |value| {
            sink(value);
            if let Some(registry) = weak_registry.upgrade() {
                registry.teardown();
            }
        }));
        registry.add_listener("flag", listener, false).unwrap();
        registry.add_listener("flag", unbound(&log), false).unwrap();

        source.set_flag(true);
        // The pass in flight finishes on its own copy.
        assert_eq!(log.values(), vec![true, true]);

        source.set_flag(false);
        assert_eq!(log.len(), 2);
        assert!(registry.is_torn_down());
    }

    #[test]
    fn test_registry_does_not_keep_source_alive() {
        let source = Arc::new(TestSource::new());
        let registry = SubscriptionRegistry::attach(&source);
        assert_eq!(Arc::strong_count(&source), 1);

        drop(source);
        assert!(!registry.is_live());
        assert!(registry.source().is_none());
    }

    #[test]
    fn test_dropping_source_drops_listeners() {
        let source = Arc::new(TestSource::new());
        let registry = SubscriptionRegistry::attach(&source);
        let held = Arc::new(());

        let captured = Arc::clone(&held);
        let listener = Arc::new(Listener::unbound(flag, move |_| {
            let _ = &captured;
        }));
        registry.add_listener("flag", listener, false).unwrap();
        assert_eq!(Arc::strong_count(&held), 2);

        drop(source);
        assert_eq!(Arc::strong_count(&held), 1);
        assert!(registry.is_torn_down());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_replaced_handler_releases_registry() {
        let source = Arc::new(TestSource::new());
        let first = SubscriptionRegistry::attach(&source);
        let log = ValueLog::new();
        first.add_listener("flag", unbound(&log), false).unwrap();

        let second = SubscriptionRegistry::attach(&source);
        assert!(first.is_torn_down());
        assert!(first.is_empty());
        assert!(second.is_live());

        // Already released; the second registry's handler stays in place.
        assert!(!first.teardown());
        assert!(source.is_attached());
    }

    /// Reads the registry back from inside detach.
    #[derive(Default)]
    struct InspectingSource {
        signal: FieldSignal,
        registry: Mutex<Weak<SubscriptionRegistry<InspectingSource>>>,
        seen_on_detach: Mutex<Option<usize>>,
    }

    impl NotifySource for InspectingSource {
        fn attach_field_handler(&self, handler: fieldwatch_core::FieldChangeHandler) {
            self.signal.attach(handler);
        }

        fn detach_field_handler(&self) {
            self.signal.detach();
            let registry = self.registry.lock().unwrap().upgrade();
            if let Some(registry) = registry {
                *self.seen_on_detach.lock().unwrap() = Some(registry.len());
            }
        }
    }

    #[test]
    fn test_source_may_use_registry_while_detaching() {
        let source = Arc::new(InspectingSource::default());
        let registry = SubscriptionRegistry::attach(&source);
        *source.registry.lock().unwrap() = Arc::downgrade(&registry);

        assert!(registry.teardown());
        assert_eq!(*source.seen_on_detach.lock().unwrap(), Some(0));
    }
}
