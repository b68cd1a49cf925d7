//! The subscription facade.
//!
//! [`Subscriptions`] is the public entry point: it resolves field accessors,
//! applies the receiver safety check, finds or creates the source's
//! registry and attaches a listener to it.
//!
//! # Example
//!
//! ```rust,ignore
//! let subscriptions = Subscriptions::new();
//! let source = Arc::new(Settings::default());
//! let panel = Arc::new(Panel::default());
//!
//! subscriptions.subscribe(&source, Settings::ENABLED, Callback::method(&panel, Panel::on_enabled))?;
//! source.set_enabled(true); // Panel::on_enabled(&panel, true)
//! ```

use fieldwatch_core::{
    Callback, FieldAccessor, FieldResolver, IdentifierResolver, Listener, NotifySource, ObjectId,
    ReceiverKind, Result, WatchError,
};
use fieldwatch_std::{Priming, RegistryCache, SubscriptionRegistry};
use std::{
    fmt,
    sync::{Arc, Weak},
};

/// How many times a subscription retries when it races a teardown.
const ATTACH_ATTEMPTS: usize = 3;

/// Per-call subscription settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Invoke the new listener once with the current value.
    pub deliver_initial_value: bool,
    /// Refuse callbacks whose receiver cannot be tracked.
    pub checked: bool,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscribeOptions {
    /// Checked subscription without initial delivery.
    pub fn new() -> Self {
        Self {
            deliver_initial_value: false,
            checked: true,
        }
    }

    /// Set initial delivery.
    pub fn with_initial_value(mut self, deliver: bool) -> Self {
        self.deliver_initial_value = deliver;
        self
    }

    /// Set the receiver safety check.
    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }
}

/// Handle on one attached listener.
///
/// Dropping the handle does not unsubscribe, and holding it does not keep
/// the listener (or anything its callback captured) alive.
pub struct Subscription<S: NotifySource> {
    field: String,
    listener: Weak<Listener<S>>,
    registry: Weak<SubscriptionRegistry<S>>,
    bound: bool,
    priming: Priming,
}

impl<S: NotifySource> Subscription<S> {
    /// The resolved field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Outcome of the initial delivery.
    pub fn priming(&self) -> Priming {
        self.priming
    }

    /// Whether the listener is tied to an owner.
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Whether the listener can still fire: its registry is live and its
    /// owner, if any, is alive.
    pub fn is_active(&self) -> bool {
        self.listener
            .upgrade()
            .is_some_and(|listener| listener.is_alive())
            && self
                .registry
                .upgrade()
                .is_some_and(|registry| registry.is_live())
    }

    /// Remove this listener. Returns whether it was still registered.
    pub fn unsubscribe(&self) -> bool {
        let Some(listener) = self.listener.upgrade() else {
            return false;
        };
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.remove_listener(&self.field, &listener))
    }
}

impl<S: NotifySource> fmt::Debug for Subscription<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("field", &self.field)
            .field("bound", &self.bound)
            .field("priming", &self.priming)
            .finish()
    }
}

/// Builder for [`Subscriptions`].
pub struct SubscriptionsBuilder {
    resolver: Arc<dyn FieldResolver>,
    sweep_on_create: bool,
}

impl SubscriptionsBuilder {
    /// Defaults: [`IdentifierResolver`], sweeping on create.
    pub fn new() -> Self {
        Self {
            resolver: Arc::new(IdentifierResolver),
            sweep_on_create: true,
        }
    }

    /// Use `resolver` to turn accessor expressions into field names.
    pub fn with_resolver(mut self, resolver: impl FieldResolver) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Set whether dead cache entries are swept when registries are created.
    pub fn with_sweep_on_create(mut self, sweep: bool) -> Self {
        self.sweep_on_create = sweep;
        self
    }

    /// Build the facade.
    pub fn build(self) -> Subscriptions {
        Subscriptions {
            cache: RegistryCache::new().with_sweep_on_create(self.sweep_on_create),
            resolver: self.resolver,
        }
    }
}

impl Default for SubscriptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscribe to field changes of notifying sources.
///
/// Owns a [`RegistryCache`]; dropping the facade tears every registry down.
pub struct Subscriptions {
    cache: RegistryCache,
    resolver: Arc<dyn FieldResolver>,
}

impl Subscriptions {
    /// A facade with default settings.
    pub fn new() -> Self {
        SubscriptionsBuilder::new().build()
    }

    /// Start configuring a facade.
    pub fn builder() -> SubscriptionsBuilder {
        SubscriptionsBuilder::new()
    }

    /// Subscribe `callback` to the field selected by `accessor`.
    ///
    /// Checked and without initial delivery; see [`subscribe_with`](Self::subscribe_with).
    pub fn subscribe<S, A>(
        &self,
        source: &Arc<S>,
        accessor: A,
        callback: Callback<A::Value>,
    ) -> Result<Subscription<S>>
    where
        S: NotifySource,
        A: FieldAccessor<S>,
    {
        self.subscribe_with(source, accessor, callback, SubscribeOptions::new())
    }

    /// Subscribe with explicit options.
    ///
    /// # Errors
    ///
    /// - [`WatchError::InvalidAccessorExpression`] if the accessor does not
    ///   resolve to one field
    /// - [`WatchError::UnsupportedCallbackTarget`] if `options.checked` and
    ///   the callback is a closure with captured state
    /// - [`WatchError::UnsupportedTargetKind`] if the callback's receiver is
    ///   held by value
    ///
    /// Nothing is registered when an error is returned.
    pub fn subscribe_with<S, A>(
        &self,
        source: &Arc<S>,
        accessor: A,
        callback: Callback<A::Value>,
        options: SubscribeOptions,
    ) -> Result<Subscription<S>>
    where
        S: NotifySource,
        A: FieldAccessor<S>,
    {
        let field = self
            .resolver
            .resolve(accessor.expression(), accessor.declared_fields())?;

        if options.checked && callback.receiver_kind() == ReceiverKind::Captured {
            #[cfg(feature = "tracing")]
            tracing::debug!(field = %field, "refusing closure callback without an owner");

            return Err(WatchError::UnsupportedCallbackTarget(format!(
                "callback for `{field}` captures state with no owner to track; \
                 use a method callback or subscribe_unsafe"
            )));
        }

        let listener = Arc::new(Listener::from_callback(
            move |source: &S| accessor.read(source),
            callback,
        )?);

        for _ in 0..ATTACH_ATTEMPTS {
            let registry = self.cache.get_or_create(source);
            match registry.add_listener(
                &field,
                Arc::clone(&listener),
                options.deliver_initial_value,
            ) {
                Ok(priming) => {
                    return Ok(Subscription {
                        field,
                        listener: Arc::downgrade(&listener),
                        registry: Arc::downgrade(&registry),
                        bound: listener.is_bound(),
                        priming,
                    });
                }
                // Torn down between lookup and insertion; the cache hands out
                // a fresh registry on the next attempt.
                Err(WatchError::RegistryClosed) => continue,
                Err(err) => return Err(err),
            }
        }
        Err(WatchError::RegistryClosed)
    }

    /// Subscribe without the receiver safety check.
    ///
    /// Closures with captured state are accepted and become unbound
    /// listeners: they fire until removed explicitly or until the source's
    /// registry is torn down.
    pub fn subscribe_unsafe<S, A>(
        &self,
        source: &Arc<S>,
        accessor: A,
        callback: Callback<A::Value>,
        options: SubscribeOptions,
    ) -> Result<Subscription<S>>
    where
        S: NotifySource,
        A: FieldAccessor<S>,
    {
        self.subscribe_with(source, accessor, callback, options.with_checked(false))
    }

    /// Drop every subscription on `source` and detach from it.
    ///
    /// Returns whether the source had a registry.
    pub fn unsubscribe_all<S: NotifySource>(&self, source: &Arc<S>) -> bool {
        self.cache.remove(source)
    }

    /// Drop every subscription on `source` owned by `target`.
    ///
    /// Dead listeners found along the way are dropped too. Returns how many
    /// listeners were removed.
    pub fn unsubscribe<S: NotifySource>(
        &self,
        source: &Arc<S>,
        target: impl Into<ObjectId>,
    ) -> usize {
        self.cache
            .try_get(source)
            .map_or(0, |registry| registry.remove_all_for(Some(target.into())))
    }

    /// The registry currently serving `source`, if any.
    pub fn registry<S: NotifySource>(
        &self,
        source: &Arc<S>,
    ) -> Option<Arc<SubscriptionRegistry<S>>> {
        self.cache.try_get(source)
    }

    /// Drop cache entries whose source is gone.
    pub fn purge(&self) -> usize {
        self.cache.purge()
    }

    /// The underlying registry store.
    pub fn cache(&self) -> &RegistryCache {
        &self.cache
    }
}

impl Default for Subscriptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriptions")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
