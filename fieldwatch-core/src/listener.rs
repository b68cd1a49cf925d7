//! # Listeners
//!
//! A [`Listener`] is one subscription to one field of one source. It comes in
//! two variants:
//!
//! - **Bound**: tied to an owner object held through a `Weak`. Once the owner
//!   is dropped the listener is *dead*: it never fires again and the
//!   registry purges it the next time it dispatches.
//! - **Unbound**: no owner. It fires until it is removed explicitly.
//!
//! Listeners are immutable once built and shared as `Arc<Listener<S>>`, so a
//! registry can snapshot its listener lists cheaply.

use crate::{
    callback::{Callback, Owner, Target},
    error::{Result, WatchError},
    source::ObjectId,
};
use std::{
    fmt,
    sync::{Arc, Weak},
};

/// One subscription to a field of a source of type `S`.
pub enum Listener<S: ?Sized> {
    /// Tied to the lifetime of an owner object.
    Bound(BoundListener<S>),
    /// Lives as long as it stays registered.
    Unbound(UnboundListener<S>),
}

/// Listener variant that holds its owner weakly.
pub struct BoundListener<S: ?Sized> {
    owner: Weak<Owner>,
    invoke: Box<dyn Fn(&Owner, &S) + Send + Sync>,
}

/// Listener variant without an owner.
pub struct UnboundListener<S: ?Sized> {
    invoke: Box<dyn Fn(&S) + Send + Sync>,
}

impl<S: ?Sized + 'static> Listener<S> {
    /// Builds a bound listener: `callback(owner, extract(source))` on every change.
    pub fn bound<O, V, E, F>(owner: &Arc<O>, extract: E, callback: F) -> Self
    where
        O: Send + Sync + 'static,
        V: 'static,
        E: Fn(&S) -> V + Send + Sync + 'static,
        F: Fn(&O, V) + Send + Sync + 'static,
    {
        let weak: Weak<O> = Arc::downgrade(owner);
        let invoke = move |erased: &Owner, source: &S| {
            if let Some(owner) = erased.downcast_ref::<O>() {
                callback(owner, extract(source));
            }
        };
        Listener::Bound(BoundListener {
            owner: weak,
            invoke: Box::new(invoke),
        })
    }

    /// Builds an unbound listener: `callback(extract(source))` on every change.
    pub fn unbound<V, E, F>(extract: E, callback: F) -> Self
    where
        V: 'static,
        E: Fn(&S) -> V + Send + Sync + 'static,
        F: Fn(V) + Send + Sync + 'static,
    {
        Listener::Unbound(UnboundListener {
            invoke: Box::new(move |source: &S| callback(extract(source))),
        })
    }

    /// Builds the listener variant matching the callback's receiver.
    ///
    /// Shared owners produce a bound listener; free functions and closures
    /// produce an unbound one.
    ///
    /// # Errors
    ///
    /// [`WatchError::UnsupportedTargetKind`] when the receiver was moved in by
    /// value, or when the shared owner is already gone.
    pub fn from_callback<V, E>(extract: E, callback: Callback<V>) -> Result<Self>
    where
        V: 'static,
        E: Fn(&S) -> V + Send + Sync + 'static,
    {
        match callback.target {
            Target::Shared { owner, invoke } => {
                if owner.strong_count() == 0 {
                    return Err(WatchError::UnsupportedTargetKind(
                        "callback owner is no longer reachable".into(),
                    ));
                }
                Ok(Listener::Bound(BoundListener {
                    owner,
                    invoke: Box::new(move |erased: &Owner, source: &S| {
                        invoke(erased, extract(source))
                    }),
                }))
            }
            Target::Value => Err(WatchError::UnsupportedTargetKind(
                "a receiver held by value cannot be weakly referenced".into(),
            )),
            Target::Captured(callback) => Ok(Listener::Unbound(UnboundListener {
                invoke: Box::new(move |source: &S| callback(extract(source))),
            })),
            Target::Function(callback) => Ok(Listener::Unbound(UnboundListener {
                invoke: Box::new(move |source: &S| callback(extract(source))),
            })),
        }
    }
}

impl<S: ?Sized> Listener<S> {
    /// True when the owner is gone, or is alive and is `candidate`.
    ///
    /// Unbound listeners never match. Passing `None` matches dead listeners only.
    pub fn is_target_or_dead(&self, candidate: Option<ObjectId>) -> bool {
        match self {
            Listener::Bound(bound) => match bound.owner.upgrade() {
                None => true,
                Some(owner) => candidate == Some(ObjectId::of(&owner)),
            },
            Listener::Unbound(_) => false,
        }
    }

    /// Delivers the current field value from `source`.
    ///
    /// A bound listener whose owner is gone is pushed onto `dead` instead of
    /// being invoked. The owner is kept alive for the duration of the call.
    pub fn dispatch(self: &Arc<Self>, source: &S, dead: &mut Vec<Arc<Self>>) {
        match &**self {
            Listener::Bound(bound) => match bound.owner.upgrade() {
                Some(owner) => (bound.invoke)(&*owner, source),
                None => dead.push(Arc::clone(self)),
            },
            Listener::Unbound(unbound) => (unbound.invoke)(source),
        }
    }

    /// Whether the listener can still fire.
    pub fn is_alive(&self) -> bool {
        match self {
            Listener::Bound(bound) => bound.owner.strong_count() > 0,
            Listener::Unbound(_) => true,
        }
    }

    /// Whether the listener is tied to an owner.
    pub fn is_bound(&self) -> bool {
        matches!(self, Listener::Bound(_))
    }

    /// Identity of the owner, while it is alive.
    pub fn owner(&self) -> Option<ObjectId> {
        match self {
            Listener::Bound(bound) => ObjectId::of_weak(&bound.owner),
            Listener::Unbound(_) => None,
        }
    }
}

impl<S: ?Sized> fmt::Debug for Listener<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Listener::Bound(bound) => f
                .debug_struct("Bound")
                .field("owner", &ObjectId::of_weak(&bound.owner))
                .finish_non_exhaustive(),
            Listener::Unbound(_) => f.debug_struct("Unbound").finish_non_exhaustive(),
        }
    }
}
