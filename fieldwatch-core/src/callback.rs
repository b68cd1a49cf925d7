//! # Callbacks and their receivers
//!
//! A [`Callback`] is the function a subscriber wants run when a field
//! changes, together with a description of *who* receives the call. The
//! receiver decides which kind of listener can carry the callback:
//!
//! | constructor              | receiver                  | listener |
//! |--------------------------|---------------------------|----------|
//! | [`Callback::method`]     | shared owner (`Arc<O>`)   | bound, dies with the owner |
//! | [`Callback::function`]   | none                      | unbound |
//! | [`Callback::closure`]    | captured closure state    | unbound, refused by checked subscribe |
//! | [`Callback::with_value`] | owner moved in by value   | none: cannot be weakly referenced |

use crate::source::ObjectId;
use std::{
    any::Any,
    fmt,
    sync::{Arc, Weak},
};

/// Type-erased owner of a bound callback.
pub(crate) type Owner = dyn Any + Send + Sync;

/// Invokes a callback on a type-erased owner.
pub(crate) type OwnerFn<V> = Box<dyn Fn(&Owner, V) + Send + Sync>;

/// What a callback is invoked on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReceiverKind {
    /// A shared object referenced through an `Arc`; held weakly.
    Shared,
    /// An object moved into the callback by value.
    Value,
    /// State captured by a closure, with no addressable owner.
    Captured,
    /// A free function.
    None,
}

pub(crate) enum Target<V> {
    Shared { owner: Weak<Owner>, invoke: OwnerFn<V> },
    Value,
    Captured(Box<dyn Fn(V) + Send + Sync>),
    Function(fn(V)),
}

/// A field-change callback and its receiver.
pub struct Callback<V> {
    pub(crate) target: Target<V>,
}

impl<V: 'static> Callback<V> {
    /// A method-style callback on a shared owner.
    ///
    /// Only a weak reference to `owner` is kept; once the owner is dropped
    /// the callback stops firing.
    pub fn method<O, F>(owner: &Arc<O>, callback: F) -> Self
    where
        O: Send + Sync + 'static,
        F: Fn(&O, V) + Send + Sync + 'static,
    {
        let weak: Weak<O> = Arc::downgrade(owner);
        let weak: Weak<Owner> = weak;
        let invoke = move |erased: &Owner, value: V| {
            if let Some(owner) = erased.downcast_ref::<O>() {
                callback(owner, value);
            }
        };
        Self {
            target: Target::Shared {
                owner: weak,
                invoke: Box::new(invoke),
            },
        }
    }

    /// A callback whose receiver is moved in by value.
    ///
    /// A by-value receiver has no shared identity, so no listener can be
    /// bound to it. Building a listener from this callback fails with
    /// [`WatchError::UnsupportedTargetKind`](crate::WatchError::UnsupportedTargetKind).
    pub fn with_value<O, F>(receiver: O, callback: F) -> Self
    where
        O: Send + Sync + 'static,
        F: Fn(&O, V) + Send + Sync + 'static,
    {
        // No listener can ever be built from it.
        drop((receiver, callback));
        Self {
            target: Target::Value,
        }
    }

    /// A closure carrying its own captured state.
    pub fn closure<F>(callback: F) -> Self
    where
        F: Fn(V) + Send + Sync + 'static,
    {
        Self {
            target: Target::Captured(Box::new(callback)),
        }
    }

    /// A free function with no receiver.
    pub fn function(callback: fn(V)) -> Self {
        Self {
            target: Target::Function(callback),
        }
    }
}

impl<V> Callback<V> {
    /// The kind of receiver this callback is invoked on.
    pub fn receiver_kind(&self) -> ReceiverKind {
        match self.target {
            Target::Shared { .. } => ReceiverKind::Shared,
            Target::Value => ReceiverKind::Value,
            Target::Captured(_) => ReceiverKind::Captured,
            Target::Function(_) => ReceiverKind::None,
        }
    }

    /// Identity of the shared owner, while it is alive.
    pub fn owner(&self) -> Option<ObjectId> {
        match &self.target {
            Target::Shared { owner, .. } => ObjectId::of_weak(owner),
            _ => None,
        }
    }
}

impl<V> fmt::Debug for Callback<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("receiver", &self.receiver_kind())
            .field("owner", &self.owner())
            .finish()
    }
}
