//! # Notifying sources
//!
//! A source is any shared object that can announce "field `F` changed" to a
//! single handler. fieldwatch never owns sources: it keeps `Weak` references
//! and identifies them by the address of their `Arc` allocation.

use std::{
    any::TypeId,
    fmt,
    sync::{Arc, Weak},
};

/// Handler invoked by a source with the name of the field that changed.
pub type FieldChangeHandler = Arc<dyn Fn(&str) + Send + Sync + 'static>;

/// An object capable of emitting field-change signals.
///
/// A source holds at most one handler. Attaching replaces the previous
/// handler and detaching clears it. Implementations must invoke the handler
/// without holding any lock the handler might need, since subscribers are
/// free to touch the source again from inside their callbacks.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `NotifySource`",
    label = "missing `NotifySource` implementation",
    note = "embed a `FieldSignal` and forward to it, or use `#[derive(Observable)]`"
)]
pub trait NotifySource: Send + Sync + 'static {
    /// Installs `handler` as the receiver of this source's field-change signals.
    fn attach_field_handler(&self, handler: FieldChangeHandler);

    /// Removes the currently installed handler, if any.
    fn detach_field_handler(&self);
}

/// Identity of a shared object, derived from its allocation address.
///
/// Two `ObjectId`s are equal exactly when they were taken from the same live
/// allocation. Inside a method an object can name itself with
/// [`ObjectId::from_ref`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Identity of the value behind `arc`.
    pub fn of<T: ?Sized>(arc: &Arc<T>) -> Self {
        Self(Arc::as_ptr(arc) as *const () as usize)
    }

    /// Identity of the value behind `weak`, if it is still alive.
    pub fn of_weak<T: ?Sized>(weak: &Weak<T>) -> Option<Self> {
        weak.upgrade().map(|arc| Self::of(&arc))
    }

    /// Identity of a value reached through a plain reference.
    ///
    /// Matches [`ObjectId::of`] when `value` lives inside an `Arc`.
    pub fn from_ref<T: ?Sized>(value: &T) -> Self {
        Self(value as *const T as *const () as usize)
    }
}

impl<T: ?Sized> From<&Arc<T>> for ObjectId {
    fn from(arc: &Arc<T>) -> Self {
        ObjectId::of(arc)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({:#x})", self.0)
    }
}

/// Key identifying a source inside a registry store.
///
/// Combines the source's concrete type with its allocation address so that
/// lookups never confuse two source types.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceKey {
    type_id: TypeId,
    object: ObjectId,
}

impl SourceKey {
    /// Key for the source behind `source`.
    pub fn of<S: 'static>(source: &Arc<S>) -> Self {
        Self {
            type_id: TypeId::of::<S>(),
            object: ObjectId::of(source),
        }
    }

    /// The source's object identity.
    pub fn object(&self) -> ObjectId {
        self.object
    }
}

impl fmt::Debug for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceKey")
            .field("object", &self.object)
            .finish_non_exhaustive()
    }
}
