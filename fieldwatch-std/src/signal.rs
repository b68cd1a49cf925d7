//! Field storage and signal emission for notifying sources.
//!
//! [`FieldSignal`] is a single-handler slot implementing the source side of
//! [`NotifySource`](fieldwatch_core::NotifySource); [`Observed`] is a field
//! cell a source can store its values in. `#[derive(Observable)]` wires both
//! together, but they can be used by hand.

use fieldwatch_core::FieldChangeHandler;
use std::{
    fmt,
    sync::{Mutex, PoisonError, RwLock},
};

/// A single-handler field-change signal.
///
/// The handler is cloned out of the slot before it runs, so it may attach,
/// detach or emit again without deadlocking.
#[derive(Default)]
pub struct FieldSignal {
    handler: Mutex<Option<FieldChangeHandler>>,
}

impl FieldSignal {
    /// Create a signal with no handler attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler`, returning the one it replaces.
    pub fn attach(&self, handler: FieldChangeHandler) -> Option<FieldChangeHandler> {
        self.slot().replace(handler)
    }

    /// Remove the current handler.
    pub fn detach(&self) -> Option<FieldChangeHandler> {
        self.slot().take()
    }

    /// Whether a handler is attached.
    pub fn is_attached(&self) -> bool {
        self.slot().is_some()
    }

    /// Announce that `field` changed. Returns whether a handler ran.
    pub fn emit(&self, field: &str) -> bool {
        let handler = self.slot().clone();
        match handler {
            Some(handler) => {
                handler(field);
                true
            }
            None => false,
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<FieldChangeHandler>> {
        self.handler.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for FieldSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSignal")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Interior-mutable storage for one observable field.
#[derive(Default)]
pub struct Observed<T> {
    value: RwLock<T>,
}

impl<T> Observed<T> {
    /// Create a cell holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Store `value`, returning the previous one.
    pub fn set(&self, value: T) -> T {
        let mut guard = self.value.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, value)
    }

    /// Run `f` against the current value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.value.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Consume the cell and return its value.
    pub fn into_inner(self) -> T {
        self.value.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> Observed<T> {
    /// A copy of the current value.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }
}

impl<T: fmt::Debug> fmt::Debug for Observed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with(|value| f.debug_tuple("Observed").field(value).finish())
    }
}
