//! Testing utilities for fieldwatch.
//!
//! This module provides small, ready-made participants for tests:
//!
//! - [`TestSource`]: a notifying source with three fields that counts how
//!   often handlers are attached and detached
//! - [`ValueLog`]: a shared, cloneable log of delivered values
//! - [`RecordingOwner`]: an owner object whose method records values, for
//!   bound listeners

use crate::signal::{FieldSignal, Observed};
use fieldwatch_core::{Field, FieldChangeHandler, FieldSet, NotifySource};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

// ============================================================================
// Test Source
// ============================================================================

/// A notifying source with `flag`, `count` and `label` fields.
///
/// Every setter stores the value and then emits the field's name.
///
/// # Example
///
/// ```rust,ignore
/// let source = Arc::new(TestSource::new());
/// let registry = SubscriptionRegistry::attach(&source);
/// source.set_flag(true); // dispatches "flag"
/// ```
#[derive(Debug, Default)]
pub struct TestSource {
    signal: FieldSignal,
    flag: Observed<bool>,
    count: Observed<i64>,
    label: Observed<String>,
    attaches: AtomicUsize,
    detaches: AtomicUsize,
}

impl FieldSet for TestSource {
    const FIELDS: &'static [&'static str] = &["flag", "count", "label"];
}

impl TestSource {
    /// Selector for `flag`.
    pub const FLAG: Field<TestSource, bool> = Field::declared(
        "flag",
        <TestSource as FieldSet>::FIELDS,
        |source: &TestSource| source.flag(),
    );
    /// Selector for `count`.
    pub const COUNT: Field<TestSource, i64> = Field::declared(
        "count",
        <TestSource as FieldSet>::FIELDS,
        |source: &TestSource| source.count(),
    );
    /// Selector for `label`.
    pub const LABEL: Field<TestSource, String> = Field::declared(
        "label",
        <TestSource as FieldSet>::FIELDS,
        |source: &TestSource| source.label(),
    );

    /// Create a source with default field values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current `flag`.
    pub fn flag(&self) -> bool {
        self.flag.get()
    }

    /// Current `count`.
    pub fn count(&self) -> i64 {
        self.count.get()
    }

    /// Current `label`.
    pub fn label(&self) -> String {
        self.label.get()
    }

    /// Set `flag` and emit.
    pub fn set_flag(&self, value: bool) {
        self.flag.set(value);
        self.emit("flag");
    }

    /// Set `count` and emit.
    pub fn set_count(&self, value: i64) {
        self.count.set(value);
        self.emit("count");
    }

    /// Set `label` and emit.
    pub fn set_label(&self, value: impl Into<String>) {
        self.label.set(value.into());
        self.emit("label");
    }

    /// Emit a change of `field` without touching any value.
    pub fn emit(&self, field: &str) -> bool {
        self.signal.emit(field)
    }

    /// Whether a handler is attached.
    pub fn is_attached(&self) -> bool {
        self.signal.is_attached()
    }

    /// How many times a handler was attached.
    pub fn attach_count(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }

    /// How many times the handler was detached.
    pub fn detach_count(&self) -> usize {
        self.detaches.load(Ordering::SeqCst)
    }
}

impl NotifySource for TestSource {
    fn attach_field_handler(&self, handler: FieldChangeHandler) {
        self.attaches.fetch_add(1, Ordering::SeqCst);
        self.signal.attach(handler);
    }

    fn detach_field_handler(&self) {
        self.detaches.fetch_add(1, Ordering::SeqCst);
        self.signal.detach();
    }
}

// ============================================================================
// Value Log
// ============================================================================

/// A shared log of values, cloneable across threads and closures.
pub struct ValueLog<V> {
    values: Arc<Mutex<Vec<V>>>,
}

impl<V> ValueLog<V> {
    /// Create an empty log.
    pub fn new() -> Self {
        Self {
            values: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append a value.
    pub fn push(&self, value: V) {
        self.lock().push(value);
    }

    /// Number of recorded values.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget all recorded values.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<V>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Send + 'static> ValueLog<V> {
    /// A closure that appends to this log.
    pub fn sink(&self) -> impl Fn(V) + Send + Sync + use<V> {
        let values = Arc::clone(&self.values);
        move |value| values.lock().unwrap_or_else(PoisonError::into_inner).push(value)
    }
}

impl<V: Clone> ValueLog<V> {
    /// A copy of the recorded values.
    pub fn values(&self) -> Vec<V> {
        self.lock().clone()
    }
}

impl<V> Default for ValueLog<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for ValueLog<V> {
    fn clone(&self) -> Self {
        Self {
            values: Arc::clone(&self.values),
        }
    }
}

// ============================================================================
// Recording Owner
// ============================================================================

/// An owner object for bound listeners that records every value it receives.
///
/// # Example
///
/// ```rust,ignore
/// let owner = Arc::new(RecordingOwner::new());
/// let listener = Listener::bound(&owner, |s: &TestSource| s.flag(), RecordingOwner::record);
/// ```
pub struct RecordingOwner<V> {
    log: ValueLog<V>,
}

impl<V> RecordingOwner<V> {
    /// Create an owner with an empty log.
    pub fn new() -> Self {
        Self {
            log: ValueLog::new(),
        }
    }

    /// Record `value`. Meant to be used as the bound callback.
    pub fn record(&self, value: V) {
        self.log.push(value);
    }

    /// Number of values received.
    pub fn count(&self) -> usize {
        self.log.len()
    }

    /// A handle on the log that outlives the owner.
    pub fn log(&self) -> ValueLog<V> {
        self.log.clone()
    }
}

impl<V: Clone> RecordingOwner<V> {
    /// A copy of the received values.
    pub fn values(&self) -> Vec<V> {
        self.log.values()
    }
}

impl<V> Default for RecordingOwner<V> {
    fn default() -> Self {
        Self::new()
    }
}
