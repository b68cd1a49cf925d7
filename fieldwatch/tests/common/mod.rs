#![allow(dead_code)]

use fieldwatch::testing::{RecordingOwner, TestSource};
use fieldwatch::{Callback, Subscription, Subscriptions};
use std::sync::{
    Arc, Mutex, Weak,
    atomic::{AtomicUsize, Ordering},
};

// ============================================================================
// Test Owners
// ============================================================================

/// An owner that unsubscribes itself from `source` the first time it fires.
pub struct SelfRemovingOwner {
    pub subscriptions: Arc<Subscriptions>,
    pub source: Weak<TestSource>,
    pub calls: AtomicUsize,
}

impl SelfRemovingOwner {
    pub fn new(subscriptions: &Arc<Subscriptions>, source: &Arc<TestSource>) -> Self {
        Self {
            subscriptions: Arc::clone(subscriptions),
            source: Arc::downgrade(source),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn on_flag(&self, _flag: bool) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(source) = self.source.upgrade() {
            self.subscriptions
                .unsubscribe(&source, fieldwatch::ObjectId::from_ref(self));
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// An owner that records every value tagged with its id into a shared log.
pub struct TaggedOwner {
    pub id: usize,
    pub order: Arc<Mutex<Vec<(usize, i64)>>>,
}

impl TaggedOwner {
    pub fn on_count(&self, count: i64) {
        self.order.lock().unwrap().push((self.id, count));
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Subscribe a fresh [`RecordingOwner`] to `flag`.
pub fn record_flag(
    subscriptions: &Subscriptions,
    source: &Arc<TestSource>,
) -> (Arc<RecordingOwner<bool>>, Subscription<TestSource>) {
    let owner = Arc::new(RecordingOwner::new());
    let subscription = subscriptions
        .subscribe(
            source,
            TestSource::FLAG,
            Callback::method(&owner, RecordingOwner::record),
        )
        .unwrap();
    (owner, subscription)
}
