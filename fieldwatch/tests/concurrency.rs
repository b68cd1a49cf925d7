//! Multi-threaded tests.

use fieldwatch::testing::{RecordingOwner, TestSource, ValueLog};
use fieldwatch::{Callback, RegistryCache, SubscribeOptions, Subscriptions, WatchError};
use lazy_static::lazy_static;
use std::sync::{
    Arc, Barrier,
    atomic::{AtomicBool, Ordering},
};
use std::thread;

lazy_static! {
    static ref SUBSCRIPTIONS: Subscriptions = Subscriptions::new();
}

#[test]
fn test_concurrent_first_lookup_builds_one_registry() {
    const THREADS: usize = 12;

    let cache = Arc::new(RegistryCache::new());
    let source = Arc::new(TestSource::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let source = Arc::clone(&source);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.get_or_create(&source)
            })
        })
        .collect();

    let registries: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(registries.iter().all(|r| Arc::ptr_eq(r, &registries[0])));
    assert_eq!(source.attach_count(), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_concurrent_subscribers_all_attach() {
    const THREADS: usize = 8;

    let source = Arc::new(TestSource::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let source = Arc::clone(&source);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let owner = Arc::new(RecordingOwner::new());
                barrier.wait();
                SUBSCRIPTIONS
                    .subscribe(
                        &source,
                        TestSource::COUNT,
                        Callback::method(&owner, RecordingOwner::record),
                    )
                    .unwrap();
                owner
            })
        })
        .collect();

    let owners: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    source.set_count(9);

    assert!(owners.iter().all(|owner| owner.values() == vec![9]));
    let registry = SUBSCRIPTIONS.registry(&source).unwrap();
    assert_eq!(registry.listener_count("count"), THREADS);
    assert!(SUBSCRIPTIONS.unsubscribe_all(&source));
}

#[test]
fn test_signals_from_many_threads() {
    const THREADS: usize = 4;
    const SIGNALS: usize = 50;

    let subscriptions = Subscriptions::new();
    let source = Arc::new(TestSource::new());
    let log = ValueLog::new();
    subscriptions
        .subscribe_unsafe(
            &source,
            TestSource::COUNT,
            Callback::closure(log.sink()),
            SubscribeOptions::new(),
        )
        .unwrap();

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for n in 0..SIGNALS {
                    source.set_count(n as i64);
                }
            });
        }
    });

    assert_eq!(log.len(), THREADS * SIGNALS);
}

#[test]
fn test_registration_churn_during_dispatch() {
    const CHURNERS: usize = 3;
    const ROUNDS: usize = 500;

    let subscriptions = Subscriptions::new();
    let source = Arc::new(TestSource::new());
    let keeper = Arc::new(RecordingOwner::new());
    let done = AtomicBool::new(false);
    let barrier = Barrier::new(CHURNERS + 2);

    let (subscriptions_ref, source_ref, done_ref, barrier_ref) =
        (&subscriptions, &source, &done, &barrier);

    thread::scope(|scope| {
        let churners: Vec<_> = (0..CHURNERS)
            .map(|worker| {
                scope.spawn(move || {
                    barrier_ref.wait();
                    for round in 0..ROUNDS {
                        let owner = Arc::new(RecordingOwner::<i64>::new());
                        let subscription = match subscriptions_ref.subscribe(
                            source_ref,
                            TestSource::COUNT,
                            Callback::method(&owner, RecordingOwner::record),
                        ) {
                            Ok(subscription) => subscription,
                            // Lost every attempt to a concurrent unsubscribe_all.
                            Err(WatchError::RegistryClosed) => continue,
                            Err(err) => panic!("unexpected error: {err}"),
                        };
                        match (worker + round) % 3 {
                            0 => {
                                subscription.unsubscribe();
                            }
                            1 => {
                                subscriptions_ref.unsubscribe(source_ref, &owner);
                            }
                            // Left to die with its owner.
                            _ => {}
                        }
                    }
                })
            })
            .collect();

        scope.spawn(move || {
            barrier_ref.wait();
            let mut count = 0;
            while !done_ref.load(Ordering::SeqCst) {
                count += 1;
                source_ref.set_count(count);
            }
        });

        barrier_ref.wait();
        for _ in 0..ROUNDS / 10 {
            subscriptions_ref.unsubscribe_all(source_ref);
            thread::yield_now();
        }

        for churner in churners {
            churner.join().unwrap();
        }
        done_ref.store(true, Ordering::SeqCst);
    });

    subscriptions
        .subscribe(
            &source,
            TestSource::COUNT,
            Callback::method(&keeper, RecordingOwner::record),
        )
        .unwrap();
    source.set_count(-1);

    let registry = subscriptions.registry(&source).unwrap();
    assert_eq!(registry.listener_count("count"), 1);
    assert_eq!(registry.len(), 1);
    assert_eq!(keeper.values(), vec![-1]);
}
