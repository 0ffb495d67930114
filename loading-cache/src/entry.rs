//! The per-key [`Entry`] slot and its tri-state value cell.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

/// The three states a cache entry's value pointer can be in.
///
/// `Live` holds a real value. `Tombstoned` means the entry has been
/// logically deleted (by `delete`, by expiration, or because it was never
/// populated) but is still visible in the read view pending physical
/// removal. `Expunged` is a stronger marker meaning "deleted, and not
/// present in the dirty side" — a writer that observes it must reinsert the
/// entry into the dirty side before storing a new value (see
/// [`crate::cache::Cache::put`]).
#[derive(Debug)]
pub(crate) enum ValueState<V> {
    Live(Arc<V>),
    Tombstoned,
    Expunged,
}

/// A single cache slot: a tri-state value cell plus last-access and
/// last-write timestamps.
///
/// `Entry` is always shared behind an `Arc` so the same slot can be
/// reachable from both the read view and the dirty side at once (data model
/// invariant 1).
#[derive(Debug)]
pub(crate) struct Entry<V> {
    value: ArcSwap<ValueState<V>>,
    /// Nanoseconds since the cache's `TimeProvider` epoch. Updated with
    /// relaxed ordering on every hit: last-access bookkeeping is a racy
    /// hint, not a linearization point.
    access_time: AtomicU64,
    write_time: AtomicU64,
}

impl<V> Entry<V> {
    pub(crate) fn new_live(value: Arc<V>, now_nanos: u64) -> Arc<Self> {
        Arc::new(Self {
            value: ArcSwap::from_pointee(ValueState::Live(value)),
            access_time: AtomicU64::new(now_nanos),
            write_time: AtomicU64::new(now_nanos),
        })
    }

    pub(crate) fn access_time_nanos(&self) -> u64 {
        self.access_time.load(Ordering::Relaxed)
    }

    pub(crate) fn write_time_nanos(&self) -> u64 {
        self.write_time.load(Ordering::Relaxed)
    }

    pub(crate) fn touch_access(&self, now_nanos: u64) {
        self.access_time.store(now_nanos, Ordering::Relaxed);
    }

    /// Read the current value state.
    pub(crate) fn load(&self) -> arc_swap::Guard<Arc<ValueState<V>>> {
        self.value.load()
    }

    /// Mark the entry as tombstoned, unconditionally (used by `delete` and
    /// by expiration sweeps). Idempotent: tombstoning an already-tombstoned
    /// or already-expunged entry is a no-op in effect.
    pub(crate) fn tombstone(&self) {
        loop {
            let current = self.value.load();
            if matches!(**current, ValueState::Tombstoned | ValueState::Expunged) {
                return;
            }
            let prev = self.value.compare_and_swap(&*current, Arc::new(ValueState::Tombstoned));
            if Arc::ptr_eq(&*prev, &*current) {
                return;
            }
        }
    }

    /// Lock-free attempt to store `value` as the new live value. Fails (and
    /// leaves the entry untouched) if the entry is currently expunged —
    /// callers must fall back to the locked slow path in that case.
    pub(crate) fn try_store_live(&self, value: Arc<V>, now_nanos: u64) -> bool {
        loop {
            let current = self.value.load();
            if matches!(**current, ValueState::Expunged) {
                return false;
            }
            let new = Arc::new(ValueState::Live(Arc::clone(&value)));
            let prev = self.value.compare_and_swap(&*current, new);
            if Arc::ptr_eq(&*prev, &*current) {
                self.write_time.store(now_nanos, Ordering::Relaxed);
                self.access_time.store(now_nanos, Ordering::Relaxed);
                return true;
            }
        }
    }

    /// Unconditionally store `value` as live. Only safe to call while
    /// holding the cache's write lock, e.g. after clearing an expunged
    /// marker: nothing else can be concurrently transitioning out of
    /// `Expunged` without the lock.
    pub(crate) fn store_live_locked(&self, value: Arc<V>, now_nanos: u64) {
        self.value.store(Arc::new(ValueState::Live(value)));
        self.write_time.store(now_nanos, Ordering::Relaxed);
        self.access_time.store(now_nanos, Ordering::Relaxed);
    }

    /// Attempt to transition a tombstoned entry to expunged. Returns `true`
    /// if the entry ends up expunged (either it already was, or this call
    /// made it so) — in which case the caller (building a new dirty map)
    /// must NOT copy the entry into the dirty side. Returns `false` if a
    /// concurrent writer raced in a live value first, in which case the
    /// entry must be copied into the dirty side as-is.
    pub(crate) fn try_expunge_if_tombstoned(&self) -> bool {
        loop {
            let current = self.value.load();
            match &**current {
                ValueState::Expunged => return true,
                ValueState::Live(_) => return false,
                ValueState::Tombstoned => {
                    let prev = self.value.compare_and_swap(&*current, Arc::new(ValueState::Expunged));
                    if Arc::ptr_eq(&*prev, &*current) {
                        return true;
                    }
                    // Lost the race (a fast-path put slipped in a live value); reload and retry.
                }
            }
        }
    }
}
