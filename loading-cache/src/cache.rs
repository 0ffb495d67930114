//! [`Cache`]: the read-view/dirty-side loading cache.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use concurrency_time::{SystemProvider, Time, TimeProvider};
use observability_deps::tracing::debug;
use parking_lot::Mutex;

use crate::entry::{Entry, ValueState};
use crate::error::CacheError;
use crate::loader::Loader;
use crate::read_view::ReadView;

/// The mutex-protected side of the cache: entries not yet promoted into the
/// read view, plus the miss counter that drives promotion.
#[derive(Debug)]
struct Dirty<K, V> {
    map: Option<HashMap<K, Arc<Entry<V>>>>,
    misses: usize,
}

impl<K, V> Dirty<K, V> {
    fn new() -> Self {
        Self {
            map: None,
            misses: 0,
        }
    }
}

/// A concurrent loading cache with access-based and write-based TTL
/// expiration.
///
/// Reads that hit the read view never block. Reads that miss, and all
/// writes, serialize on an internal mutex that also guards the dirty side
/// and (for `get`) the loader invocation — giving single-flight semantics
/// per cache across all keys. See `DESIGN.md` for why this global
/// serialization, rather than a per-key lock, is the implementation chosen
/// here.
pub struct Cache<L>
where
    L: Loader,
{
    read: ArcSwap<ReadView<L::Key, L::Value>>,
    dirty: Mutex<Dirty<L::Key, L::Value>>,
    loader: L,
    access_ttl: Option<Duration>,
    write_ttl: Option<Duration>,
    clock: Arc<dyn TimeProvider>,
}

impl<L> Debug for Cache<L>
where
    L: Loader,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("access_ttl", &self.access_ttl)
            .field("write_ttl", &self.write_ttl)
            .finish_non_exhaustive()
    }
}

impl<L> Cache<L>
where
    L: Loader,
    L::Key: Clone + Eq + Hash + Debug,
    L::Value: Clone,
{
    /// Start building a cache around `loader`. Both TTLs default to
    /// disabled; see [`CacheBuilder`].
    pub fn builder(loader: L) -> CacheBuilder<L> {
        CacheBuilder::new(loader)
    }

    fn new(
        loader: L,
        access_ttl: Option<Duration>,
        write_ttl: Option<Duration>,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            read: ArcSwap::from_pointee(ReadView::empty()),
            dirty: Mutex::new(Dirty::new()),
            loader,
            access_ttl,
            write_ttl,
            clock,
        }
    }

    /// Look up `key` without ever invoking the loader.
    ///
    /// Consults the read view lock-free first; only falls through to the
    /// dirty side (behind the cache mutex) when the read view is known to
    /// be incomplete (`amended`).
    pub fn get_if_present(&self, key: &L::Key) -> Option<L::Value> {
        {
            let read = self.read.load();
            if let Some(entry) = read.get(key) {
                return self.observe(entry);
            }
            if !read.amended {
                return None;
            }
        }

        let mut dirty = self.dirty.lock();

        // Double-checked: the key may have been promoted into the read view
        // between the lock-free check above and acquiring the lock.
        if let Some(entry) = self.read.load().get(key) {
            return self.observe(entry);
        }

        let found = dirty.map.as_ref().and_then(|m| m.get(key)).cloned();
        self.record_miss_locked(&mut dirty);
        drop(dirty);

        found.and_then(|entry| self.observe(&entry))
    }

    /// Look up `key`, invoking the loader on a miss or expiration.
    ///
    /// The loader call is serialized with every other `get`/`put`/`delete`
    /// on this cache: it runs with the write lock held.
    pub fn get(&self, key: &L::Key) -> Result<L::Value, CacheError<L::Error>> {
        if let Some(value) = self.get_if_present(key) {
            return Ok(value);
        }

        let mut dirty = self.dirty.lock();
        let now = self.clock.now();

        if let Some(entry) = self.read.load().get(key) {
            if let Some(value) = self.observe_locked(entry, now) {
                return Ok(value);
            }
            return self.load_and_store_locked(&mut dirty, key, now);
        }

        if let Some(entry) = dirty.map.as_ref().and_then(|m| m.get(key)).cloned() {
            self.record_miss_locked(&mut dirty);
            if let Some(value) = self.observe_locked(&entry, now) {
                return Ok(value);
            }
            return self.load_and_store_locked(&mut dirty, key, now);
        }

        self.record_miss_locked(&mut dirty);
        self.load_and_store_locked(&mut dirty, key, now)
    }

    /// Insert or overwrite `key`.
    ///
    /// Tries a lock-free compare-and-swap into an existing read-view entry
    /// first; only takes the write lock when the entry is absent, lives
    /// only in the dirty side, or was expunged.
    pub fn put(&self, key: L::Key, value: L::Value) {
        let value = Arc::new(value);
        let now = self.clock.now();

        if let Some(entry) = self.read.load().get(&key) {
            if entry.try_store_live(Arc::clone(&value), now.as_nanos()) {
                return;
            }
        }

        let mut dirty = self.dirty.lock();
        self.put_locked(&mut dirty, key, value, self.clock.now());
    }

    /// Remove `key`. Idempotent; safe to call on an absent key.
    pub fn delete(&self, key: &L::Key) {
        {
            let read = self.read.load();
            if let Some(entry) = read.get(key) {
                entry.tombstone();
                return;
            }
            if !read.amended {
                return;
            }
        }

        let mut dirty = self.dirty.lock();
        if let Some(entry) = self.read.load().get(key) {
            entry.tombstone();
            return;
        }
        if let Some(map) = dirty.map.as_mut() {
            map.remove(key);
        }
    }

    /// Visit every live key/value pair present at the time of the call.
    ///
    /// `visitor` returning `false` stops iteration early. If the dirty side
    /// holds unpromoted keys, it is promoted to the read view first (under
    /// the write lock); the visit itself then proceeds lock-free.
    pub fn range<F>(&self, mut visitor: F)
    where
        F: FnMut(&L::Key, &L::Value) -> bool,
    {
        if self.read.load().amended {
            let mut dirty = self.dirty.lock();
            if self.read.load().amended {
                self.promote_locked(&mut dirty);
            }
        }

        let read = self.read.load();
        for (key, entry) in read.map.iter() {
            match &**entry.load() {
                ValueState::Live(value) => {
                    if !visitor(key, value) {
                        return;
                    }
                }
                ValueState::Tombstoned | ValueState::Expunged => {}
            }
        }
    }

    /// Checks expiration, opportunistically sweeps, refreshes the access
    /// timestamp, and extracts the live value. Shared by the lock-free and
    /// locked lookup paths: a `try_lock` that fails because the caller
    /// already holds the write lock simply skips the sweep.
    fn observe(&self, entry: &Arc<Entry<L::Value>>) -> Option<L::Value> {
        let now = self.clock.now();
        self.observe_at(entry, now)
    }

    fn observe_locked(&self, entry: &Arc<Entry<L::Value>>, now: Time) -> Option<L::Value> {
        self.observe_at(entry, now)
    }

    fn observe_at(&self, entry: &Arc<Entry<L::Value>>, now: Time) -> Option<L::Value> {
        if self.is_expired(entry, now) {
            entry.tombstone();
            self.maybe_sweep(now);
            return None;
        }
        if self.access_ttl.is_some() {
            entry.touch_access(now.as_nanos());
        }
        match &**entry.load() {
            ValueState::Live(value) => Some((**value).clone()),
            ValueState::Tombstoned | ValueState::Expunged => None,
        }
    }

    fn is_expired(&self, entry: &Entry<L::Value>, now: Time) -> bool {
        if let Some(ttl) = self.access_ttl {
            if ttl > Duration::ZERO
                && now.checked_duration_since(Time::from_nanos(entry.access_time_nanos())) >= ttl
            {
                return true;
            }
        }
        if let Some(ttl) = self.write_ttl {
            if ttl > Duration::ZERO
                && now.checked_duration_since(Time::from_nanos(entry.write_time_nanos())) >= ttl
            {
                return true;
            }
        }
        false
    }

    /// Opportunistic expiration sweep: skipped (not blocked on) if the
    /// write lock is already held by the current thread or contended.
    fn maybe_sweep(&self, now: Time) {
        let Some(_guard) = self.dirty.try_lock() else {
            return;
        };
        let read = self.read.load();
        let mut swept = 0usize;
        for entry in read.map.values() {
            if self.is_expired(entry, now) {
                entry.tombstone();
                swept += 1;
            }
        }
        if swept > 0 {
            debug!(swept, "opportunistic expiration sweep");
        }
    }

    fn record_miss_locked(&self, dirty: &mut Dirty<L::Key, L::Value>) {
        dirty.misses += 1;
        let dirty_len = dirty.map.as_ref().map_or(0, HashMap::len);
        if dirty.misses >= dirty_len {
            self.promote_locked(dirty);
        }
    }

    fn promote_locked(&self, dirty: &mut Dirty<L::Key, L::Value>) {
        let new_map = dirty.map.take().unwrap_or_default();
        debug!(entries = new_map.len(), "promoting dirty side to read view");
        self.read.store(Arc::new(ReadView {
            map: Arc::new(new_map),
            amended: false,
        }));
        dirty.misses = 0;
    }

    /// Build the dirty side from the current read view, if it does not
    /// already exist: live entries are copied by reference, tombstoned ones
    /// are expunged (dropped from the soon-to-exist dirty side) rather than
    /// copied.
    fn ensure_dirty_locked(&self, dirty: &mut Dirty<L::Key, L::Value>) {
        if dirty.map.is_some() {
            return;
        }

        let read = self.read.load_full();
        let mut new_dirty = HashMap::with_capacity(read.map.len());
        for (key, entry) in read.map.iter() {
            if !entry.try_expunge_if_tombstoned() {
                new_dirty.insert(key.clone(), Arc::clone(entry));
            }
        }
        dirty.map = Some(new_dirty);
        self.read.store(Arc::new(read.with_amended(true)));
    }

    fn put_locked(&self, dirty: &mut Dirty<L::Key, L::Value>, key: L::Key, value: Arc<L::Value>, now: Time) {
        if let Some(entry) = self.read.load().get(&key) {
            if matches!(**entry.load(), ValueState::Expunged) {
                if let Some(map) = dirty.map.as_mut() {
                    map.insert(key, Arc::clone(entry));
                }
            }
            entry.store_live_locked(value, now.as_nanos());
            return;
        }

        if let Some(entry) = dirty.map.as_ref().and_then(|m| m.get(&key)).cloned() {
            entry.store_live_locked(value, now.as_nanos());
            return;
        }

        self.ensure_dirty_locked(dirty);
        let entry = Entry::new_live(value, now.as_nanos());
        dirty
            .map
            .as_mut()
            .expect("ensure_dirty_locked just populated the dirty side")
            .insert(key, entry);
    }

    fn load_and_store_locked(
        &self,
        dirty: &mut Dirty<L::Key, L::Value>,
        key: &L::Key,
        now: Time,
    ) -> Result<L::Value, CacheError<L::Error>> {
        match self.loader.load(key) {
            Ok(value) => {
                let value = Arc::new(value);
                self.put_locked(dirty, key.clone(), Arc::clone(&value), now);
                Ok((*value).clone())
            }
            Err(err) => {
                debug!(key = ?key, "loader failed");
                Err(CacheError::Loader(err))
            }
        }
    }
}

/// Builder for [`Cache`]. Both TTLs default to disabled.
pub struct CacheBuilder<L> {
    loader: L,
    access_ttl: Option<Duration>,
    write_ttl: Option<Duration>,
    clock: Arc<dyn TimeProvider>,
}

impl<L> Debug for CacheBuilder<L>
where
    L: Loader,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("access_ttl", &self.access_ttl)
            .field("write_ttl", &self.write_ttl)
            .finish_non_exhaustive()
    }
}

impl<L> CacheBuilder<L>
where
    L: Loader,
{
    fn new(loader: L) -> Self {
        Self {
            loader,
            access_ttl: None,
            write_ttl: None,
            clock: Arc::new(SystemProvider::new()),
        }
    }

    /// Entries expire when `now - last_access >= ttl`.
    #[must_use]
    pub fn access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = Some(ttl);
        self
    }

    /// Entries expire when `now - last_write >= ttl`.
    #[must_use]
    pub fn write_ttl(mut self, ttl: Duration) -> Self {
        self.write_ttl = Some(ttl);
        self
    }

    /// Override the clock (used by tests to avoid sleeping).
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the cache.
    pub fn build(self) -> Cache<L>
    where
        L::Key: Clone + Eq + Hash + Debug,
        L::Value: Clone,
    {
        Cache::new(self.loader, self.access_ttl, self.write_ttl, self.clock)
    }
}
