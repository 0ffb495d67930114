//! The immutable, atomically-swapped [`ReadView`] snapshot.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use crate::entry::Entry;

/// A snapshot of the cache's lock-free read path.
///
/// `map` is reference-counted so publishing a new view that only flips
/// `amended` (see [`crate::cache::Cache`]'s dirty-side bookkeeping) is a
/// cheap `Arc::clone`, not a copy of the whole map.
#[derive(Debug)]
pub(crate) struct ReadView<K, V> {
    pub(crate) map: Arc<HashMap<K, Arc<Entry<V>>>>,
    /// `true` when the dirty side holds keys not present in `map`.
    pub(crate) amended: bool,
}

impl<K, V> ReadView<K, V>
where
    K: Eq + Hash,
{
    pub(crate) fn empty() -> Self {
        Self {
            map: Arc::new(HashMap::new()),
            amended: false,
        }
    }

    pub(crate) fn with_amended(&self, amended: bool) -> Self {
        Self {
            map: Arc::clone(&self.map),
            amended,
        }
    }

    pub(crate) fn get(&self, key: &K) -> Option<&Arc<Entry<V>>> {
        self.map.get(key)
    }
}
