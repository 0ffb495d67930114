//! The caller-supplied [`Loader`] collaborator.

/// Materializes a value for a key that is absent from, or has expired out
/// of, the cache.
///
/// `load` is invoked synchronously by [`crate::Cache::get`] while the
/// cache's write lock is held, which gives single-flight semantics per
/// cache across all keys — a deliberate simplification documented in
/// `DESIGN.md`. Implementations should therefore avoid calling back into
/// the same cache from within `load`.
pub trait Loader: Send + Sync + 'static {
    /// The cache's key type.
    type Key;
    /// The cache's value type.
    type Value;
    /// The error type returned on load failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Compute the value for `key`.
    fn load(&self, key: &Self::Key) -> Result<Self::Value, Self::Error>;
}

/// Adapts any `Fn(&K) -> Result<V, E>` closure into a [`Loader`].
pub struct FnLoader<K, V, E, F>(F, std::marker::PhantomData<fn(&K) -> Result<V, E>>);

impl<K, V, E, F> FnLoader<K, V, E, F>
where
    F: Fn(&K) -> Result<V, E> + Send + Sync,
{
    /// Wrap `f` as a [`Loader`].
    pub fn new(f: F) -> Self {
        Self(f, std::marker::PhantomData)
    }
}

impl<K, V, E, F> Loader for FnLoader<K, V, E, F>
where
    K: 'static,
    V: 'static,
    F: Fn(&K) -> Result<V, E> + Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Key = K;
    type Value = V;
    type Error = E;

    fn load(&self, key: &K) -> Result<V, E> {
        (self.0)(key)
    }
}
