//! Error taxonomy for [`crate::Cache`].

/// Errors returned by [`crate::Cache::get`].
///
/// The cache never recovers or retries a loader failure: the error is
/// propagated to the caller unchanged and the entry is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum CacheError<E> {
    /// The configured [`crate::Loader`] returned an error while computing a
    /// missing or expired entry.
    #[error("loader failed: {0}")]
    Loader(#[source] E),
}
