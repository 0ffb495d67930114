//! Monotonic time abstraction for the concurrency crates.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    clippy::explicit_iter_loop,
    clippy::use_self
)]

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// A point in time, expressed as nanoseconds since an arbitrary, process-local
/// monotonic epoch.
///
/// `Time` values are only meaningful relative to one another and to the
/// [`TimeProvider`] that produced them; they carry no relationship to wall
/// clock time. This sidesteps the ambiguity between `UnixNano()` and
/// `Nanosecond()` timestamps seen in some loading-cache implementations: a
/// single `TimeProvider` is the only source of truth for "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(u64);

impl Time {
    /// Construct a `Time` from a raw nanosecond count.
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// The raw nanosecond count since the provider's epoch.
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Saturating duration elapsed between `earlier` and `self`.
    ///
    /// Returns `Duration::ZERO` if `earlier` is actually later than `self`
    /// (can happen across two different providers, or due to clamping).
    pub fn checked_duration_since(self, earlier: Self) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }

    /// `self + duration`, saturating at `u64::MAX` nanoseconds.
    #[must_use]
    pub fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.as_nanos() as u64))
    }
}

/// A source of monotonically non-decreasing [`Time`] values.
///
/// Every timestamp recorded by the loading cache and every deadline computed
/// by the task primitive goes through a `TimeProvider` rather than calling
/// `std::time::Instant::now()` directly, so tests can substitute
/// [`MockProvider`] and advance time deterministically instead of sleeping.
pub trait TimeProvider: Debug + Send + Sync + 'static {
    /// Return the current time.
    fn now(&self) -> Time;
}

/// The production [`TimeProvider`], backed by [`std::time::Instant`].
///
/// The epoch is fixed to the first call to [`SystemProvider::new`] or
/// [`SystemProvider::now`] made anywhere in the process; all `Time` values it
/// produces are nanoseconds elapsed since that instant.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProvider;

impl SystemProvider {
    /// Create a new system time provider.
    pub fn new() -> Self {
        Self
    }

    fn epoch() -> Instant {
        static EPOCH: OnceLock<Instant> = OnceLock::new();
        *EPOCH.get_or_init(Instant::now)
    }
}

impl TimeProvider for SystemProvider {
    fn now(&self) -> Time {
        Time(Self::epoch().elapsed().as_nanos() as u64)
    }
}

/// A [`TimeProvider`] with a value that only advances when told to.
///
/// Used throughout the cache and task test suites in place of real sleeps.
#[derive(Debug)]
pub struct MockProvider {
    now: AtomicU64,
}

impl MockProvider {
    /// Create a provider starting at `start`.
    pub fn new(start: Time) -> Self {
        Self {
            now: AtomicU64::new(start.as_nanos()),
        }
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        self.now
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Set the clock to an absolute `Time`.
    pub fn set(&self, time: Time) {
        self.now.store(time.as_nanos(), Ordering::SeqCst);
    }
}

impl TimeProvider for MockProvider {
    fn now(&self) -> Time {
        Time(self.now.load(Ordering::SeqCst))
    }
}
