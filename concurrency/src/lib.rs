//! Two small concurrency primitives under one roof: a read/dirty-split
//! [`Cache`] with TTL expiration, and a cancellable one-shot [`Task`] with a
//! CAS-driven state machine. See `loading-cache` and `concurrent-task` for
//! the implementations; this crate just re-exports their public surface
//! plus [`TimeProvider`] so callers depend on a single crate.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, missing_docs)]

pub use concurrency_time::{SystemProvider, Time, TimeProvider};
pub use concurrent_task::{Executable, Executor, Scope, Task, TaskError, ThreadPerTaskExecutor};
pub use loading_cache::{Cache, CacheBuilder, CacheError, FnLoader, Loader};
