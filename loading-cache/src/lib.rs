//! A concurrent loading cache modeled on Go's `sync.Map`: a lock-free read
//! view backed by a mutex-guarded dirty side, with access- and write-based
//! TTL expiration layered on top.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]

mod cache;
mod entry;
mod error;
mod loader;
mod read_view;

pub use cache::{Cache, CacheBuilder};
pub use error::CacheError;
pub use loader::{FnLoader, Loader};
