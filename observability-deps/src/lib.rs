//! Re-exports the observability crates used across this workspace so every
//! other crate pins the same version through a single `path` dependency
//! instead of duplicating `tracing` version requirements everywhere.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]

pub use tracing;
