//! A one-shot, cancellable task with a CAS-driven state machine, modeled on
//! `java.util.concurrent.FutureTask`: [`Task`] wraps an [`Executable`],
//! exposes cooperative cancellation through [`Scope`], and lets any number
//! of threads block on its outcome via `get`/`get_timeout`.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]

mod error;
mod executor;
mod scope;
mod state;
mod task;
mod waiter;

pub use error::TaskError;
pub use executor::{Executor, ThreadPerTaskExecutor};
pub use scope::Scope;
pub use task::{Executable, Task};
