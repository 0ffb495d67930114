//! The task's lifecycle state machine.
//!
//! Mirrors `java.util.concurrent.FutureTask`: possible transitions are
//!
//! ```text
//! NEW -> COMPLETING -> NORMAL
//! NEW -> COMPLETING -> ERROR
//! NEW -> CANCELLED
//! NEW -> INTERRUPTING -> INTERRUPTED
//! ```
//!
//! `COMPLETING` and `INTERRUPTING` are transient: they exist only for the
//! instant it takes to write the outcome (or to send the interrupt) before
//! the state is advanced to its terminal value. A reader that observes one
//! of the transient states must spin briefly rather than treat the task as
//! done.

use std::sync::atomic::{AtomicU8, Ordering};

pub(crate) const NEW: u8 = 0;
pub(crate) const COMPLETING: u8 = 1;
pub(crate) const NORMAL: u8 = 2;
pub(crate) const ERROR: u8 = 3;
pub(crate) const CANCELLED: u8 = 4;
pub(crate) const INTERRUPTING: u8 = 5;
pub(crate) const INTERRUPTED: u8 = 6;

/// The raw lifecycle state, CAS-driven so cancellation and completion race
/// safely regardless of which thread wins.
#[derive(Debug)]
pub(crate) struct State(AtomicU8);

impl State {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(NEW))
    }

    pub(crate) fn load(&self, order: Ordering) -> u8 {
        self.0.load(order)
    }

    /// Attempt `expected -> new`. Returns `true` on success.
    pub(crate) fn cas(&self, expected: u8, new: u8) -> bool {
        self.0
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn store(&self, new: u8, order: Ordering) {
        self.0.store(new, order);
    }
}

/// `true` for the four states a waiter can stop parking on: `NORMAL`,
/// `ERROR`, `CANCELLED`, `INTERRUPTED`. The transient `COMPLETING`/
/// `INTERRUPTING` states are deliberately excluded — a waiter observing one
/// of those must yield briefly and reload rather than treat the task as
/// finished. This is an internal wait-loop detail, distinct from the public
/// `isDone() -> state != NEW` contract (see `Task::is_done`).
pub(crate) fn is_terminal(state: u8) -> bool {
    matches!(state, NORMAL | ERROR | CANCELLED | INTERRUPTED)
}

pub(crate) fn is_cancelled(state: u8) -> bool {
    matches!(state, CANCELLED | INTERRUPTING | INTERRUPTED)
}
