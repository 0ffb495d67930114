//! [`Task`]: a one-shot, cancellable unit of work with a CAS-driven state
//! machine, modeled on `java.util.concurrent.FutureTask`.

use std::fmt;
use std::time::{Duration, Instant};

use observability_deps::tracing::debug;
use parking_lot::Mutex;

use crate::error::TaskError;
use crate::scope::Scope;
use crate::state::{self, State};
use crate::waiter::WaiterList;

/// A unit of work a [`Task`] can run.
///
/// `run` receives a [`Scope`] so it can cooperatively check for cancellation
/// at safe points; nothing forcibly stops the thread running it (Rust has no
/// safe mechanism for that, unlike Java's `Thread.interrupt`, which
/// `FutureTask` relies on for best-effort interruption). It consumes `self`
/// because a `Task` only ever runs its executable once.
pub trait Executable: Send + 'static {
    /// The value produced on success.
    type Output: Send + 'static;
    /// The error produced on failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run the work to completion, or return early once `scope` reports
    /// cancellation.
    fn run(self, scope: &Scope) -> Result<Self::Output, Self::Error>;
}

/// A one-shot task around an [`Executable`].
///
/// Lifecycle states (see [`crate::state`]): `NEW`, transient `COMPLETING`/
/// `INTERRUPTING`, and the terminal states `NORMAL`, `ERROR`, `CANCELLED`,
/// `INTERRUPTED`. Exactly one of `run` or `cancel` determines how a task
/// leaves `NEW`; once it does, its outcome never changes.
///
/// `get`/`get_timeout` may be called from any number of threads and any
/// number of times; each sees the same outcome.
pub struct Task<Ex: Executable> {
    state: State,
    outcome: Mutex<Option<Result<Ex::Output, Ex::Error>>>,
    waiters: WaiterList,
    scope: Scope,
    executable: Mutex<Option<Ex>>,
}

/// Result of one `wait_for_completion` call: distinguishes a task that
/// actually reached a terminal state from a waiter that gave up because its
/// scope was cancelled or its deadline passed.
enum WaitOutcome {
    Done,
    Interrupted,
    TimedOut,
}

impl<Ex: Executable> fmt::Debug for Task<Ex> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("state", &self.state.load(std::sync::atomic::Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<Ex: Executable> Task<Ex> {
    /// Create a new, unstarted task wrapping `executable`, whose scope is a
    /// child of `parent` (typically an [`crate::Executor`]'s own scope, so
    /// that cancelling the executor cancels this task too).
    pub fn new(executable: Ex, parent: &Scope) -> Self {
        Self {
            state: State::new(),
            outcome: Mutex::new(None),
            waiters: WaiterList::new(),
            scope: parent.child(),
            executable: Mutex::new(Some(executable)),
        }
    }

    /// The cancellation token that will be handed to `run`.
    pub fn scope(&self) -> Scope {
        self.scope.clone()
    }

    /// Run the task on the calling thread.
    ///
    /// A no-op if the task is no longer `NEW` (already cancelled, or already
    /// run by a racing caller): at most one call to `run` across all threads
    /// actually invokes the executable.
    pub fn run(&self) {
        if self.state.load(std::sync::atomic::Ordering::Acquire) != state::NEW {
            return;
        }
        let Some(executable) = self.executable.lock().take() else {
            return;
        };
        let result = executable.run(&self.scope);
        self.finish(result);
    }

    fn finish(&self, result: Result<Ex::Output, Ex::Error>) {
        if !self.state.cas(state::NEW, state::COMPLETING) {
            // Cancelled (or being interrupted) out from under us: the
            // outcome is discarded even if the executable happened to
            // finish, per `FutureTask` semantics.
            return;
        }
        let terminal = match &result {
            Ok(_) => state::NORMAL,
            Err(_) => state::ERROR,
        };
        *self.outcome.lock() = Some(result);
        self.state.store(terminal, std::sync::atomic::Ordering::Release);
        debug!(terminal, "task completed");
        self.waiters.drain_and_close();
    }

    /// Attempt to cancel the task.
    ///
    /// Returns `false` if the task has already left `NEW` (it is too late:
    /// it already completed, or was already cancelled). If
    /// `may_interrupt_if_running` is `true`, [`Scope::is_cancelled`] on the
    /// task's scope starts returning `true` immediately, whether or not
    /// `run` has started yet.
    pub fn cancel(&self, may_interrupt_if_running: bool) -> bool {
        let target = if may_interrupt_if_running {
            state::INTERRUPTING
        } else {
            state::CANCELLED
        };
        if !self.state.cas(state::NEW, target) {
            return false;
        }
        if may_interrupt_if_running {
            self.scope.cancel();
            self.state
                .store(state::INTERRUPTED, std::sync::atomic::Ordering::Release);
        }
        debug!(may_interrupt_if_running, "task cancelled");
        self.waiters.drain_and_close();
        true
    }

    /// Whether the task was cancelled (with or without interruption).
    pub fn is_cancelled(&self) -> bool {
        state::is_cancelled(self.state.load(std::sync::atomic::Ordering::Acquire))
    }

    /// Whether the task has reached a terminal state. State ≠ `NEW`,
    /// including the transient `COMPLETING`/`INTERRUPTING` states — this is
    /// the public contract, distinct from the wait loop's internal notion of
    /// "stop parking".
    pub fn is_done(&self) -> bool {
        self.state.load(std::sync::atomic::Ordering::Acquire) != state::NEW
    }

    /// Block until the task completes, then return its outcome.
    pub fn get(&self) -> Result<Ex::Output, TaskError<Ex::Error>>
    where
        Ex::Output: Clone,
        Ex::Error: Clone,
    {
        match self.wait_for_completion(None) {
            WaitOutcome::Done => self.report_outcome(),
            WaitOutcome::Interrupted => Err(TaskError::Interrupted),
            WaitOutcome::TimedOut => unreachable!("get waits with no deadline"),
        }
    }

    /// Block until the task completes or `timeout` elapses, whichever comes
    /// first.
    pub fn get_timeout(&self, timeout: Duration) -> Result<Ex::Output, TaskError<Ex::Error>>
    where
        Ex::Output: Clone,
        Ex::Error: Clone,
    {
        let deadline = Instant::now() + timeout;
        match self.wait_for_completion(Some(deadline)) {
            WaitOutcome::Done => self.report_outcome(),
            WaitOutcome::Interrupted => Err(TaskError::Interrupted),
            WaitOutcome::TimedOut => Err(TaskError::Timeout),
        }
    }

    /// Upper bound on how long an untimed wait ever parks for in one go.
    /// `park()` alone only wakes on `unpark()`, but `Executor::shutdown`
    /// cancels a scope without unparking anyone — it has no registry of the
    /// tasks spawned through it to call `drain_and_close` on. Parking in
    /// short slices instead of indefinitely is what gives a waiter blocked in
    /// untimed `get()` a bounded delay before it notices such a shutdown.
    const CANCELLATION_POLL_INTERVAL: Duration = Duration::from_millis(50);

    /// Park the calling thread until the task reaches a terminal state, the
    /// task's cancellation scope is tripped, or (when `deadline` is set)
    /// the deadline passes.
    fn wait_for_completion(&self, deadline: Option<Instant>) -> WaitOutcome {
        loop {
            // Step 1 of the waiter protocol: the cancellation token is
            // checked before anything else, every iteration, independent of
            // whatever the task's own state says — a waiter blocked on an
            // `Executable` that never polls its scope must still observe an
            // outer shutdown within a bounded delay.
            if self.scope.is_cancelled() {
                return WaitOutcome::Interrupted;
            }

            let s = self.state.load(std::sync::atomic::Ordering::Acquire);
            if state::is_terminal(s) {
                return WaitOutcome::Done;
            }
            if s == state::COMPLETING || s == state::INTERRUPTING {
                // A result is being written this instant; it'll be visible
                // in terms of nanoseconds, not worth parking for.
                std::thread::yield_now();
                continue;
            }

            if !self.waiters.push_current_thread() {
                // The list was closed concurrently, meaning the task just
                // became terminal; loop around to observe it.
                continue;
            }

            match deadline {
                None => std::thread::park_timeout(Self::CANCELLATION_POLL_INTERVAL),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        let s = self.state.load(std::sync::atomic::Ordering::Acquire);
                        return if state::is_terminal(s) {
                            WaitOutcome::Done
                        } else {
                            WaitOutcome::TimedOut
                        };
                    }
                    std::thread::park_timeout(deadline - now);
                }
            }
        }
    }

    fn report_outcome(&self) -> Result<Ex::Output, TaskError<Ex::Error>>
    where
        Ex::Output: Clone,
        Ex::Error: Clone,
    {
        match self.state.load(std::sync::atomic::Ordering::Acquire) {
            state::NORMAL | state::ERROR => {
                let guard = self.outcome.lock();
                match guard.as_ref().expect("terminal NORMAL/ERROR state implies a stored outcome") {
                    Ok(value) => Ok(value.clone()),
                    Err(err) => Err(TaskError::Execution(err.clone())),
                }
            }
            state::CANCELLED => Err(TaskError::Cancelled),
            state::INTERRUPTED => Err(TaskError::Interrupted),
            other => unreachable!("report_outcome called with non-terminal state {other}"),
        }
    }
}
