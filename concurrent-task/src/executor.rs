//! A minimal [`Executor`] that runs each task on its own OS thread.

use std::sync::Arc;

use observability_deps::tracing::debug;

use crate::scope::Scope;
use crate::task::{Executable, Task};

/// Something that can run a [`Task`] to completion, off the caller's thread.
pub trait Executor {
    /// The scope every task spawned through this executor is a child of.
    /// Construct tasks with `Task::new(executable, executor.scope())` so
    /// that [`Executor::shutdown`] reaches them.
    fn scope(&self) -> &Scope;

    /// Schedule `task` to run. Must not block the calling thread.
    fn spawn<Ex>(&self, task: Arc<Task<Ex>>)
    where
        Ex: Executable + 'static;

    /// Cancel the scope shared by every task this executor has spawned.
    /// Tasks already running see [`Scope::is_cancelled`] flip on their next
    /// check; tasks not yet started are skipped by `Task::run` entirely once
    /// `cancel` has also been called on them directly — `shutdown` only
    /// affects cooperative cancellation, it does not forcibly stop threads.
    fn shutdown(&self) {
        self.scope().cancel();
    }
}

/// An [`Executor`] that spawns one OS thread per task.
///
/// The spec this crate implements is deliberately silent on pooling — every
/// call to `spawn` gets its own thread, same as calling
/// `std::thread::spawn(move || task.run())` directly. A bounded worker pool
/// is an extension left to callers that need one.
#[derive(Debug, Clone, Default)]
pub struct ThreadPerTaskExecutor {
    scope: Scope,
}

impl ThreadPerTaskExecutor {
    /// Create a new executor with a fresh, uncancelled scope.
    pub fn new() -> Self {
        Self { scope: Scope::new() }
    }
}

impl Executor for ThreadPerTaskExecutor {
    fn scope(&self) -> &Scope {
        &self.scope
    }

    fn spawn<Ex>(&self, task: Arc<Task<Ex>>)
    where
        Ex: Executable + 'static,
    {
        std::thread::spawn(move || {
            debug!("task thread starting");
            task.run();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    struct AddOne(u32);

    impl Executable for AddOne {
        type Output = u32;
        type Error = Infallible;

        fn run(self, _scope: &Scope) -> Result<u32, Infallible> {
            Ok(self.0 + 1)
        }
    }

    #[test]
    fn spawned_task_completes() {
        let executor = ThreadPerTaskExecutor::new();
        let task = Arc::new(Task::new(AddOne(41), executor.scope()));
        executor.spawn(Arc::clone(&task));
        assert_eq!(task.get().unwrap(), 42);
    }

    #[test]
    fn shutdown_cancels_the_scope_of_every_task_spawned_through_the_executor() {
        struct Spin;
        impl Executable for Spin {
            type Output = ();
            type Error = Infallible;
            fn run(self, scope: &Scope) -> Result<(), Infallible> {
                while !scope.is_cancelled() {
                    std::thread::yield_now();
                }
                Ok(())
            }
        }

        let executor = ThreadPerTaskExecutor::new();
        let task = Arc::new(Task::new(Spin, executor.scope()));
        let task_scope = task.scope();
        executor.spawn(Arc::clone(&task));

        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(!task_scope.is_cancelled());
        executor.shutdown();
        assert!(task_scope.is_cancelled());
    }

    #[test]
    fn shutdown_unblocks_a_waiter_even_when_the_executable_never_polls_its_scope() {
        // Deliberately ignores `scope` entirely, unlike `Spin` above: the
        // executable itself will never return, let alone notice a shutdown.
        struct Oblivious;
        impl Executable for Oblivious {
            type Output = ();
            type Error = Infallible;
            fn run(self, _scope: &Scope) -> Result<(), Infallible> {
                loop {
                    std::thread::park();
                }
            }
        }

        let executor = ThreadPerTaskExecutor::new();
        let task = Arc::new(Task::new(Oblivious, executor.scope()));
        executor.spawn(Arc::clone(&task));

        std::thread::sleep(std::time::Duration::from_millis(10));
        executor.shutdown();

        assert_eq!(
            task.get_timeout(std::time::Duration::from_secs(1)),
            Err(crate::TaskError::Interrupted)
        );
    }
}
