use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use concurrency::{Cache, Executable, Executor, FnLoader, Scope, Task, ThreadPerTaskExecutor};

/// A loader that hands its work off to a [`Task`] instead of computing the
/// value inline: exercises both subsystems together.
struct Square(u32);

impl Executable for Square {
    type Output = u64;
    type Error = std::convert::Infallible;

    fn run(self, _scope: &Scope) -> Result<u64, Self::Error> {
        Ok(u64::from(self.0) * u64::from(self.0))
    }
}

struct TaskBackedLoader {
    executor: ThreadPerTaskExecutor,
}

impl loading_cache::Loader for TaskBackedLoader {
    type Key = u32;
    type Value = u64;
    type Error = concurrent_task::TaskError<std::convert::Infallible>;

    fn load(&self, key: &u32) -> Result<u64, Self::Error> {
        let task = Arc::new(Task::new(Square(*key), self.executor.scope()));
        self.executor.spawn(Arc::clone(&task));
        task.get()
    }
}

#[test]
fn cache_loader_can_run_work_on_a_task() {
    let cache = Cache::builder(TaskBackedLoader {
        executor: ThreadPerTaskExecutor::new(),
    })
    .build();

    assert_eq!(cache.get(&6).unwrap(), 36);
    // Second lookup must hit the cache, not spawn another task.
    assert_eq!(cache.get(&6).unwrap(), 36);
}

#[test]
fn cancelling_a_task_discards_its_outcome_even_if_the_executable_finishes() {
    struct NeverInterruptsPromptly(Arc<AtomicU32>);

    impl Executable for NeverInterruptsPromptly {
        type Output = ();
        type Error = std::convert::Infallible;

        fn run(self, scope: &Scope) -> Result<(), Self::Error> {
            while !scope.is_cancelled() {
                std::thread::yield_now();
            }
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let executor = ThreadPerTaskExecutor::new();
    let completions = Arc::new(AtomicU32::new(0));
    let task = Arc::new(Task::new(
        NeverInterruptsPromptly(Arc::clone(&completions)),
        executor.scope(),
    ));
    executor.spawn(Arc::clone(&task));

    std::thread::sleep(std::time::Duration::from_millis(10));
    assert!(task.cancel(true));

    // Give the executable time to observe the interrupt and finish running.
    std::thread::sleep(std::time::Duration::from_millis(10));
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    assert!(task.is_cancelled());
    assert!(matches!(
        task.get(),
        Err(concurrent_task::TaskError::Interrupted)
    ));
}
