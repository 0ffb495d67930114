//! Cooperative, hierarchical cancellation token handed to a running
//! [`crate::Executable`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cancellation flag visible to the code running inside a [`crate::Task`].
///
/// Scopes form a tree: every [`crate::Task`] is constructed with a parent
/// `Scope` (typically an [`crate::Executor`]'s own scope) and derives a
/// [`Scope::child`] of it. `is_cancelled` is `true` if the scope itself was
/// cancelled *or* any ancestor was — so cancelling an executor's scope
/// cancels every task it ever spawned in one call, without having to touch
/// each task individually.
#[derive(Debug, Clone)]
pub struct Scope {
    cancelled: Arc<AtomicBool>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    /// Create a new, unparented root scope (e.g. for an [`crate::Executor`]).
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            parent: None,
        }
    }

    /// Derive a child scope: cancelled whenever it or `self` is.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            parent: Some(Arc::new(self.clone())),
        }
    }

    /// Whether this scope, or any ancestor of it, has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
            || self.parent.as_deref().is_some_and(Scope::is_cancelled)
    }

    /// Cancel this scope (and, transitively, every descendant).
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled_and_latches() {
        let scope = Scope::new();
        assert!(!scope.is_cancelled());
        scope.cancel();
        assert!(scope.is_cancelled());
    }

    #[test]
    fn cancelling_a_parent_cancels_its_children() {
        let parent = Scope::new();
        let child = parent.child();
        let grandchild = child.child();

        assert!(!grandchild.is_cancelled());
        parent.cancel();
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
    }

    #[test]
    fn cancelling_a_child_does_not_cancel_its_parent() {
        let parent = Scope::new();
        let child = parent.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }
}
