//! A Treiber-stack waiter list: threads blocked on [`crate::Task::get`] park
//! and are chained onto this stack, then unparked in one pass when the task
//! completes or is cancelled.

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::thread::Thread;

struct Node {
    thread: Thread,
    next: *mut Node,
}

/// Sentinel marking the list as closed (the task has reached a terminal
/// state). Never dereferenced — only ever compared against by address.
fn closed() -> *mut Node {
    ptr::NonNull::dangling().as_ptr()
}

/// Lock-free singly linked stack of parked waiter threads.
///
/// Pushing is a standard Treiber-stack CAS loop over the head pointer.
/// Completion drains the whole stack in one swap, then walks and unparks
/// every node that was chained from the old head — mirroring
/// `FutureTask.finishCompletion()`'s single-pass `WaitNode` drain.
#[derive(Debug)]
pub(crate) struct WaiterList {
    head: AtomicPtr<Node>,
}

impl WaiterList {
    pub(crate) fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Push the current thread onto the stack. Returns `false` without
    /// enqueuing if the list has already been drained and closed — the
    /// caller must re-check completion rather than park.
    pub(crate) fn push_current_thread(&self) -> bool {
        let node = Box::into_raw(Box::new(Node {
            thread: std::thread::current(),
            next: ptr::null_mut(),
        }));
        loop {
            let head = self.head.load(Ordering::Acquire);
            if head == closed() {
                // Safety: `node` was just allocated above and never published
                // (linked into the list), so we still exclusively own it.
                unsafe { drop(Box::from_raw(node)) };
                return false;
            }
            // Safety: `node` is a live, exclusively-owned allocation.
            unsafe {
                (*node).next = head;
            }
            if self
                .head
                .compare_exchange(head, node, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// Atomically take every currently queued waiter and mark the list
    /// closed, then unpark each one. Idempotent: a second call finds the
    /// list already closed and does nothing.
    pub(crate) fn drain_and_close(&self) {
        let mut node = self.head.swap(closed(), Ordering::AcqRel);
        while !node.is_null() && node != closed() {
            // Safety: every node still reachable here was published exactly
            // once by `push_current_thread` and this is the only code path
            // that ever frees a node.
            let boxed = unsafe { Box::from_raw(node) };
            boxed.thread.unpark();
            node = boxed.next;
        }
    }
}

impl Drop for WaiterList {
    fn drop(&mut self) {
        // Ordinarily empty by the time a `Task` is dropped (`drain_and_close`
        // already ran), but free any stragglers rather than leak.
        let mut node = self.head.swap(closed(), Ordering::AcqRel);
        while !node.is_null() && node != closed() {
            let boxed = unsafe { Box::from_raw(node) };
            node = boxed.next;
        }
    }
}
