//! Thread-safe FIFO of deferred work posted to a dispatcher.
//!
//! Any thread may enqueue; only the owning thread dequeues, one item per
//! loop iteration, in strict arrival order. There is no priority lane.
//! Enqueuing does not wake the pump by itself — the posting handle wakes it
//! right after, so the queue stays a plain locked deque.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// A deferred callable, boxed for the queue.
pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

/// One unit of deferred execution.
///
/// Dropping an unexecuted `Blocking` item drops its completion sender, which
/// the blocked invoker observes as a fatal condition — posted work is never
/// silently discarded.
pub(crate) enum WorkItem {
    /// Posted by a blocking `invoke`. The task captures its own panics and
    /// reports them to the invoker; the loop runs it bare.
    Blocking(Task),

    /// Posted by `invoke_and_forget`. Panics are routed through the
    /// dispatcher's unhandled-panic protocol.
    Forget(Task),
}

pub(crate) struct WorkQueue {
    items: Mutex<VecDeque<WorkItem>>,
}

impl WorkQueue {
    pub(crate) fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    /// Append an item. Callable from any thread.
    pub(crate) fn push(&self, item: WorkItem) {
        self.items.lock().push_back(item);
    }

    /// Remove the oldest item, if any. Owning thread only.
    pub(crate) fn pop(&self) -> Option<WorkItem> {
        self.items.lock().pop_front()
    }

    /// Take every pending item at once. Used by the final shutdown sequence;
    /// the caller drops the items, which signals blocked invokers.
    pub(crate) fn drain(&self) -> Vec<WorkItem> {
        self.items.lock().drain(..).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.lock().len()
    }
}
