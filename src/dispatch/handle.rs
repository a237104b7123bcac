//! Cross-thread handle to a dispatcher.
//!
//! The [`crate::Dispatcher`] itself never leaves its owning thread; foreign
//! threads interact through a [`DispatcherHandle`] — the sole thread-safe
//! entry points are `invoke`, `invoke_and_forget`, `shutdown`, and the
//! `has_shutdown_started` probe.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, ThreadId};

use super::pump::PumpWaker;
use super::work_queue::{WorkItem, WorkQueue};

/// State shared between a dispatcher and its handles.
pub(crate) struct Shared {
    pub(crate) thread: ThreadId,
    pub(crate) queue: WorkQueue,
    pub(crate) waker: Arc<dyn PumpWaker>,
    /// Set by `shutdown()` from any thread; consumed by the loop.
    pub(crate) shutdown_requested: AtomicBool,
    /// Cross-thread mirror of the owning thread's `HasShutdownStarted`.
    pub(crate) shutdown_started: AtomicBool,
    /// Set when the dispatcher is dropped (owning thread exited). Posting to
    /// a defunct dispatcher is a programming error and fails fast.
    pub(crate) defunct: AtomicBool,
}

/// Cheap, cloneable, `Send + Sync` reference to one thread's dispatcher.
#[derive(Clone)]
pub struct DispatcherHandle {
    pub(crate) shared: Arc<Shared>,
}

impl DispatcherHandle {
    /// The id of the owning thread.
    pub fn thread(&self) -> ThreadId {
        self.shared.thread
    }

    /// True between the `ShutdownStarted` event and the start of the next
    /// `run()` cycle. Readable from any thread.
    pub fn has_shutdown_started(&self) -> bool {
        self.shared.shutdown_started.load(Ordering::SeqCst)
    }

    /// Request shutdown of the owning thread's loop.
    ///
    /// Idempotent and callable from any thread, including from inside the
    /// loop itself. A request made before `run()` is ever entered is honored
    /// as soon as it starts. Only new loop iterations are prevented; the item
    /// currently executing always completes.
    pub fn shutdown(&self) {
        self.shared.shutdown_requested.store(true, Ordering::SeqCst);
        self.shared.waker.wake();
    }

    /// Execute `callable` on the owning thread and return its result.
    ///
    /// Called from the owning thread itself, the callable runs immediately
    /// and synchronously in place — it does not re-enter the queue, so
    /// invoking from inside a handler cannot deadlock. From a foreign thread
    /// the callable is queued and the caller blocks until the loop executes
    /// it.
    ///
    /// # Panics
    ///
    /// A panic raised by `callable` is rethrown on the calling thread; it
    /// never enters the dispatcher's unhandled-panic protocol. Also panics
    /// if the dispatcher shuts down (or its thread has already exited)
    /// without running the callable — invoking a dispatcher that will never
    /// run is a programming error, not a silent no-op.
    pub fn invoke<T, F>(&self, callable: F) -> T
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        if thread::current().id() == self.shared.thread {
            return callable();
        }

        if self.shared.defunct.load(Ordering::SeqCst) {
            panic!("invoke on a dispatcher whose thread has exited");
        }

        // Message-passing hand-off: the task carries its own result channel
        // and captures panics so they surface here, in the caller's context.
        let (tx, rx) = mpsc::channel::<thread::Result<T>>();
        self.shared.queue.push(WorkItem::Blocking(Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(callable));
            let _ = tx.send(result);
        })));
        self.shared.waker.wake();

        match rx.recv() {
            Ok(Ok(value)) => value,
            Ok(Err(payload)) => resume_panic(payload),
            // The item was dropped unexecuted: the dispatcher shut down or
            // its thread exited before our turn came.
            Err(_) => panic!("invoke: dispatcher shut down before the callable ran"),
        }
    }

    /// Queue `callable` for execution on the owning thread without waiting.
    ///
    /// A panic raised by the callable is routed through the dispatcher's
    /// unhandled-panic protocol on the owning thread; nothing is ever
    /// surfaced back to the poster.
    ///
    /// # Panics
    ///
    /// Panics if the owning thread has already exited.
    pub fn invoke_and_forget<F>(&self, callable: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.shared.defunct.load(Ordering::SeqCst) {
            panic!("invoke_and_forget on a dispatcher whose thread has exited");
        }
        self.shared.queue.push(WorkItem::Forget(Box::new(callable)));
        self.shared.waker.wake();
    }
}

fn resume_panic(payload: Box<dyn Any + Send>) -> ! {
    panic::resume_unwind(payload)
}
