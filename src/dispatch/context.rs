//! Per-thread dispatcher registry and the thread-affinity capability.
//!
//! Two layers of lookup:
//! - a thread-local slot holding the owning thread's `Rc<Dispatcher>` (the
//!   only full-access path), and
//! - a process-wide registry keyed by `ThreadId` handing out
//!   [`DispatcherHandle`]s to foreign threads.
//!
//! The registry replaces ambient global singletons: owned objects capture an
//! explicit handle at construction and check against it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::OnceLock;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use super::dispatcher::Dispatcher;
use super::handle::DispatcherHandle;

thread_local! {
    /// The dispatcher owned by this thread, once created.
    static CURRENT: RefCell<Option<Rc<Dispatcher>>> = const { RefCell::new(None) };
}

/// Send halves of every live dispatcher, keyed by owning thread.
static REGISTRY: OnceLock<Mutex<HashMap<ThreadId, DispatcherHandle>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<ThreadId, DispatcherHandle>> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// This thread's dispatcher, creating it with `make` on first access.
pub(crate) fn current_or_init(make: impl FnOnce() -> Rc<Dispatcher>) -> Rc<Dispatcher> {
    CURRENT.with(|slot| {
        let mut slot = slot.borrow_mut();
        if let Some(dispatcher) = slot.as_ref() {
            return Rc::clone(dispatcher);
        }
        let dispatcher = make();
        registry()
            .lock()
            .insert(thread::current().id(), dispatcher.handle());
        *slot = Some(Rc::clone(&dispatcher));
        dispatcher
    })
}

/// Install an explicitly constructed dispatcher for this thread.
///
/// # Panics
///
/// Panics if the thread already has one — the pump cannot be swapped after
/// first access.
pub(crate) fn install(dispatcher: Rc<Dispatcher>) {
    CURRENT.with(|slot| {
        let mut slot = slot.borrow_mut();
        assert!(
            slot.is_none(),
            "this thread already has a dispatcher; create the pump-specific \
             dispatcher before the first Dispatcher::current() call"
        );
        registry()
            .lock()
            .insert(thread::current().id(), dispatcher.handle());
        *slot = Some(dispatcher);
    });
}

/// Registry lookup for a foreign thread's dispatcher.
pub(crate) fn handle_for(thread: ThreadId) -> Option<DispatcherHandle> {
    registry().lock().get(&thread).cloned()
}

/// Drop the registry entry for an exiting thread. Called from
/// `Dispatcher::drop`.
pub(crate) fn unregister(thread: ThreadId) {
    registry().lock().remove(&thread);
}

/// Thread-affinity capability for objects owned by a dispatcher.
///
/// Captures the constructing thread's dispatcher handle once; every public
/// operation of the owning object calls [`verify_access`] first. Violations
/// are programming errors and fail fast rather than being silently
/// redirected to the right thread.
///
/// [`verify_access`]: DispatcherObject::verify_access
pub struct DispatcherObject {
    owner: DispatcherHandle,
}

impl DispatcherObject {
    /// Bind to the calling thread's dispatcher, creating it if this is the
    /// thread's first access.
    pub fn new() -> Self {
        Self {
            owner: Dispatcher::current().handle(),
        }
    }

    /// The owning dispatcher's cross-thread handle.
    pub fn owner(&self) -> &DispatcherHandle {
        &self.owner
    }

    /// True when the calling thread is the owning thread.
    pub fn check_access(&self) -> bool {
        thread::current().id() == self.owner.thread()
    }

    /// Assert that the calling thread owns this object.
    ///
    /// # Panics
    ///
    /// Panics when called from any other thread.
    pub fn verify_access(&self) {
        if !self.check_access() {
            panic!(
                "cross-thread access: object owned by dispatcher thread {:?}, called from {:?}",
                self.owner.thread(),
                thread::current().id()
            );
        }
    }
}

impl Default for DispatcherObject {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_access_passes_on_owning_thread() {
        let object = DispatcherObject::new();
        assert!(object.check_access());
        object.verify_access();
    }

    #[test]
    fn test_verify_access_fails_on_foreign_thread() {
        let object = DispatcherObject::new();
        let owner = object.owner().clone();

        let result = thread::spawn(move || {
            // The handle is Send; the capability check is about identity,
            // not about what the compiler lets us move.
            let foreign = DispatcherObject { owner };
            assert!(!foreign.check_access());
            foreign.verify_access();
        })
        .join();

        assert!(result.is_err(), "verify_access must panic off-thread");
    }

    #[test]
    fn test_registry_resolves_foreign_thread_handle() {
        let dispatcher = Dispatcher::current();
        let thread_id = thread::current().id();

        let looked_up = thread::spawn(move || handle_for(thread_id))
            .join()
            .unwrap();

        let handle = looked_up.expect("registered dispatcher must be visible");
        assert_eq!(handle.thread(), dispatcher.handle().thread());
    }
}
