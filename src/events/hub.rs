//! Typed multi-subscriber broadcast hub.
//!
//! A hub maps an event-kind tag to an ordered subscriber list and keeps one
//! additional catch-all list. Delivery order is fixed and documented:
//! **catch-all subscribers first, then kind-specific subscribers**, each in
//! subscription order.
//!
//! The hub is thread-affine (no `Send`/`Sync`); cross-thread event flow goes
//! through the dispatcher's work queue instead. Subscriber lists are
//! snapshotted before delivery, so a subscriber may subscribe or unsubscribe
//! (including itself) mid-delivery without corrupting iteration — changes
//! take effect from the next `publish`. Publishing from inside a callback is
//! allowed; the nested delivery skips the subscriber that is currently
//! executing instead of re-entering it.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

/// Implemented by record types routable through an [`EventHub`].
pub trait EventRecord {
    /// The discriminant used as the routing key.
    type Kind: Copy + Eq + Hash + fmt::Debug;

    /// This record's discriminant.
    fn kind(&self) -> Self::Kind;

    /// Whether delivery must stop before the next subscriber. Only event
    /// kinds whose semantics say so (a vetoed close) return true; a plain
    /// `handled` flag never stops delivery.
    fn stop_requested(&self) -> bool {
        false
    }
}

/// Token returned by `subscribe`; pass it back to `unsubscribe`.
///
/// Copyable so a handler can capture its own token (via a `Cell`) and remove
/// itself during delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

type Callback<E> = RefCell<Box<dyn FnMut(&mut E)>>;

struct Subscriber<E> {
    id: u64,
    callback: Rc<Callback<E>>,
}

impl<E> Clone for Subscriber<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Rc::clone(&self.callback),
        }
    }
}

/// Per-kind publish/subscribe broadcaster for one category of events.
pub struct EventHub<E: EventRecord> {
    next_id: Cell<u64>,
    by_kind: RefCell<HashMap<E::Kind, Vec<Subscriber<E>>>>,
    catch_all: RefCell<Vec<Subscriber<E>>>,
}

impl<E: EventRecord> EventHub<E> {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            by_kind: RefCell::new(HashMap::new()),
            catch_all: RefCell::new(Vec::new()),
        }
    }

    fn allocate(&self, callback: impl FnMut(&mut E) + 'static) -> Subscriber<E> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Subscriber {
            id,
            callback: Rc::new(RefCell::new(Box::new(callback))),
        }
    }

    /// Subscribe to one event kind. Subscribers of the same kind are invoked
    /// in subscription order, after all catch-all subscribers.
    pub fn subscribe(
        &self,
        kind: E::Kind,
        callback: impl FnMut(&mut E) + 'static,
    ) -> Subscription {
        let subscriber = self.allocate(callback);
        let id = subscriber.id;
        self.by_kind
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push(subscriber);
        Subscription(id)
    }

    /// Subscribe to every event kind. Catch-all subscribers are invoked
    /// before kind-specific ones, in subscription order.
    pub fn subscribe_all(&self, callback: impl FnMut(&mut E) + 'static) -> Subscription {
        let subscriber = self.allocate(callback);
        let id = subscriber.id;
        self.catch_all.borrow_mut().push(subscriber);
        Subscription(id)
    }

    /// Remove a subscriber. Unknown tokens are ignored. If called during
    /// delivery, the removed subscriber may still receive the event currently
    /// being published (the list was snapshotted); it receives nothing after.
    pub fn unsubscribe(&self, subscription: Subscription) {
        let Subscription(id) = subscription;
        self.catch_all.borrow_mut().retain(|s| s.id != id);
        let mut by_kind = self.by_kind.borrow_mut();
        for list in by_kind.values_mut() {
            list.retain(|s| s.id != id);
        }
    }

    /// Deliver one record: catch-all subscribers first, then the record
    /// kind's subscribers. Stops early only when the record requests it
    /// (see [`EventRecord::stop_requested`]).
    ///
    /// Delivery may re-enter `publish` from inside a callback (a nested
    /// dispatcher run level pumping the same hub). A subscriber whose
    /// callback is still executing is skipped for the nested record — a
    /// handler is never re-entered.
    pub fn publish(&self, event: &mut E) {
        let kind = event.kind();
        let mut pending: Vec<Subscriber<E>> = Vec::new();
        pending.extend(self.catch_all.borrow().iter().cloned());
        if let Some(list) = self.by_kind.borrow().get(&kind) {
            pending.extend(list.iter().cloned());
        }
        // Borrows released: callbacks are free to (un)subscribe.
        for subscriber in pending {
            if event.stop_requested() {
                break;
            }
            if let Ok(mut callback) = subscriber.callback.try_borrow_mut() {
                (*callback)(event);
            }
        }
    }

    /// Number of live subscribers (catch-all included).
    pub fn subscriber_count(&self) -> usize {
        let by_kind: usize = self.by_kind.borrow().values().map(Vec::len).sum();
        self.catch_all.borrow().len() + by_kind
    }
}

impl<E: EventRecord> Default for EventHub<E> {
    fn default() -> Self {
        Self::new()
    }
}
