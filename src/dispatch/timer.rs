//! Recurring timers scheduled by the dispatcher.
//!
//! A timer is not a thread — it is a scheduling entry. Ticks fire on the
//! owning dispatcher's thread, only while its loop is running, with
//! at-least-interval spacing and never concurrently with other dispatched
//! work.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::dispatcher::Dispatcher;
use crate::events::hub::{EventHub, EventRecord, Subscription};

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one timer, carried in its tick events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Record delivered to tick subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickEvent {
    pub timer: TimerId,
}

impl EventRecord for TickEvent {
    type Kind = ();

    fn kind(&self) {}
}

pub(crate) struct TimerState {
    id: TimerId,
    interval: Cell<Duration>,
    enabled: Cell<bool>,
    next_due: Cell<Option<Instant>>,
    ticks: EventHub<TickEvent>,
}

impl TimerState {
    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub(crate) fn next_due(&self) -> Option<Instant> {
        self.next_due.get()
    }

    /// Schedule the next tick a full interval from `now`, not from the
    /// previous deadline — spacing is at-least-interval, never catch-up.
    pub(crate) fn reschedule(&self, now: Instant) {
        self.next_due.set(Some(now + self.interval.get()));
    }

    pub(crate) fn fire(&self) {
        let mut event = TickEvent { timer: self.id };
        self.ticks.publish(&mut event);
    }

    /// Unbind on dispatcher shutdown; a later `start()` rebinds.
    pub(crate) fn deactivate(&self) {
        self.enabled.set(false);
        self.next_due.set(None);
    }
}

/// A recurring deadline object bound to the calling thread's dispatcher.
///
/// Created free-standing; `start()` binds it to the current thread's
/// dispatcher and it stays bound until `stop()` or dispatcher shutdown.
/// Thread-affine by construction (`!Send`), so the compiler enforces what
/// `DispatcherObject::verify_access` checks at runtime elsewhere.
#[derive(Clone)]
pub struct Timer {
    state: Rc<TimerState>,
}

impl Timer {
    /// Create a stopped timer with the given interval (zero is allowed and
    /// means "due on every iteration the loop has nothing more urgent").
    pub fn new(interval: Duration) -> Self {
        Self {
            state: Rc::new(TimerState {
                id: TimerId(NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed)),
                interval: Cell::new(interval),
                enabled: Cell::new(false),
                next_due: Cell::new(None),
                ticks: EventHub::new(),
            }),
        }
    }

    pub fn id(&self) -> TimerId {
        self.state.id
    }

    pub fn interval(&self) -> Duration {
        self.state.interval.get()
    }

    /// Change the interval. If the timer is running, the next tick is
    /// rescheduled a full new interval from now.
    pub fn set_interval(&self, interval: Duration) {
        self.state.interval.set(interval);
        if self.state.enabled.get() {
            self.state.reschedule(Instant::now());
        }
    }

    /// True between `start()` and `stop()`/dispatcher shutdown.
    pub fn is_enabled(&self) -> bool {
        self.state.enabled.get()
    }

    /// Subscribe to ticks. Subscribers persist across stop/start cycles.
    pub fn on_tick(&self, callback: impl FnMut(&mut TickEvent) + 'static) -> Subscription {
        self.state.ticks.subscribe_all(callback)
    }

    /// Remove a tick subscriber.
    pub fn remove_tick(&self, subscription: Subscription) {
        self.state.ticks.unsubscribe(subscription);
    }

    /// Bind to the calling thread's dispatcher and schedule the first tick
    /// one interval from now. Restartable after `stop()`; starting a running
    /// timer just reschedules it. No tick is ever delivered unless the
    /// dispatcher's loop is actually running.
    pub fn start(&self) {
        self.state.enabled.set(true);
        self.state.reschedule(Instant::now());
        Dispatcher::current().register_timer(&self.state);
    }

    /// Remove this timer from its dispatcher's active set. Idempotent.
    pub fn stop(&self) {
        self.state.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_timer_is_stopped_and_unscheduled() {
        let timer = Timer::new(Duration::from_millis(10));
        assert!(!timer.is_enabled());
        assert!(timer.state.next_due().is_none());
    }

    #[test]
    fn test_timer_ids_are_unique() {
        let a = Timer::new(Duration::from_millis(1));
        let b = Timer::new(Duration::from_millis(1));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_start_schedules_one_interval_out() {
        let timer = Timer::new(Duration::from_millis(50));
        let before = Instant::now();
        timer.start();
        let due = timer.state.next_due().expect("started timer must be due");
        assert!(due >= before + Duration::from_millis(50));
        assert!(timer.is_enabled());
        timer.stop();
    }

    #[test]
    fn test_stop_clears_schedule() {
        let timer = Timer::new(Duration::from_millis(5));
        timer.start();
        timer.stop();
        assert!(!timer.is_enabled());
        assert!(timer.state.next_due().is_none());
    }

    #[test]
    fn test_set_interval_reschedules_running_timer() {
        let timer = Timer::new(Duration::from_millis(5));
        timer.start();
        let first = timer.state.next_due().unwrap();
        timer.set_interval(Duration::from_millis(200));
        let second = timer.state.next_due().unwrap();
        assert!(second > first);
        timer.stop();
    }

    #[test]
    fn test_tick_subscribers_receive_timer_id() {
        let timer = Timer::new(Duration::ZERO);
        let seen = Rc::new(Cell::new(None));
        let seen2 = Rc::clone(&seen);
        timer.on_tick(move |event| seen2.set(Some(event.timer)));

        timer.state.fire();
        assert_eq!(seen.get(), Some(timer.id()));
    }
}
