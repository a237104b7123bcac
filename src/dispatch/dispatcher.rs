//! The dispatcher: one thread's cooperative event loop.
//!
//! Exactly one dispatcher exists per OS thread that uses one, created lazily
//! on first access and never shared or migrated. The loop classifies every
//! wake-up as native message, posted work, due timer, or idle, fans the
//! resulting records out through the event hubs, and keeps going until a
//! shutdown request is observed.
//!
//! Foreign threads only ever touch a [`DispatcherHandle`]; everything on the
//! `Dispatcher` itself is thread-affine (`Rc`, so the compiler enforces it).

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use super::context;
use super::handle::{DispatcherHandle, Shared};
use super::pump::{MessagePump, PumpWait};
use super::timer::TimerState;
use super::work_queue::{WorkItem, WorkQueue};
use crate::events::{DispatcherEvent, Event, EventHub, PanicReport};

type PanicPayload = Box<dyn Any + Send>;

/// Single-threaded cooperative scheduler owning one thread's message queue.
pub struct Dispatcher {
    shared: Arc<Shared>,
    pump: Box<dyn MessagePump>,
    /// Lifecycle events: Idle, the shutdown pair, and the panic protocol.
    events: EventHub<DispatcherEvent>,
    /// Window and input events translated from native messages.
    window_events: EventHub<Event>,
    timers: RefCell<Vec<Weak<TimerState>>>,
    run_depth: Cell<usize>,
    has_shutdown_started: Cell<bool>,
    has_shutdown_finished: Cell<bool>,
}

impl Dispatcher {
    /// The calling thread's dispatcher, created with the platform default
    /// pump on first access.
    ///
    /// # Panics
    ///
    /// Panics if the platform pump cannot be created (native resource
    /// exhaustion; never observed in practice).
    pub fn current() -> Rc<Dispatcher> {
        context::current_or_init(|| Dispatcher::build(default_pump()))
    }

    /// Create this thread's dispatcher with an explicit pump.
    ///
    /// # Panics
    ///
    /// Panics if the thread already has a dispatcher — the pump cannot be
    /// swapped after first access.
    pub fn with_pump(pump: Box<dyn MessagePump>) -> Rc<Dispatcher> {
        let dispatcher = Dispatcher::build(pump);
        context::install(Rc::clone(&dispatcher));
        dispatcher
    }

    /// Cross-thread handle lookup for another thread's dispatcher, if that
    /// thread has created one.
    pub fn handle_for(thread: ThreadId) -> Option<DispatcherHandle> {
        context::handle_for(thread)
    }

    fn build(pump: Box<dyn MessagePump>) -> Rc<Dispatcher> {
        let waker = pump.waker();
        Rc::new(Dispatcher {
            shared: Arc::new(Shared {
                thread: thread::current().id(),
                queue: WorkQueue::new(),
                waker,
                shutdown_requested: AtomicBool::new(false),
                shutdown_started: AtomicBool::new(false),
                defunct: AtomicBool::new(false),
            }),
            pump,
            events: EventHub::new(),
            window_events: EventHub::new(),
            timers: RefCell::new(Vec::new()),
            run_depth: Cell::new(0),
            has_shutdown_started: Cell::new(false),
            has_shutdown_finished: Cell::new(false),
        })
    }

    /// A cheap `Send + Sync` handle for foreign threads.
    pub fn handle(&self) -> DispatcherHandle {
        DispatcherHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// The root lifecycle hub.
    pub fn events(&self) -> &EventHub<DispatcherEvent> {
        &self.events
    }

    /// The hub receiving translated window and input events.
    pub fn window_events(&self) -> &EventHub<Event> {
        &self.window_events
    }

    /// True from the `ShutdownStarted` event until the next `run()` cycle
    /// begins.
    pub fn has_shutdown_started(&self) -> bool {
        self.has_shutdown_started.get()
    }

    /// True from the `ShutdownFinished` event until the next `run()` cycle
    /// begins.
    pub fn has_shutdown_finished(&self) -> bool {
        self.has_shutdown_finished.get()
    }

    /// Request shutdown. Equivalent to `handle().shutdown()`; idempotent and
    /// safe to call before `run()` — a pending request is honored as soon as
    /// the loop starts.
    pub fn shutdown(&self) {
        self.handle().shutdown();
    }

    /// Owner-thread convenience for [`DispatcherHandle::invoke`].
    pub fn invoke<T, F>(&self, callable: F) -> T
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.handle().invoke(callable)
    }

    /// Owner-thread convenience for [`DispatcherHandle::invoke_and_forget`].
    pub fn invoke_and_forget<F>(&self, callable: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle().invoke_and_forget(callable)
    }

    /// Run the blocking loop until shutdown is requested.
    ///
    /// May be called recursively from inside a handler (modal operations);
    /// nested levels share one shutdown state and each shutdown request
    /// unwinds exactly one level. The `ShutdownStarted`/`ShutdownFinished`
    /// pair fires exactly once per entered `run`, even when the loop is
    /// terminated by an unhandled panic — the panic resumes after the
    /// sequence completes.
    pub fn run(&self) {
        let depth = self.run_depth.get();
        if depth == 0 {
            // Fresh cycle: the previous cycle's observable flags reset only
            // now, so they stay readable between run/shutdown cycles.
            self.has_shutdown_started.set(false);
            self.has_shutdown_finished.set(false);
            self.shared.shutdown_started.store(false, Ordering::SeqCst);
        }
        self.run_depth.set(depth + 1);

        let escaped = self.pump_loop();

        self.run_depth.set(self.run_depth.get() - 1);
        if let Some(payload) = escaped {
            panic::resume_unwind(payload);
        }
    }

    /// One level of the loop. Returns a panic payload when terminating
    /// abnormally (the shutdown sequence has already run by then).
    fn pump_loop(&self) -> Option<PanicPayload> {
        loop {
            if self.shared.shutdown_requested.load(Ordering::SeqCst) {
                self.run_shutdown_sequence();
                return None;
            }

            // 1. Native message, if one is queued.
            match self.pump.poll_or_wait(Some(Duration::ZERO)) {
                PumpWait::Message(record) => {
                    if let Some(mut event) = record {
                        if let Err(payload) = self.dispatch_native(&mut event) {
                            return Some(self.abort_with(payload));
                        }
                    }
                    continue;
                }
                // The consumed wake may carry a shutdown request that landed
                // after the check above; go back to the top rather than
                // falling through to a blocking wait that nothing will end.
                PumpWait::Woken => continue,
                PumpWait::TimedOut => {}
            }

            // 2. Posted work, one item per iteration.
            if let Some(item) = self.shared.queue.pop() {
                if let Err(payload) = self.execute_work(item) {
                    return Some(self.abort_with(payload));
                }
                continue;
            }

            // 3. Due timer.
            let now = Instant::now();
            if let Some(timer) = self.due_timer(now) {
                timer.reschedule(now);
                if let Err(payload) = self.fire_tick(&timer) {
                    return Some(self.abort_with(payload));
                }
                continue;
            }

            // 4. Truly idle.
            match self.raise_idle() {
                Err(payload) => return Some(self.abort_with(payload)),
                Ok(true) => continue, // skip_wait: immediate re-poll
                Ok(false) => {}
            }

            // 5. Block until something arrives, bounded by the soonest
            // timer. A shutdown requested since the top of the iteration
            // left a sticky wake, so the wait returns immediately.
            let timeout = self
                .next_timer_deadline()
                .map(|deadline| deadline.saturating_duration_since(Instant::now()));
            if let PumpWait::Message(Some(mut event)) = self.pump.poll_or_wait(timeout) {
                if let Err(payload) = self.dispatch_native(&mut event) {
                    return Some(self.abort_with(payload));
                }
            }
        }
    }

    /// Route a translated native record through the window hub.
    fn dispatch_native(&self, event: &mut Event) -> Result<(), PanicPayload> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.window_events.publish(event);
        }));
        match outcome {
            Ok(()) => Ok(()),
            Err(payload) => self.filter_panic(payload),
        }
    }

    fn execute_work(&self, item: WorkItem) -> Result<(), PanicPayload> {
        match item {
            // Blocking invokes capture their own panics and deliver them to
            // the invoker; they never enter the protocol here.
            WorkItem::Blocking(task) => {
                task();
                Ok(())
            }
            WorkItem::Forget(task) => {
                match panic::catch_unwind(AssertUnwindSafe(task)) {
                    Ok(()) => Ok(()),
                    Err(payload) => self.filter_panic(payload),
                }
            }
        }
    }

    fn fire_tick(&self, timer: &Rc<TimerState>) -> Result<(), PanicPayload> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| timer.fire()));
        match outcome {
            Ok(()) => Ok(()),
            Err(payload) => self.filter_panic(payload),
        }
    }

    /// Raise `Idle`; returns whether a handler requested an immediate
    /// re-poll instead of blocking.
    fn raise_idle(&self) -> Result<bool, PanicPayload> {
        let mut event = DispatcherEvent::Idle { skip_wait: false };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.events.publish(&mut event);
        }));
        match outcome {
            Ok(()) => Ok(matches!(event, DispatcherEvent::Idle { skip_wait: true })),
            // The idle pass was cut short; re-poll instead of blocking so
            // the remaining idle subscribers get another turn.
            Err(payload) => self.filter_panic(payload).map(|()| true),
        }
    }

    /// The two-stage unhandled-panic protocol (filter, then handle).
    /// `Ok(())` means a handler dealt with it and the loop continues;
    /// `Err` returns the payload for propagation out of `run`.
    fn filter_panic(&self, payload: PanicPayload) -> Result<(), PanicPayload> {
        let report = PanicReport::from_payload(payload.as_ref());

        let mut filter = DispatcherEvent::UnhandledPanicFilter {
            panic: report.clone(),
            request_catch: false,
        };
        self.events.publish(&mut filter);
        let catch_requested = matches!(
            filter,
            DispatcherEvent::UnhandledPanicFilter {
                request_catch: true,
                ..
            }
        );
        if !catch_requested {
            return Err(payload);
        }

        let mut event = DispatcherEvent::UnhandledPanic {
            panic: report,
            handled: false,
        };
        self.events.publish(&mut event);
        if matches!(event, DispatcherEvent::UnhandledPanic { handled: true, .. }) {
            Ok(())
        } else {
            Err(payload)
        }
    }

    /// Abnormal termination: the shutdown sequence still runs, then the
    /// payload propagates out of this `run` level.
    fn abort_with(&self, payload: PanicPayload) -> PanicPayload {
        eprintln!(
            "sash: unhandled panic is terminating the dispatcher loop: {}",
            PanicReport::from_payload(payload.as_ref()).message
        );
        self.run_shutdown_sequence();
        payload
    }

    /// `ShutdownStarted` → drain native messages → `ShutdownFinished`.
    /// Runs exactly once per exiting `run` level.
    fn run_shutdown_sequence(&self) {
        self.has_shutdown_started.set(true);
        self.shared.shutdown_started.store(true, Ordering::SeqCst);
        let mut started = DispatcherEvent::ShutdownStarted;
        self.events.publish(&mut started);

        // Remaining native messages are dequeued and ignored.
        loop {
            match self.pump.poll_or_wait(Some(Duration::ZERO)) {
                PumpWait::Message(_) => continue,
                // The wake belongs to pending work, possibly for an outer
                // run level; put it back instead of swallowing it.
                PumpWait::Woken => {
                    self.shared.waker.wake();
                    break;
                }
                PumpWait::TimedOut => break,
            }
        }

        if self.run_depth.get() == 1 {
            // Final nesting level: pending work is dropped (which signals any
            // blocked invoker) and timers are unbound.
            drop(self.shared.queue.drain());
            self.clear_timers();
        }

        // Consume the request now: a shutdown() called by a Finished handler
        // becomes a pending request for the next run cycle.
        self.shared
            .shutdown_requested
            .store(false, Ordering::SeqCst);

        self.has_shutdown_finished.set(true);
        let mut finished = DispatcherEvent::ShutdownFinished;
        self.events.publish(&mut finished);
    }

    // === Timer management ===

    /// Add a started timer to the active set. Re-registering the same timer
    /// is a no-op.
    pub(crate) fn register_timer(&self, state: &Rc<TimerState>) {
        let mut timers = self.timers.borrow_mut();
        let already = timers
            .iter()
            .any(|weak| weak.upgrade().is_some_and(|t| Rc::ptr_eq(&t, state)));
        if !already {
            timers.push(Rc::downgrade(state));
        }
    }

    /// The earliest due, enabled timer at `now`, pruning dead and stopped
    /// entries along the way.
    fn due_timer(&self, now: Instant) -> Option<Rc<TimerState>> {
        let mut timers = self.timers.borrow_mut();
        timers.retain(|weak| weak.upgrade().is_some_and(|t| t.is_enabled()));

        let mut best: Option<(Instant, Rc<TimerState>)> = None;
        for weak in timers.iter() {
            let Some(timer) = weak.upgrade() else { continue };
            let Some(due) = timer.next_due() else { continue };
            if due <= now && best.as_ref().map_or(true, |(d, _)| due < *d) {
                best = Some((due, timer));
            }
        }
        best.map(|(_, timer)| timer)
    }

    /// Soonest deadline across active timers, bounding the idle wait.
    fn next_timer_deadline(&self) -> Option<Instant> {
        self.timers
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|t| t.is_enabled())
            .filter_map(|t| t.next_due())
            .min()
    }

    fn clear_timers(&self) {
        let timers = self.timers.take();
        for weak in timers {
            if let Some(timer) = weak.upgrade() {
                timer.deactivate();
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // The owning thread is exiting. Fail fast for future posters and
        // signal anyone blocked on an already-posted invoke.
        self.shared.defunct.store(true, Ordering::SeqCst);
        let pending = self.shared.queue.len();
        if pending > 0 {
            eprintln!("sash: dispatcher dropped with {pending} unexecuted work item(s)");
        }
        drop(self.shared.queue.drain());
        context::unregister(self.shared.thread);
    }
}

#[cfg(target_os = "windows")]
fn default_pump() -> Box<dyn MessagePump> {
    match crate::platform::windows::Win32MessagePump::new() {
        Ok(pump) => Box::new(pump),
        Err(e) => panic!("failed to create the Win32 message pump: {e}"),
    }
}

#[cfg(not(target_os = "windows"))]
fn default_pump() -> Box<dyn MessagePump> {
    Box::new(super::pump::WaitPump::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::pump::WaitPump;
    use crate::events::{EventKind, WindowId};
    use std::collections::VecDeque;

    /// Pump that replays a fixed sequence of translated records, then
    /// reports timeouts. Wakes behave like the real thing (sticky flag).
    struct ScriptedPump {
        script: RefCell<VecDeque<Event>>,
        woken: Arc<AtomicBool>,
    }

    struct ScriptedWaker(Arc<AtomicBool>);

    impl crate::dispatch::pump::PumpWaker for ScriptedWaker {
        fn wake(&self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    impl ScriptedPump {
        fn new(events: Vec<Event>) -> Self {
            Self {
                script: RefCell::new(events.into()),
                woken: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl MessagePump for ScriptedPump {
        fn poll_or_wait(&self, _timeout: Option<Duration>) -> PumpWait {
            if let Some(event) = self.script.borrow_mut().pop_front() {
                return PumpWait::Message(Some(event));
            }
            if self.woken.swap(false, Ordering::SeqCst) {
                return PumpWait::Woken;
            }
            PumpWait::TimedOut
        }

        fn waker(&self) -> Arc<dyn crate::dispatch::pump::PumpWaker> {
            Arc::new(ScriptedWaker(Arc::clone(&self.woken)))
        }
    }

    /// Run `scenario` on a fresh thread with a fresh dispatcher, forwarding
    /// its result (or panic) to the caller.
    fn on_fresh_dispatcher<T, F>(pump: Box<dyn MessagePump + Send>, scenario: F) -> thread::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Rc<Dispatcher>) -> T + Send + 'static,
    {
        thread::spawn(move || {
            let dispatcher = Dispatcher::with_pump(pump);
            scenario(&dispatcher)
        })
        .join()
    }

    #[test]
    fn test_scripted_native_events_reach_window_hub_in_order() {
        let script = vec![
            Event::Resized {
                window: WindowId(7),
                width: 100,
                height: 50,
            },
            Event::Moved {
                window: WindowId(7),
                x: 3,
                y: 4,
            },
        ];
        let kinds = on_fresh_dispatcher(Box::new(ScriptedPump::new(script)), |dispatcher| {
            let seen = Rc::new(RefCell::new(Vec::new()));
            let seen2 = Rc::clone(&seen);
            dispatcher.window_events().subscribe_all(move |event| {
                seen2.borrow_mut().push(crate::events::EventRecord::kind(event));
            });
            let handle = dispatcher.handle();
            dispatcher.events().subscribe(
                crate::events::DispatcherEventKind::Idle,
                move |_| handle.shutdown(),
            );
            dispatcher.run();
            let kinds = seen.borrow().clone();
            kinds
        })
        .unwrap();

        assert_eq!(kinds, vec![EventKind::Resized, EventKind::Moved]);
    }

    #[test]
    fn test_panic_in_native_dispatch_survives_when_caught_and_handled() {
        let script = vec![Event::RedrawRequested {
            window: WindowId(1),
        }];
        let result = on_fresh_dispatcher(Box::new(ScriptedPump::new(script)), |dispatcher| {
            dispatcher
                .window_events()
                .subscribe(EventKind::RedrawRequested, |_| panic!("redraw handler"));
            dispatcher.events().subscribe(
                crate::events::DispatcherEventKind::UnhandledPanicFilter,
                |event| {
                    if let DispatcherEvent::UnhandledPanicFilter { request_catch, .. } = event {
                        *request_catch = true;
                    }
                },
            );
            dispatcher.events().subscribe(
                crate::events::DispatcherEventKind::UnhandledPanic,
                |event| {
                    if let DispatcherEvent::UnhandledPanic { handled, .. } = event {
                        *handled = true;
                    }
                },
            );
            let handle = dispatcher.handle();
            dispatcher.events().subscribe(
                crate::events::DispatcherEventKind::Idle,
                move |_| handle.shutdown(),
            );
            dispatcher.run();
            true
        });

        assert!(result.unwrap());
    }

    #[test]
    fn test_nested_run_unwinds_one_level_per_shutdown() {
        let counts = on_fresh_dispatcher(Box::new(WaitPump::new()), |dispatcher| {
            let starts = Rc::new(Cell::new(0u32));
            let finishes = Rc::new(Cell::new(0u32));
            {
                let starts = Rc::clone(&starts);
                dispatcher.events().subscribe(
                    crate::events::DispatcherEventKind::ShutdownStarted,
                    move |_| starts.set(starts.get() + 1),
                );
                let finishes = Rc::clone(&finishes);
                dispatcher.events().subscribe(
                    crate::events::DispatcherEventKind::ShutdownFinished,
                    move |_| finishes.set(finishes.get() + 1),
                );
            }

            // First idle: enter a nested run whose own first idle shuts it
            // down. Second idle (outer level resumed): shut down the outer.
            let entered_nested = Rc::new(Cell::new(false));
            let dispatcher2 = Rc::clone(dispatcher);
            let entered = Rc::clone(&entered_nested);
            dispatcher.events().subscribe(
                crate::events::DispatcherEventKind::Idle,
                move |_| {
                    if !entered.get() {
                        entered.set(true);
                        dispatcher2.shutdown(); // consumed by the nested level
                        dispatcher2.run();
                    } else {
                        dispatcher2.shutdown();
                    }
                },
            );

            dispatcher.run();
            (starts.get(), finishes.get())
        })
        .unwrap();

        // One pair per entered run level.
        assert_eq!(counts, (2, 2));
    }

    /// Pump wrapper that requests shutdown from inside the first poll,
    /// after the loop's top-of-iteration check has already passed.
    struct ShutdownMidPollPump {
        inner: WaitPump,
        handle: Arc<parking_lot::Mutex<Option<DispatcherHandle>>>,
        injected: Cell<bool>,
    }

    impl MessagePump for ShutdownMidPollPump {
        fn poll_or_wait(&self, timeout: Option<Duration>) -> PumpWait {
            if !self.injected.replace(true) {
                if let Some(handle) = self.handle.lock().as_ref() {
                    handle.shutdown();
                }
            }
            self.inner.poll_or_wait(timeout)
        }

        fn waker(&self) -> Arc<dyn crate::dispatch::pump::PumpWaker> {
            self.inner.waker()
        }
    }

    #[test]
    fn test_shutdown_landing_inside_a_poll_still_ends_the_run() {
        let (done_tx, done_rx) = std::sync::mpsc::channel();
        thread::spawn(move || {
            let slot = Arc::new(parking_lot::Mutex::new(None));
            let pump = ShutdownMidPollPump {
                inner: WaitPump::new(),
                handle: Arc::clone(&slot),
                injected: Cell::new(false),
            };
            let dispatcher = Dispatcher::with_pump(Box::new(pump));
            *slot.lock() = Some(dispatcher.handle());

            // The request arrives mid-iteration and its wake is consumed by
            // the non-blocking poll; the loop must still observe it instead
            // of blocking forever.
            dispatcher.run();
            done_tx.send(()).unwrap();
        });

        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("run() must return after the mid-poll shutdown");
    }

    #[test]
    fn test_nested_run_entered_from_idle_pumps_its_own_idle() {
        let counts = on_fresh_dispatcher(Box::new(WaitPump::new()), |dispatcher| {
            let starts = Rc::new(Cell::new(0u32));
            let finishes = Rc::new(Cell::new(0u32));
            {
                let starts = Rc::clone(&starts);
                dispatcher.events().subscribe(
                    crate::events::DispatcherEventKind::ShutdownStarted,
                    move |_| starts.set(starts.get() + 1),
                );
                let finishes = Rc::clone(&finishes);
                dispatcher.events().subscribe(
                    crate::events::DispatcherEventKind::ShutdownFinished,
                    move |_| finishes.set(finishes.get() + 1),
                );
            }

            // First subscriber enters a nested run with no shutdown pending,
            // so the inner loop must idle on its own. The second subscriber
            // ends whichever level is currently idling; it is what stops the
            // inner loop, from inside the nested idle delivery.
            let nested = Rc::new(Cell::new(false));
            let dispatcher2 = Rc::clone(dispatcher);
            let nested2 = Rc::clone(&nested);
            dispatcher.events().subscribe(
                crate::events::DispatcherEventKind::Idle,
                move |_| {
                    if !nested2.replace(true) {
                        dispatcher2.run();
                    }
                },
            );
            let dispatcher3 = Rc::clone(dispatcher);
            dispatcher.events().subscribe(
                crate::events::DispatcherEventKind::Idle,
                move |_| dispatcher3.shutdown(),
            );

            dispatcher.run();
            (starts.get(), finishes.get())
        })
        .unwrap();

        // Both levels idled and shut down cleanly: one pair each.
        assert_eq!(counts, (2, 2));
    }

    #[test]
    fn test_skip_wait_forces_an_immediate_repoll() {
        let idles = on_fresh_dispatcher(Box::new(WaitPump::new()), |dispatcher| {
            let count = Rc::new(Cell::new(0u32));
            let counted = Rc::clone(&count);
            let handle = dispatcher.handle();
            dispatcher.events().subscribe(
                crate::events::DispatcherEventKind::Idle,
                move |event| {
                    counted.set(counted.get() + 1);
                    if counted.get() < 3 {
                        // Without the re-poll the loop would block here
                        // forever; reaching idle again proves it.
                        if let DispatcherEvent::Idle { skip_wait } = event {
                            *skip_wait = true;
                        }
                    } else {
                        handle.shutdown();
                    }
                },
            );
            dispatcher.run();
            count.get()
        })
        .unwrap();

        assert_eq!(idles, 3);
    }

    #[test]
    fn test_pending_shutdown_request_is_honored_when_run_starts() {
        let ran_idle = on_fresh_dispatcher(Box::new(WaitPump::new()), |dispatcher| {
            let idled = Rc::new(Cell::new(false));
            let idled2 = Rc::clone(&idled);
            dispatcher.events().subscribe(
                crate::events::DispatcherEventKind::Idle,
                move |_| idled2.set(true),
            );
            dispatcher.shutdown();
            dispatcher.run(); // must return without ever idling
            idled.get()
        })
        .unwrap();

        assert!(!ran_idle);
    }
}
