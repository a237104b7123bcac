//! Injected message-pump interface and the default headless pump.
//!
//! The dispatcher never talks to the OS directly; it is handed a
//! [`MessagePump`] with two operations: a combined poll-or-block call and a
//! cross-thread wake. Each target platform supplies its own backing
//! implementation ([`crate::platform::windows::Win32MessagePump`] on
//! Windows); [`WaitPump`] backs headless threads and tests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::events::Event;

/// Outcome of one [`MessagePump::poll_or_wait`] call.
#[derive(Debug)]
pub enum PumpWait {
    /// One native message was dequeued. If the message translates to a
    /// structured record and was not already routed inside the pump (the
    /// Win32 pump dispatches through the window procedure), it is returned
    /// here for the dispatcher to publish.
    Message(Option<Event>),

    /// [`PumpWaker::wake`] was called from some thread.
    Woken,

    /// No message or wake arrived before the deadline.
    TimedOut,
}

/// Cross-thread wake primitive for one pump. Wakes must be sticky: a wake
/// delivered while no one is waiting is reported by the next
/// `poll_or_wait` call instead of being lost.
pub trait PumpWaker: Send + Sync {
    fn wake(&self);
}

/// Blocking primitive the dispatcher loop is built on.
///
/// `poll_or_wait(Some(Duration::ZERO))` is the non-blocking poll used at the
/// top of every loop iteration; `None` blocks indefinitely.
pub trait MessagePump {
    /// Dequeue one native message, report a pending wake, or block until the
    /// timeout elapses.
    fn poll_or_wait(&self, timeout: Option<Duration>) -> PumpWait;

    /// A waker for this pump, callable from any thread.
    fn waker(&self) -> Arc<dyn PumpWaker>;
}

// === Default headless pump ===

struct WaitState {
    pending: Mutex<bool>,
    signal: Condvar,
}

impl PumpWaker for WaitState {
    fn wake(&self) {
        let mut pending = self.pending.lock();
        *pending = true;
        self.signal.notify_one();
    }
}

/// Condvar-backed pump with no native message source.
///
/// Used for dispatcher threads that only ever process posted work and
/// timers: worker threads, non-Windows targets, and the test suite.
pub struct WaitPump {
    state: Arc<WaitState>,
}

impl WaitPump {
    pub fn new() -> Self {
        Self {
            state: Arc::new(WaitState {
                pending: Mutex::new(false),
                signal: Condvar::new(),
            }),
        }
    }
}

impl Default for WaitPump {
    fn default() -> Self {
        Self::new()
    }
}

impl MessagePump for WaitPump {
    fn poll_or_wait(&self, timeout: Option<Duration>) -> PumpWait {
        let mut pending = self.state.pending.lock();
        if *pending {
            *pending = false;
            return PumpWait::Woken;
        }

        let Some(timeout) = timeout else {
            // Indefinite wait; the condvar may wake spuriously.
            while !*pending {
                self.state.signal.wait(&mut pending);
            }
            *pending = false;
            return PumpWait::Woken;
        };

        if timeout.is_zero() {
            return PumpWait::TimedOut;
        }

        let deadline = Instant::now() + timeout;
        loop {
            let timed_out = self
                .state
                .signal
                .wait_until(&mut pending, deadline)
                .timed_out();
            if *pending {
                *pending = false;
                return PumpWait::Woken;
            }
            if timed_out {
                return PumpWait::TimedOut;
            }
        }
    }

    fn waker(&self) -> Arc<dyn PumpWaker> {
        Arc::clone(&self.state) as Arc<dyn PumpWaker>
    }
}
