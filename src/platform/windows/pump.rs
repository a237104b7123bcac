//! Win32 message pump: `PeekMessageW` + `MsgWaitForMultipleObjects` with an
//! auto-reset event as the cross-thread wake channel.
//!
//! Native messages are dispatched to their window procedures from inside
//! `poll_or_wait`; the window procedure publishes the translated records
//! itself (see [`super::window`]), so `PumpWait::Message` carries no record
//! here — it only tells the loop a message was processed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use windows::Win32::Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0, WAIT_TIMEOUT};
use windows::Win32::System::Threading::{CreateEventW, SetEvent, WaitForSingleObject, INFINITE};
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, MsgWaitForMultipleObjects, PeekMessageW, TranslateMessage, MSG, PM_REMOVE,
    QS_ALLINPUT, WM_QUIT,
};

use crate::dispatch::pump::{MessagePump, PumpWait, PumpWaker};
use crate::error::{Error, Result};

/// The wake event, shared between the pump and its wakers. The raw handle is
/// stored as `isize` so the type is `Send + Sync`; it stays valid until the
/// last owner drops.
struct WakeEvent {
    raw: isize,
}

impl WakeEvent {
    fn handle(&self) -> HANDLE {
        HANDLE(self.raw as *mut core::ffi::c_void)
    }
}

impl PumpWaker for WakeEvent {
    fn wake(&self) {
        // Auto-reset event: setting it while set is a no-op, which gives the
        // sticky-wake semantics the dispatcher relies on.
        unsafe {
            let _ = SetEvent(self.handle());
        }
    }
}

impl Drop for WakeEvent {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.handle());
        }
    }
}

// The handle is only ever passed to thread-safe kernel waits and SetEvent.
unsafe impl Send for WakeEvent {}
unsafe impl Sync for WakeEvent {}

/// Native pump for threads that own windows.
pub struct Win32MessagePump {
    wake: Arc<WakeEvent>,
}

impl Win32MessagePump {
    pub fn new() -> Result<Self> {
        let event = unsafe { CreateEventW(None, false, false, None) }
            .map_err(|e| Error::platform("CreateEventW", e.code().0 as u32))?;
        Ok(Self {
            wake: Arc::new(WakeEvent { raw: event.0 as isize }),
        })
    }

    /// Process one queued native message, if any. Dispatching runs the window
    /// procedure inline, which is where translated records get published.
    fn pump_one(&self) -> Option<PumpWait> {
        let mut msg = MSG::default();
        unsafe {
            if PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                if msg.message != WM_QUIT {
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
                return Some(PumpWait::Message(None));
            }
        }
        None
    }

    fn wake_pending(&self) -> bool {
        unsafe { WaitForSingleObject(self.wake.handle(), 0) == WAIT_OBJECT_0 }
    }
}

impl MessagePump for Win32MessagePump {
    fn poll_or_wait(&self, timeout: Option<Duration>) -> PumpWait {
        if let Some(wait) = self.pump_one() {
            return wait;
        }
        if self.wake_pending() {
            return PumpWait::Woken;
        }

        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let millis = match deadline {
                None => INFINITE,
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return PumpWait::TimedOut;
                    }
                    left.as_millis().min(u128::from(INFINITE - 1)) as u32
                }
            };

            let signaled = unsafe {
                MsgWaitForMultipleObjects(Some(&[self.wake.handle()]), false, millis, QS_ALLINPUT)
            };
            if signaled == WAIT_OBJECT_0 {
                return PumpWait::Woken;
            }
            if signaled == WAIT_TIMEOUT {
                return PumpWait::TimedOut;
            }
            // Queue status readiness; may be stale, in which case we wait
            // again with the remaining budget.
            if let Some(wait) = self.pump_one() {
                return wait;
            }
        }
    }

    fn waker(&self) -> Arc<dyn PumpWaker> {
        Arc::clone(&self.wake) as Arc<dyn PumpWaker>
    }
}
