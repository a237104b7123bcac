//! Event records carried through dispatch.
//!
//! Every event is a tagged union with a discriminant ([`EventKind`] /
//! [`DispatcherEventKind`]) used by the hub for per-kind routing. Records are
//! immutable by convention except for the designated response fields
//! (`cancel`, `handled`, `skip_wait`, `request_catch`), which subscribers
//! flip in place during delivery.
//! This module is pure Rust with no FFI dependencies, making it fully testable.

use super::hub::EventRecord;

/// Identifies a native window within this process.
///
/// On Windows this wraps the `HWND` value; headless tests use synthetic ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub isize);

/// Mouse button identifier for [`Event::MouseButton`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Window and input events, translated from native platform messages.
///
/// One native message maps to zero or one records; messages with no mapping
/// are handled by the platform default procedure and never reach the hub.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // === Window Events ===
    /// The user asked to close the window. A subscriber may set `cancel` to
    /// veto the close; delivery stops as soon as `cancel` is set.
    CloseRequested { window: WindowId, cancel: bool },

    /// The window's client area changed size.
    Resized {
        window: WindowId,
        width: u32,
        height: u32,
    },

    /// The window moved to a new position (client origin, screen coordinates).
    Moved { window: WindowId, x: i32, y: i32 },

    /// Keyboard focus was gained (`gained: true`) or lost.
    Focused { window: WindowId, gained: bool },

    /// The platform asked for the window contents to be repainted.
    RedrawRequested { window: WindowId },

    // === Input Events ===
    /// A key went down (`pressed: true`) or up. `code` is the platform
    /// virtual-key code.
    Key {
        window: WindowId,
        code: u32,
        pressed: bool,
        handled: bool,
    },

    /// A mouse button went down or up at client coordinates (x, y).
    MouseButton {
        window: WindowId,
        button: MouseButton,
        pressed: bool,
        x: i32,
        y: i32,
        handled: bool,
    },

    /// The mouse moved to client coordinates (x, y).
    MouseMoved {
        window: WindowId,
        x: i32,
        y: i32,
        handled: bool,
    },

    /// The vertical wheel scrolled; `delta` is in lines, positive away from
    /// the user.
    MouseWheel {
        window: WindowId,
        delta: f32,
        handled: bool,
    },
}

/// Discriminant for [`Event`], used as the hub routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CloseRequested,
    Resized,
    Moved,
    Focused,
    RedrawRequested,
    Key,
    MouseButton,
    MouseMoved,
    MouseWheel,
}

impl Event {
    /// The window this event belongs to.
    pub fn window(&self) -> WindowId {
        match *self {
            Event::CloseRequested { window, .. }
            | Event::Resized { window, .. }
            | Event::Moved { window, .. }
            | Event::Focused { window, .. }
            | Event::RedrawRequested { window }
            | Event::Key { window, .. }
            | Event::MouseButton { window, .. }
            | Event::MouseMoved { window, .. }
            | Event::MouseWheel { window, .. } => window,
        }
    }

    /// True for keyboard/mouse events (the variants carrying a `handled` flag).
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            Event::Key { .. }
                | Event::MouseButton { .. }
                | Event::MouseMoved { .. }
                | Event::MouseWheel { .. }
        )
    }

    /// Whether an earlier subscriber marked this input event handled.
    /// Always false for non-input events.
    pub fn is_handled(&self) -> bool {
        match *self {
            Event::Key { handled, .. }
            | Event::MouseButton { handled, .. }
            | Event::MouseMoved { handled, .. }
            | Event::MouseWheel { handled, .. } => handled,
            _ => false,
        }
    }

    /// Mark an input event handled. No effect on non-input events.
    /// Later subscribers still see the event; `handled` never stops delivery.
    pub fn mark_handled(&mut self) {
        match self {
            Event::Key { handled, .. }
            | Event::MouseButton { handled, .. }
            | Event::MouseMoved { handled, .. }
            | Event::MouseWheel { handled, .. } => *handled = true,
            _ => {}
        }
    }
}

impl EventRecord for Event {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        match self {
            Event::CloseRequested { .. } => EventKind::CloseRequested,
            Event::Resized { .. } => EventKind::Resized,
            Event::Moved { .. } => EventKind::Moved,
            Event::Focused { .. } => EventKind::Focused,
            Event::RedrawRequested { .. } => EventKind::RedrawRequested,
            Event::Key { .. } => EventKind::Key,
            Event::MouseButton { .. } => EventKind::MouseButton,
            Event::MouseMoved { .. } => EventKind::MouseMoved,
            Event::MouseWheel { .. } => EventKind::MouseWheel,
        }
    }

    // Close is the one window event whose semantics stop delivery early:
    // once a subscriber vetoes the close, later subscribers are skipped.
    fn stop_requested(&self) -> bool {
        matches!(self, Event::CloseRequested { cancel: true, .. })
    }
}

/// Descriptive summary of a panic captured by the dispatcher, carried in the
/// unhandled-panic lifecycle events. The original payload is retained by the
/// dispatcher for resumption; this is the displayable part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicReport {
    /// The panic message, if the payload was a string; a placeholder otherwise.
    pub message: String,
}

impl PanicReport {
    /// Extract a displayable message from a `catch_unwind` payload.
    pub fn from_payload(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { message }
    }
}

/// Dispatcher lifecycle events, published on the dispatcher's root hub.
///
/// Events flow strictly on the owning thread: Idle when nothing is pending,
/// the shutdown pair exactly once per entered `run()`, and the two-stage
/// unhandled-panic protocol when a handler panics.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatcherEvent {
    /// No native message, work item, or timer is pending. Setting `skip_wait`
    /// forces an immediate re-poll instead of blocking — this is how
    /// continuous rendering loops are driven.
    Idle { skip_wait: bool },

    /// Shutdown has been observed by the loop; fires before the final drain.
    ShutdownStarted,

    /// The loop is about to return from `run()`.
    ShutdownFinished,

    /// First stage of the unhandled-panic protocol. A subscriber sets
    /// `request_catch` to declare interest in handling the panic.
    UnhandledPanicFilter {
        panic: PanicReport,
        request_catch: bool,
    },

    /// Second stage, raised only if a filter requested the catch. Setting
    /// `handled` keeps the loop running; otherwise the panic resumes out of
    /// `run()` after the shutdown sequence.
    UnhandledPanic { panic: PanicReport, handled: bool },
}

/// Discriminant for [`DispatcherEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatcherEventKind {
    Idle,
    ShutdownStarted,
    ShutdownFinished,
    UnhandledPanicFilter,
    UnhandledPanic,
}

impl EventRecord for DispatcherEvent {
    type Kind = DispatcherEventKind;

    fn kind(&self) -> DispatcherEventKind {
        match self {
            DispatcherEvent::Idle { .. } => DispatcherEventKind::Idle,
            DispatcherEvent::ShutdownStarted => DispatcherEventKind::ShutdownStarted,
            DispatcherEvent::ShutdownFinished => DispatcherEventKind::ShutdownFinished,
            DispatcherEvent::UnhandledPanicFilter { .. } => {
                DispatcherEventKind::UnhandledPanicFilter
            }
            DispatcherEvent::UnhandledPanic { .. } => DispatcherEventKind::UnhandledPanic,
        }
    }
}
