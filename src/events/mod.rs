//! Event records and the typed broadcast hub.
//!
//! Everything here is pure Rust with no FFI dependencies, making the event
//! layer fully testable off-platform. The flow through the system:
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ native pump │     │  work queue  │     │    timers    │
//! └──────┬──────┘     └──────┬───────┘     └──────┬───────┘
//!        │ translate         │ execute            │ tick
//!        ▼                   ▼                    ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Dispatcher (owning thread)              │
//! └──────────────┬──────────────────────────┬───────────────┘
//!                │ publish(Event)           │ publish(DispatcherEvent)
//!                ▼                          ▼
//!        EventHub<Event>            EventHub<DispatcherEvent>
//! ```

pub mod hub;
pub mod types;

pub use hub::{EventHub, EventRecord, Subscription};
pub use types::{
    DispatcherEvent, DispatcherEventKind, Event, EventKind, MouseButton, PanicReport, WindowId,
};
