//! Single-threaded cooperative dispatch for native windowing.
//!
//! Each thread that wants an event loop gets exactly one [`Dispatcher`],
//! created lazily and never shared. The loop interleaves native window
//! messages, work posted from other threads, and recurring timers, and
//! broadcasts everything through typed event hubs. The core is free of FFI —
//! the native integration is injected as a [`MessagePump`], so the whole
//! scheduling machinery runs (and is tested) headless; the Win32 pump and
//! window live under [`platform`].
//!
//! Minimal usage:
//!
//! ```no_run
//! use sash::{Dispatcher, DispatcherEventKind};
//!
//! let dispatcher = Dispatcher::current();
//! let handle = dispatcher.handle();
//! dispatcher
//!     .events()
//!     .subscribe(DispatcherEventKind::Idle, move |_| handle.shutdown());
//! dispatcher.run();
//! ```

pub mod dispatch;
pub mod error;
pub mod events;
pub mod platform;

// Re-export the working set so most users need a single `use sash::...`.
pub use dispatch::{
    Dispatcher, DispatcherHandle, DispatcherObject, MessagePump, PumpWait, PumpWaker, TickEvent,
    Timer, TimerId, WaitPump,
};
pub use error::{Error, Result};
pub use events::{
    DispatcherEvent, DispatcherEventKind, Event, EventHub, EventKind, EventRecord, MouseButton,
    PanicReport, Subscription, WindowId,
};
