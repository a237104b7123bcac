//! Cooperative single-threaded dispatch: the event loop, its work queue,
//! timers, thread-affinity helpers, and the injected message pump.
//!
//! The public surface is intentionally small: [`Dispatcher`] for the owning
//! thread, [`DispatcherHandle`] for everyone else, [`Timer`] for recurring
//! work, and [`MessagePump`] for embedders supplying their own native loop
//! integration.

mod context;
mod dispatcher;
mod handle;
pub mod pump;
mod timer;
mod work_queue;

pub use context::DispatcherObject;
pub use dispatcher::Dispatcher;
pub use handle::DispatcherHandle;
pub use pump::{MessagePump, PumpWait, PumpWaker, WaitPump};
pub use timer::{TickEvent, Timer, TimerId};
