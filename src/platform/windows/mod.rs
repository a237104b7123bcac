//! Win32 backing for the dispatcher: the native message pump and top-level
//! windows whose messages feed the event hubs.

mod pump;
mod translate;
mod window;

pub use pump::Win32MessagePump;
pub use window::Window;
