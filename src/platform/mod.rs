//! Native platform integration, compiled per target.
//!
//! Everything under here touches FFI; the dispatch core never does. Other
//! targets run headless on [`crate::WaitPump`].

#[cfg(target_os = "windows")]
pub mod windows;
