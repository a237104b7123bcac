//! Crate-wide error type for fallible platform operations.
//!
//! The dispatch core itself is infallible by construction; errors only arise
//! at the native boundary (creating events, windows, classes), so the type
//! stays small.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A native platform call failed.
    #[error("{function} failed (error {code:#010x})")]
    Platform { function: &'static str, code: u32 },
}

impl Error {
    /// Wrap a failed native call, tagging it with the API name.
    pub fn platform(function: &'static str, code: u32) -> Self {
        Error::Platform { function, code }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
