//! Crate-wide error type.
//!
//! Every fallible operation returns [`Result`]. Screen hooks use the same
//! type, so a fault raised by application code travels the same path as
//! an I/O failure and reaches the loop's top-level handler.

use std::io;

use thiserror::Error;

/// Errors raised by the framework or by screens running inside it.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on the console or the input source.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed JSON configuration.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A key name that does not parse (e.g. in a config file).
    #[error("unknown key name: {0:?}")]
    KeyName(String),

    /// Configuration values that parse but cannot be used.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Failure raised by application screen code.
    #[error("{0}")]
    Screen(String),

    /// A fault caught at the top of the main loop after the terminal was
    /// restored. Carries the rendered description of the original fault.
    #[error("program fault: {0}")]
    Fault(String),
}

impl Error {
    /// Convenience constructor for application screens.
    pub fn screen(msg: impl Into<String>) -> Self {
        Error::Screen(msg.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
