//! winter: a minimal terminal UI micro-framework.
//!
//! ANSI output buffering, raw key decoding, and a screen state machine
//! with menu, dialog and message widgets.

pub mod ansi;
pub mod config;
pub mod demo;
pub mod error;
pub mod keymap;
pub mod keys;
pub mod output;
pub mod platform;
pub mod program;
pub mod report;
pub mod span;
pub mod widgets;

pub use config::ProgramConfig;
pub use error::{Error, Result};
pub use keys::Key;
pub use program::{Context, Program, Screen, ScreenBox};
pub use span::Span;
