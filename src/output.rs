//! Output channel: a text buffer in front of the console.
//!
//! Everything printed or escaped in buffered mode accumulates in memory
//! until [`Output::flush`] writes it to the sink in a single `write_all`.
//! The buffer is empty after every flush, including a failed one.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use crate::ansi::{self, Escape};
use crate::error::Result;
use crate::keymap::ByteSource;
use crate::span::Span;

/// Buffered writer for text and escape sequences.
pub struct Output {
    buffer: String,
    sink: Box<dyn Write>,
}

impl Output {
    /// Output that writes to `sink` on flush.
    pub fn new(sink: impl Write + 'static) -> Self {
        Output {
            buffer: String::new(),
            sink: Box::new(sink),
        }
    }

    /// Output bound to the process's standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Append text to the buffer.
    pub fn print(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Append a span, rendering its escapes inline.
    pub fn print_span(&mut self, span: &Span) {
        self.buffer.push_str(&span.to_string());
    }

    /// Buffered escape: appended, executed on the next flush.
    pub fn escape(&mut self, esc: &Escape) {
        self.buffer.push_str(esc.as_str());
    }

    /// Immediate escape: written and flushed to the sink right away,
    /// bypassing (and not disturbing) the buffer.
    pub fn escape_now(&mut self, esc: &Escape) -> Result<()> {
        self.sink.write_all(esc.as_str().as_bytes())?;
        self.sink.flush()?;
        Ok(())
    }

    /// Write the whole buffer as one unit and empty it.
    pub fn flush(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.buffer);
        if !pending.is_empty() {
            self.sink.write_all(pending.as_bytes())?;
        }
        self.sink.flush()?;
        Ok(())
    }

    /// Text waiting for the next flush.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Drop buffered output without writing it.
    pub fn discard(&mut self) {
        self.buffer.clear();
    }

    // ------------------------------------------------------------------------
    // Buffered helpers
    // ------------------------------------------------------------------------

    pub fn clear(&mut self) {
        self.escape(&ansi::clear());
    }

    pub fn home(&mut self) {
        self.escape(&ansi::home());
    }

    /// Move to zero-based absolute column `x`, row `y`.
    pub fn cursor_to(&mut self, x: u16, y: u16) {
        self.escape(&ansi::cursor_to(x, y));
    }

    pub fn hide_cursor(&mut self) {
        self.escape(&ansi::hide_cursor());
    }

    pub fn show_cursor(&mut self) {
        self.escape(&ansi::show_cursor());
    }

    pub fn reset_style(&mut self) {
        self.escape(&ansi::reset());
    }

    /// Synchronously query the cursor position.
    ///
    /// Writes the request immediately, then blocks on `input` until the
    /// `ESC [ row ; col R` reply is read. Returns zero-based
    /// `(column, row)`, or `None` when the reply is not of that shape.
    pub fn cursor_position(&mut self, input: &mut dyn ByteSource) -> Result<Option<(u16, u16)>> {
        self.escape_now(&ansi::request_cursor_position())?;

        if input.read_byte()? != 0x1b || input.read_byte()? != b'[' {
            return Ok(None);
        }
        let Some(row) = read_number(input, b';')? else {
            return Ok(None);
        };
        let Some(col) = read_number(input, b'R')? else {
            return Ok(None);
        };
        Ok(Some((col.saturating_sub(1), row.saturating_sub(1))))
    }
}

/// Read ASCII digits up to `terminator`.
fn read_number(input: &mut dyn ByteSource, terminator: u8) -> Result<Option<u16>> {
    let mut digits = String::new();
    loop {
        let byte = input.read_byte()?;
        if byte == terminator {
            return Ok(digits.parse().ok());
        }
        if !byte.is_ascii_digit() || digits.len() >= 5 {
            return Ok(None);
        }
        digits.push(byte as char);
    }
}

impl std::fmt::Debug for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Output").field("buffer", &self.buffer).finish_non_exhaustive()
    }
}

// ============================================================================
// CAPTURE SINK
// ============================================================================

/// In-memory sink whose contents stay readable after being handed to an
/// [`Output`]. Used to drive programs headless.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    /// Return and clear everything written so far.
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.0.borrow_mut());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
