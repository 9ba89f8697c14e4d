//! Generic screens built on the screen contract.
//!
//! - [`Message`]: centered text, `enter` continues to an optional next screen
//! - [`Menu`]: header plus a list of selectable actions
//! - [`Dialog`]: header plus typed [`Field`]s bound to an operation
//!
//! All of them draw inside the frame: header lines start at interior row 1,
//! list rows follow after one blank row.

mod dialog;
mod menu;
mod message;

pub use dialog::{Destination, Dialog, Field, FieldKind, Operation, Value, masked};
pub use menu::{Action, Menu, MenuItem};
pub use message::Message;

use crate::ansi::{self, Escape};
use crate::program::Context;
use crate::span::Span;

/// Style applied to the selected row unless a widget is given its own.
pub fn default_decorator() -> Vec<Escape> {
    ansi::highlight()
}

/// Interior row of the first list entry below a header.
fn first_row(header: &Span) -> u16 {
    2 + header.line_count() as u16
}

fn draw_header(ctx: &mut Context, header: &Span) {
    for (i, line) in header.lines().iter().enumerate() {
        ctx.print_line(1 + i as u16, line);
    }
}
