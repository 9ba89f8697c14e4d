//! ANSI escape sequences.
//!
//! Every function here is pure: it builds an [`Escape`] value and nothing
//! else. A value does nothing until it is handed to
//! [`Output::escape`](crate::output::Output::escape) (buffered),
//! [`Output::escape_now`](crate::output::Output::escape_now) (immediate),
//! or embedded in a [`Span`](crate::span::Span) for later rendering.
//!
//! Coordinates taken by [`cursor_to`] are zero-based; the wire form is
//! 1-based.

use std::borrow::Cow;
use std::fmt;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Escape character.
pub const ESC: &str = "\x1b";

/// Control Sequence Introducer.
pub const CSI: &str = "\x1b[";

// ============================================================================
// ESCAPE VALUE
// ============================================================================

/// A complete escape sequence, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Escape(Cow<'static, str>);

impl Escape {
    /// `CSI` followed by `code`.
    pub fn csi(code: impl fmt::Display) -> Self {
        Escape(Cow::Owned(format!("{CSI}{code}")))
    }

    /// A fixed sequence, written verbatim.
    pub const fn raw(seq: &'static str) -> Self {
        Escape(Cow::Borrowed(seq))
    }

    /// The sequence as written to the terminal.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Escape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SCREEN AND CURSOR
// ============================================================================

pub fn clear() -> Escape {
    Escape::raw("\x1b[2J")
}

pub fn home() -> Escape {
    Escape::raw("\x1b[H")
}

/// Move the cursor to zero-based column `x`, row `y`.
pub fn cursor_to(x: u16, y: u16) -> Escape {
    Escape::csi(format_args!("{};{}H", u32::from(y) + 1, u32::from(x) + 1))
}

pub fn hide_cursor() -> Escape {
    Escape::raw("\x1b[?25l")
}

pub fn show_cursor() -> Escape {
    Escape::raw("\x1b[?25h")
}

/// Save the cursor position (DEC).
pub fn save_cursor() -> Escape {
    Escape::raw("\x1b7")
}

/// Restore the cursor position (DEC).
pub fn restore_cursor() -> Escape {
    Escape::raw("\x1b8")
}

/// Save the screen contents.
pub fn save_screen() -> Escape {
    Escape::raw("\x1b[?47h")
}

/// Restore the screen contents saved by [`save_screen`].
pub fn restore_screen() -> Escape {
    Escape::raw("\x1b[?47l")
}

pub fn enter_alternate_screen() -> Escape {
    Escape::raw("\x1b[?1049h")
}

pub fn leave_alternate_screen() -> Escape {
    Escape::raw("\x1b[?1049l")
}

/// Stop the terminal from wrapping at the right margin.
pub fn disable_line_wrap() -> Escape {
    Escape::raw("\x1b[?7l")
}

pub fn enable_line_wrap() -> Escape {
    Escape::raw("\x1b[?7h")
}

/// Ask the terminal to report the cursor position (`ESC [ row ; col R`).
pub fn request_cursor_position() -> Escape {
    Escape::raw("\x1b[6n")
}

// ============================================================================
// STYLE
// ============================================================================

/// Text attribute with distinct enable and disable codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Bold,
    Dim,
    Italic,
    Underline,
    Blink,
    Invert,
    Hidden,
    Strikethrough,
}

impl Attribute {
    pub const ALL: [Attribute; 8] = [
        Attribute::Bold,
        Attribute::Dim,
        Attribute::Italic,
        Attribute::Underline,
        Attribute::Blink,
        Attribute::Invert,
        Attribute::Hidden,
        Attribute::Strikethrough,
    ];

    /// SGR code that turns the attribute on.
    pub fn on_code(self) -> u8 {
        match self {
            Attribute::Bold => 1,
            Attribute::Dim => 2,
            Attribute::Italic => 3,
            Attribute::Underline => 4,
            Attribute::Blink => 5,
            Attribute::Invert => 7,
            Attribute::Hidden => 8,
            Attribute::Strikethrough => 9,
        }
    }

    /// SGR code that turns the attribute off. Bold and dim share 22.
    pub fn off_code(self) -> u8 {
        match self {
            Attribute::Bold | Attribute::Dim => 22,
            Attribute::Italic => 23,
            Attribute::Underline => 24,
            Attribute::Blink => 25,
            Attribute::Invert => 27,
            Attribute::Hidden => 28,
            Attribute::Strikethrough => 29,
        }
    }
}

/// The eight standard colors plus the terminal default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    Default,
}

impl Color {
    fn offset(self) -> u8 {
        match self {
            Color::Black => 0,
            Color::Red => 1,
            Color::Green => 2,
            Color::Yellow => 3,
            Color::Blue => 4,
            Color::Magenta => 5,
            Color::Cyan => 6,
            Color::White => 7,
            Color::Default => 9,
        }
    }

    pub fn fg_code(self) -> u8 {
        30 + self.offset()
    }

    pub fn bg_code(self) -> u8 {
        40 + self.offset()
    }
}

fn sgr(codes: impl Iterator<Item = u8>) -> Escape {
    let joined: Vec<String> = codes.map(|c| c.to_string()).collect();
    Escape::csi(format_args!("{}m", joined.join(";")))
}

/// Enable every attribute in `attrs` with a single SGR sequence.
pub fn enable(attrs: &[Attribute]) -> Escape {
    sgr(attrs.iter().map(|a| a.on_code()))
}

/// Disable every attribute in `attrs` with a single SGR sequence.
pub fn disable(attrs: &[Attribute]) -> Escape {
    sgr(attrs.iter().map(|a| a.off_code()))
}

pub fn fg(color: Color) -> Escape {
    sgr(std::iter::once(color.fg_code()))
}

pub fn bg(color: Color) -> Escape {
    sgr(std::iter::once(color.bg_code()))
}

pub fn reset_fg() -> Escape {
    fg(Color::Default)
}

pub fn reset_bg() -> Escape {
    bg(Color::Default)
}

/// Reset every attribute and color.
pub fn reset() -> Escape {
    Escape::raw("\x1b[0m")
}

/// Default highlight for the focused row of a menu or dialog: bold yellow.
pub fn highlight() -> Vec<Escape> {
    vec![enable(&[Attribute::Bold]), fg(Color::Yellow)]
}

// ============================================================================
// TESTS
// ============================================================================
