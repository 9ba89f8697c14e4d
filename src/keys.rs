//! Symbolic keys.
//!
//! A [`Key`] is what the decoder hands to screens. Its `Display` form is
//! the symbolic name (`enter`, `up`, `ctrl+z`, `f5`) or, for literal keys,
//! the character itself. `FromStr` accepts the same names, which is how
//! kill and back keys are written in configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Literal character with no symbolic mapping.
    Char(char),
    Space,
    Enter,
    Tab,
    Escape,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    /// Numeric keypad 5 with num lock off.
    Center,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    /// Function key, 1-based.
    F(u8),
    /// Control plus a lowercase letter.
    Ctrl(char),
    /// A byte that maps to nothing and is not a character.
    Byte(u8),
}

impl Key {
    /// The key a single typed character stands for, using the names the
    /// decoder gives to whitespace and control bytes.
    pub fn from_char(c: char) -> Self {
        match c {
            ' ' => Key::Space,
            '\t' => Key::Tab,
            '\r' => Key::Enter,
            '\x1b' => Key::Escape,
            '\x08' | '\x7f' => Key::Backspace,
            '\x01'..='\x1a' => Key::Ctrl((b'a' + (c as u8 - 1)) as char),
            _ => Key::Char(c),
        }
    }

    /// The character a text field should receive for this key, if any.
    pub fn as_char(self) -> Option<char> {
        match self {
            Key::Char(c) => Some(c),
            Key::Space => Some(' '),
            _ => None,
        }
    }
}

const NAMED: &[(Key, &str)] = &[
    (Key::Space, "space"),
    (Key::Enter, "enter"),
    (Key::Tab, "tab"),
    (Key::Escape, "escape"),
    (Key::Backspace, "backspace"),
    (Key::Up, "up"),
    (Key::Down, "down"),
    (Key::Left, "left"),
    (Key::Right, "right"),
    (Key::Center, "center"),
    (Key::Home, "home"),
    (Key::End, "end"),
    (Key::PageUp, "pageup"),
    (Key::PageDown, "pagedown"),
    (Key::Insert, "insert"),
    (Key::Delete, "delete"),
];

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{c}"),
            Key::F(n) => write!(f, "f{n}"),
            Key::Ctrl(c) => write!(f, "ctrl+{c}"),
            Key::Byte(b) => write!(f, "0x{b:02x}"),
            named => {
                let name = NAMED
                    .iter()
                    .find(|(k, _)| k == named)
                    .map(|(_, n)| *n)
                    .unwrap_or("?");
                f.write_str(name)
            }
        }
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(Key::from_char(c));
        }

        let lower = s.to_ascii_lowercase();
        if let Some((key, _)) = NAMED.iter().find(|(_, n)| *n == lower) {
            return Ok(*key);
        }
        if let Some(letter) = lower.strip_prefix("ctrl+") {
            let mut letters = letter.chars();
            if let (Some(c @ 'a'..='z'), None) = (letters.next(), letters.next()) {
                return Ok(Key::Ctrl(c));
            }
        }
        if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
            if (1..=12).contains(&n) {
                return Ok(Key::F(n));
            }
        }
        if let Some(hex) = lower.strip_prefix("0x") {
            if let Ok(b) = u8::from_str_radix(hex, 16) {
                return Ok(Key::Byte(b));
            }
        }
        Err(Error::KeyName(s.to_string()))
    }
}

impl Serialize for Key {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// TESTS
// ============================================================================
