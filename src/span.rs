//! Styled text with embedded, not-yet-executed escape sequences.
//!
//! A [`Span`] is an ordered list of text and escape segments. Only text
//! counts toward the visible width, so styled text can be measured,
//! centered and cropped without the escapes leaking into the arithmetic.

use std::fmt;

use crate::ansi::{self, Escape};

/// One piece of a [`Span`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Visible characters.
    Text(String),
    /// Zero-width escape sequence.
    Escape(Escape),
}

/// Text interleaved with escape sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Span {
    segments: Vec<Segment>,
}

impl Span {
    pub fn new() -> Self {
        Self::default()
    }

    /// `text` wrapped in `styles` and followed by a full style reset.
    pub fn styled(text: impl Into<String>, styles: &[Escape]) -> Self {
        let mut span = Span::new();
        for style in styles {
            span.push_escape(style.clone());
        }
        span.push_text(text);
        span.push_escape(ansi::reset());
        span
    }

    /// Builder form of [`push_text`](Self::push_text).
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.push_text(text);
        self
    }

    /// Builder form of [`push_escape`](Self::push_escape).
    pub fn escape(mut self, esc: Escape) -> Self {
        self.push_escape(esc);
        self
    }

    /// Append another span.
    pub fn append(mut self, other: impl Into<Span>) -> Self {
        self.extend(other.into());
        self
    }

    /// Append text, merging with a trailing text segment.
    pub fn push_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(Segment::Text(last)) => last.push_str(&text),
            _ => self.segments.push(Segment::Text(text)),
        }
    }

    pub fn push_escape(&mut self, esc: Escape) {
        self.segments.push(Segment::Escape(esc));
    }

    pub fn extend(&mut self, other: Span) {
        for segment in other.segments {
            match segment {
                Segment::Text(t) => self.push_text(t),
                Segment::Escape(e) => self.push_escape(e),
            }
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of visible characters.
    pub fn width(&self) -> usize {
        visible_width(self)
    }

    /// The visible text with every escape removed.
    pub fn plain(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Text(t) => Some(t.as_str()),
                Segment::Escape(_) => None,
            })
            .collect()
    }

    /// Split at newlines. Escapes stay on the line where they appear.
    /// Always returns at least one (possibly empty) line.
    pub fn lines(&self) -> Vec<Span> {
        let mut lines = vec![Span::new()];
        for segment in &self.segments {
            match segment {
                Segment::Escape(e) => {
                    if let Some(line) = lines.last_mut() {
                        line.push_escape(e.clone());
                    }
                }
                Segment::Text(t) => {
                    let mut parts = t.split('\n');
                    if let (Some(first), Some(line)) = (parts.next(), lines.last_mut()) {
                        line.push_text(first);
                    }
                    for part in parts {
                        lines.push(Span::new().text(part));
                    }
                }
            }
        }
        lines
    }

    /// Number of lines [`lines`](Self::lines) would return.
    pub fn line_count(&self) -> usize {
        1 + self.newline_count()
    }

    pub fn newline_count(&self) -> usize {
        self.plain().matches('\n').count()
    }
}

impl From<&str> for Span {
    fn from(text: &str) -> Self {
        Span::new().text(text)
    }
}

impl From<String> for Span {
    fn from(text: String) -> Self {
        Span::new().text(text)
    }
}

impl From<Escape> for Span {
    fn from(esc: Escape) -> Self {
        Span::new().escape(esc)
    }
}

/// Renders the escape sequences inline, ready for the terminal.
impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => f.write_str(t)?,
                Segment::Escape(e) => write!(f, "{e}")?,
            }
        }
        Ok(())
    }
}

// ============================================================================
// LAYOUT
// ============================================================================

/// Width of `span` in characters, ignoring escapes.
pub fn visible_width(span: &Span) -> usize {
    span.segments
        .iter()
        .map(|s| match s {
            Segment::Text(t) => t.chars().count(),
            Segment::Escape(_) => 0,
        })
        .sum()
}

/// Pad or crop `span` to exactly `width` visible characters.
///
/// Narrower text gets `floor(extra / 2)` pad characters on the left and
/// `ceil(extra / 2)` on the right. Wider text keeps `width` characters
/// starting at `floor((len - width) / 2)`. Escapes are never dropped.
pub fn center(span: &Span, width: usize, pad: char) -> Span {
    let len = visible_width(span);
    if len < width {
        let extra = width - len;
        let left = extra / 2;
        let right = extra - left;
        let mut out = Span::new().text(pad_str(pad, left));
        out.extend(span.clone());
        out.push_text(pad_str(pad, right));
        out
    } else if len > width {
        crop(span, (len - width) / 2, width)
    } else {
        span.clone()
    }
}

/// [`center`] over plain text.
pub fn center_str(text: &str, width: usize, pad: char) -> String {
    center(&Span::from(text), width, pad).plain()
}

fn pad_str(pad: char, n: usize) -> String {
    std::iter::repeat_n(pad, n).collect()
}

fn crop(span: &Span, offset: usize, width: usize) -> Span {
    let mut out = Span::new();
    let mut index = 0;
    for segment in &span.segments {
        match segment {
            Segment::Escape(e) => out.push_escape(e.clone()),
            Segment::Text(t) => {
                let kept: String = t
                    .chars()
                    .enumerate()
                    .filter(|(i, _)| (offset..offset + width).contains(&(index + i)))
                    .map(|(_, c)| c)
                    .collect();
                index += t.chars().count();
                out.push_text(kept);
            }
        }
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================
