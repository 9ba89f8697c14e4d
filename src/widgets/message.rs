use crate::error::Result;
use crate::keys::Key;
use crate::program::{Context, Screen, ScreenBox};
use crate::span::Span;

/// Centered text. `enter` continues to the next screen, if there is one;
/// otherwise only the kill key leaves.
pub struct Message {
    text: Span,
    next: Option<ScreenBox>,
}

impl Message {
    pub fn new(text: impl Into<Span>) -> Self {
        Message { text: text.into(), next: None }
    }

    pub fn then(mut self, next: ScreenBox) -> Self {
        self.next = Some(next);
        self
    }

    pub fn with_next(mut self, next: Option<ScreenBox>) -> Self {
        self.next = next;
        self
    }

    pub fn text(&self) -> &Span {
        &self.text
    }

    pub fn is_terminal(&self) -> bool {
        self.next.is_none()
    }

    /// Interior row of the first line: the block sits around the middle.
    fn top_row(&self, height: u16) -> u16 {
        let above = self.text.newline_count().div_ceil(2) as u16;
        (height / 2).saturating_sub(above)
    }
}

impl Default for Message {
    fn default() -> Self {
        Message::new("Something went wrong...\nPress [ESC] to exit")
    }
}

impl Screen for Message {
    fn enter(&mut self, ctx: &mut Context, _previous: Option<ScreenBox>) -> Result<()> {
        ctx.clear()?;
        let top = self.top_row(ctx.height());
        for (i, line) in self.text.lines().iter().enumerate() {
            ctx.print_line(top + i as u16, line);
        }
        Ok(())
    }

    fn keypress(&mut self, ctx: &mut Context, key: Key) -> Result<()> {
        if key == Key::Enter {
            if let Some(next) = self.next.take() {
                ctx.switch_to(next);
            }
        }
        Ok(())
    }
}
