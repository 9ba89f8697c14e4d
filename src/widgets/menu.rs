use std::fmt;

use crate::ansi::Escape;
use crate::error::Result;
use crate::keys::Key;
use crate::program::{Context, Screen, ScreenBox};
use crate::span::Span;

use super::{default_decorator, draw_header, first_row};

/// Command run when a menu item is chosen. Usually queues a transition.
pub type Action = Box<dyn FnMut(&mut Context) -> Result<()>>;

pub struct MenuItem {
    name: String,
    action: Option<Action>,
}

impl MenuItem {
    pub fn new(name: impl Into<String>, action: impl FnMut(&mut Context) -> Result<()> + 'static) -> Self {
        MenuItem { name: name.into(), action: Some(Box::new(action)) }
    }

    /// Item that does nothing when chosen.
    pub fn inert(name: impl Into<String>) -> Self {
        MenuItem { name: name.into(), action: None }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn select(&mut self, ctx: &mut Context) -> Result<()> {
        match self.action.as_mut() {
            Some(action) => action(ctx),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItem")
            .field("name", &self.name)
            .field("action", &self.action.is_some())
            .finish()
    }
}

/// Header plus a vertical list of items. `up`/`down` move the selection
/// without wrapping, `enter` runs the selected item.
///
/// Applications that rebuild their items on entry wrap a `Menu` in their
/// own screen and forward the hooks.
pub struct Menu {
    header: Span,
    items: Vec<MenuItem>,
    selected: usize,
    decorator: Vec<Escape>,
}

impl Menu {
    pub fn new(header: impl Into<Span>, items: Vec<MenuItem>) -> Self {
        Menu {
            header: header.into(),
            items,
            selected: 0,
            decorator: default_decorator(),
        }
    }

    pub fn decorator(mut self, decorator: Vec<Escape>) -> Self {
        self.decorator = decorator;
        self
    }

    pub fn set_decorator(&mut self, decorator: Vec<Escape>) {
        self.decorator = decorator;
    }

    pub fn set_header(&mut self, header: impl Into<Span>) {
        self.header = header.into();
    }

    /// Replace the items, keeping the selection inside the new list.
    pub fn set_items(&mut self, items: Vec<MenuItem>) {
        self.items = items;
        self.selected = self.selected.min(self.items.len().saturating_sub(1));
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    fn draw_items(&self, ctx: &mut Context) {
        let top = first_row(&self.header);
        for (i, item) in self.items.iter().enumerate() {
            let line = if i == self.selected {
                Span::styled(item.name.as_str(), &self.decorator)
            } else {
                Span::from(item.name.as_str())
            };
            ctx.print_line(top + i as u16, &line);
        }
    }
}

impl Screen for Menu {
    fn enter(&mut self, ctx: &mut Context, _previous: Option<ScreenBox>) -> Result<()> {
        ctx.clear()?;
        draw_header(ctx, &self.header);
        self.draw_items(ctx);
        Ok(())
    }

    fn keypress(&mut self, ctx: &mut Context, key: Key) -> Result<()> {
        match key {
            Key::Enter => {
                return match self.items.get_mut(self.selected) {
                    Some(item) => item.select(ctx),
                    None => Ok(()),
                };
            }
            Key::Up => self.selected = self.selected.saturating_sub(1),
            Key::Down => {
                if self.selected + 1 < self.items.len() {
                    self.selected += 1;
                }
            }
            _ => {}
        }
        self.draw_items(ctx);
        Ok(())
    }
}
