//! Screens behind the `demo` and `keys` commands.
//!
//! The demo edits a small in-memory profile through every widget: a home
//! menu rebuilt on each entry, form and PIN dialogs, a confirmation, a
//! message, and a stopwatch driven by `update`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::ansi::{self, Attribute, Color, Escape};
use crate::error::Result;
use crate::keys::Key;
use crate::program::{Context, Screen, ScreenBox};
use crate::span::Span;
use crate::widgets::{Dialog, Field, Menu, MenuItem, Message, Value, masked};

// ============================================================================
// PROFILE
// ============================================================================

/// Highlight style of the home menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Underline,
    Bold,
    Inverse,
}

impl Theme {
    pub const NAMES: [&'static str; 3] = ["underline", "bold", "inverse"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "underline" => Some(Theme::Underline),
            "bold" => Some(Theme::Bold),
            "inverse" => Some(Theme::Inverse),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn decorator(self) -> Vec<Escape> {
        match self {
            Theme::Underline => vec![ansi::enable(&[Attribute::Underline])],
            Theme::Bold => ansi::highlight(),
            Theme::Inverse => vec![ansi::enable(&[Attribute::Invert])],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    pub age: i64,
    pub volume: f64,
    pub theme: Theme,
    pub pin: i64,
}

impl Default for Profile {
    fn default() -> Self {
        Profile {
            name: "guest".to_string(),
            age: 30,
            volume: 0.5,
            theme: Theme::Bold,
            pin: 1234,
        }
    }
}

pub type SharedProfile = Rc<RefCell<Profile>>;

fn accent(text: &str) -> Span {
    Span::styled(text, &[ansi::enable(&[Attribute::Bold]), ansi::fg(Color::Cyan)])
}

// ============================================================================
// HOME
// ============================================================================

/// Entry screen of the demo. Header, items and highlight follow the
/// profile, so they are rebuilt every time the screen is entered.
pub struct Home {
    profile: SharedProfile,
    menu: Menu,
}

impl Home {
    pub fn new(profile: SharedProfile) -> Self {
        Home {
            profile,
            menu: Menu::new("", Vec::new()),
        }
    }

    fn rebuild(&mut self) {
        let (header, theme) = {
            let p = self.profile.borrow();
            let header = Span::from("Hello, ").append(accent(&p.name)).text("\nPick a widget");
            (header, p.theme)
        };
        self.menu.set_header(header);
        self.menu.set_decorator(theme.decorator());
        self.menu.set_items(self.items());
    }

    fn items(&self) -> Vec<MenuItem> {
        let edit = Rc::clone(&self.profile);
        let unlock = Rc::clone(&self.profile);
        let reset = Rc::clone(&self.profile);
        let home = Rc::clone(&self.profile);
        vec![
            MenuItem::new("profile", move |ctx| {
                ctx.switch_to(Box::new(profile_dialog(&edit)));
                Ok(())
            }),
            MenuItem::new("unlock", move |ctx| {
                ctx.switch_to(Box::new(unlock_dialog(&unlock)));
                Ok(())
            }),
            MenuItem::new("stopwatch", |ctx| {
                ctx.switch_to(Box::new(Stopwatch::default()));
                Ok(())
            }),
            MenuItem::new("reset", move |ctx| {
                ctx.switch_to(Box::new(reset_dialog(&reset)));
                Ok(())
            }),
            MenuItem::new("about", move |ctx| {
                let back = Home::new(Rc::clone(&home));
                ctx.switch_to(Box::new(Message::new(about()).then(Box::new(back))));
                Ok(())
            }),
            MenuItem::new("quit", |ctx| {
                ctx.quit();
                Ok(())
            }),
        ]
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }
}

impl Screen for Home {
    fn enter(&mut self, ctx: &mut Context, previous: Option<ScreenBox>) -> Result<()> {
        self.rebuild();
        self.menu.enter(ctx, previous)
    }

    fn keypress(&mut self, ctx: &mut Context, key: Key) -> Result<()> {
        self.menu.keypress(ctx, key)
    }
}

fn about() -> Span {
    Span::from("winter ")
        .append(accent(env!("CARGO_PKG_VERSION")))
        .text("\nmenus, dialogs, messages\n\nPress [enter] to go back")
}

// ============================================================================
// DIALOGS
// ============================================================================

fn profile_dialog(profile: &SharedProfile) -> Dialog {
    let fields = {
        let p = profile.borrow();
        vec![
            Field::text("name")
                .value(p.name.clone())
                .validate(|v| v.as_text().is_some_and(|s| !s.is_empty() && s.chars().count() <= 12)),
            Field::int("age")
                .value(p.age.to_string())
                .validate(|v| v.as_int().is_some_and(|n| (0..=150).contains(&n))),
            Field::float("volume")
                .value(p.volume.to_string())
                .validate(|v| v.as_float().is_some_and(|x| (0.0..=1.0).contains(&x))),
            Field::text("theme").choices(Theme::NAMES).selected(p.theme.index()),
        ]
    };

    let target = Rc::clone(profile);
    Dialog::new("Edit profile", fields, move |values| {
        let [Value::Text(name), Value::Int(age), Value::Float(volume), Value::Text(theme)] = values else {
            return Span::from("Nothing saved");
        };
        let mut p = target.borrow_mut();
        p.name = name.clone();
        p.age = *age;
        p.volume = *volume;
        if let Some(theme) = Theme::from_name(theme) {
            p.theme = theme;
        }
        Span::from("Saved profile of ").append(accent(name))
    })
}

fn unlock_dialog(profile: &SharedProfile) -> Dialog {
    let pin = Field::int("PIN")
        .validate(|v| v.as_int().is_some_and(|p| (0..10_000).contains(&p)))
        .obfuscate(|p| masked(p, 4));

    let profile = Rc::clone(profile);
    Dialog::new("Unlock", vec![pin], move |values| {
        let correct = profile.borrow().pin;
        match values.first().and_then(Value::as_int) {
            Some(entered) if entered == correct => Span::styled("Unlocked", &[ansi::fg(Color::Green)]),
            _ => Span::styled("Wrong PIN", &[ansi::fg(Color::Red)]),
        }
    })
}

fn reset_dialog(profile: &SharedProfile) -> Dialog {
    let profile = Rc::clone(profile);
    Dialog::confirm("Reset profile?", move |values| {
        if values.first().and_then(Value::as_bool) == Some(true) {
            *profile.borrow_mut() = Profile::default();
            Span::from("Profile reset")
        } else {
            Span::from("Operation cancelled")
        }
    })
}

// ============================================================================
// STOPWATCH
// ============================================================================

/// Counts time in `update` while running. Space starts and stops,
/// backspace resets, the back key returns.
#[derive(Default)]
pub struct Stopwatch {
    elapsed: Duration,
    running: bool,
    shown: Option<u128>,
    previous: Option<ScreenBox>,
}

const TIME_ROW: u16 = 6;

impl Stopwatch {
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Redraw the time when the displayed tenth changed.
    fn draw_time(&mut self, ctx: &mut Context) {
        let tenths = self.elapsed.as_millis() / 100;
        if self.shown == Some(tenths) {
            return;
        }
        self.shown = Some(tenths);
        ctx.print_line(TIME_ROW, &Span::styled(format_elapsed(self.elapsed), &ansi::highlight()));
    }
}

/// `mm:ss.t`
pub fn format_elapsed(elapsed: Duration) -> String {
    let tenths = elapsed.as_millis() / 100;
    format!("{:02}:{:02}.{}", tenths / 600, (tenths / 10) % 60, tenths % 10)
}

impl Screen for Stopwatch {
    fn enter(&mut self, ctx: &mut Context, previous: Option<ScreenBox>) -> Result<()> {
        self.previous = previous;
        self.shown = None;
        ctx.clear()?;
        ctx.print_line(1, &accent("Stopwatch"));
        ctx.print_line(3, &Span::from("[space] start/stop"));
        ctx.print_line(4, &Span::from("[backspace] reset"));
        self.draw_time(ctx);
        Ok(())
    }

    fn update(&mut self, ctx: &mut Context, dt: Duration) -> Result<()> {
        if self.running {
            self.elapsed += dt;
        }
        self.draw_time(ctx);
        Ok(())
    }

    fn keypress(&mut self, ctx: &mut Context, key: Key) -> Result<()> {
        if key == ctx.back_key() {
            if let Some(previous) = self.previous.take() {
                ctx.switch_to(previous);
            }
            return Ok(());
        }
        match key {
            Key::Space => self.running = !self.running,
            Key::Backspace => self.elapsed = Duration::ZERO,
            _ => {}
        }
        Ok(())
    }
}

// ============================================================================
// KEY INSPECTOR
// ============================================================================

/// Shows the most recent keys with their symbolic names.
#[derive(Debug, Default)]
pub struct KeyInspector {
    recent: VecDeque<Key>,
    count: u64,
}

const RECENT: usize = 8;
const FIRST_KEY_ROW: u16 = 5;

impl KeyInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recent(&self) -> impl Iterator<Item = &Key> {
        self.recent.iter()
    }

    fn draw(&self, ctx: &mut Context) {
        ctx.print_line(3, &Span::from(format!("{} keys", self.count)));
        let rows = usize::from(ctx.height().saturating_sub(FIRST_KEY_ROW)).min(RECENT);
        for i in 0..rows {
            let line = match self.recent.get(i) {
                Some(key) if i == 0 => Span::styled(describe(key), &ansi::highlight()),
                Some(key) => Span::from(describe(key)),
                None => Span::new(),
            };
            ctx.print_line(FIRST_KEY_ROW + i as u16, &line);
        }
    }
}

fn describe(key: &Key) -> String {
    format!("{:<10} {key:?}", key.to_string())
}

impl Screen for KeyInspector {
    fn enter(&mut self, ctx: &mut Context, _previous: Option<ScreenBox>) -> Result<()> {
        ctx.clear()?;
        let hint = Span::from("Press any key, ")
            .append(accent(&ctx.kill_key().to_string()))
            .text(" quits");
        ctx.print_line(1, &hint);
        self.draw(ctx);
        Ok(())
    }

    fn keypress(&mut self, ctx: &mut Context, key: Key) -> Result<()> {
        self.recent.push_front(key);
        self.recent.truncate(RECENT);
        self.count += 1;
        self.draw(ctx);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
