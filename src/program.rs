//! Screen state machine and main loop.
//!
//! A [`Program`] owns exactly one current [`Screen`]. Screens never
//! switch directly: they queue the next screen on the [`Context`] and the
//! program applies the request as soon as the hook returns, running the
//! outgoing screen's `exit` before the incoming screen's `enter`.
//!
//! Loop, once per iteration:
//! 1. drain pending input, dispatching each key (the kill key only
//!    requests a stop, keys after it in the same batch still arrive)
//! 2. call `update` with the time since the previous iteration
//! 3. flush the output buffer
//!
//! Errors returned by hooks, and panics inside them, end the loop. The
//! console is restored either way and the fault is reported.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use crate::ansi;
use crate::config::ProgramConfig;
use crate::error::{Error, Result};
use crate::keymap::{KeyDecoder, KeyTable};
use crate::keys::Key;
use crate::output::Output;
use crate::platform::{self, RawMode, Stdin};
use crate::span::{self, Span};

/// Owned screen, as stored by the program and passed between screens.
pub type ScreenBox = Box<dyn Screen>;

// ============================================================================
// SCREEN CONTRACT
// ============================================================================

/// Lifecycle hooks of one state of the program. Every hook defaults to a
/// no-op.
pub trait Screen {
    /// Became current. `previous` is the screen that was current before,
    /// handed over by value: keep it to return to it later, or drop it.
    fn enter(&mut self, _ctx: &mut Context, _previous: Option<ScreenBox>) -> Result<()> {
        Ok(())
    }

    /// Called once per loop iteration with the elapsed time.
    fn update(&mut self, _ctx: &mut Context, _dt: Duration) -> Result<()> {
        Ok(())
    }

    fn keypress(&mut self, _ctx: &mut Context, _key: Key) -> Result<()> {
        Ok(())
    }

    /// About to stop being current. `next` is `None` when the program ends.
    fn exit(&mut self, _ctx: &mut Context, _next: Option<&dyn Screen>) -> Result<()> {
        Ok(())
    }

    /// Name used in log records.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

// ============================================================================
// CONTEXT
// ============================================================================

/// Everything a screen may touch while one of its hooks runs.
#[derive(Debug)]
pub struct Context {
    out: Output,
    width: u16,
    height: u16,
    title: Option<String>,
    kill_key: Key,
    back_key: Key,
    pending: VecDeque<ScreenBox>,
    running: bool,
}

impl std::fmt::Debug for dyn Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Context {
    pub fn new(config: &ProgramConfig, out: Output) -> Self {
        Context {
            out,
            width: config.width,
            height: config.height,
            title: config.title.clone(),
            kill_key: config.kill_key,
            back_key: config.back_key,
            pending: VecDeque::new(),
            running: false,
        }
    }

    pub fn out(&mut self) -> &mut Output {
        &mut self.out
    }

    /// Interior width of the frame.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Interior height of the frame.
    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Key that ends the loop. Screens never receive it.
    pub fn kill_key(&self) -> Key {
        self.kill_key
    }

    /// Key that sends dialogs back to where they came from.
    pub fn back_key(&self) -> Key {
        self.back_key
    }

    /// Queue a transition, applied when the current hook returns.
    pub fn switch_to(&mut self, next: ScreenBox) {
        self.pending.push_back(next);
    }

    #[cfg(test)]
    pub(crate) fn take_transition(&mut self) -> Option<ScreenBox> {
        self.pending.pop_front()
    }

    /// Ask the loop to stop after the current iteration.
    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Clear the console and redraw the frame, then flush.
    pub fn clear(&mut self) -> Result<()> {
        self.out.clear();
        self.out.reset_style();
        self.out.home();
        for (row, line) in frame_lines(self.width, self.height, self.title()).iter().enumerate() {
            self.out.cursor_to(0, row as u16);
            self.out.print(line);
        }
        self.out.flush()
    }

    /// Move to zero-based `col`, `row` inside the frame.
    pub fn move_to(&mut self, col: u16, row: u16) {
        self.out.cursor_to(col.saturating_add(1), row.saturating_add(1));
    }

    /// Print `line` centered across the interior at `row`.
    pub fn print_line(&mut self, row: u16, line: &Span) {
        self.move_to(0, row);
        let centered = span::center(line, usize::from(self.width), ' ');
        self.out.print_span(&centered);
    }
}

/// The double-line frame: top border with the optional title, `height`
/// interior rows, bottom border.
pub fn frame_lines(width: u16, height: u16, title: Option<&str>) -> Vec<String> {
    let width = usize::from(width);
    let caption = title.map(|t| format!(" {t} ")).unwrap_or_default();

    let mut lines = Vec::with_capacity(usize::from(height) + 2);
    lines.push(format!("╔{}╗", span::center_str(&caption, width, '═')));
    for _ in 0..height {
        lines.push(format!("║{}║", " ".repeat(width)));
    }
    lines.push(format!("╚{}╝", "═".repeat(width)));
    lines
}

// ============================================================================
// PROGRAM
// ============================================================================

/// The state machine plus the resources it drives.
pub struct Program {
    ctx: Context,
    decoder: KeyDecoder,
    tick: Duration,
    current: Option<ScreenBox>,
    last_tick: Instant,
    _raw: Option<RawMode>,
}

impl Program {
    /// Program over explicit output and input. Nothing touches the real
    /// console unless `out` and `decoder` do.
    pub fn new(config: &ProgramConfig, out: Output, decoder: KeyDecoder) -> Self {
        Program {
            ctx: Context::new(config, out),
            decoder,
            tick: config.tick(),
            current: None,
            last_tick: Instant::now(),
            _raw: None,
        }
    }

    /// Program on the process's console: raw mode, stdin, stdout, and the
    /// platform's native key table. Raw mode ends when the program drops.
    pub fn on_terminal(config: &ProgramConfig) -> Result<Self> {
        config.validate()?;
        if let Some((cols, rows)) = platform::console_size() {
            if cols < config.width.saturating_add(2) || rows < config.height.saturating_add(3) {
                tracing::warn!(
                    cols,
                    rows,
                    width = config.width,
                    height = config.height,
                    "console smaller than frame"
                );
            }
        }
        let raw = RawMode::enable()?;
        let decoder = KeyDecoder::new(KeyTable::native(), Stdin::new());
        let mut program = Program::new(config, Output::stdout(), decoder);
        program._raw = Some(raw);
        Ok(program)
    }

    pub fn context(&mut self) -> &mut Context {
        &mut self.ctx
    }

    pub fn current(&self) -> Option<&dyn Screen> {
        self.current.as_deref()
    }

    /// Make `next` current, then apply any transitions its hooks queued.
    pub fn switch_state(&mut self, next: ScreenBox) -> Result<()> {
        self.transition(next)?;
        self.apply_pending()
    }

    /// Ask the loop to stop after the current iteration.
    pub fn exit(&mut self) {
        self.ctx.quit();
    }

    /// Query the console's cursor position, zero-based `(column, row)`.
    pub fn cursor_position(&mut self) -> Result<Option<(u16, u16)>> {
        self.ctx.out.cursor_position(self.decoder.source_mut())
    }

    /// Run `initial` until the kill key or [`Context::quit`].
    ///
    /// Returns [`Error::Fault`] when a hook failed or panicked; the console
    /// has been restored and the fault written to it by then.
    pub fn run(&mut self, initial: ScreenBox) -> Result<()> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            platform::with_caught_panics(|| self.run_loop(initial))
        }));
        let fault = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err.to_string()),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };

        let restored = self.restore();
        match fault {
            None => restored,
            Some(message) => {
                tracing::error!(%message, "screen fault");
                self.report(&message);
                Err(Error::Fault(message))
            }
        }
    }

    fn run_loop(&mut self, initial: ScreenBox) -> Result<()> {
        tracing::info!(width = self.ctx.width, height = self.ctx.height, "program started");
        self.ctx.running = true;
        self.ctx.out.hide_cursor();
        self.ctx.out.escape(&ansi::disable_line_wrap());
        self.ctx.out.flush()?;
        self.ctx.clear()?;
        self.switch_state(initial)?;

        self.last_tick = Instant::now();
        while self.ctx.running {
            self.step()?;
        }

        if let Some(screen) = self.current.as_mut() {
            screen.exit(&mut self.ctx, None)?;
        }
        tracing::info!("program stopped");
        Ok(())
    }

    /// One loop iteration.
    fn step(&mut self) -> Result<()> {
        let mut wait = self.tick;
        while self.decoder.has_key(wait)? {
            wait = Duration::ZERO;
            let key = self.decoder.next_key()?;
            if key == self.ctx.kill_key {
                tracing::debug!(%key, "kill key pressed");
                self.ctx.quit();
                continue;
            }
            if let Some(screen) = self.current.as_mut() {
                screen.keypress(&mut self.ctx, key)?;
            }
            self.apply_pending()?;
        }

        let now = Instant::now();
        let dt = now.duration_since(self.last_tick);
        self.last_tick = now;
        if let Some(screen) = self.current.as_mut() {
            screen.update(&mut self.ctx, dt)?;
        }
        self.apply_pending()?;

        if !self.ctx.out.pending().is_empty() {
            self.ctx.out.flush()?;
        }
        Ok(())
    }

    fn transition(&mut self, mut next: ScreenBox) -> Result<()> {
        let previous = match self.current.take() {
            Some(mut outgoing) => {
                tracing::debug!(from = outgoing.name(), to = next.name(), "switching screen");
                outgoing.exit(&mut self.ctx, Some(next.as_ref()))?;
                Some(outgoing)
            }
            None => {
                tracing::debug!(to = next.name(), "entering first screen");
                None
            }
        };
        let entered = next.enter(&mut self.ctx, previous);
        self.current = Some(next);
        entered
    }

    fn apply_pending(&mut self) -> Result<()> {
        while let Some(next) = self.ctx.pending.pop_front() {
            self.transition(next)?;
        }
        Ok(())
    }

    /// Leave the console usable: plain style, cursor below the frame and
    /// visible, wrapping back on.
    fn restore(&mut self) -> Result<()> {
        let below_frame = self.ctx.height.saturating_add(2);
        let out = &mut self.ctx.out;
        out.reset_style();
        out.cursor_to(0, below_frame);
        out.escape(&ansi::enable_line_wrap());
        out.show_cursor();
        out.flush()
    }

    fn report(&mut self, message: &str) {
        let out = &mut self.ctx.out;
        out.print("error: ");
        out.print(&message.replace('\n', "\r\n"));
        out.print("\r\n");
        // Best-effort: the console may be what failed
        let _ = out.flush();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic with non-string payload".to_string()
    }
}

// ============================================================================
// TESTS
// ============================================================================
