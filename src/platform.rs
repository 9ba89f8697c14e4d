//! Console plumbing: raw mode and the stdin byte source.
//!
//! Structure:
//! - `RawMode`: guard that puts the console in raw mode until dropped
//! - `Stdin`: non-blocking byte source over file descriptor 0
//! - `install_panic_hook`: best-effort console restoration on panic
//! - `with_caught_panics`: marks panics the main loop reports itself
//!
//! Input decoding works on raw bytes, so stdin is read directly rather
//! than through crossterm's event layer.

use std::cell::Cell;
use std::io::{self, Write};
use std::time::Duration;

use crossterm::terminal;

use crate::ansi;
use crate::keymap::ByteSource;

// ============================================================================
// RAW MODE
// ============================================================================

/// Keeps the console in raw mode for as long as it lives.
#[derive(Debug)]
pub struct RawMode {
    _private: (),
}

impl RawMode {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        tracing::debug!("raw mode enabled");
        Ok(RawMode { _private: () })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        // Best-effort: nothing sensible to do if this fails during drop
        let _ = terminal::disable_raw_mode();
        tracing::debug!("raw mode disabled");
    }
}

/// Console size as `(columns, rows)`, if it can be determined.
pub fn console_size() -> Option<(u16, u16)> {
    terminal::size().ok()
}

// ============================================================================
// PANICS
// ============================================================================

thread_local! {
    static CAUGHT: Cell<bool> = const { Cell::new(false) };
}

/// Run `f` with panics on this thread reported by the caller, which
/// catches and prints them once the console is restored.
pub fn with_caught_panics<R>(f: impl FnOnce() -> R) -> R {
    struct Reset(bool);

    impl Drop for Reset {
        fn drop(&mut self) {
            CAUGHT.with(|caught| caught.set(self.0));
        }
    }

    let _reset = Reset(CAUGHT.with(|caught| caught.replace(true)));
    f()
}

/// Whether a panic on this thread will be caught and reported by
/// [`with_caught_panics`]'s caller.
pub fn panics_are_caught() -> bool {
    CAUGHT.with(Cell::get)
}

/// Install a panic hook that restores the console before the panic
/// message is printed. Panics inside [`with_caught_panics`] only go to
/// the log; the main loop reports them below the frame.
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        if panics_are_caught() {
            tracing::error!(%panic_info, "panic inside the main loop");
            return;
        }
        let _ = terminal::disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = write!(stdout, "{}{}", ansi::reset(), ansi::show_cursor());
        let _ = stdout.flush();
        original_hook(panic_info);
    }));
}

// ============================================================================
// STDIN
// ============================================================================

/// Raw byte source over standard input.
#[derive(Debug, Default)]
pub struct Stdin {
    _private: (),
}

impl Stdin {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(unix)]
impl ByteSource for Stdin {
    fn poll(&mut self, timeout: Duration) -> io::Result<bool> {
        let mut fds = libc::pollfd {
            fd: libc::STDIN_FILENO,
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

        // SAFETY: `fds` is a valid pollfd for the duration of the call.
        let ready = unsafe { libc::poll(&mut fds, 1, millis) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }
        Ok(ready > 0 && fds.revents & libc::POLLIN != 0)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = 0u8;
        loop {
            // SAFETY: reading at most one byte into a valid one-byte buffer.
            let n = unsafe {
                libc::read(
                    libc::STDIN_FILENO,
                    (&mut byte as *mut u8).cast::<libc::c_void>(),
                    1,
                )
            };
            match n {
                1 => return Ok(byte),
                0 => {
                    return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
                }
                _ => {
                    let err = io::Error::last_os_error();
                    if err.kind() != io::ErrorKind::Interrupted {
                        return Err(err);
                    }
                }
            }
        }
    }
}

#[cfg(not(unix))]
impl ByteSource for Stdin {
    fn poll(&mut self, _timeout: Duration) -> io::Result<bool> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "raw stdin polling is only implemented for unix consoles",
        ))
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        io::Read::read_exact(&mut io::stdin(), &mut byte)?;
        Ok(byte[0])
    }
}
