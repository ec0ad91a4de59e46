//! Local console collaborator.
//!
//! The door session talks to the sysop's screen and keyboard through
//! the [`Console`] trait so tests (and hosts running without a
//! terminal) can substitute a headless implementation.

use crossterm::cursor::{MoveTo, RestorePosition, SavePosition};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use crossterm::QueueableCommand;
use std::collections::VecDeque;
use std::io::{stdout, Write};
use std::time::Duration;

/// Extended scan codes for the arrow keys
pub mod key {
    pub const UP: u8 = 72;
    pub const LEFT: u8 = 75;
    pub const RIGHT: u8 = 77;
    pub const DOWN: u8 = 80;
}

/// One keypress: a character, or an extended scan code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleKey {
    pub ch: char,
    pub extended: bool,
}

impl ConsoleKey {
    pub fn plain(ch: char) -> Self {
        Self {
            ch,
            extended: false,
        }
    }

    pub fn extended(code: u8) -> Self {
        Self {
            ch: code as char,
            extended: true,
        }
    }
}

/// The sysop-side screen and keyboard
pub trait Console {
    /// Whether a key is waiting without blocking
    fn key_pressed(&mut self) -> bool;

    /// Take the next key if one is waiting
    fn read_key(&mut self) -> Option<ConsoleKey>;

    /// Write text at the cursor
    fn write(&mut self, text: &str);

    /// Overwrite a full status row
    fn status_line(&mut self, row: u16, text: &str);

    /// (columns, rows)
    fn size(&self) -> (u16, u16);

    /// Downcasting support for implementation-specific access
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Real console backed by the process terminal.
#[derive(Debug, Default)]
pub struct CrosstermConsole;

impl CrosstermConsole {
    pub fn new() -> Self {
        Self
    }
}

impl Console for CrosstermConsole {
    fn key_pressed(&mut self) -> bool {
        event::poll(Duration::from_millis(0)).unwrap_or(false)
    }

    fn read_key(&mut self) -> Option<ConsoleKey> {
        if !event::poll(Duration::from_millis(0)).unwrap_or(false) {
            return None;
        }
        match event::read() {
            Ok(Event::Key(k)) if k.kind == KeyEventKind::Press => match k.code {
                KeyCode::Char(c) => Some(ConsoleKey::plain(c)),
                KeyCode::Enter => Some(ConsoleKey::plain('\r')),
                KeyCode::Backspace => Some(ConsoleKey::plain('\x08')),
                KeyCode::Tab => Some(ConsoleKey::plain('\t')),
                KeyCode::Esc => Some(ConsoleKey::plain('\x1b')),
                KeyCode::Up => Some(ConsoleKey::extended(key::UP)),
                KeyCode::Down => Some(ConsoleKey::extended(key::DOWN)),
                KeyCode::Left => Some(ConsoleKey::extended(key::LEFT)),
                KeyCode::Right => Some(ConsoleKey::extended(key::RIGHT)),
                _ => None,
            },
            _ => None,
        }
    }

    fn write(&mut self, text: &str) {
        let mut out = stdout();
        let _ = out.queue(Print(text));
        let _ = out.flush();
    }

    fn status_line(&mut self, row: u16, text: &str) {
        let mut out = stdout();
        let _ = out.queue(SavePosition);
        let _ = out.queue(MoveTo(0, row));
        let _ = out.queue(Clear(ClearType::CurrentLine));
        let _ = out.queue(Print(text));
        let _ = out.queue(RestorePosition);
        let _ = out.flush();
    }

    fn size(&self) -> (u16, u16) {
        crossterm::terminal::size().unwrap_or((80, 25))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Headless console: keys come from a seedable queue, output collects
/// into a string. Used by tests and terminal-less hosts.
#[derive(Debug, Default)]
pub struct NullConsole {
    pub keys: VecDeque<ConsoleKey>,
    pub output: String,
    pub status: String,
}

impl NullConsole {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Console for NullConsole {
    fn key_pressed(&mut self) -> bool {
        !self.keys.is_empty()
    }

    fn read_key(&mut self) -> Option<ConsoleKey> {
        self.keys.pop_front()
    }

    fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn status_line(&mut self, _row: u16, text: &str) {
        self.status = text.to_string();
    }

    fn size(&self) -> (u16, u16) {
        (80, 25)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
