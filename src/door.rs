//! The door session state machine.
//!
//! A [`DoorSession`] ties everything together: it parses the command
//! line, loads the dropfile, picks the framing the host asked for,
//! adopts the inherited socket, and then serves the application a
//! merged local/remote keyboard plus a color-aware output surface.
//! While the application polls for keys, a once-per-second event tick
//! watches the carrier, the time limit, and the idle clock.
//!
//! Event handlers are supplied through [`SessionHooks`]; the defaults
//! end the session. Handlers return [`ControlFlow`] rather than
//! terminating the process themselves, and the session turns an
//! `Exit` into a banner, a short pause, and an orderly close.

use crate::colors::{expand_backtick_codes, expand_pipe_codes, strip_pipe_codes, TextOp};
use crate::connection::Connection;
use crate::console::{key, Console, ConsoleKey};
use crate::dropfile::{ComType, DropInfo, Emulation};
use crate::errors::DoorResult;
use crate::framing::Framer;
use crate::transport::Transport;
use jiff::{SignedDuration, Timestamp};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Pause shown under every exit banner
const EXIT_PAUSE: Duration = Duration::from_millis(2500);

/// How long to wait for a named dropfile to appear
const DROPFILE_WAIT: Duration = Duration::from_secs(5);

/// Grace window for the continuation bytes of a remote ESC sequence
const ESCAPE_GRACE_MS: u64 = 100;

/// Idle limit when the host does not supply one
const DEFAULT_MAX_IDLE_SECS: i64 = 300;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The remote socket dropped
    Hangup,
    /// The time limit ran out
    TimeUp,
    /// The user sat idle too long
    IdleTimeout,
    /// The dropfile never appeared or would not parse
    DropfileMissing,
    /// The connection could not be opened
    NoCarrier,
    /// Started without enough arguments; usage was shown
    Usage,
}

/// What an event handler wants the session to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Continue,
    Exit(ExitReason),
}

/// Where the last key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    None,
    Local,
    Remote,
}

/// The most recent keypress, feeding the idle clock
#[derive(Debug, Clone)]
pub struct LastKey {
    pub ch: char,
    pub extended: bool,
    pub source: KeySource,
    pub pressed_at: Timestamp,
}

/// Session event handlers. Every method has a default; override the
/// ones the door cares about.
pub trait SessionHooks {
    /// The remote socket dropped
    fn on_hangup(&mut self) -> ControlFlow {
        ControlFlow::Exit(ExitReason::Hangup)
    }

    /// The time limit ran out
    fn on_time_up(&mut self) -> ControlFlow {
        ControlFlow::Exit(ExitReason::TimeUp)
    }

    /// The idle limit ran out
    fn on_timeout(&mut self) -> ControlFlow {
        ControlFlow::Exit(ExitReason::IdleTimeout)
    }

    /// Invoked when the command line is unusable
    fn on_usage(&mut self, console: &mut dyn Console) {
        console.write(
            "Usage: door [flags]\r\n\
             \x20 -L          local session (no socket)\r\n\
             \x20 -D<path>    dropfile to load\r\n\
             \x20 -H<handle>  inherited socket handle\r\n\
             \x20 -N<node>    node number\r\n\
             \x20 -C<type>    com type override (0-4)\r\n",
        );
    }

    /// A flag the session did not recognize
    fn on_unknown_flag(&mut self, _flag: &str) {}
}

/// Hooks that just end the session on every event.
#[derive(Debug, Default)]
pub struct DefaultHooks;

impl SessionHooks for DefaultHooks {}

/// Parsed command-line flags. The prefix may be `-` or `/` and the
/// key letter is case-insensitive; values attach directly (`-H31`).
#[derive(Debug, Default, Clone)]
pub struct DoorOptions {
    pub local: bool,
    pub dropfile: Option<PathBuf>,
    pub socket_handle: Option<i64>,
    pub node: Option<u32>,
    pub com_type_override: Option<u32>,
    pub unknown: Vec<String>,
}

impl DoorOptions {
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Self {
        let mut opts = Self::default();
        for arg in args {
            let rest = match arg.strip_prefix('-').or_else(|| arg.strip_prefix('/')) {
                Some(r) => r,
                None => {
                    opts.unknown.push(arg);
                    continue;
                }
            };
            let mut chars = rest.chars();
            let letter = chars.next().map(|c| c.to_ascii_lowercase());
            let value = chars.as_str();
            match letter {
                Some('l') if value.is_empty() => opts.local = true,
                Some('d') if !value.is_empty() => opts.dropfile = Some(PathBuf::from(value)),
                Some('h') => match value.parse() {
                    Ok(h) => opts.socket_handle = Some(h),
                    Err(_) => opts.unknown.push(arg),
                },
                Some('n') => match value.parse() {
                    Ok(n) => opts.node = Some(n),
                    Err(_) => opts.unknown.push(arg),
                },
                Some('c') => match value.parse() {
                    Ok(c) => opts.com_type_override = Some(c),
                    Err(_) => opts.unknown.push(arg),
                },
                _ => opts.unknown.push(arg),
            }
        }
        opts
    }
}

/// One remote user's door session.
pub struct DoorSession {
    pub info: DropInfo,
    console: Box<dyn Console>,
    hooks: Box<dyn SessionHooks>,
    connection: Option<Connection>,

    pub last_key: LastKey,
    pub events_enabled: bool,
    pub idle_check_enabled: bool,
    pub max_idle_secs: i64,
    /// Interpret the backtick grammar in outbound text
    pub lord_codes: bool,

    time_started: Timestamp,
    last_tick: Timestamp,
    left_warned_min: i64,
    idle_warned_min: i64,
    pending_keys: VecDeque<ConsoleKey>,
}

impl DoorSession {
    /// Parse flags, load the dropfile, open the connection.
    ///
    /// On failure the appropriate banner has already been shown and
    /// the reason is returned for the process exit code.
    pub fn startup<I: IntoIterator<Item = String>>(
        args: I,
        mut console: Box<dyn Console>,
        mut hooks: Box<dyn SessionHooks>,
    ) -> Result<Self, ExitReason> {
        let opts = DoorOptions::parse(args);
        for flag in &opts.unknown {
            hooks.on_unknown_flag(flag);
        }

        let mut info = if let Some(path) = &opts.dropfile {
            match Self::await_dropfile(path) {
                Ok(info) => info,
                Err(_) => {
                    Self::abort_banner(console.as_mut(), "Dropfile Not Found");
                    return Err(ExitReason::DropfileMissing);
                }
            }
        } else if opts.local {
            DropInfo::local()
        } else if let (Some(handle), Some(node)) = (opts.socket_handle, opts.node) {
            let mut info = DropInfo::local();
            info.com_type = ComType::Telnet;
            info.socket_handle = handle;
            info.node = node;
            // Leave identity blank; an rlogin handshake can fill it.
            info.alias = String::new();
            info.real_name = String::new();
            info
        } else {
            hooks.on_usage(console.as_mut());
            thread::sleep(EXIT_PAUSE);
            return Err(ExitReason::Usage);
        };

        if let Some(code) = opts.com_type_override {
            if let Some(com_type) = ComType::from_code(code) {
                info.com_type = com_type;
            }
        }
        if let Some(node) = opts.node {
            info.node = node;
        }
        if let Some(handle) = opts.socket_handle {
            info.socket_handle = handle;
        }

        let connection = match info.com_type {
            ComType::Local => None,
            ComType::Serial => {
                // No fossil support.
                Self::abort_banner(console.as_mut(), "No Carrier Detected");
                return Err(ExitReason::NoCarrier);
            }
            com_type => {
                let framer = match com_type {
                    ComType::Telnet => Framer::telnet(),
                    ComType::Rlogin => Framer::rlogin(),
                    // The host already upgraded the socket.
                    ComType::WebSocket => Framer::websocket(false),
                    ComType::Local | ComType::Serial => unreachable!(),
                };
                let opened = Transport::adopt(info.socket_handle)
                    .and_then(|transport| Connection::open(transport, framer));
                match opened {
                    Ok(conn) => Some(conn),
                    Err(_) => {
                        Self::abort_banner(console.as_mut(), "No Carrier Detected");
                        return Err(ExitReason::NoCarrier);
                    }
                }
            }
        };

        let now = Timestamp::now();
        Ok(Self {
            info,
            console,
            hooks,
            connection,
            last_key: LastKey {
                ch: '\0',
                extended: false,
                source: KeySource::None,
                pressed_at: now,
            },
            events_enabled: true,
            idle_check_enabled: true,
            max_idle_secs: DEFAULT_MAX_IDLE_SECS,
            lord_codes: false,
            time_started: now,
            // Let the first tick run immediately.
            last_tick: now - SignedDuration::from_secs(2),
            left_warned_min: 0,
            idle_warned_min: 0,
            pending_keys: VecDeque::new(),
        })
    }

    /// Wait up to five seconds for the dropfile to appear, then load it.
    fn await_dropfile(path: &Path) -> DoorResult<DropInfo> {
        let deadline = Instant::now() + DROPFILE_WAIT;
        while !path.exists() {
            if Instant::now() >= deadline {
                return Err(crate::errors::DoorError::DropfileMissing(
                    path.to_path_buf(),
                ));
            }
            thread::sleep(Duration::from_millis(100));
        }
        DropInfo::load(path)
    }

    fn abort_banner(console: &mut dyn Console, text: &str) {
        console.write(&format!("\r\n{}\r\n", text));
        thread::sleep(EXIT_PAUSE);
    }

    pub fn is_local(&self) -> bool {
        self.connection.is_none()
    }

    /// The remote connection, for direct line-oriented I/O.
    pub fn connection_mut(&mut self) -> Option<&mut Connection> {
        self.connection.as_mut()
    }

    /// The local console collaborator.
    pub fn console(&self) -> &dyn Console {
        self.console.as_ref()
    }

    /// Whether the remote side is still there (always true locally).
    pub fn carrier(&self) -> bool {
        self.connection
            .as_ref()
            .map(|c| c.is_connected())
            .unwrap_or(true)
    }

    /// Seconds of session time remaining
    pub fn seconds_left(&self) -> i64 {
        self.info.max_time_secs - Timestamp::now().duration_since(self.time_started).as_secs()
    }

    /// Seconds since the last keypress
    pub fn idle_seconds(&self) -> i64 {
        Timestamp::now()
            .duration_since(self.last_key.pressed_at)
            .as_secs()
    }

    /// Run the once-per-second event checks: carrier, time limit, idle
    /// limit, minute warnings, status bar. Invoked from the key
    /// polling loop; calling more often is free because the body runs
    /// at most once per wall-clock second.
    pub fn tick(&mut self) -> ControlFlow {
        if !self.events_enabled {
            return ControlFlow::Continue;
        }
        let connected = match &self.connection {
            Some(conn) => conn.is_connected(),
            // Local sessions have no carrier, clock, or idle events.
            None => return ControlFlow::Continue,
        };

        let now = Timestamp::now();
        if now.duration_since(self.last_tick).as_secs() < 1 {
            return ControlFlow::Continue;
        }
        self.last_tick = now;

        if !connected {
            let flow = self.hooks.on_hangup();
            return self.apply_flow(flow);
        }

        let seconds_left = self.seconds_left();
        if seconds_left < 1 {
            let flow = self.hooks.on_time_up();
            return self.apply_flow(flow);
        }

        if self.idle_check_enabled {
            let idle = self.idle_seconds();
            if idle > self.max_idle_secs {
                let flow = self.hooks.on_timeout();
                return self.apply_flow(flow);
            }

            let idle_left_min = (self.max_idle_secs - idle + 59) / 60;
            // Only nag once the user has actually gone quiet.
            if idle >= 60
                && (1..=5).contains(&idle_left_min)
                && idle_left_min != self.idle_warned_min
            {
                self.idle_warned_min = idle_left_min;
                let _ = self.write_line(&format!(
                    "\r\n|0CIdle warning: {} minute(s) until disconnect.|07",
                    idle_left_min
                ));
            }
        }

        let left_min = (seconds_left + 59) / 60;
        if (1..=5).contains(&left_min) && left_min != self.left_warned_min {
            self.left_warned_min = left_min;
            let _ = self.write_line(&format!(
                "\r\n|0CYou have {} minute(s) remaining.|07",
                left_min
            ));
        }

        self.refresh_status_bar();
        ControlFlow::Continue
    }

    fn apply_flow(&mut self, flow: ControlFlow) -> ControlFlow {
        if let ControlFlow::Exit(reason) = flow {
            self.shutdown(reason);
        }
        flow
    }

    /// Show the exit banner for `reason`, pause, and close the
    /// connection.
    pub fn shutdown(&mut self, reason: ExitReason) {
        let text = match reason {
            ExitReason::Hangup => "Carrier Lost",
            ExitReason::TimeUp => "Your Time Is Up",
            ExitReason::IdleTimeout => "Idle Time Exceeded",
            ExitReason::DropfileMissing => "Dropfile Not Found",
            ExitReason::NoCarrier => "No Carrier Detected",
            ExitReason::Usage => "",
        };
        if !text.is_empty() {
            let _ = self.write_line(&format!("\r\n|0F{}|07", text));
            thread::sleep(EXIT_PAUSE);
        }
        if let Some(conn) = self.connection.as_mut() {
            conn.close();
        }
    }

    fn refresh_status_bar(&mut self) {
        let (_, rows) = self.console.size();
        let text = format!(
            " {} | Node {} | {} min left | idle {}s ",
            self.info.alias,
            self.info.node,
            (self.seconds_left().max(0) + 59) / 60,
            self.idle_seconds().max(0)
        );
        self.console.status_line(rows.saturating_sub(1), &text);
    }

    /// Whether a key is waiting on either side, running events first.
    pub fn key_pressed(&mut self) -> Result<bool, ExitReason> {
        if let ControlFlow::Exit(reason) = self.tick() {
            return Err(reason);
        }
        if !self.pending_keys.is_empty() || self.console.key_pressed() {
            return Ok(true);
        }
        if let Some(conn) = self.connection.as_mut() {
            if conn.can_read() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Block until the local console or the remote connection yields a
    /// key, running the event tick while waiting.
    pub fn read_key(&mut self) -> Result<ConsoleKey, ExitReason> {
        loop {
            if let ControlFlow::Exit(reason) = self.tick() {
                return Err(reason);
            }

            if let Some(k) = self.pending_keys.pop_front() {
                self.record_key(k, KeySource::Remote);
                return Ok(k);
            }

            if self.console.key_pressed() {
                if let Some(k) = self.console.read_key() {
                    self.record_key(k, KeySource::Local);
                    return Ok(k);
                }
            }

            let remote = match self.connection.as_mut() {
                Some(conn) => {
                    if conn.can_read() {
                        conn.read_char(1)
                    } else {
                        None
                    }
                }
                None => None,
            };
            if let Some(ch) = remote {
                self.absorb_rlogin_identity();
                let k = if ch == '\x1b' {
                    match self.connection.as_mut() {
                        Some(conn) => Self::decode_escape(conn, &mut self.pending_keys),
                        None => ConsoleKey::plain(ch),
                    }
                } else {
                    ConsoleKey::plain(ch)
                };
                self.record_key(k, KeySource::Remote);
                return Ok(k);
            }

            thread::sleep(Duration::from_millis(1));
        }
    }

    /// A remote ESC may begin an ANSI arrow sequence. Collect up to two
    /// continuation bytes within the grace window; anything that is not
    /// `ESC [ A..D` is pushed back and the ESC delivered alone.
    fn decode_escape(conn: &mut Connection, pending: &mut VecDeque<ConsoleKey>) -> ConsoleKey {
        let deadline = Instant::now() + Duration::from_millis(ESCAPE_GRACE_MS);
        let mut seq = Vec::new();
        while seq.len() < 2 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match conn.read_char(remaining.as_millis().max(1) as u64) {
                Some(ch) => seq.push(ch),
                None => break,
            }
        }
        if seq.len() == 2 && seq[0] == '[' {
            let code = match seq[1] {
                'A' => key::UP,
                'B' => key::DOWN,
                'C' => key::RIGHT,
                'D' => key::LEFT,
                _ => 0,
            };
            if code != 0 {
                return ConsoleKey::extended(code);
            }
        }
        for ch in seq {
            pending.push_back(ConsoleKey::plain(ch));
        }
        ConsoleKey::plain('\x1b')
    }

    fn record_key(&mut self, k: ConsoleKey, source: KeySource) {
        self.last_key = LastKey {
            ch: k.ch,
            extended: k.extended,
            source,
            pressed_at: Timestamp::now(),
        };
        self.idle_warned_min = 0;
    }

    /// Pick up identity strings an rlogin client supplied, if the
    /// dropfile left them blank.
    fn absorb_rlogin_identity(&mut self) {
        let Some(conn) = &self.connection else { return };
        if let Framer::Rlogin(rlogin) = conn.framer() {
            if rlogin.handshake_complete() {
                if self.info.alias.is_empty() {
                    self.info.alias = rlogin.remote_user();
                }
                if self.info.real_name.is_empty() {
                    self.info.real_name = rlogin.local_user();
                }
            }
        }
    }

    /// Write door text: the backtick grammar (when enabled) and the
    /// pipe grammar are applied, then the result goes to the remote
    /// user and is echoed on the local console.
    pub fn write(&mut self, text: &str) -> DoorResult<()> {
        let ops = if self.lord_codes {
            expand_backtick_codes(text)
        } else {
            vec![TextOp::Text(text.to_string())]
        };
        for op in ops {
            match op {
                TextOp::Text(t) => {
                    let expanded = match self.info.emulation {
                        Emulation::Ansi => expand_pipe_codes(&t),
                        Emulation::Ascii => strip_pipe_codes(&t),
                    };
                    self.emit(&expanded)?;
                }
                TextOp::Delay(d) => thread::sleep(d),
                TextOp::AwaitKey => self.more_prompt()?,
            }
        }
        Ok(())
    }

    /// [`DoorSession::write`] plus a CR/LF.
    pub fn write_line(&mut self, text: &str) -> DoorResult<()> {
        self.write(text)?;
        self.emit("\r\n")
    }

    fn emit(&mut self, text: &str) -> DoorResult<()> {
        self.console.write(text);
        if let Some(conn) = self.connection.as_mut() {
            conn.write_str(text)?;
        }
        Ok(())
    }

    fn more_prompt(&mut self) -> DoorResult<()> {
        const PROMPT: &str = "<MORE>";
        self.emit(PROMPT)?;
        let _ = self.read_key();
        self.emit(&"\x08 \x08".repeat(PROMPT.len()))
    }
}

impl Drop for DoorSession {
    fn drop(&mut self) {
        // Leave the sysop's terminal in a sane state; the connection
        // closes itself.
        self.console.write("\x1b[0m");
    }
}
