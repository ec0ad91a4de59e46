//! # Airlock
//!
//! A support library for text-mode door programs: interactive terminal
//! applications launched by a bulletin-board host to serve one remote
//! user over a socket the host already opened.
//!
//! The connection stack carries the application's byte stream over one
//! of three framings: raw Telnet with in-band option negotiation
//! (RFC 854), rlogin with its startup handshake, or WebSocket (both
//! the old draft-0 handshake and RFC 6455), while presenting a
//! uniform, buffered, line-oriented I/O surface. The door layer on top
//! handles dropfiles, local-console echo, idle and time-limit
//! bookkeeping, and the pipe/backtick color grammars.
//!
//! ## Architecture
//!
//! Leaves first:
//! - [`byte_queue`]: growable FIFO backing the input and output sides
//! - [`transport`]: blocking socket I/O with millisecond polls;
//!   connect, listen, or adopt an inherited descriptor
//! - [`framing`]: the per-protocol state machines (Telnet, rlogin,
//!   WebSocket) between the wire and the application bytes
//! - [`connection`]: couples a transport with a framer and two queues;
//!   `read_char` / `read_line` / `write`
//! - [`door`]: the session state machine: flags, dropfile, event
//!   tick, key multiplexing, color output
//!
//! Everything is single-threaded and synchronous: one process serves
//! one connection, and every I/O primitive blocks until completion or
//! a millisecond-resolution timeout.
//!
//! ## Example
//!
//! ```no_run
//! use airlock::console::CrosstermConsole;
//! use airlock::door::{DefaultHooks, DoorSession};
//!
//! fn main() {
//!     let mut session = match DoorSession::startup(
//!         std::env::args().skip(1),
//!         Box::new(CrosstermConsole::new()),
//!         Box::new(DefaultHooks),
//!     ) {
//!         Ok(session) => session,
//!         Err(_) => std::process::exit(1),
//!     };
//!
//!     let _ = session.write_line("|0EWelcome to the door.|07");
//!     while let Ok(key) = session.read_key() {
//!         if key.ch == 'q' {
//!             break;
//!         }
//!     }
//! }
//! ```

pub mod ansi;
pub mod byte_queue;
pub mod colors;
pub mod connection;
pub mod console;
pub mod door;
pub mod dropfile;
pub mod errors;
pub mod framing;
pub mod transport;

pub use byte_queue::ByteQueue;
pub use connection::Connection;
pub use console::{Console, ConsoleKey, CrosstermConsole, NullConsole};
pub use door::{
    ControlFlow, DefaultHooks, DoorOptions, DoorSession, ExitReason, KeySource, LastKey,
    SessionHooks,
};
pub use dropfile::{ComType, DropInfo, Emulation};
pub use errors::{DoorError, DoorResult};
pub use framing::Framer;
pub use transport::{Transport, TransportListener};
