//! Telnet framing: RFC 854 option negotiation stripped from the
//! application stream.
//!
//! The framer is a byte-at-a-time state machine. Incoming IAC command
//! sequences are consumed and answered; everything else flows through
//! to the input queue. Sub-negotiation payloads are accepted and
//! discarded; a door has no use for them, but they must not leak into
//! the application stream.
//!
//! Server-side response policy:
//! - `DO` BINARY / ECHO / SUPPRESS-GA is accepted with `WILL`; any
//!   other `DO` is refused with `WONT`.
//! - An asynchronous `WILL` for BINARY / SUPPRESS-GA is accepted with
//!   `DO`; any other `WILL` (including ECHO) is refused with `DONT`.
//! - `DONT` is answered `WONT`, `WONT` is answered `DONT`.

use crate::byte_queue::ByteQueue;
use crate::framing::InputSink;

pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
pub const SB: u8 = 250;
pub const SE: u8 = 240;

/// Option numbers this framer negotiates
pub mod opt {
    pub const BINARY: u8 = 0;
    pub const ECHO: u8 = 1;
    pub const SGA: u8 = 3;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Normal data flow
    Data,
    /// Got IAC, next byte is a command
    SawIac,
    /// Got IAC WILL/WONT/DO/DONT, next byte is the option
    SawCommand(u8),
    /// Got IAC SB, next byte is the option being sub-negotiated
    SawSb,
    /// Collecting sub-negotiation payload
    InSb,
    /// Got IAC inside a sub-negotiation payload
    SawSbIac,
}

/// RFC 854 option-negotiation framer (server side).
pub struct TelnetFramer {
    state: State,
    local: [bool; 256],
    remote: [bool; 256],
}

impl Default for TelnetFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl TelnetFramer {
    pub fn new() -> Self {
        Self {
            state: State::Data,
            local: [false; 256],
            remote: [false; 256],
        }
    }

    /// Whether we have agreed to enable `option` on our side
    pub fn local_enabled(&self, option: u8) -> bool {
        self.local[option as usize]
    }

    /// Whether the peer has announced `option` and we accepted it
    pub fn remote_enabled(&self, option: u8) -> bool {
        self.remote[option as usize]
    }

    fn accepts_local(option: u8) -> bool {
        matches!(option, opt::BINARY | opt::ECHO | opt::SGA)
    }

    fn accepts_remote(option: u8) -> bool {
        matches!(option, opt::BINARY | opt::SGA)
    }

    fn respond(&mut self, command: u8, option: u8, reply: &mut ByteQueue) {
        match command {
            DO => {
                if Self::accepts_local(option) {
                    self.local[option as usize] = true;
                    reply.enqueue_slice(&[IAC, WILL, option]);
                } else {
                    reply.enqueue_slice(&[IAC, WONT, option]);
                }
            }
            DONT => {
                self.local[option as usize] = false;
                reply.enqueue_slice(&[IAC, WONT, option]);
            }
            WILL => {
                if Self::accepts_remote(option) {
                    self.remote[option as usize] = true;
                    reply.enqueue_slice(&[IAC, DO, option]);
                } else {
                    reply.enqueue_slice(&[IAC, DONT, option]);
                }
            }
            WONT => {
                self.remote[option as usize] = false;
                reply.enqueue_slice(&[IAC, DONT, option]);
            }
            _ => unreachable!("only negotiation commands reach SawCommand"),
        }
    }

    /// Feed raw wire bytes; application bytes go to `sink`, negotiation
    /// answers accumulate in `reply`.
    pub fn negotiate_inbound(&mut self, raw: &[u8], sink: &mut InputSink<'_>, reply: &mut ByteQueue) {
        for &byte in raw {
            match self.state {
                State::Data => {
                    if byte == IAC {
                        self.state = State::SawIac;
                    } else {
                        sink.push(byte);
                    }
                }
                State::SawIac => match byte {
                    WILL | WONT | DO | DONT => self.state = State::SawCommand(byte),
                    SB => self.state = State::SawSb,
                    IAC => {
                        // IAC IAC is an escaped literal 0xFF data byte.
                        sink.push(IAC);
                        self.state = State::Data;
                    }
                    _ => {
                        // NOP, AYT and friends are discarded.
                        self.state = State::Data;
                    }
                },
                State::SawCommand(command) => {
                    self.respond(command, byte, reply);
                    self.state = State::Data;
                }
                State::SawSb => {
                    self.state = State::InSb;
                }
                State::InSb => {
                    if byte == IAC {
                        self.state = State::SawSbIac;
                    }
                }
                State::SawSbIac => match byte {
                    SE => self.state = State::Data,
                    IAC => self.state = State::InSb,
                    _ => {
                        // Malformed sub-negotiation; drop it and recover.
                        self.state = State::Data;
                    }
                },
            }
        }
    }

    /// Escape application bytes for the wire: literal 0xFF doubles.
    pub fn negotiate_outbound(&mut self, data: &[u8], wire: &mut ByteQueue) {
        for &byte in data {
            if byte == IAC {
                wire.enqueue(IAC);
            }
            wire.enqueue(byte);
        }
    }
}
