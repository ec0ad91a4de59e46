//! Framing layer: byte-level protocol state machines sitting between
//! the raw transport and the application stream.
//!
//! A [`Framer`] transforms raw inbound wire bytes into clean
//! application bytes (`negotiate_inbound`) and application bytes into
//! wire bytes (`negotiate_outbound`). Handshake lifecycles (the
//! WebSocket upgrade) run through [`Framer::shake`] before the first
//! application byte flows.
//!
//! Every variant enqueues decoded bytes through the shared
//! [`InboundFilter`], which applies CR/LF and CR/NUL suppression and
//! tracks the last raw byte seen on the wire.

pub mod rlogin;
pub mod telnet;
pub mod websocket;

use crate::byte_queue::ByteQueue;
use crate::errors::DoorResult;
use crate::transport::Transport;

pub use rlogin::RloginFramer;
pub use telnet::TelnetFramer;
pub use websocket::WebSocketFramer;

/// Inbound byte filter shared by all framer variants.
///
/// With `strip_lf` set, a 0x0A immediately following a 0x0D on the wire
/// is dropped; with `strip_null`, a 0x00 following a 0x0D is dropped.
/// `last_byte_in` always reflects the raw byte, dropped or not.
#[derive(Debug, Clone)]
pub struct InboundFilter {
    pub strip_lf: bool,
    pub strip_null: bool,
    last_byte_in: u8,
}

impl InboundFilter {
    pub fn new(strip_lf: bool, strip_null: bool) -> Self {
        Self {
            strip_lf,
            strip_null,
            last_byte_in: 0,
        }
    }

    /// The most recently seen raw input byte (pre-drop)
    pub fn last_byte_in(&self) -> u8 {
        self.last_byte_in
    }

    /// Borrow the filter and a destination queue as a push target for a
    /// framer pass.
    pub fn sink<'a>(&'a mut self, queue: &'a mut ByteQueue) -> InputSink<'a> {
        InputSink {
            filter: self,
            queue,
        }
    }
}

/// Destination for decoded application bytes, applying the inbound
/// filter before enqueueing.
pub struct InputSink<'a> {
    filter: &'a mut InboundFilter,
    queue: &'a mut ByteQueue,
}

impl InputSink<'_> {
    pub fn push(&mut self, byte: u8) {
        let previous = self.filter.last_byte_in;
        self.filter.last_byte_in = byte;
        if previous == b'\r' {
            if self.filter.strip_lf && byte == b'\n' {
                return;
            }
            if self.filter.strip_null && byte == 0x00 {
                return;
            }
        }
        self.queue.enqueue(byte);
    }
}

/// The protocol framing carried over a connection.
pub enum Framer {
    /// No framing; bytes pass through untouched
    Raw,
    Telnet(TelnetFramer),
    Rlogin(RloginFramer),
    WebSocket(WebSocketFramer),
}

impl Framer {
    pub fn raw() -> Self {
        Framer::Raw
    }

    pub fn telnet() -> Self {
        Framer::Telnet(TelnetFramer::new())
    }

    pub fn rlogin() -> Self {
        Framer::Rlogin(RloginFramer::new())
    }

    pub fn websocket(shake_required: bool) -> Self {
        Framer::WebSocket(WebSocketFramer::new(shake_required))
    }

    /// Run any out-of-band handshake this framing needs before
    /// application bytes flow. Only the WebSocket upgrade does work
    /// here; everything else negotiates in-band.
    pub fn shake(&mut self, transport: &mut Transport) -> DoorResult<()> {
        match self {
            Framer::WebSocket(ws) => ws.shake(transport),
            _ => Ok(()),
        }
    }

    /// Transform raw wire bytes into application bytes (into `sink`),
    /// accumulating any protocol answers in `reply` for the caller to
    /// send.
    pub fn negotiate_inbound(
        &mut self,
        raw: &[u8],
        sink: &mut InputSink<'_>,
        reply: &mut ByteQueue,
    ) -> DoorResult<()> {
        match self {
            Framer::Raw => {
                for &byte in raw {
                    sink.push(byte);
                }
                Ok(())
            }
            Framer::Telnet(telnet) => {
                telnet.negotiate_inbound(raw, sink, reply);
                Ok(())
            }
            Framer::Rlogin(rlogin) => {
                rlogin.negotiate_inbound(raw, sink, reply);
                Ok(())
            }
            Framer::WebSocket(ws) => ws.negotiate_inbound(raw, sink, reply),
        }
    }

    /// Transform application bytes into wire bytes appended to `wire`.
    pub fn negotiate_outbound(&mut self, data: &[u8], wire: &mut ByteQueue) {
        match self {
            Framer::Raw => wire.enqueue_slice(data),
            Framer::Telnet(telnet) => telnet.negotiate_outbound(data, wire),
            Framer::Rlogin(rlogin) => rlogin.negotiate_outbound(data, wire),
            Framer::WebSocket(ws) => ws.negotiate_outbound(data, wire),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_filter(strip_lf: bool, strip_null: bool, raw: &[u8]) -> (Vec<u8>, u8) {
        let mut filter = InboundFilter::new(strip_lf, strip_null);
        let mut queue = ByteQueue::new();
        let mut framer = Framer::raw();
        let mut reply = ByteQueue::new();
        framer
            .negotiate_inbound(raw, &mut filter.sink(&mut queue), &mut reply)
            .unwrap();
        (queue.drain(), filter.last_byte_in())
    }

    #[test]
    fn test_strip_lf_after_cr() {
        let (bytes, last) = run_filter(true, false, b"a\r\nb");
        assert_eq!(bytes, b"a\rb");
        assert_eq!(last, b'b');
    }

    #[test]
    fn test_strip_null_after_cr() {
        let (bytes, _) = run_filter(false, true, &[b'a', b'\r', 0x00, b'b']);
        assert_eq!(bytes, b"a\rb");
    }

    #[test]
    fn test_no_strip_when_disabled() {
        let (bytes, _) = run_filter(false, false, b"a\r\nb");
        assert_eq!(bytes, b"a\r\nb");
    }

    #[test]
    fn test_lone_lf_not_stripped() {
        let (bytes, _) = run_filter(true, true, b"a\nb");
        assert_eq!(bytes, b"a\nb");
    }

    #[test]
    fn test_strip_applies_across_chunks() {
        let mut filter = InboundFilter::new(true, false);
        let mut queue = ByteQueue::new();
        let mut framer = Framer::raw();
        let mut reply = ByteQueue::new();
        framer
            .negotiate_inbound(b"a\r", &mut filter.sink(&mut queue), &mut reply)
            .unwrap();
        framer
            .negotiate_inbound(b"\nb", &mut filter.sink(&mut queue), &mut reply)
            .unwrap();
        assert_eq!(queue.drain(), b"a\rb");
    }

    #[test]
    fn test_raw_framer_outbound_verbatim() {
        let mut framer = Framer::raw();
        let mut wire = ByteQueue::new();
        framer.negotiate_outbound(&[0x00, 0xFF, b'x'], &mut wire);
        assert_eq!(wire.drain(), vec![0x00, 0xFF, b'x']);
    }
}
