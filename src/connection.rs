//! The buffered, line-oriented connection surface presented to door
//! applications.
//!
//! A [`Connection`] couples a [`Transport`] with a [`Framer`] and two
//! byte queues. Reads drain the input queue, refilling it from the
//! wire through the framer; writes pass through the framer into the
//! output queue, which is sent whole and cleared on every call. The
//! application only ever sees clean post-framing bytes, and the wire
//! only ever sees framed ones.
//!
//! Transport failures never surface as errors on the read path: they
//! flip the connection to disconnected, after which reads return
//! `None` and writes are no-ops.

use crate::byte_queue::ByteQueue;
use crate::errors::{DoorError, DoorResult};
use crate::framing::{Framer, InboundFilter};
use crate::transport::Transport;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Receive buffer size for one wire read
const RECV_CHUNK: usize = 64 * 1024;

/// A framed, buffered connection to the remote user.
pub struct Connection {
    transport: Transport,
    framer: Framer,
    input_q: ByteQueue,
    output_q: ByteQueue,
    filter: InboundFilter,
    line_ending: String,
    read_timed_out: bool,
    connected: bool,
}

impl Connection {
    /// Couple a transport and framer, running the framer's handshake
    /// (the WebSocket upgrade) before the first application byte.
    pub fn open(mut transport: Transport, mut framer: Framer) -> DoorResult<Self> {
        if let Err(e) = framer.shake(&mut transport) {
            transport.close();
            return Err(e);
        }
        Ok(Self {
            transport,
            framer,
            input_q: ByteQueue::new(),
            output_q: ByteQueue::new(),
            // LF is kept so "\r\n" line terminators stay visible; the
            // NUL a telnet NVT pads CR with is dropped.
            filter: InboundFilter::new(false, true),
            line_ending: "\r\n".to_string(),
            read_timed_out: false,
            connected: true,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Whether the last timed read gave up before data arrived
    pub fn read_timed_out(&self) -> bool {
        self.read_timed_out
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.transport.local_addr()
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.transport.peer_addr()
    }

    /// The framing in use (for querying negotiated state)
    pub fn framer(&self) -> &Framer {
        &self.framer
    }

    /// The most recently seen raw inbound byte
    pub fn last_byte_in(&self) -> u8 {
        self.filter.last_byte_in()
    }

    /// Configure CR/LF and CR/NUL suppression on the inbound stream
    pub fn set_strip(&mut self, strip_lf: bool, strip_null: bool) {
        self.filter.strip_lf = strip_lf;
        self.filter.strip_null = strip_null;
    }

    /// Change the line ending appended by [`Connection::write_line`]
    pub fn set_line_ending(&mut self, ending: &str) {
        self.line_ending = ending.to_string();
    }

    /// Half-close (finish writes, drain reads) when the socket goes down
    pub fn set_shutdown_on_close(&mut self, enabled: bool) {
        self.transport.half_close = enabled;
    }

    /// One poll-and-receive round: pull whatever the wire has ready
    /// through the framer into the input queue, answering any protocol
    /// traffic. Disconnects flip the connection state.
    fn pump(&mut self) {
        if !self.connected {
            return;
        }
        if !self.transport.poll_readable(1) {
            return;
        }
        let mut buf = vec![0u8; RECV_CHUNK];
        match self.transport.recv(&mut buf) {
            Ok(n) => {
                let mut reply = ByteQueue::new();
                let result = self.framer.negotiate_inbound(
                    &buf[..n],
                    &mut self.filter.sink(&mut self.input_q),
                    &mut reply,
                );
                if !reply.is_empty() && self.transport.send_all(&reply.drain()).is_err() {
                    self.connected = false;
                }
                if result.is_err() {
                    // Framer parse errors close the connection.
                    self.transport.close();
                    self.connected = false;
                }
            }
            Err(_) => {
                self.connected = false;
            }
        }
    }

    /// True when at least one application byte is buffered or arrives
    /// within one poll round.
    pub fn can_read(&mut self) -> bool {
        if !self.input_q.is_empty() {
            return true;
        }
        self.pump();
        !self.input_q.is_empty()
    }

    /// Look at the next buffered character without consuming it.
    pub fn peek(&mut self) -> Option<char> {
        if self.input_q.is_empty() {
            self.pump();
        }
        self.input_q.peek().map(|b| b as char)
    }

    /// Read the next character, waiting up to `timeout_ms`
    /// milliseconds. A timeout of 0 waits forever. Returns `None` on
    /// timeout (with [`Connection::read_timed_out`] set) or disconnect.
    pub fn read_char(&mut self, timeout_ms: u64) -> Option<char> {
        let deadline = if timeout_ms > 0 {
            Some(Instant::now() + Duration::from_millis(timeout_ms))
        } else {
            None
        };
        loop {
            if let Some(byte) = self.input_q.dequeue() {
                self.read_timed_out = false;
                return Some(byte as char);
            }
            if !self.connected {
                return None;
            }
            self.pump();
            if self.input_q.is_empty() {
                if let Some(d) = deadline {
                    if Instant::now() >= d {
                        self.read_timed_out = true;
                        return None;
                    }
                }
            }
        }
    }

    /// Drain up to `max` buffered bytes, refilling once from the wire
    /// if the buffer is empty. Does not block beyond one poll round.
    pub fn read_bytes(&mut self, max: usize) -> Vec<u8> {
        if self.input_q.is_empty() {
            self.pump();
        }
        let mut out = Vec::with_capacity(max.min(self.input_q.count()));
        while out.len() < max {
            match self.input_q.dequeue() {
                Some(b) => out.push(b),
                None => break,
            }
        }
        out
    }

    /// Read a line of input.
    ///
    /// Characters accumulate until the accumulator ends with
    /// `terminator`. With `echo` on, printable input is echoed back to
    /// the peer (replaced by `mask` when given), and backspace/DEL
    /// erase the previous character with a `"\x08 \x08"` wipe. On
    /// timeout the partial accumulator is returned as-is, terminator
    /// unstripped; otherwise the terminator is stripped and, when
    /// echoing, a CR/LF is sent.
    pub fn read_line(
        &mut self,
        terminator: &str,
        echo: bool,
        mask: Option<char>,
        timeout_ms: u64,
    ) -> String {
        let mut line = String::new();
        loop {
            let ch = match self.read_char(timeout_ms) {
                Some(c) => c,
                None => return line,
            };

            if echo && (ch == '\x08' || ch == '\x7F') {
                if let Some(removed) = line.pop() {
                    if removed >= ' ' {
                        let _ = self.write(b"\x08 \x08");
                    }
                }
                continue;
            }

            line.push(ch);
            if echo && ch >= ' ' {
                // Echo the byte as-is; characters here are always
                // single octets (the framer never produces more).
                let echoed = mask.unwrap_or(ch) as u32;
                if echoed <= 0xFF {
                    let _ = self.write(&[echoed as u8]);
                }
            }

            if line.ends_with(terminator) {
                line.truncate(line.len() - terminator.len());
                if echo {
                    let _ = self.write(b"\r\n");
                }
                return line;
            }
        }
    }

    /// Frame and send a byte slice. The whole transformed payload is
    /// handed to the transport before this returns.
    pub fn write(&mut self, data: &[u8]) -> DoorResult<()> {
        if !self.connected {
            return Ok(());
        }
        self.framer.negotiate_outbound(data, &mut self.output_q);
        let wire = self.output_q.drain();
        match self.transport.send_all(&wire) {
            Ok(()) => {
                if !self.transport.is_open() {
                    self.connected = false;
                }
                Ok(())
            }
            Err(e @ DoorError::Io(_)) => Err(e),
            Err(_) => {
                self.connected = false;
                Ok(())
            }
        }
    }

    pub fn write_str(&mut self, text: &str) -> DoorResult<()> {
        self.write(text.as_bytes())
    }

    /// Write text followed by the connection's line ending.
    pub fn write_line(&mut self, text: &str) -> DoorResult<()> {
        let mut out = Vec::with_capacity(text.len() + self.line_ending.len());
        out.extend_from_slice(text.as_bytes());
        out.extend_from_slice(self.line_ending.as_bytes());
        self.write(&out)
    }

    /// Close the connection. Reopening requires a fresh Connection.
    pub fn close(&mut self) {
        self.transport.close();
        self.connected = false;
        self.input_q.clear();
        self.output_q.clear();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.connected {
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportListener;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    fn raw_pair() -> (Connection, TcpStream) {
        let listener = TransportListener::listen("127.0.0.1", 0).unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let transport = listener.accept().unwrap();
        let conn = Connection::open(transport, Framer::raw()).unwrap();
        (conn, client)
    }

    #[test]
    fn test_read_char_returns_buffered_byte() {
        let (mut conn, mut client) = raw_pair();
        client.write_all(b"A").unwrap();
        assert_eq!(conn.read_char(1000), Some('A'));
        assert!(!conn.read_timed_out());
    }

    #[test]
    fn test_read_char_timeout_sets_flag() {
        let (mut conn, _client) = raw_pair();
        let start = Instant::now();
        assert_eq!(conn.read_char(30), None);
        assert!(conn.read_timed_out());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_read_char_none_after_disconnect() {
        let (mut conn, client) = raw_pair();
        drop(client);
        assert_eq!(conn.read_char(500), None);
        assert!(!conn.is_connected());
    }

    #[test]
    fn test_write_after_disconnect_is_noop() {
        let (mut conn, client) = raw_pair();
        drop(client);
        conn.read_char(200);
        assert!(!conn.is_connected());
        assert!(conn.write(b"anyone there?").is_ok());
    }

    #[test]
    fn test_read_line_with_echo_and_mask() {
        let (mut conn, mut client) = raw_pair();
        client.write_all(b"ab\x08c\r\n").unwrap();
        let line = conn.read_line("\r\n", true, Some('*'), 1000);
        assert_eq!(line, "ac");

        let mut echoed = [0u8; 8];
        client.read_exact(&mut echoed).unwrap();
        assert_eq!(&echoed, b"**\x08 \x08*\r\n");
    }

    #[test]
    fn test_read_line_without_echo_is_silent() {
        let (mut conn, mut client) = raw_pair();
        client.write_all(b"secret\r\n").unwrap();
        let line = conn.read_line("\r\n", false, None, 1000);
        assert_eq!(line, "secret");

        // Nothing must have been echoed back.
        client
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();
        let mut buf = [0u8; 1];
        assert!(client.read(&mut buf).is_err());
    }

    #[test]
    fn test_read_line_timeout_returns_partial() {
        let (mut conn, mut client) = raw_pair();
        client.write_all(b"par").unwrap();
        let line = conn.read_line("\r\n", false, None, 100);
        assert_eq!(line, "par");
        assert!(conn.read_timed_out());
    }

    #[test]
    fn test_read_line_custom_terminator() {
        let (mut conn, mut client) = raw_pair();
        client.write_all(b"value;rest").unwrap();
        let line = conn.read_line(";", false, None, 1000);
        assert_eq!(line, "value");
        // The remainder stays buffered for the next read.
        assert_eq!(conn.read_char(1000), Some('r'));
    }

    #[test]
    fn test_write_line_appends_ending() {
        let (mut conn, mut client) = raw_pair();
        conn.write_line("hello").unwrap();
        let mut buf = [0u8; 7];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello\r\n");
    }

    #[test]
    fn test_strip_null_after_cr_default() {
        let (mut conn, mut client) = raw_pair();
        client.write_all(&[b'x', b'\r', 0x00, b'y']).unwrap();
        assert_eq!(conn.read_char(1000), Some('x'));
        assert_eq!(conn.read_char(1000), Some('\r'));
        assert_eq!(conn.read_char(1000), Some('y'));
    }

    #[test]
    fn test_strip_lf_when_enabled() {
        let (mut conn, mut client) = raw_pair();
        conn.set_strip(true, true);
        client.write_all(b"x\r\ny").unwrap();
        assert_eq!(conn.read_char(1000), Some('x'));
        assert_eq!(conn.read_char(1000), Some('\r'));
        assert_eq!(conn.read_char(1000), Some('y'));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let (mut conn, mut client) = raw_pair();
        client.write_all(b"Z").unwrap();
        // Allow the byte to arrive.
        while !conn.can_read() {}
        assert_eq!(conn.peek(), Some('Z'));
        assert_eq!(conn.read_char(1000), Some('Z'));
    }

    #[test]
    fn test_read_bytes_drains_buffer() {
        let (mut conn, mut client) = raw_pair();
        client.write_all(b"bulk data").unwrap();
        while !conn.can_read() {}
        let bytes = conn.read_bytes(4);
        assert_eq!(bytes, b"bulk");
        let rest = conn.read_bytes(64);
        assert_eq!(rest, b" data");
    }

    #[test]
    fn test_close_then_reads_return_none() {
        let (mut conn, _client) = raw_pair();
        conn.close();
        assert!(!conn.is_connected());
        assert_eq!(conn.read_char(10), None);
    }
}
