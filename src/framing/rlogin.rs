//! rlogin framing (server role).
//!
//! An rlogin client opens the conversation with a NUL byte followed by
//! three NUL-terminated strings: the client-side user name, the
//! server-side user name, and the terminal type with its speed
//! (`"ansi/57600"`). The server acknowledges with a single NUL and the
//! stream is raw application bytes from then on.
//!
//! The captured strings are kept so the session layer can use them to
//! fill identity fields the dropfile left empty. If the first inbound
//! byte is not NUL the handshake is assumed to have been completed by
//! the host before the door started, and the framer passes everything
//! through.

use crate::byte_queue::ByteQueue;
use crate::framing::InputSink;

const MAX_IDENT_LEN: usize = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for the leading NUL
    Start,
    /// Collecting the three NUL-terminated strings (0, 1, 2)
    Ident(usize),
    /// Handshake done, raw bytes
    PassThrough,
}

/// rlogin startup-handshake framer.
pub struct RloginFramer {
    phase: Phase,
    fields: [Vec<u8>; 3],
}

impl Default for RloginFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl RloginFramer {
    pub fn new() -> Self {
        Self {
            phase: Phase::Start,
            fields: [Vec::new(), Vec::new(), Vec::new()],
        }
    }

    /// Whether the startup exchange has completed
    pub fn handshake_complete(&self) -> bool {
        self.phase == Phase::PassThrough
    }

    /// Client-side user name from the handshake
    pub fn local_user(&self) -> String {
        String::from_utf8_lossy(&self.fields[0]).into_owned()
    }

    /// Server-side user name from the handshake
    pub fn remote_user(&self) -> String {
        String::from_utf8_lossy(&self.fields[1]).into_owned()
    }

    /// Terminal type / speed string from the handshake
    pub fn terminal(&self) -> String {
        String::from_utf8_lossy(&self.fields[2]).into_owned()
    }

    pub fn negotiate_inbound(&mut self, raw: &[u8], sink: &mut InputSink<'_>, reply: &mut ByteQueue) {
        for (i, &byte) in raw.iter().enumerate() {
            match self.phase {
                Phase::Start => {
                    if byte == 0 {
                        self.phase = Phase::Ident(0);
                    } else {
                        // Host already ran the exchange for us.
                        self.phase = Phase::PassThrough;
                        sink.push(byte);
                    }
                }
                Phase::Ident(field) => {
                    if byte == 0 {
                        if field == 2 {
                            // All three strings received: acknowledge and
                            // hand the rest of this chunk to the application.
                            reply.enqueue(0);
                            self.phase = Phase::PassThrough;
                        } else {
                            self.phase = Phase::Ident(field + 1);
                        }
                    } else if self.fields[field].len() < MAX_IDENT_LEN {
                        self.fields[field].push(byte);
                    }
                }
                Phase::PassThrough => {
                    // Everything after the handshake, including the rest
                    // of the current chunk, is application data.
                    for &b in &raw[i..] {
                        sink.push(b);
                    }
                    return;
                }
            }
        }
    }

    pub fn negotiate_outbound(&mut self, data: &[u8], wire: &mut ByteQueue) {
        wire.enqueue_slice(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::InboundFilter;

    fn feed(framer: &mut RloginFramer, raw: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut app = ByteQueue::new();
        let mut reply = ByteQueue::new();
        let mut filter = InboundFilter::new(false, false);
        framer.negotiate_inbound(raw, &mut filter.sink(&mut app), &mut reply);
        (app.drain(), reply.drain())
    }

    #[test]
    fn test_handshake_captures_fields_and_acks() {
        let mut framer = RloginFramer::new();
        let (app, reply) = feed(&mut framer, b"\0sysop\0guest\0ansi/57600\0");
        assert!(app.is_empty());
        assert_eq!(reply, vec![0]);
        assert!(framer.handshake_complete());
        assert_eq!(framer.local_user(), "sysop");
        assert_eq!(framer.remote_user(), "guest");
        assert_eq!(framer.terminal(), "ansi/57600");
    }

    #[test]
    fn test_trailing_bytes_become_application_data() {
        let mut framer = RloginFramer::new();
        let (app, reply) = feed(&mut framer, b"\0a\0b\0term\0hello");
        assert_eq!(app, b"hello");
        assert_eq!(reply, vec![0]);
    }

    #[test]
    fn test_handshake_split_across_chunks() {
        let mut framer = RloginFramer::new();
        let (app1, reply1) = feed(&mut framer, b"\0sys");
        assert!(app1.is_empty());
        assert!(reply1.is_empty());
        let (app2, reply2) = feed(&mut framer, b"op\0guest\0an");
        assert!(app2.is_empty());
        assert!(reply2.is_empty());
        let (app3, reply3) = feed(&mut framer, b"si\0after");
        assert_eq!(app3, b"after");
        assert_eq!(reply3, vec![0]);
        assert_eq!(framer.local_user(), "sysop");
        assert_eq!(framer.terminal(), "ansi");
    }

    #[test]
    fn test_non_nul_start_passes_through() {
        let mut framer = RloginFramer::new();
        let (app, reply) = feed(&mut framer, b"already raw");
        assert_eq!(app, b"already raw");
        assert!(reply.is_empty());
        assert!(framer.handshake_complete());
    }

    #[test]
    fn test_passthrough_after_handshake() {
        let mut framer = RloginFramer::new();
        feed(&mut framer, b"\0a\0b\0c\0");
        let (app, reply) = feed(&mut framer, b"payload");
        assert_eq!(app, b"payload");
        assert!(reply.is_empty());
    }

    #[test]
    fn test_outbound_is_verbatim() {
        let mut framer = RloginFramer::new();
        let mut wire = ByteQueue::new();
        framer.negotiate_outbound(&[0, 1, 0xFF], &mut wire);
        assert_eq!(wire.drain(), vec![0, 1, 0xFF]);
    }
}
