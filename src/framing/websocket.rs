//! WebSocket framing: server-side opening handshake plus the frame
//! codecs for draft-0 (Hixie-76) and versions 7/8/13 (RFC 6455).
//!
//! Door clients tunnel an 8-bit terminal byte stream through WebSocket
//! text frames as UTF-8. The framer preserves that tunnel exactly:
//! inbound multi-byte UTF-8 sequences collapse to their low eight bits
//! (ISO-8859-1 semantics), and no value above 0xFF ever reaches the
//! application stream. Outbound bytes 0x80..=0xFF are expanded to
//! two-byte UTF-8 sequences.
//!
//! Control frames: a ping is answered with a pong carrying the same
//! payload, a pong is swallowed, and a close frame tears the
//! connection down.

use crate::byte_queue::ByteQueue;
use crate::errors::{DoorError, DoorResult};
use crate::framing::InputSink;
use crate::transport::Transport;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha1::{Digest, Sha1};
use std::time::{Duration, Instant};

/// RFC 6455 magic GUID appended to the client key before hashing
const ACCEPT_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Per-line (and body) budget while reading the upgrade request
const HANDSHAKE_LINE_TIMEOUT: Duration = Duration::from_secs(5);

const OP_CONTINUATION: u8 = 0x0;
const OP_TEXT: u8 = 0x1;
const OP_BINARY: u8 = 0x2;
const OP_CLOSE: u8 = 0x8;
const OP_PING: u8 = 0x9;
const OP_PONG: u8 = 0xA;

/// Compute the `Sec-WebSocket-Accept` value for a client key.
pub fn accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.trim().as_bytes());
    hasher.update(ACCEPT_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Extract a Hixie-76 key number: the digits of the header value
/// concatenated, divided by the number of spaces. The division is done
/// in 64 bits; keys with no spaces are rejected.
pub fn hixie_key_number(key: &str) -> DoorResult<u32> {
    let digits: String = key.chars().filter(|c| c.is_ascii_digit()).collect();
    let spaces = key.chars().filter(|&c| c == ' ').count() as u64;
    if spaces == 0 {
        return Err(DoorError::HandshakeFailed(
            "draft-0 key contains no spaces".into(),
        ));
    }
    let number: u64 = digits.parse().map_err(|_| {
        DoorError::HandshakeFailed("draft-0 key contains no digits".into())
    })?;
    Ok((number / spaces) as u32)
}

/// MD5 challenge response for the Hixie-76 handshake.
pub fn hixie_digest(key1: u32, key2: u32, body: &[u8; 8]) -> [u8; 16] {
    let mut challenge = [0u8; 16];
    challenge[..4].copy_from_slice(&key1.to_be_bytes());
    challenge[4..8].copy_from_slice(&key2.to_be_bytes());
    challenge[8..].copy_from_slice(body);
    md5::compute(challenge).0
}

/// Headers collected from the client's upgrade request
#[derive(Debug, Default, Clone)]
struct UpgradeRequest {
    path: Option<String>,
    host: Option<String>,
    origin: Option<String>,
    key: Option<String>,
    key1: Option<String>,
    key2: Option<String>,
    sub_protocol: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    /// Waiting for the FIN/opcode byte
    NeedStart,
    /// Waiting for the mask bit + 7-bit length
    NeedLen,
    /// Collecting a 2- or 8-byte extended length
    NeedExtLen(usize),
    /// Collecting the 4-byte masking key
    NeedMask,
    /// Consuming payload bytes
    InData,
}

/// Stateful ISO-8859-1-through-UTF-8 collapse.
///
/// Sequences may split across receive chunks, so the partial value is
/// carried between calls.
#[derive(Debug, Default)]
struct Utf8Collapse {
    pending: u32,
    remaining: u8,
}

impl Utf8Collapse {
    fn push(&mut self, byte: u8, out: &mut dyn FnMut(u8)) {
        if self.remaining > 0 {
            if byte & 0xC0 == 0x80 {
                self.pending = (self.pending << 6) | u32::from(byte & 0x3F);
                self.remaining -= 1;
                if self.remaining == 0 {
                    out((self.pending & 0xFF) as u8);
                }
            } else {
                // Truncated sequence; deliver the stray byte as-is.
                self.remaining = 0;
                self.push(byte, out);
            }
        } else if byte < 0x80 {
            out(byte);
        } else if byte & 0xE0 == 0xC0 {
            self.pending = u32::from(byte & 0x1F);
            self.remaining = 1;
        } else if byte & 0xF0 == 0xE0 {
            self.pending = u32::from(byte & 0x0F);
            self.remaining = 2;
        } else if byte & 0xF8 == 0xF0 {
            self.pending = u32::from(byte & 0x07);
            self.remaining = 3;
        } else {
            // Lone continuation byte; pass through.
            out(byte);
        }
    }
}

/// Expand one application byte to its UTF-8 tunnel form.
fn encode_tunnel_byte(byte: u8, out: &mut Vec<u8>) {
    if byte < 0x80 {
        out.push(byte);
    } else {
        out.push(0xC0 | (byte >> 6));
        out.push(0x80 | (byte & 0x3F));
    }
}

/// WebSocket framer (server role) for draft-0 and v7/8/13.
pub struct WebSocketFramer {
    shake_required: bool,
    handshake_complete: bool,
    version: u8,
    request: UpgradeRequest,

    // v7/8/13 inbound frame assembly
    frame_state: FrameState,
    opcode: u8,
    text_frame: bool,
    payload_len: u64,
    payload_received: u64,
    ext_len_acc: u64,
    mask: [u8; 4],
    mask_filled: usize,
    control_payload: Vec<u8>,

    // draft-0 inbound framing
    draft0_in_frame: bool,

    utf8: Utf8Collapse,
}

impl WebSocketFramer {
    /// `shake_required` is false when the host process has already run
    /// the upgrade on the inherited socket; the framer then starts in
    /// pass-through v13 framing.
    pub fn new(shake_required: bool) -> Self {
        Self {
            shake_required,
            handshake_complete: !shake_required,
            version: 13,
            request: UpgradeRequest::default(),
            frame_state: FrameState::NeedStart,
            opcode: 0,
            text_frame: true,
            payload_len: 0,
            payload_received: 0,
            ext_len_acc: 0,
            mask: [0; 4],
            mask_filled: 0,
            control_payload: Vec::new(),
            draft0_in_frame: false,
            utf8: Utf8Collapse::default(),
        }
    }

    pub fn handshake_complete(&self) -> bool {
        self.handshake_complete
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Run the server side of the opening handshake against the
    /// transport. No-op when the handshake is not required or already
    /// done.
    pub fn shake(&mut self, transport: &mut Transport) -> DoorResult<()> {
        if !self.shake_required || self.handshake_complete {
            return Ok(());
        }

        self.read_upgrade_request(transport)?;

        let version = self
            .request
            .version
            .clone()
            .unwrap_or_else(|| "0".to_string());
        match version.as_str() {
            "7" | "8" | "13" => {
                self.version = version.parse().unwrap_or(13);
                self.respond_rfc6455(transport)?;
            }
            "0" => {
                self.version = 0;
                self.respond_hixie76(transport)?;
            }
            other => {
                return Err(DoorError::HandshakeFailed(format!(
                    "unsupported WebSocket version {}",
                    other
                )));
            }
        }
        self.handshake_complete = true;
        Ok(())
    }

    fn read_upgrade_request(&mut self, transport: &mut Transport) -> DoorResult<()> {
        let request_line = read_header_line(transport)?;
        let mut parts = request_line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("GET"), Some(path)) => self.request.path = Some(path.to_string()),
            _ => {
                return Err(DoorError::HandshakeFailed(format!(
                    "bad request line: {}",
                    request_line
                )));
            }
        }

        loop {
            let line = read_header_line(transport)?;
            if line.is_empty() {
                return Ok(());
            }
            let (name, value) = match line.split_once(':') {
                Some((n, v)) => (n.trim().to_ascii_lowercase(), v.trim().to_string()),
                None => continue,
            };
            match name.as_str() {
                "host" => self.request.host = Some(value),
                "origin" | "sec-websocket-origin" => self.request.origin = Some(value),
                "sec-websocket-key" => self.request.key = Some(value),
                "sec-websocket-key1" => self.request.key1 = Some(value),
                "sec-websocket-key2" => self.request.key2 = Some(value),
                "sec-websocket-protocol" => self.request.sub_protocol = Some(value),
                "sec-websocket-version" | "sec-websocket-draft" => {
                    self.request.version = Some(value)
                }
                // Recognized but not needed to answer.
                "connection" | "upgrade" => {}
                _ => {}
            }
        }
    }

    fn require(field: &Option<String>, name: &str) -> DoorResult<String> {
        field
            .clone()
            .ok_or_else(|| DoorError::HandshakeFailed(format!("missing {} header", name)))
    }

    fn respond_rfc6455(&mut self, transport: &mut Transport) -> DoorResult<()> {
        let key = Self::require(&self.request.key, "Sec-WebSocket-Key")?;
        Self::require(&self.request.host, "Host")?;
        Self::require(&self.request.origin, "Origin")?;
        Self::require(&self.request.path, "request path")?;

        let mut response = String::new();
        response.push_str("HTTP/1.1 101 Switching Protocols\r\n");
        response.push_str("Upgrade: websocket\r\n");
        response.push_str("Connection: Upgrade\r\n");
        response.push_str(&format!("Sec-WebSocket-Accept: {}\r\n", accept_key(&key)));
        if let Some(protocol) = &self.request.sub_protocol {
            response.push_str(&format!("Sec-WebSocket-Protocol: {}\r\n", protocol));
        }
        response.push_str("\r\n");
        transport.send_all(response.as_bytes())
    }

    fn respond_hixie76(&mut self, transport: &mut Transport) -> DoorResult<()> {
        let key1 = Self::require(&self.request.key1, "Sec-WebSocket-Key1")?;
        let key2 = Self::require(&self.request.key2, "Sec-WebSocket-Key2")?;
        let host = Self::require(&self.request.host, "Host")?;
        let origin = Self::require(&self.request.origin, "Origin")?;
        let path = Self::require(&self.request.path, "request path")?;

        // The challenge body is the 8 bytes after the blank line.
        let mut body = [0u8; 8];
        read_exact_timed(transport, &mut body)?;

        let digest = hixie_digest(
            hixie_key_number(&key1)?,
            hixie_key_number(&key2)?,
            &body,
        );

        let mut response = String::new();
        response.push_str("HTTP/1.1 101 WebSocket Protocol Handshake\r\n");
        response.push_str("Upgrade: WebSocket\r\n");
        response.push_str("Connection: Upgrade\r\n");
        response.push_str(&format!("Sec-WebSocket-Origin: {}\r\n", origin));
        response.push_str(&format!("Sec-WebSocket-Location: ws://{}{}\r\n", host, path));
        if let Some(protocol) = &self.request.sub_protocol {
            response.push_str(&format!("Sec-WebSocket-Protocol: {}\r\n", protocol));
        }
        response.push_str("\r\n");
        transport.send_all(response.as_bytes())?;
        transport.send_all(&digest)
    }

    pub fn negotiate_inbound(
        &mut self,
        raw: &[u8],
        sink: &mut InputSink<'_>,
        reply: &mut ByteQueue,
    ) -> DoorResult<()> {
        if self.version == 0 {
            self.decode_draft0(raw, sink);
            return Ok(());
        }

        let data = raw;
        let mut pos = 0;

        while pos < data.len() {
            match self.frame_state {
                FrameState::NeedStart => {
                    let byte = data[pos];
                    pos += 1;
                    let opcode = byte & 0x0F;
                    match opcode {
                        OP_CLOSE => return Err(DoorError::TransportClosed),
                        OP_TEXT => self.text_frame = true,
                        OP_BINARY => self.text_frame = false,
                        // Continuation keeps the previous data mode;
                        // control frames do not disturb it.
                        _ => {}
                    }
                    self.opcode = opcode;
                    self.control_payload.clear();
                    self.frame_state = FrameState::NeedLen;
                }
                FrameState::NeedLen => {
                    let byte = data[pos];
                    pos += 1;
                    if byte & 0x80 == 0 {
                        return Err(DoorError::MalformedFrame(
                            "client frame without mask bit".into(),
                        ));
                    }
                    self.ext_len_acc = 0;
                    match byte & 0x7F {
                        126 => self.frame_state = FrameState::NeedExtLen(2),
                        127 => self.frame_state = FrameState::NeedExtLen(8),
                        n => {
                            self.payload_len = u64::from(n);
                            self.mask_filled = 0;
                            self.frame_state = FrameState::NeedMask;
                        }
                    }
                }
                FrameState::NeedExtLen(remaining) => {
                    let byte = data[pos];
                    pos += 1;
                    self.ext_len_acc = (self.ext_len_acc << 8) | u64::from(byte);
                    if remaining == 1 {
                        self.payload_len = self.ext_len_acc;
                        self.mask_filled = 0;
                        self.frame_state = FrameState::NeedMask;
                    } else {
                        self.frame_state = FrameState::NeedExtLen(remaining - 1);
                    }
                }
                FrameState::NeedMask => {
                    let byte = data[pos];
                    pos += 1;
                    self.mask[self.mask_filled] = byte;
                    self.mask_filled += 1;
                    if self.mask_filled == 4 {
                        self.payload_received = 0;
                        if self.payload_len == 0 {
                            self.finish_frame(reply);
                        } else {
                            self.frame_state = FrameState::InData;
                        }
                    }
                }
                FrameState::InData => {
                    let byte = data[pos] ^ self.mask[(self.payload_received % 4) as usize];
                    pos += 1;
                    self.payload_received += 1;
                    match self.opcode {
                        OP_TEXT | OP_BINARY | OP_CONTINUATION => {
                            if self.text_frame {
                                self.utf8.push(byte, &mut |b| sink.push(b));
                            } else {
                                sink.push(byte);
                            }
                        }
                        OP_PING => self.control_payload.push(byte),
                        // Pong payloads are swallowed.
                        _ => {}
                    }
                    if self.payload_received == self.payload_len {
                        self.finish_frame(reply);
                    }
                }
            }
        }
        Ok(())
    }

    fn finish_frame(&mut self, reply: &mut ByteQueue) {
        if self.opcode == OP_PING {
            // Answer with a pong carrying the same payload, unmasked.
            reply.enqueue(0x80 | OP_PONG);
            reply.enqueue(self.control_payload.len() as u8);
            reply.enqueue_slice(&self.control_payload);
            self.control_payload.clear();
        }
        self.frame_state = FrameState::NeedStart;
    }

    fn decode_draft0(&mut self, raw: &[u8], sink: &mut InputSink<'_>) {
        for &byte in raw {
            if self.draft0_in_frame {
                if byte == 0xFF {
                    self.draft0_in_frame = false;
                } else {
                    self.utf8.push(byte, &mut |b| sink.push(b));
                }
            } else if byte == 0x00 {
                self.draft0_in_frame = true;
            }
            // Bytes outside a 0x00..0xFF frame are not valid draft-0
            // traffic and are dropped.
        }
    }

    pub fn negotiate_outbound(&mut self, data: &[u8], wire: &mut ByteQueue) {
        let mut payload = Vec::with_capacity(data.len() + data.len() / 4);
        for &byte in data {
            encode_tunnel_byte(byte, &mut payload);
        }

        if self.version == 0 {
            wire.enqueue(0x00);
            wire.enqueue_slice(&payload);
            wire.enqueue(0xFF);
            return;
        }

        // One unfragmented text frame, unmasked (server to client).
        wire.enqueue(0x80 | OP_TEXT);
        let len = payload.len() as u64;
        if len <= 125 {
            wire.enqueue(len as u8);
        } else if len <= 0xFFFF {
            wire.enqueue(126);
            wire.enqueue_slice(&(len as u16).to_be_bytes());
        } else {
            wire.enqueue(127);
            wire.enqueue_slice(&len.to_be_bytes());
        }
        wire.enqueue_slice(&payload);
    }
}

/// Read one CRLF-terminated header line, allowing 5 seconds for it to
/// arrive in full.
fn read_header_line(transport: &mut Transport) -> DoorResult<String> {
    let deadline = Instant::now() + HANDSHAKE_LINE_TIMEOUT;
    let mut line = Vec::new();
    loop {
        if Instant::now() >= deadline {
            return Err(DoorError::HandshakeFailed(
                "timed out reading upgrade header".into(),
            ));
        }
        if !transport.poll_readable(10) {
            continue;
        }
        let mut byte = [0u8; 1];
        match transport.recv(&mut byte) {
            Ok(0) => continue,
            Ok(_) => {
                if byte[0] == b'\n' {
                    return Ok(String::from_utf8_lossy(&line).into_owned());
                }
                if byte[0] != b'\r' {
                    line.push(byte[0]);
                }
            }
            Err(DoorError::TransportClosed) => {
                return Err(DoorError::HandshakeFailed(
                    "peer closed during handshake".into(),
                ));
            }
            Err(e) => return Err(e),
        }
    }
}

/// Read an exact number of body bytes under the handshake deadline.
fn read_exact_timed(transport: &mut Transport, buf: &mut [u8]) -> DoorResult<()> {
    let deadline = Instant::now() + HANDSHAKE_LINE_TIMEOUT;
    let mut filled = 0;
    while filled < buf.len() {
        if Instant::now() >= deadline {
            return Err(DoorError::HandshakeFailed(
                "timed out reading handshake body".into(),
            ));
        }
        if !transport.poll_readable(10) {
            continue;
        }
        match transport.recv(&mut buf[filled..]) {
            Ok(n) => filled += n,
            Err(DoorError::TransportClosed) => {
                return Err(DoorError::HandshakeFailed(
                    "peer closed during handshake".into(),
                ));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::InboundFilter;

    fn feed(framer: &mut WebSocketFramer, raw: &[u8]) -> DoorResult<(Vec<u8>, Vec<u8>)> {
        let mut app = ByteQueue::new();
        let mut reply = ByteQueue::new();
        let mut filter = InboundFilter::new(false, false);
        framer.negotiate_inbound(raw, &mut filter.sink(&mut app), &mut reply)?;
        Ok((app.drain(), reply.drain()))
    }

    #[test]
    fn test_accept_key_rfc_vector() {
        assert_eq!(
            accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn test_hixie_key_numbers_from_draft_example() {
        let n1 = hixie_key_number("18x 6]8vM;54 *(5:  {   U1]8  z [  8").unwrap();
        let n2 = hixie_key_number("1_ tx7X d  <  nw  334J702) 7]o}` 0").unwrap();
        assert_eq!(n1, 155_712_099);
        assert_eq!(n2, 173_347_027);
    }

    #[test]
    fn test_hixie_digest_from_draft_example() {
        let digest = hixie_digest(155_712_099, 173_347_027, b"Tm[K T2u");
        assert_eq!(&digest, b"fQJ,fN/4F4!~K~MH");
    }

    #[test]
    fn test_hixie_key_without_spaces_is_rejected() {
        assert!(hixie_key_number("12345").is_err());
    }

    #[test]
    fn test_v13_frame_decode_hello() {
        let mut framer = WebSocketFramer::new(false);
        let frame = [0x81, 0x85, 0x37, 0xFA, 0x21, 0x3D, 0x7F, 0x9F, 0x4D, 0x51, 0x58];
        let (app, reply) = feed(&mut framer, &frame).unwrap();
        assert_eq!(app, b"Hello");
        assert!(reply.is_empty());
    }

    #[test]
    fn test_v13_frame_decode_split_anywhere() {
        let frame = [0x81, 0x85, 0x37, 0xFA, 0x21, 0x3D, 0x7F, 0x9F, 0x4D, 0x51, 0x58];
        for split in 1..frame.len() {
            let mut framer = WebSocketFramer::new(false);
            let (mut app, _) = feed(&mut framer, &frame[..split]).unwrap();
            let (rest, _) = feed(&mut framer, &frame[split..]).unwrap();
            app.extend(rest);
            assert_eq!(app, b"Hello", "split at {}", split);
        }
    }

    #[test]
    fn test_v13_frame_encode_hi() {
        let mut framer = WebSocketFramer::new(false);
        let mut wire = ByteQueue::new();
        framer.negotiate_outbound(b"Hi", &mut wire);
        assert_eq!(wire.drain(), vec![0x81, 0x02, 0x48, 0x69]);
    }

    #[test]
    fn test_v13_high_bytes_round_trip() {
        // CP437 box-drawing bytes must tunnel through unchanged.
        let mut framer = WebSocketFramer::new(false);
        let mut wire = ByteQueue::new();
        let original: Vec<u8> = vec![0xB0, 0xB1, 0xC9, 0x20, 0x41, 0xFF];
        framer.negotiate_outbound(&original, &mut wire);
        let encoded = wire.drain();

        // Re-mask the payload as a client would before decoding.
        let payload = &encoded[2..];
        let mask = [0x11, 0x22, 0x33, 0x44];
        let mut masked_frame = vec![0x81, 0x80 | payload.len() as u8];
        masked_frame.extend_from_slice(&mask);
        for (i, &b) in payload.iter().enumerate() {
            masked_frame.push(b ^ mask[i % 4]);
        }

        let mut decoder = WebSocketFramer::new(false);
        let (app, _) = feed(&mut decoder, &masked_frame).unwrap();
        assert_eq!(app, original);
    }

    #[test]
    fn test_v13_extended_length_frame() {
        // 300-byte payload forces the 2-byte extended length form.
        let payload: Vec<u8> = (0..300u32).map(|i| (i % 96 + 32) as u8).collect();
        let mask = [9, 8, 7, 6];
        let mut frame = vec![0x81, 0x80 | 126, 0x01, 0x2C];
        frame.extend_from_slice(&mask);
        for (i, &b) in payload.iter().enumerate() {
            frame.push(b ^ mask[i % 4]);
        }
        let mut framer = WebSocketFramer::new(false);
        let (app, _) = feed(&mut framer, &frame).unwrap();
        assert_eq!(app, payload);
    }

    #[test]
    fn test_v13_unmasked_client_frame_is_malformed() {
        let mut framer = WebSocketFramer::new(false);
        let result = feed(&mut framer, &[0x81, 0x02, 0x48, 0x69]);
        assert!(matches!(result, Err(DoorError::MalformedFrame(_))));
    }

    #[test]
    fn test_v13_ping_answered_with_pong() {
        let mut framer = WebSocketFramer::new(false);
        let mask = [1, 2, 3, 4];
        let payload = b"ka";
        let mut frame = vec![0x89, 0x80 | payload.len() as u8];
        frame.extend_from_slice(&mask);
        for (i, &b) in payload.iter().enumerate() {
            frame.push(b ^ mask[i % 4]);
        }
        let (app, reply) = feed(&mut framer, &frame).unwrap();
        assert!(app.is_empty());
        assert_eq!(reply, vec![0x8A, 0x02, b'k', b'a']);
    }

    #[test]
    fn test_v13_close_reports_transport_closed() {
        let mut framer = WebSocketFramer::new(false);
        let result = feed(&mut framer, &[0x88, 0x80, 0, 0, 0, 0]);
        assert!(matches!(result, Err(DoorError::TransportClosed)));
    }

    #[test]
    fn test_draft0_decode() {
        let mut framer = WebSocketFramer::new(false);
        framer.version = 0;
        let (app, _) = feed(&mut framer, b"\x00abc\xff\x00de\xff").unwrap();
        assert_eq!(app, b"abcde");
    }

    #[test]
    fn test_draft0_utf8_collapse() {
        let mut framer = WebSocketFramer::new(false);
        framer.version = 0;
        // 0xC3 0x9A is U+00DA; the tunnel collapses it to byte 0xDA.
        let (app, _) = feed(&mut framer, &[0x00, 0xC3, 0x9A, 0xFF]).unwrap();
        assert_eq!(app, vec![0xDA]);
    }

    #[test]
    fn test_draft0_encode() {
        let mut framer = WebSocketFramer::new(false);
        framer.version = 0;
        let mut wire = ByteQueue::new();
        framer.negotiate_outbound(&[b'A', 0xB0], &mut wire);
        assert_eq!(wire.drain(), vec![0x00, b'A', 0xC2, 0xB0, 0xFF]);
    }

    #[test]
    fn test_shake_not_required_starts_complete() {
        let framer = WebSocketFramer::new(false);
        assert!(framer.handshake_complete());
        assert_eq!(framer.version(), 13);
    }
}
