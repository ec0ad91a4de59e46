//! Blocking TCP transport with millisecond-resolution readability polls.
//!
//! A [`Transport`] owns exactly one OS socket. It can be opened three
//! ways: an outbound [`Transport::connect`], an inbound accept through
//! [`TransportListener`], or [`Transport::adopt`] of a descriptor
//! inherited from the host process that launched the door.
//!
//! All I/O is synchronous. Reads are driven by [`Transport::poll_readable`],
//! which reports whether at least one byte (or end-of-stream) can be
//! read within a millisecond budget; [`Transport::recv`] then performs
//! the actual receive.

use crate::errors::{DoorError, DoorResult};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

/// How long `close()` keeps draining after shutting down the write side
const HALF_CLOSE_DRAIN: Duration = Duration::from_millis(250);

/// A blocking TCP transport owning one socket.
pub struct Transport {
    stream: Option<TcpStream>,
    local_addr: Option<SocketAddr>,
    peer_addr: Option<SocketAddr>,
    /// Shut down the write side and drain reads before closing
    pub half_close: bool,
}

impl Transport {
    fn from_stream(stream: TcpStream) -> Self {
        let local_addr = stream.local_addr().ok();
        let peer_addr = stream.peer_addr().ok();
        Self {
            stream: Some(stream),
            local_addr,
            peer_addr,
            half_close: true,
        }
    }

    /// Resolve `host` and establish an outbound TCP stream.
    pub fn connect(host: &str, port: u16) -> DoorResult<Self> {
        let stream = TcpStream::connect((host, port)).map_err(DoorError::Io)?;
        Ok(Self::from_stream(stream))
    }

    /// Take ownership of an already-open socket descriptor inherited
    /// from the host process.
    ///
    /// On Unix the handle is a raw file descriptor; on Windows it is a
    /// raw SOCKET. Either way the transport owns it from here on and
    /// will close it.
    pub fn adopt(handle: i64) -> DoorResult<Self> {
        if handle < 0 {
            return Err(DoorError::Io(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("invalid socket handle {}", handle),
            )));
        }
        Ok(Self::from_stream(Self::adopt_raw(handle)))
    }

    #[cfg(unix)]
    fn adopt_raw(handle: i64) -> TcpStream {
        use std::os::fd::{FromRawFd, RawFd};
        unsafe { TcpStream::from_raw_fd(handle as RawFd) }
    }

    #[cfg(windows)]
    fn adopt_raw(handle: i64) -> TcpStream {
        use std::os::windows::io::{FromRawSocket, RawSocket};
        unsafe { TcpStream::from_raw_socket(handle as RawSocket) }
    }

    /// Whether the underlying socket is still open on our side.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Local address captured when the socket was opened.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Peer address captured when the socket was opened.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// True if at least one byte (or end-of-stream) is readable within
    /// `ms` milliseconds. Polling granularity is 1 ms.
    pub fn poll_readable(&self, ms: u64) -> bool {
        let stream = match self.stream.as_ref() {
            Some(s) => s,
            // A closed transport reads EOF immediately.
            None => return true,
        };

        let deadline = Instant::now() + Duration::from_millis(ms.max(1));
        let mut probe = [0u8; 1];
        loop {
            if stream
                .set_read_timeout(Some(Duration::from_millis(1)))
                .is_err()
            {
                return true;
            }
            match stream.peek(&mut probe) {
                // Data available, or Ok(0) meaning the peer closed.
                Ok(_) => return true,
                Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {}
                // Let recv() surface the real error.
                Err(_) => return true,
            }
            if Instant::now() >= deadline {
                return false;
            }
        }
    }

    /// Receive up to `buf.len()` bytes. A zero-length read means the
    /// peer closed; the transport marks itself closed and reports
    /// [`DoorError::TransportClosed`].
    pub fn recv(&mut self, buf: &mut [u8]) -> DoorResult<usize> {
        let stream = match self.stream.as_mut() {
            Some(s) => s,
            None => return Err(DoorError::TransportClosed),
        };
        stream.set_read_timeout(None).map_err(DoorError::from)?;
        match stream.read(buf) {
            Ok(0) => {
                self.stream = None;
                Err(DoorError::TransportClosed)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                let err = DoorError::from(e);
                if err.is_disconnect() {
                    self.stream = None;
                }
                Err(err)
            }
        }
    }

    /// Blocking write of the full slice.
    ///
    /// A connection reset (host-initiated abort or remote forcible
    /// close) closes the transport silently; any other error is fatal.
    pub fn send_all(&mut self, buf: &[u8]) -> DoorResult<()> {
        let stream = match self.stream.as_mut() {
            Some(s) => s,
            None => return Ok(()),
        };
        match stream.write_all(buf).and_then(|_| stream.flush()) {
            Ok(()) => Ok(()),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::ConnectionReset
                        | ErrorKind::ConnectionAborted
                        | ErrorKind::BrokenPipe
                ) =>
            {
                self.stream = None;
                Ok(())
            }
            Err(e) => Err(DoorError::Io(e)),
        }
    }

    /// Close the socket. With `half_close` set, the write side is shut
    /// down first and pending inbound data is drained so the peer sees
    /// an orderly FIN rather than a reset.
    pub fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if self.half_close {
                let _ = stream.shutdown(Shutdown::Write);
                let _ = stream.set_read_timeout(Some(HALF_CLOSE_DRAIN));
                let mut sink = [0u8; 512];
                while matches!(stream.read(&mut sink), Ok(n) if n > 0) {}
            }
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}

/// A bound, listening socket that accepts [`Transport`]s.
pub struct TransportListener {
    listener: TcpListener,
}

impl TransportListener {
    /// Bind `addr:port` and start listening.
    pub fn listen(addr: &str, port: u16) -> DoorResult<Self> {
        let target = (addr, port)
            .to_socket_addrs()
            .map_err(DoorError::Io)?
            .next()
            .ok_or_else(|| {
                DoorError::Io(std::io::Error::new(
                    ErrorKind::InvalidInput,
                    "address did not resolve",
                ))
            })?;
        let listener = TcpListener::bind(target).map_err(DoorError::Io)?;
        Ok(Self { listener })
    }

    /// Block until a client connects.
    pub fn accept(&self) -> DoorResult<Transport> {
        let (stream, _addr) = self.listener.accept().map_err(DoorError::Io)?;
        Ok(Transport::from_stream(stream))
    }

    pub fn local_addr(&self) -> DoorResult<SocketAddr> {
        self.listener.local_addr().map_err(DoorError::Io)
    }
}
