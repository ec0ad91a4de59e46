use std::fmt;
use std::path::PathBuf;

/// Error types for the door connection stack
#[derive(Debug)]
pub enum DoorError {
    /// The peer closed or reset the connection
    TransportClosed,

    /// A timed read gave up before any data arrived
    Timeout,

    /// The framing handshake could not be completed
    /// (missing header, unknown protocol version, malformed key)
    HandshakeFailed(String),

    /// A WebSocket frame violated the protocol (bad length, missing mask)
    MalformedFrame(String),

    /// The dropfile never appeared on disk
    DropfileMissing(PathBuf),

    /// The dropfile exists but a field could not be parsed
    DropfileMalformed { line: usize, reason: String },

    /// Any other I/O error
    Io(std::io::Error),
}

impl fmt::Display for DoorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoorError::TransportClosed => write!(f, "Connection closed by peer"),
            DoorError::Timeout => write!(f, "Read timed out"),
            DoorError::HandshakeFailed(reason) => write!(f, "Handshake failed: {}", reason),
            DoorError::MalformedFrame(reason) => write!(f, "Malformed frame: {}", reason),
            DoorError::DropfileMissing(path) => {
                write!(f, "Dropfile not found: {}", path.display())
            }
            DoorError::DropfileMalformed { line, reason } => {
                write!(f, "Dropfile line {}: {}", line, reason)
            }
            DoorError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for DoorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DoorError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DoorError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe => DoorError::TransportClosed,
            _ => DoorError::Io(err),
        }
    }
}

impl DoorError {
    /// True for errors that mean the peer is simply gone, as opposed to
    /// a local fault worth reporting
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            DoorError::TransportClosed | DoorError::MalformedFrame(_)
        )
    }
}

/// Result type alias for door operations
pub type DoorResult<T> = Result<T, DoorError>;
