//! Session-level tests: adopting real sockets from a dropfile or the
//! command line, key multiplexing, and the event tick.
//!
//! These exercise descriptor inheritance, so they are Unix-only.
#![cfg(unix)]

use airlock::console::{key, ConsoleKey, NullConsole};
use airlock::door::{ControlFlow, DefaultHooks, DoorSession, ExitReason, SessionHooks};
use airlock::framing::Framer;
use airlock::{ComType, Emulation, KeySource};
use std::fs;
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::os::fd::IntoRawFd;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// An inherited-socket pair: the raw fd the "host" hands the door, and
/// the remote client's stream.
fn inherited_socket() -> (i64, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).unwrap();
    let (server, _) = listener.accept().unwrap();
    (server.into_raw_fd() as i64, client)
}

fn session_from_args(args: Vec<String>) -> DoorSession {
    DoorSession::startup(args, Box::new(NullConsole::new()), Box::new(DefaultHooks)).unwrap()
}

#[test]
fn handle_and_node_flags_open_telnet_session() {
    let (handle, mut client) = inherited_socket();
    let mut session = session_from_args(vec![format!("-H{}", handle), "-N4".to_string()]);

    assert!(!session.is_local());
    assert_eq!(session.info.node, 4);
    assert_eq!(session.info.com_type, ComType::Telnet);

    client.write_all(b"A").unwrap();
    let k = session.read_key().unwrap();
    assert_eq!(k, ConsoleKey::plain('A'));
    assert_eq!(session.last_key.source, KeySource::Remote);
}

#[test]
fn dropfile_com_type_picks_websocket_without_handshake() {
    let (handle, _client) = inherited_socket();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("door32.sys");
    fs::write(
        &path,
        format!("4\n{}\n115200\nBBS\n1\nPat\nPat\n10\n30\n1\n2\n", handle),
    )
    .unwrap();

    let mut session = session_from_args(vec![format!("-D{}", path.display())]);
    assert_eq!(session.info.com_type, ComType::WebSocket);
    assert_eq!(session.info.emulation, Emulation::Ansi);

    match session.connection_mut().unwrap().framer() {
        Framer::WebSocket(ws) => {
            // The host already upgraded the socket, so no handshake runs.
            assert!(ws.handshake_complete());
            assert_eq!(ws.version(), 13);
        }
        _ => panic!("expected websocket framer"),
    }
}

#[test]
fn com_type_override_flag_wins_over_dropfile() {
    let (handle, _client) = inherited_socket();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("door32.sys");
    fs::write(
        &path,
        format!("2\n{}\n115200\nBBS\n1\nPat\nPat\n10\n30\n1\n2\n", handle),
    )
    .unwrap();

    let mut session =
        session_from_args(vec![format!("-D{}", path.display()), "-C3".to_string()]);
    assert_eq!(session.info.com_type, ComType::Rlogin);
    assert!(matches!(
        session.connection_mut().unwrap().framer(),
        Framer::Rlogin(_)
    ));
}

#[test]
fn missing_dropfile_exits_after_wait() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("never-written.sys");
    let start = Instant::now();
    let result = DoorSession::startup(
        vec![format!("-D{}", path.display())],
        Box::new(NullConsole::new()),
        Box::new(DefaultHooks),
    );
    assert!(matches!(result, Err(ExitReason::DropfileMissing)));
    // Five seconds of waiting plus the banner pause.
    assert!(start.elapsed() >= Duration::from_secs(5));
}

#[test]
fn serial_com_type_is_refused() {
    let (handle, _client) = inherited_socket();
    let result = DoorSession::startup(
        vec![format!("-H{}", handle), "-N1".to_string(), "-C1".to_string()],
        Box::new(NullConsole::new()),
        Box::new(DefaultHooks),
    );
    assert!(matches!(result, Err(ExitReason::NoCarrier)));
}

#[test]
fn remote_arrow_escape_decodes_to_extended_key() {
    let (handle, mut client) = inherited_socket();
    let mut session = session_from_args(vec![format!("-H{}", handle), "-N1".to_string()]);

    client.write_all(b"\x1b[C").unwrap();
    let k = session.read_key().unwrap();
    assert_eq!(k, ConsoleKey::extended(key::RIGHT));
    assert_eq!(session.last_key.extended, true);
}

#[test]
fn lone_escape_is_delivered_as_itself() {
    let (handle, mut client) = inherited_socket();
    let mut session = session_from_args(vec![format!("-H{}", handle), "-N1".to_string()]);

    client.write_all(b"\x1bx").unwrap();
    // ESC followed by a non-arrow byte: the ESC comes through alone,
    // then the follow-up byte.
    let k1 = session.read_key().unwrap();
    let k2 = session.read_key().unwrap();
    assert_eq!(k1, ConsoleKey::plain('\x1b'));
    assert_eq!(k2, ConsoleKey::plain('x'));
}

#[test]
fn local_keys_win_alongside_remote() {
    let (handle, _client) = inherited_socket();
    let mut console = NullConsole::new();
    console.keys.push_back(ConsoleKey::plain('L'));
    let mut session = DoorSession::startup(
        vec![format!("-H{}", handle), "-N1".to_string()],
        Box::new(console),
        Box::new(DefaultHooks),
    )
    .unwrap();

    let k = session.read_key().unwrap();
    assert_eq!(k, ConsoleKey::plain('L'));
    assert_eq!(session.last_key.source, KeySource::Local);
}

#[test]
fn hangup_ends_the_session() {
    let (handle, client) = inherited_socket();
    let mut session = session_from_args(vec![format!("-H{}", handle), "-N1".to_string()]);
    drop(client);

    let result = session.read_key();
    assert!(matches!(result, Err(ExitReason::Hangup)));
    assert!(!session.carrier());
}

#[test]
fn time_up_ends_the_session() {
    let (handle, _client) = inherited_socket();
    let mut session = session_from_args(vec![format!("-H{}", handle), "-N1".to_string()]);
    session.info.max_time_secs = 0;

    let result = session.read_key();
    assert!(matches!(result, Err(ExitReason::TimeUp)));
}

#[test]
fn idle_timeout_ends_the_session() {
    let (handle, _client) = inherited_socket();
    let mut session = session_from_args(vec![format!("-H{}", handle), "-N1".to_string()]);
    session.max_idle_secs = 0;

    // Let at least one full second of idleness accumulate.
    std::thread::sleep(Duration::from_millis(1100));
    let result = session.read_key();
    assert!(matches!(result, Err(ExitReason::IdleTimeout)));
}

#[test]
fn tick_body_runs_at_most_once_per_second() {
    struct Counting(Arc<AtomicUsize>);
    impl SessionHooks for Counting {
        fn on_time_up(&mut self) -> ControlFlow {
            self.0.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue
        }
    }

    let count = Arc::new(AtomicUsize::new(0));
    let (handle, _client) = inherited_socket();
    let mut session = DoorSession::startup(
        vec![format!("-H{}", handle), "-N1".to_string()],
        Box::new(NullConsole::new()),
        Box::new(Counting(Arc::clone(&count))),
    )
    .unwrap();
    session.info.max_time_secs = 0;

    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(300) {
        session.tick();
    }
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn session_write_reaches_remote_with_colors() {
    use std::io::Read;

    let (handle, mut client) = inherited_socket();
    let mut session = session_from_args(vec![format!("-H{}", handle), "-N1".to_string()]);

    session.write("|0EHello|07").unwrap();
    client
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let mut buf = [0u8; 64];
    let n = client.read(&mut buf).unwrap();
    let text = String::from_utf8_lossy(&buf[..n]).into_owned();
    assert!(text.contains("Hello"));
    assert!(text.contains("\x1b[0;1;33;40m"));
}
