//! A minimal door: guess the number between 1 and 100.
//!
//! Run locally with `-L`, or from a host with `-D<dropfile>` /
//! `-H<handle> -N<node>`.

use airlock::console::CrosstermConsole;
use airlock::door::{DefaultHooks, DoorSession};
use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    let mut session = match DoorSession::startup(
        std::env::args().skip(1),
        Box::new(CrosstermConsole::new()),
        Box::new(DefaultHooks),
    ) {
        Ok(session) => session,
        Err(reason) => {
            eprintln!("startup failed: {:?}", reason);
            std::process::exit(1);
        }
    };

    let secret = (SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(42)
        % 100
        + 1) as i64;

    let _ = session.write_line("|0EThe Guessing Door|07");
    let _ = session.write_line("I am thinking of a number between 1 and 100.");

    loop {
        let _ = session.write("|0BYour guess:|07 ");
        let line = if session.is_local() {
            // Local play: collect keys from the console.
            let mut line = String::new();
            loop {
                match session.read_key() {
                    Ok(k) if k.ch == '\r' => break,
                    Ok(k) if !k.extended => {
                        line.push(k.ch);
                        let _ = session.write(&k.ch.to_string());
                    }
                    Ok(_) => {}
                    Err(_) => return,
                }
            }
            let _ = session.write("\r\n");
            line
        } else if let Some(conn) = session.connection_mut() {
            conn.read_line("\r\n", true, None, 60_000)
        } else {
            String::new()
        };

        let guess: i64 = match line.trim().parse() {
            Ok(n) => n,
            Err(_) => {
                let _ = session.write_line("Numbers only.");
                continue;
            }
        };

        if guess < secret {
            let _ = session.write_line("|09Higher.|07");
        } else if guess > secret {
            let _ = session.write_line("|0CLower.|07");
        } else {
            let _ = session.write_line("|0AYou got it!|07");
            break;
        }
    }

    let _ = session.write_line("Returning you to the board...");
    if let Some(conn) = session.connection_mut() {
        conn.close();
    }
}
