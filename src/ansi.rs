//! ANSI escape-sequence generation.
//!
//! Pure functions returning escape strings for the remote terminal.
//! Nothing here touches an I/O handle; the session layer decides where
//! the sequences go. Colors use the classic DOS text attribute layout:
//! low nibble foreground 0-15, bits 4-6 background 0-7, bit 7 blink.

/// DOS color index to ANSI color offset
const ANSI_COLOR: [u8; 8] = [0, 4, 2, 6, 1, 5, 3, 7];

pub fn cursor_up(n: u16) -> String {
    format!("\x1b[{}A", n)
}

pub fn cursor_down(n: u16) -> String {
    format!("\x1b[{}B", n)
}

pub fn cursor_forward(n: u16) -> String {
    format!("\x1b[{}C", n)
}

pub fn cursor_backward(n: u16) -> String {
    format!("\x1b[{}D", n)
}

/// Move to 1-based column `x`, row `y`
pub fn goto(x: u16, y: u16) -> String {
    format!("\x1b[{};{}H", y, x)
}

pub fn clear_screen() -> String {
    "\x1b[2J\x1b[H".to_string()
}

pub fn clear_to_eol() -> String {
    "\x1b[K".to_string()
}

pub fn save_cursor() -> String {
    "\x1b[s".to_string()
}

pub fn restore_cursor() -> String {
    "\x1b[u".to_string()
}

pub fn reset_attributes() -> String {
    "\x1b[0m".to_string()
}

/// SGR sequence for a full DOS text attribute byte.
pub fn sgr_for_attribute(attr: u8) -> String {
    let fg = attr & 0x0F;
    let bg = (attr >> 4) & 0x07;
    let mut seq = String::from("\x1b[0");
    if fg > 7 {
        seq.push_str(";1");
    }
    if attr & 0x80 != 0 {
        seq.push_str(";5");
    }
    seq.push_str(&format!(
        ";{};{}m",
        30 + ANSI_COLOR[(fg & 7) as usize],
        40 + ANSI_COLOR[bg as usize]
    ));
    seq
}

/// SGR sequence setting only the foreground (0-15). Resets attributes
/// first so a previous bold does not bleed into a dim color.
pub fn sgr_foreground(color: u8) -> String {
    let color = color & 0x0F;
    if color > 7 {
        format!("\x1b[0;1;{}m", 30 + ANSI_COLOR[(color & 7) as usize])
    } else {
        format!("\x1b[0;{}m", 30 + ANSI_COLOR[color as usize])
    }
}

/// SGR sequence setting only the background (0-7), leaving the
/// foreground alone.
pub fn sgr_background(color: u8) -> String {
    format!("\x1b[{}m", 40 + ANSI_COLOR[(color & 0x07) as usize])
}
