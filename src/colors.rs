//! Color grammars applied to outbound door text.
//!
//! Two grammars are supported. The pipe grammar replaces `|XX` (two
//! hex digits) with the SGR sequence for DOS attribute 0xXX. The
//! backtick grammar is the compact color-and-control notation used by
//! legend-style games; besides colors it carries delays and a
//! wait-for-key prompt, so expansion produces a list of [`TextOp`]s
//! rather than a flat string; the session layer executes them in
//! order.

use crate::ansi;
use std::time::Duration;

/// One step of expanded door text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOp {
    /// Literal text (escape sequences included) to send
    Text(String),
    /// Pause output for the given duration
    Delay(Duration),
    /// Show a more-prompt and wait for a keypress
    AwaitKey,
}

/// Replace `|XX` attribute codes with ANSI SGR sequences.
///
/// Anything that is not a pipe followed by exactly two hex digits
/// passes through unchanged.
pub fn expand_pipe_codes(text: &str) -> String {
    apply_pipe_codes(text, true)
}

/// Remove `|XX` attribute codes without emitting escapes, for clients
/// that negotiated plain ASCII.
pub fn strip_pipe_codes(text: &str) -> String {
    apply_pipe_codes(text, false)
}

fn apply_pipe_codes(text: &str, ansi: bool) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'|' && i + 2 < bytes.len() {
            let hi = (bytes[i + 1] as char).to_digit(16);
            let lo = (bytes[i + 2] as char).to_digit(16);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                if ansi {
                    out.push_str(&ansi::sgr_for_attribute((hi * 16 + lo) as u8));
                }
                i += 3;
                continue;
            }
        }
        // Advance one whole character, not one byte.
        let ch = text[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

/// Foreground color for a backtick color code character, if it is one
fn backtick_foreground(code: char) -> Option<u8> {
    match code {
        '1'..='9' => Some(code as u8 - b'0'),
        '0' => Some(10),
        '!' => Some(11),
        '@' => Some(12),
        '#' => Some(13),
        '$' => Some(14),
        '%' => Some(15),
        '*' => Some(0),
        _ => None,
    }
}

/// Expand the backtick grammar into a sequence of operations.
pub fn expand_backtick_codes(text: &str) -> Vec<TextOp> {
    let mut ops = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    let mut flush = |current: &mut String, ops: &mut Vec<TextOp>| {
        if !current.is_empty() {
            ops.push(TextOp::Text(std::mem::take(current)));
        }
    };

    while let Some(ch) = chars.next() {
        if ch != '`' {
            current.push(ch);
            continue;
        }
        let code = match chars.next() {
            Some(c) => c,
            None => {
                // Trailing lone backtick passes through.
                current.push('`');
                break;
            }
        };
        if let Some(color) = backtick_foreground(code) {
            current.push_str(&ansi::sgr_foreground(color));
            continue;
        }
        match code {
            '`' => current.push('`'),
            'r' => {
                // `r0 .. `r7 set the background.
                match chars.peek().and_then(|c| c.to_digit(8)) {
                    Some(bg) => {
                        chars.next();
                        current.push_str(&ansi::sgr_background(bg as u8));
                    }
                    None => {} // `r without a digit is swallowed
                }
            }
            'b' => current.push('\x07'),
            'c' => {
                current.push_str(&ansi::reset_attributes());
                current.push_str(&ansi::clear_screen());
            }
            'd' => {
                flush(&mut current, &mut ops);
                ops.push(TextOp::Delay(Duration::from_millis(500)));
            }
            'w' => {
                flush(&mut current, &mut ops);
                ops.push(TextOp::Delay(Duration::from_millis(100)));
            }
            'l' => {
                flush(&mut current, &mut ops);
                ops.push(TextOp::Delay(Duration::from_millis(50)));
            }
            'k' => {
                flush(&mut current, &mut ops);
                ops.push(TextOp::AwaitKey);
            }
            'x' => current.push(' '),
            '\\' => current.push_str("\r\n"),
            '|' => current.push('|'),
            '.' => {} // reserved, produces nothing
            _ => {}   // unknown codes are swallowed
        }
    }
    if !current.is_empty() {
        ops.push(TextOp::Text(current));
    }
    ops
}
