//! Dropfile parsing.
//!
//! Before launching a door, the host writes a small text file carrying
//! the user's identity and the descriptor of the already-open socket.
//! Two formats are understood: the 11-line `DOOR32.SYS` and the
//! 14-line `INFO.*` file written by legend-style hosts. Both are
//! line-per-field with CRLF or lone-LF endings.

use crate::errors::{DoorError, DoorResult};
use std::fs;
use std::path::Path;

/// Connection framing selected by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComType {
    /// No remote connection; keyboard and screen only
    Local,
    /// Serial port / fossil (not supported)
    Serial,
    Telnet,
    Rlogin,
    WebSocket,
}

impl ComType {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(ComType::Local),
            1 => Some(ComType::Serial),
            2 => Some(ComType::Telnet),
            3 => Some(ComType::Rlogin),
            4 => Some(ComType::WebSocket),
            _ => None,
        }
    }
}

/// Terminal emulation the user's client supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emulation {
    Ascii,
    Ansi,
}

/// Configuration extracted from the dropfile. Created once by the
/// parser; read-only afterwards.
#[derive(Debug, Clone)]
pub struct DropInfo {
    pub com_type: ComType,
    /// Platform-native socket descriptor inherited from the host,
    /// or -1 for local sessions
    pub socket_handle: i64,
    pub baud: u32,
    pub node: u32,
    pub access: u32,
    /// User record position, 0-based
    pub rec_pos: u32,
    /// Session time limit in seconds
    pub max_time_secs: i64,
    pub alias: String,
    pub real_name: String,
    pub emulation: Emulation,
    // Legend-of-the-dragon extras
    pub fairy: bool,
    pub registered: bool,
    pub clean_mode: bool,
}

impl DropInfo {
    /// Defaults for a `-L` local session: no socket, an hour on the
    /// clock, ANSI output.
    pub fn local() -> Self {
        Self {
            com_type: ComType::Local,
            socket_handle: -1,
            baud: 0,
            node: 1,
            access: 0,
            rec_pos: 0,
            max_time_secs: 3600,
            alias: "Local".to_string(),
            real_name: "Local User".to_string(),
            emulation: Emulation::Ansi,
            fairy: false,
            registered: false,
            clean_mode: false,
        }
    }

    /// Load a dropfile, picking the format from the file name:
    /// `DOOR32.SYS` (any case) parses as DOOR32, anything else as
    /// `INFO.*`.
    pub fn load(path: &Path) -> DoorResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DoorError::DropfileMissing(path.to_path_buf())
            } else {
                DoorError::Io(e)
            }
        })?;
        let is_door32 = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.eq_ignore_ascii_case("door32.sys"))
            .unwrap_or(false);
        if is_door32 {
            Self::parse_door32(&content)
        } else {
            Self::parse_info(&content)
        }
    }

    /// Parse the 11-line DOOR32.SYS format.
    pub fn parse_door32(content: &str) -> DoorResult<Self> {
        let lines = collect_lines(content, 11)?;

        let com_code: u32 = parse_field(&lines, 1, "com type")?;
        let com_type = ComType::from_code(com_code).ok_or(DoorError::DropfileMalformed {
            line: 1,
            reason: format!("unknown com type {}", com_code),
        })?;

        let rec_pos: u32 = parse_field(&lines, 5, "record position")?;
        let time_minutes: i64 = parse_field(&lines, 9, "time left")?;
        let emulation_code: u32 = parse_field(&lines, 10, "emulation")?;

        Ok(Self {
            com_type,
            socket_handle: parse_field(&lines, 2, "socket handle")?,
            baud: parse_field(&lines, 3, "baud rate")?,
            node: parse_field(&lines, 11, "node number")?,
            access: parse_field(&lines, 8, "access level")?,
            // 1-based on disk
            rec_pos: rec_pos.saturating_sub(1),
            max_time_secs: time_minutes * 60,
            alias: lines[6].clone(),
            real_name: lines[5].clone(),
            emulation: if emulation_code == 0 {
                Emulation::Ascii
            } else {
                Emulation::Ansi
            },
            fairy: false,
            registered: false,
            clean_mode: false,
        })
    }

    /// Parse the 14-line INFO.* format.
    pub fn parse_info(content: &str) -> DoorResult<Self> {
        let lines = collect_lines(content, 14)?;

        let time_minutes: i64 = parse_field(&lines, 5, "time left")?;
        let socket_handle: i64 = parse_field(&lines, 9, "com port")?;

        let mut real_name = lines[6].clone();
        if !lines[7].is_empty() {
            real_name.push(' ');
            real_name.push_str(&lines[7]);
        }

        Ok(Self {
            // INFO.* does not carry a com type; a valid handle means
            // telnet unless the command line overrides it.
            com_type: if socket_handle >= 0 {
                ComType::Telnet
            } else {
                ComType::Local
            },
            socket_handle,
            baud: parse_field(&lines, 10, "baud rate")?,
            node: 1,
            access: 0,
            rec_pos: parse_field(&lines, 1, "record position")?,
            max_time_secs: time_minutes * 60,
            alias: lines[5].clone(),
            real_name,
            emulation: if lines[1].trim() == "3" {
                Emulation::Ansi
            } else {
                Emulation::Ascii
            },
            fairy: lines[3].eq_ignore_ascii_case("FAIRY YES"),
            registered: lines[12].eq_ignore_ascii_case("REGISTERED"),
            clean_mode: lines[13].eq_ignore_ascii_case("CLEAN MODE ON"),
        })
    }
}

/// Split dropfile content into trimmed lines, requiring at least
/// `required` of them.
fn collect_lines(content: &str, required: usize) -> DoorResult<Vec<String>> {
    let lines: Vec<String> = content.lines().map(|l| l.trim_end().to_string()).collect();
    if lines.len() < required {
        return Err(DoorError::DropfileMalformed {
            line: lines.len() + 1,
            reason: format!("expected {} lines, found {}", required, lines.len()),
        });
    }
    Ok(lines)
}

/// Parse the 1-based line `number` as a numeric field.
fn parse_field<T: std::str::FromStr>(
    lines: &[String],
    number: usize,
    what: &str,
) -> DoorResult<T> {
    lines[number - 1]
        .trim()
        .parse()
        .map_err(|_| DoorError::DropfileMalformed {
            line: number,
            reason: format!("bad {}: {:?}", what, lines[number - 1]),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOOR32: &str = "2\n31\n115200\nMystic BBS\n5\nJane Operator\nJaney\n255\n45\n1\n3\n";

    const INFO: &str = "7\n3\n0\nFAIRY YES\n32\nBrave Knight\nBrave\nKnight\n52\n57600\n57600\nTELNET\nREGISTERED\nCLEAN MODE OFF\n";

    #[test]
    fn test_door32_fields() {
        let info = DropInfo::parse_door32(DOOR32).unwrap();
        assert_eq!(info.com_type, ComType::Telnet);
        assert_eq!(info.socket_handle, 31);
        assert_eq!(info.baud, 115200);
        assert_eq!(info.rec_pos, 4); // 1-based on disk
        assert_eq!(info.real_name, "Jane Operator");
        assert_eq!(info.alias, "Janey");
        assert_eq!(info.access, 255);
        assert_eq!(info.max_time_secs, 45 * 60);
        assert_eq!(info.emulation, Emulation::Ansi);
        assert_eq!(info.node, 3);
    }

    #[test]
    fn test_door32_ascii_emulation() {
        let content = DOOR32.replace("\n1\n3\n", "\n0\n3\n");
        let info = DropInfo::parse_door32(&content).unwrap();
        assert_eq!(info.emulation, Emulation::Ascii);
    }

    #[test]
    fn test_door32_emulation_above_one_is_ansi() {
        let content = DOOR32.replace("\n1\n3\n", "\n2\n3\n");
        let info = DropInfo::parse_door32(&content).unwrap();
        assert_eq!(info.emulation, Emulation::Ansi);
    }

    #[test]
    fn test_door32_crlf_tolerated() {
        let content = DOOR32.replace('\n', "\r\n");
        let info = DropInfo::parse_door32(&content).unwrap();
        assert_eq!(info.alias, "Janey");
    }

    #[test]
    fn test_door32_short_file_rejected() {
        let err = DropInfo::parse_door32("2\n31\n").unwrap_err();
        assert!(matches!(err, DoorError::DropfileMalformed { .. }));
    }

    #[test]
    fn test_door32_bad_com_type() {
        let content = DOOR32.replacen("2\n", "9\n", 1);
        let err = DropInfo::parse_door32(&content).unwrap_err();
        assert!(matches!(
            err,
            DoorError::DropfileMalformed { line: 1, .. }
        ));
    }

    #[test]
    fn test_door32_bad_number_reports_line() {
        let content = DOOR32.replace("115200", "fast");
        let err = DropInfo::parse_door32(&content).unwrap_err();
        assert!(matches!(
            err,
            DoorError::DropfileMalformed { line: 3, .. }
        ));
    }

    #[test]
    fn test_info_fields() {
        let info = DropInfo::parse_info(INFO).unwrap();
        assert_eq!(info.com_type, ComType::Telnet);
        assert_eq!(info.socket_handle, 52);
        assert_eq!(info.rec_pos, 7); // already 0-based
        assert_eq!(info.emulation, Emulation::Ansi);
        assert!(info.fairy);
        assert!(info.registered);
        assert!(!info.clean_mode);
        assert_eq!(info.alias, "Brave Knight");
        assert_eq!(info.real_name, "Brave Knight");
        assert_eq!(info.max_time_secs, 32 * 60);
    }

    #[test]
    fn test_info_empty_last_name_not_appended() {
        let content = INFO.replace("Brave\nKnight\n52", "Brave\n\n52");
        let info = DropInfo::parse_info(&content).unwrap();
        assert_eq!(info.real_name, "Brave");
    }

    #[test]
    fn test_info_ascii_emulation() {
        let content = INFO.replacen("7\n3\n", "7\n0\n", 1);
        let info = DropInfo::parse_info(&content).unwrap();
        assert_eq!(info.emulation, Emulation::Ascii);
    }

    #[test]
    fn test_info_unregistered() {
        let content = INFO.replace("\nREGISTERED\n", "\nUNREGISTERED\n");
        let info = DropInfo::parse_info(&content).unwrap();
        assert!(!info.registered);
    }

    #[test]
    fn test_local_defaults() {
        let info = DropInfo::local();
        assert_eq!(info.com_type, ComType::Local);
        assert_eq!(info.socket_handle, -1);
        assert_eq!(info.emulation, Emulation::Ansi);
        assert!(info.max_time_secs > 0);
    }
}
