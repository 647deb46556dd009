//! Decoding of `ERROR:<code>` status lines
//!
//! Error codes are 16 bits wide. The high byte names the firmware module
//! that raised the error, the low byte is the module's own code.

use std::fmt;

/// Command handler status: bad command
pub const MC_STATUS_BAD_COMMAND: u8 = 1;
/// Command handler status: input buffer overrun
pub const MC_STATUS_BUFFER_OVERRUN: u8 = 2;
/// Command handler status: wrong number of arguments
pub const MC_STATUS_BAD_ARGUMENT_COUNT: u8 = 3;
/// Command handler status: malformed blob
pub const MC_STATUS_BAD_BLOB: u8 = 4;
/// Command handler status: argument out of range
pub const MC_STATUS_BAD_ARGUMENT_VALUE: u8 = 5;

/// Firmware module that reported an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSource {
    /// The command parser/dispatcher
    CommandHandler,
    /// Microchip CryptoAuthLib
    CryptoAuthLib,
    /// WINC network controller driver
    Winc,
    /// Source byte not known to this host
    Unknown(u8),
}

impl From<u8> for StatusSource {
    fn from(source: u8) -> Self {
        match source {
            0 => Self::CommandHandler,
            1 => Self::CryptoAuthLib,
            2 => Self::Winc,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for StatusSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandHandler => write!(f, "Command Handler"),
            Self::CryptoAuthLib => write!(f, "Crypto Auth Lib"),
            Self::Winc => write!(f, "WINC Library"),
            Self::Unknown(_) => write!(f, "Unknown module"),
        }
    }
}

/// Decoded firmware error status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareStatus {
    /// Status line as received
    pub line: String,
    /// Numeric code, if the line carried one
    pub code: Option<u16>,
    /// Free text following `ERROR:` when it was not numeric
    pub text: Option<String>,
}

impl FirmwareStatus {
    /// Decode a status line
    pub fn parse(line: &str) -> Self {
        let detail = line
            .find(':')
            .filter(|_| line.to_uppercase().contains("ERROR:"))
            .map(|idx| line[idx + 1..].trim());

        let (code, text) = match detail {
            Some(d) => match parse_code(d) {
                Some(code) => (Some(code), None),
                None if d.is_empty() => (None, None),
                None => (None, Some(d.to_string())),
            },
            None => (None, None),
        };

        Self {
            line: line.to_string(),
            code,
            text,
        }
    }

    /// Module that raised the error
    pub fn source(&self) -> StatusSource {
        match self.code {
            Some(code) => StatusSource::from((code >> 8) as u8),
            None => StatusSource::Unknown(0xFF),
        }
    }

    /// User-facing description of the error
    pub fn message(&self) -> String {
        let Some(code) = self.code else {
            return self.text.clone().unwrap_or_else(|| "Unknown error".to_string());
        };

        let byte = (code & 0xFF) as u8;
        if self.source() == StatusSource::CommandHandler {
            match byte {
                MC_STATUS_BAD_COMMAND => return "Invalid command".to_string(),
                MC_STATUS_BUFFER_OVERRUN => return "Buffer overrun".to_string(),
                MC_STATUS_BAD_ARGUMENT_COUNT => return "Incorrect number of arguments".to_string(),
                MC_STATUS_BAD_BLOB => return "Invalid data blob".to_string(),
                MC_STATUS_BAD_ARGUMENT_VALUE => return "Invalid argument value".to_string(),
                _ => {}
            }
        }
        format!("Errorcode: 0x{:02X}", byte)
    }
}

impl fmt::Display for FirmwareStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} reported: {}", self.source(), self.message())
    }
}

/// Parse a status code; the firmware sends up to four hex digits, with or
/// without a `0x` prefix
fn parse_code(s: &str) -> Option<u16> {
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if hex.is_empty() || hex.len() > 4 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_handler_codes() {
        let status = FirmwareStatus::parse("ERROR:0x0003");
        assert_eq!(status.code, Some(3));
        assert_eq!(status.source(), StatusSource::CommandHandler);
        assert_eq!(
            status.to_string(),
            "Command Handler reported: Incorrect number of arguments"
        );

        let status = FirmwareStatus::parse("ERROR: 1");
        assert_eq!(status.message(), "Invalid command");
    }

    #[test]
    fn test_library_codes() {
        let status = FirmwareStatus::parse("ERROR:0x01F0");
        assert_eq!(status.source(), StatusSource::CryptoAuthLib);
        assert_eq!(status.to_string(), "Crypto Auth Lib reported: Errorcode: 0xF0");

        let status = FirmwareStatus::parse("ERROR:0x0212");
        assert_eq!(status.to_string(), "WINC Library reported: Errorcode: 0x12");

        let status = FirmwareStatus::parse("ERROR:0105");
        assert_eq!(status.code, Some(0x0105));
        assert_eq!(status.source(), StatusSource::CryptoAuthLib);
        assert_eq!(status.to_string(), "Crypto Auth Lib reported: Errorcode: 0x05");

        let status = FirmwareStatus::parse("ERROR:000A");
        assert_eq!(status.code, Some(0x000A));
        assert_eq!(status.source(), StatusSource::CommandHandler);
        assert_eq!(status.message(), "Errorcode: 0x0A");

        let status = FirmwareStatus::parse("ERROR:0x0705");
        assert_eq!(status.source(), StatusSource::Unknown(7));
        assert_eq!(status.message(), "Errorcode: 0x05");
    }

    #[test]
    fn test_text_and_bare_errors() {
        let status = FirmwareStatus::parse("ERROR: no certificate");
        assert_eq!(status.code, None);
        assert_eq!(
            status.to_string(),
            "Unknown module reported: no certificate"
        );

        let status = FirmwareStatus::parse("ERROR: BEEF1");
        assert_eq!(status.code, None);
        assert_eq!(status.text.as_deref(), Some("BEEF1"));

        let status = FirmwareStatus::parse("ERROR");
        assert_eq!(status.to_string(), "Unknown module reported: Unknown error");
    }
}
