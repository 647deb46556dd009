//! Minimal Intel HEX reader

use std::fmt;

/// Contiguous data at an absolute address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Start address
    pub address: u32,
    /// Data bytes
    pub data: Vec<u8>,
}

impl Segment {
    /// Address one past the last byte, `None` if that lies beyond 4 GiB
    pub fn end(&self) -> Option<u32> {
        u32::try_from(self.data.len())
            .ok()
            .and_then(|len| self.address.checked_add(len))
    }
}

/// Error in a hex file, with its 1-based line number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Line number
    pub line: usize,
    /// What was wrong
    pub reason: &'static str,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

impl std::error::Error for ParseError {}

/// Parse Intel HEX text into data segments
///
/// Handles data, end-of-file and extended segment/linear address records.
/// Start address records are ignored. Adjacent records are merged.
pub fn parse_ihex(text: &str) -> Result<Vec<Segment>, ParseError> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut base: u32 = 0;

    for (idx, line) in text.lines().enumerate() {
        let err = |reason| ParseError {
            line: idx + 1,
            reason,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let hex = line.strip_prefix(':').ok_or_else(|| err("missing ':'"))?;
        let bytes = decode_hex(hex).ok_or_else(|| err("invalid hex digits"))?;
        if bytes.len() < 5 || bytes.len() != bytes[0] as usize + 5 {
            return Err(err("bad record length"));
        }
        if bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)) != 0 {
            return Err(err("checksum mismatch"));
        }

        let offset = u16::from_be_bytes([bytes[1], bytes[2]]) as u32;
        let data = &bytes[4..bytes.len() - 1];
        match bytes[3] {
            0x00 => {
                let address = base.wrapping_add(offset);
                match segments.last_mut() {
                    Some(last) if last.end() == Some(address) => last.data.extend_from_slice(data),
                    _ => segments.push(Segment {
                        address,
                        data: data.to_vec(),
                    }),
                }
            }
            0x01 => break,
            0x02 if data.len() == 2 => {
                base = (u16::from_be_bytes([data[0], data[1]]) as u32) << 4;
            }
            0x04 if data.len() == 2 => {
                base = (u16::from_be_bytes([data[0], data[1]]) as u32) << 16;
            }
            0x03 | 0x05 => {}
            _ => return Err(err("unsupported record")),
        }
    }

    Ok(segments)
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}
