//! VE.Direct hex protocol: command encoding and response framing.
//!
//! Commands go out as one ASCII line, `:` + hex digits + two checksum digits
//! + `\n`. The device answers on the same wire, interleaved with telemetry
//! text, by echoing the request digits followed by the register payload. The
//! [`HexResponseFramer`] watches the byte stream for that echo and delivers
//! the payload window once the line terminates.

use bytes::BytesMut;

use crate::vedirect::checksum::{self, bytes_to_hex, hex_to_bytes};
use crate::vedirect::error::VeDirectError;

/// Operation nibble for a register read.
pub const OP_GET: u8 = 0x7;
/// Operation nibble for a register write.
pub const OP_SET: u8 = 0x8;

/// First per-day history register; day `d` lives at `0x1050 + d`.
pub const HISTORY_BASE_REGISTER: u16 = 0x1050;

/// Hex characters in a full history record payload (34 bytes).
pub const RECORD_PAYLOAD_HEX_LEN: usize = 68;
/// Offset of the day-sequence probe window inside the payload.
pub const DAY_SEQUENCE_OFFSET: usize = 64;
/// Minimum byte count the device keeps transmitting after the echoed token
/// before a record response may be accepted. The response line itself is 71
/// bytes past the echo; the rest is resumed telemetry.
pub const RECORD_MIN_TOTAL_LEN: usize = 80;

/// A declarative hex command. Serializes deterministically; the checksum is
/// a pure function of the serialized digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexCommand {
    pub operation: u8,
    pub register: u16,
    pub flags: u8,
    pub data: Vec<u8>,
}

impl HexCommand {
    /// A register read (GET) with no data payload.
    pub fn get(register: u16) -> Self {
        Self {
            operation: OP_GET,
            register,
            flags: 0,
            data: Vec::new(),
        }
    }

    /// The GET command for history day offset `day`.
    pub fn history_day(day: u16) -> Self {
        Self::get(HISTORY_BASE_REGISTER + day)
    }

    /// Digit string without checksum: operation nibble, register
    /// little-endian byte pair, flags, then any data bytes.
    pub fn digits(&self) -> String {
        let [reg_lo, reg_hi] = self.register.to_le_bytes();
        let mut out = format!("{:X}{:02X}{:02X}{:02X}", self.operation, reg_lo, reg_hi, self.flags);
        out.push_str(&bytes_to_hex(&self.data));
        out
    }

    /// The token the device echoes back ahead of the response payload. For a
    /// GET this is the full request digit string.
    pub fn echoed_token(&self) -> String {
        let [reg_lo, reg_hi] = self.register.to_le_bytes();
        format!("{:X}{:02X}{:02X}{:02X}", self.operation, reg_lo, reg_hi, self.flags)
    }

    /// Serialize to the wire line, checksum appended.
    pub fn encode(&self) -> String {
        let digits = self.digits();
        // digits() only emits hex, so the decode cannot fail.
        let bytes = hex_to_bytes(&digits).expect("command digits are valid hex");
        format!(":{}{:02X}\n", digits, checksum::checksum(&bytes))
    }

    /// Parse a wire line back into a command, verifying its checksum.
    /// Inverse of [`HexCommand::encode`].
    pub fn parse(line: &str) -> Result<Self, VeDirectError> {
        let digits = line
            .trim_end_matches('\n')
            .trim_end_matches('\r')
            .strip_prefix(':')
            .ok_or_else(|| VeDirectError::MalformedHex("missing ':' prefix".into()))?;
        if digits.len() < 8 {
            return Err(VeDirectError::MalformedHex(format!(
                "command too short: {:?}",
                digits
            )));
        }
        let all = hex_to_bytes(digits)?;
        if !checksum::verify(&all) {
            let sum = all.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
            return Err(VeDirectError::ChecksumMismatch { sum });
        }
        // Strip checksum digits, then split the fixed header fields.
        let body = &digits[..digits.len() - 2];
        let operation = hex_to_bytes(&body[..1])?[0];
        let reg_lo = hex_to_bytes(&body[1..3])?[0];
        let reg_hi = hex_to_bytes(&body[3..5])?[0];
        let flags = hex_to_bytes(&body[5..7])?[0];
        let data = hex_to_bytes(&body[7..])?;
        Ok(Self {
            operation,
            register: u16::from_le_bytes([reg_lo, reg_hi]),
            flags,
            data,
        })
    }
}

/// Ensure a raw digit line carries a valid checksum, appending one when the
/// given line does not already validate. Accepts input with or without the
/// leading `:`; returns the full wire line.
pub fn ensure_checksum(raw: &str) -> Result<String, VeDirectError> {
    let digits = raw
        .trim()
        .trim_start_matches(':')
        .trim_end_matches('\n');
    if digits.is_empty() {
        return Err(VeDirectError::MalformedHex("empty command".into()));
    }
    let bytes = hex_to_bytes(digits)?;
    if digits.len() >= 3 && checksum::verify(&bytes) {
        return Ok(format!(":{}\n", digits));
    }
    Ok(format!(":{}{:02X}\n", digits, checksum::checksum(&bytes)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FramerState {
    WaitMatch,
    WaitTerminator,
    Complete,
}

/// Incremental recognizer for one hex response.
///
/// Construct one per outstanding request with the expected echoed token and
/// the payload window geometry, then feed it raw stream bytes. The framer
/// has no notion of time; bounding the wait is the caller's job.
#[derive(Debug)]
pub struct HexResponseFramer {
    token: Vec<u8>,
    buf: BytesMut,
    state: FramerState,
    window_offset: usize,
    window_len: usize,
    min_total_len: usize,
    total_seen: usize,
    payload: Option<String>,
}

impl HexResponseFramer {
    pub fn new(token: &str, window_offset: usize, window_len: usize, min_total_len: usize) -> Self {
        Self {
            token: token.as_bytes().to_vec(),
            buf: BytesMut::with_capacity(256),
            state: FramerState::WaitMatch,
            window_offset,
            window_len,
            min_total_len,
            total_seen: 0,
            payload: None,
        }
    }

    /// Framer for a full 34-byte history record response.
    pub fn for_history_record(token: &str) -> Self {
        Self::new(token, 0, RECORD_PAYLOAD_HEX_LEN, RECORD_MIN_TOTAL_LEN)
    }

    /// Framer for the 4-digit day-sequence probe window. Decodes the same
    /// field the record tail carries; only the window differs.
    pub fn for_day_sequence_probe(token: &str) -> Self {
        Self::new(token, DAY_SEQUENCE_OFFSET, 4, RECORD_MIN_TOTAL_LEN)
    }

    /// Feed stream bytes. Returns the payload window once the response is
    /// framed AND the guaranteed minimum byte count past the echo has been
    /// observed; until then the response stays pending. Bytes ahead of the
    /// echo are telemetry noise and do not count toward the minimum.
    pub fn push(&mut self, data: &[u8]) -> Option<String> {
        for &b in data {
            self.total_seen += 1;
            match self.state {
                FramerState::WaitMatch => {
                    self.buf.extend_from_slice(&[b]);
                    if self.buf.len() >= self.token.len()
                        && self.buf[self.buf.len() - self.token.len()..] == self.token[..]
                    {
                        self.buf.clear();
                        self.total_seen = 0;
                        self.state = FramerState::WaitTerminator;
                    }
                }
                FramerState::WaitTerminator => {
                    self.buf.extend_from_slice(&[b]);
                    if b == b'\n' {
                        let end = (self.window_offset + self.window_len).min(self.buf.len());
                        let start = self.window_offset.min(end);
                        let window = &self.buf[start..end];
                        self.payload = Some(String::from_utf8_lossy(window).into_owned());
                        self.state = FramerState::Complete;
                    }
                }
                FramerState::Complete => {
                    // Only the length gate remains; extra bytes just count.
                }
            }
            if self.state == FramerState::Complete && self.total_seen >= self.min_total_len {
                return self.payload.take();
            }
        }
        None
    }

    /// Validate the framed response line against the protocol checksum: the
    /// echoed token digits plus everything up to the terminator must sum to
    /// 0x55 once decoded. Call after the framer completed.
    pub fn verify_checksum(&self) -> Result<(), VeDirectError> {
        let tail: String = self
            .buf
            .iter()
            .take_while(|&&b| b != b'\r' && b != b'\n')
            .map(|&b| b as char)
            .collect();
        let mut digits = String::from_utf8_lossy(&self.token).into_owned();
        digits.push_str(&tail);
        let bytes = hex_to_bytes(&digits)?;
        if checksum::verify(&bytes) {
            Ok(())
        } else {
            let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
            Err(VeDirectError::ChecksumMismatch { sum })
        }
    }
}
