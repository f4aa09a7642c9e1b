//! Incremental decoder for the VE.Direct text telemetry stream.
//!
//! The controller continuously pushes `Key\tValue\r\n` lines, closed off by a
//! `Checksum\t<byte>` field whose raw byte value brings the running sum of the
//! whole block to 0 modulo 256. This decoder is fed one byte at a time and
//! yields a completed key/value frame whenever a block validates. Blocks that
//! fail the checksum are dropped silently and decoding resumes on the next
//! byte.
//!
//! Hex protocol lines (`:` prefixed) can interleave with telemetry at any
//! point. A `:7` GET echo observed mid-frame is captured under the reserved
//! `"Get"` key of the pending frame; any other hex line is skipped.

use std::collections::BTreeMap;
use std::mem;

const CR: u8 = b'\r';
const LF: u8 = b'\n';
const TAB: u8 = b'\t';
const HEX_MARKER: u8 = b':';

/// Reserved frame key holding a hex GET echo seen while the frame assembled.
pub const GET_KEY: &str = "Get";

/// One validated telemetry block: field name to raw string value.
/// Values are exposed verbatim; interpreting them is the consumer's job.
pub type Frame = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    WaitHeader,
    InKey,
    InValue,
    InChecksum,
    HexEcho,
    InHexGet,
}

/// Byte-at-a-time state machine reconstructing telemetry frames.
///
/// Holds all of its accumulator state explicitly; a freshly constructed
/// decoder replaying the same stream produces identical output.
#[derive(Debug)]
pub struct TextFrameDecoder {
    state: State,
    key: String,
    value: String,
    scratch: String,
    sum: u8,
    frame: Frame,
}

impl Default for TextFrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TextFrameDecoder {
    pub fn new() -> Self {
        Self {
            state: State::WaitHeader,
            key: String::new(),
            value: String::new(),
            scratch: String::new(),
            sum: 0,
            frame: Frame::new(),
        }
    }

    /// Feed one byte. Returns a completed frame when the byte closes a block
    /// whose running sum validates.
    pub fn feed(&mut self, byte: u8) -> Option<Frame> {
        // A hex marker anywhere outside the checksum byte position preempts
        // the text machine: the line that follows belongs to the hex protocol.
        if byte == HEX_MARKER && self.state != State::InChecksum {
            self.state = State::HexEcho;
            self.key.clear();
            self.value.clear();
            self.scratch.clear();
            self.sum = 0;
        }

        match self.state {
            State::WaitHeader => {
                self.sum = self.sum.wrapping_add(byte);
                if byte == LF {
                    self.state = State::InKey;
                }
                None
            }
            State::InKey => {
                self.sum = self.sum.wrapping_add(byte);
                if byte == TAB {
                    if self.key == "Checksum" {
                        self.state = State::InChecksum;
                    } else {
                        self.state = State::InValue;
                    }
                } else {
                    self.key.push(byte as char);
                }
                None
            }
            State::InValue => {
                self.sum = self.sum.wrapping_add(byte);
                if byte == CR {
                    self.frame
                        .insert(mem::take(&mut self.key), mem::take(&mut self.value));
                    self.state = State::WaitHeader;
                } else {
                    self.value.push(byte as char);
                }
                None
            }
            State::InChecksum => {
                // The checksum field's value is one raw byte, not hex.
                self.sum = self.sum.wrapping_add(byte);
                self.key.clear();
                self.value.clear();
                self.state = State::WaitHeader;
                let valid = self.sum == 0;
                self.sum = 0;
                if valid {
                    Some(mem::take(&mut self.frame))
                } else {
                    self.frame.clear();
                    None
                }
            }
            State::HexEcho => {
                self.sum = 0;
                self.scratch.push(byte as char);
                if self.scratch == ":7" {
                    self.state = State::InHexGet;
                } else if byte == LF {
                    // Some other hex line; not ours to keep.
                    self.state = State::WaitHeader;
                    self.scratch.clear();
                }
                None
            }
            State::InHexGet => {
                self.sum = self.sum.wrapping_add(byte);
                self.scratch.push(byte as char);
                if byte == LF {
                    self.frame
                        .insert(GET_KEY.to_string(), mem::take(&mut self.scratch));
                    self.state = State::WaitHeader;
                }
                None
            }
        }
    }

    /// Feed a chunk, collecting every frame it completes.
    pub fn feed_all(&mut self, data: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        for &b in data {
            if let Some(frame) = self.feed(b) {
                frames.push(frame);
            }
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assemble a wire-format block from key/value pairs, closing it with a
    /// checksum byte that brings the running sum, seeded with `seed`, back
    /// to zero. The seed covers bytes the decoder accumulated before the
    /// block, such as a GET echo tail.
    fn build_block_seeded(seed: u8, fields: &[(&str, &str)]) -> Vec<u8> {
        let mut out = Vec::new();
        for (k, v) in fields {
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(k.as_bytes());
            out.push(b'\t');
            out.extend_from_slice(v.as_bytes());
        }
        out.extend_from_slice(b"\r\nChecksum\t");
        let sum: u8 = out.iter().fold(seed, |acc, &b| acc.wrapping_add(b));
        out.push(0u8.wrapping_sub(sum));
        out
    }

    fn build_block(fields: &[(&str, &str)]) -> Vec<u8> {
        build_block_seeded(0, fields)
    }

    #[test]
    fn well_formed_block_emits_one_frame() {
        let data = build_block(&[("PID", "0xA042"), ("V", "12800"), ("I", "-400")]);
        let mut dec = TextFrameDecoder::new();
        let frames = dec.feed_all(&data);
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.get("PID").map(String::as_str), Some("0xA042"));
        assert_eq!(frame.get("V").map(String::as_str), Some("12800"));
        assert_eq!(frame.get("I").map(String::as_str), Some("-400"));
    }

    #[test]
    fn corrupted_byte_suppresses_emission() {
        let mut data = build_block(&[("V", "12800"), ("I", "-400")]);
        // Flip one payload byte without touching the checksum.
        let pos = data.iter().position(|&b| b == b'8').unwrap();
        data[pos] = b'9';
        let mut dec = TextFrameDecoder::new();
        assert!(dec.feed_all(&data).is_empty());
    }

    #[test]
    fn recovers_after_discarded_block() {
        let mut bad = build_block(&[("V", "1")]);
        let pos = bad.iter().position(|&b| b == b'1').unwrap();
        bad[pos] = b'2';
        let good = build_block(&[("V", "12800")]);
        let mut dec = TextFrameDecoder::new();
        let mut frames = dec.feed_all(&bad);
        frames.extend(dec.feed_all(&good));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].get("V").map(String::as_str), Some("12800"));
    }

    #[test]
    fn discarded_block_does_not_leak_fields() {
        let mut bad = build_block(&[("H19", "500")]);
        *bad.last_mut().unwrap() ^= 0xFF;
        let good = build_block(&[("V", "12800")]);
        let mut dec = TextFrameDecoder::new();
        dec.feed_all(&bad);
        let frames = dec.feed_all(&good);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].get("H19").is_none());
    }

    #[test]
    fn get_echo_is_folded_into_pending_frame() {
        // The bytes after the ":7" match run through the block accumulator,
        // so on the wire the device's closing checksum covers them too. The
        // fixture has to do the same or the block can never validate.
        let echo = b":7501000EE\n";
        let residue = echo[2..].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        let mut data = echo.to_vec();
        data.extend_from_slice(&build_block_seeded(residue, &[("V", "12800")]));
        let mut dec = TextFrameDecoder::new();
        let frames = dec.feed_all(&data);
        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0].get(GET_KEY).map(String::as_str),
            Some(":7501000EE\n")
        );
        assert_eq!(frames[0].get("V").map(String::as_str), Some("12800"));
    }

    #[test]
    fn non_get_hex_line_is_skipped() {
        let mut data = b":A0102000543\n".to_vec();
        data.extend_from_slice(&build_block(&[("V", "12800")]));
        let mut dec = TextFrameDecoder::new();
        let frames = dec.feed_all(&data);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].get(GET_KEY).is_none());
    }

    #[test]
    fn replay_through_fresh_decoder_is_identical() {
        let mut data = build_block(&[("PID", "0xA042"), ("H20", "25")]);
        data.extend_from_slice(&build_block(&[("V", "12800")]));
        let mut first = TextFrameDecoder::new();
        let mut second = TextFrameDecoder::new();
        assert_eq!(first.feed_all(&data), second.feed_all(&data));
    }
}
