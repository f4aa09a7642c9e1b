//! Test utilities & fixtures: a scripted VE.Direct transport and wire-format
//! builders for telemetry blocks and hex history responses.

use std::collections::{HashMap, VecDeque};

use mpptmon::vedirect::checksum::{bytes_to_hex, checksum, hex_to_bytes};
use mpptmon::vedirect::history::RECORD_LEN;
use mpptmon::vedirect::{Transport, VeDirectError};

/// Scripted transport: each `send` looks up the command line and queues the
/// next canned reply for it; reads drain the queue in bounded chunks and
/// return `Ok(0)` (a transport timeout) once it is empty.
#[allow(dead_code)] // Not every integration file exercises the stub.
pub struct StubTransport {
    pub sent: Vec<String>,
    rx: VecDeque<u8>,
    replies: HashMap<String, VecDeque<Vec<u8>>>,
    max_chunk: usize,
}

#[allow(dead_code)] // Not every integration file uses every helper.
impl StubTransport {
    pub fn new() -> Self {
        Self {
            sent: Vec::new(),
            rx: VecDeque::new(),
            replies: HashMap::new(),
            max_chunk: 17, // deliberately awkward so frames straddle reads
        }
    }

    /// Queue a reply for the next time `line` is sent.
    pub fn on_send(&mut self, line: &str, reply: Vec<u8>) {
        self.replies
            .entry(line.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Queue bytes as if the device had pushed them unsolicited.
    pub fn push_unsolicited(&mut self, data: &[u8]) {
        self.rx.extend(data);
    }
}

impl Transport for StubTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), VeDirectError> {
        let line = String::from_utf8_lossy(bytes).into_owned();
        if let Some(queue) = self.replies.get_mut(&line) {
            if let Some(reply) = queue.pop_front() {
                self.rx.extend(reply);
            }
        }
        self.sent.push(line);
        Ok(())
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, VeDirectError> {
        let n = buf.len().min(self.max_chunk).min(self.rx.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.rx.pop_front().expect("length checked");
        }
        Ok(n)
    }
}

/// Build a raw 34-byte history record with the given day sequence and a
/// yield derived from it, so each day decodes to distinct values.
#[allow(dead_code)]
pub fn record_bytes(day_sequence: u16) -> [u8; RECORD_LEN] {
    let mut raw = [0u8; RECORD_LEN];
    raw[1..5].copy_from_slice(&(1000 + day_sequence as u32).to_le_bytes());
    raw[9..11].copy_from_slice(&1440u16.to_le_bytes());
    raw[11..13].copy_from_slice(&1190u16.to_le_bytes());
    raw[24..28].copy_from_slice(&350u32.to_le_bytes());
    raw[28..30].copy_from_slice(&180u16.to_le_bytes());
    raw[30..32].copy_from_slice(&6800u16.to_le_bytes());
    raw[32..34].copy_from_slice(&day_sequence.to_le_bytes());
    raw
}

/// Assemble a device response line for `token` carrying `payload` bytes,
/// checksum appended, plus a resumed-telemetry tail so the bytes past the
/// echo clear the protocol's 80-byte minimum.
#[allow(dead_code)]
pub fn device_response(token: &str, payload: &[u8]) -> Vec<u8> {
    let payload_hex = bytes_to_hex(payload);
    let digits = format!("{}{}", token, payload_hex);
    let bytes = hex_to_bytes(&digits).expect("test digits are hex");
    let mut out = format!(":{}{:02X}\n", digits, checksum(&bytes)).into_bytes();
    out.extend_from_slice(b"\r\nPID\t0xA042\r\nFW\t159\r\n");
    out
}

/// Assemble a telemetry block from key/value pairs, closed with the raw
/// checksum byte that zeroes the running sum.
#[allow(dead_code)]
pub fn telemetry_block(fields: &[(&str, &str)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (k, v) in fields {
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(k.as_bytes());
        out.push(b'\t');
        out.extend_from_slice(v.as_bytes());
    }
    out.extend_from_slice(b"\r\nChecksum\t");
    let sum: u8 = out.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    out.push(0u8.wrapping_sub(sum));
    out
}
