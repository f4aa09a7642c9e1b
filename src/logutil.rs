//! Logging helpers for raw serial data so multi-line wire chunks stay
//! single-line in the logs.

/// Render a received byte chunk for logging: printable ASCII passes
/// through, control bytes become escapes or `\xNN`, and long chunks are
/// truncated with an ellipsis to cap log noise.
pub fn preview_bytes(data: &[u8]) -> String {
    const MAX_PREVIEW: usize = 96;
    let mut out = String::with_capacity(data.len().min(MAX_PREVIEW) + 8);
    for (count, &b) in data.iter().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7E => out.push(b as char),
            _ => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", b);
            }
        }
    }
    out
}
