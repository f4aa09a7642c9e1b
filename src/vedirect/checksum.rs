//! VE.Direct hex protocol checksum and ASCII-hex helpers.
//!
//! The hex sub-protocol uses an 8-bit checksum chosen so that the sum of all
//! message bytes, checksum included, is 0x55 modulo 256. Digit strings on the
//! wire may have odd length; a zero nibble is implied on the left before the
//! string is treated as bytes.

use crate::vedirect::error::VeDirectError;

/// Byte sum every valid hex message converges to, checksum included.
pub const HEX_SUM_TARGET: u8 = 0x55;

/// Compute the checksum byte for a hex message payload:
/// `(0x55 - sum(bytes)) mod 256`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(HEX_SUM_TARGET, |acc, &b| acc.wrapping_sub(b))
}

/// True when a complete message (payload plus checksum byte) sums back to
/// the protocol target.
pub fn verify(bytes: &[u8]) -> bool {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) == HEX_SUM_TARGET
}

/// Decode an ASCII-hex digit string into bytes, left-padding odd-length
/// input with an implicit zero nibble first.
pub fn hex_to_bytes(digits: &str) -> Result<Vec<u8>, VeDirectError> {
    let padded;
    let digits = if digits.len() % 2 == 1 {
        padded = format!("0{}", digits);
        padded.as_str()
    } else {
        digits
    };
    let raw = digits.as_bytes();
    let mut out = Vec::with_capacity(raw.len() / 2);
    for pair in raw.chunks_exact(2) {
        let hi = nibble(pair[0])?;
        let lo = nibble(pair[1])?;
        out.push((hi << 4) | lo);
    }
    Ok(out)
}

/// Encode bytes as uppercase ASCII-hex.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(&mut out, "{:02X}", b);
    }
    out
}

fn nibble(c: u8) -> Result<u8, VeDirectError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        _ => Err(VeDirectError::MalformedHex(format!(
            "invalid hex digit {:?}",
            c as char
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_matches_documented_set_example() {
        // MPPT documentation: set battery max current to 10.0A
        // 0x55-0x08-0xF0-0xED-0x00-0x64-0x00 = 0x0C
        let payload = [0x08, 0xF0, 0xED, 0x00, 0x64, 0x00];
        assert_eq!(checksum(&payload), 0x0C);
    }

    #[test]
    fn payload_plus_checksum_sums_to_target() {
        let samples: &[&[u8]] = &[
            &[],
            &[0x00],
            &[0x07, 0x50, 0x10, 0x00],
            &[0xFF, 0xFF, 0xFF],
            &[0x12, 0x34, 0x56, 0x78, 0x9A],
        ];
        for payload in samples {
            let mut msg = payload.to_vec();
            msg.push(checksum(payload));
            assert!(verify(&msg), "failed for {:02X?}", payload);
        }
    }

    #[test]
    fn odd_length_digits_are_left_padded() {
        assert_eq!(hex_to_bytes("7501000").unwrap(), vec![0x07, 0x50, 0x10, 0x00]);
        assert_eq!(hex_to_bytes("F").unwrap(), vec![0x0F]);
    }

    #[test]
    fn round_trips_even_length() {
        let bytes = vec![0xDE, 0xAD, 0xBE, 0xEF];
        assert_eq!(hex_to_bytes(&bytes_to_hex(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn rejects_non_hex() {
        assert!(hex_to_bytes("7G").is_err());
    }
}
