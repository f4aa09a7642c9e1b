//! Fixed-layout decoder for the per-day history record (registers
//! 0x1050..0x106E).
//!
//! The register payload is 34 bytes, little-endian throughout. Scaled fields
//! carry their engineering units here so consumers never touch raw counts.

use crate::vedirect::checksum::hex_to_bytes;
use crate::vedirect::error::VeDirectError;

/// Binary length of one history day record.
pub const RECORD_LEN: usize = 34;

/// One calendar day of charge statistics, decoded and unit-scaled.
///
/// `day_sequence` is the device-assigned counter identifying the day; pairing
/// it with the requested day offset is the record's natural identity.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryDayRecord {
    pub reserved: u8,
    /// Cumulative yield, kWh.
    pub yield_total_kwh: f64,
    /// Energy consumed, kWh.
    pub consumed_kwh: f64,
    /// Daily maximum battery voltage, V.
    pub max_battery_voltage: f64,
    /// Daily minimum battery voltage, V.
    pub min_battery_voltage: f64,
    pub error_db: u8,
    /// Most recent error code of the day.
    pub error_0: u8,
    pub error_1: u8,
    pub error_2: u8,
    /// Oldest error code of the day.
    pub error_3: u8,
    pub time_bulk_min: u16,
    pub time_absorption_min: u16,
    pub time_float_min: u16,
    /// Daily maximum power, W.
    pub max_power_w: u32,
    /// Daily maximum battery current, A.
    pub max_battery_current_a: f64,
    /// Daily maximum PV voltage, V.
    pub max_pv_voltage: f64,
    pub day_sequence: u16,
}

impl HistoryDayRecord {
    /// Decode the hex-encoded payload window of a history response.
    /// Pure and deterministic; no I/O.
    pub fn decode_hex(payload: &str) -> Result<Self, VeDirectError> {
        let bytes = hex_to_bytes(payload.trim())?;
        Self::decode(&bytes)
    }

    /// Decode the raw 34-byte record.
    pub fn decode(bytes: &[u8]) -> Result<Self, VeDirectError> {
        if bytes.len() < RECORD_LEN {
            return Err(VeDirectError::IncompleteRecord {
                got: bytes.len(),
                want: RECORD_LEN,
            });
        }
        let u16_at = |off: usize| u16::from_le_bytes([bytes[off], bytes[off + 1]]);
        let u32_at = |off: usize| {
            u32::from_le_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]])
        };
        Ok(Self {
            reserved: bytes[0],
            yield_total_kwh: u32_at(1) as f64 / 100.0,
            consumed_kwh: u32_at(5) as f64 / 100.0,
            max_battery_voltage: u16_at(9) as f64 / 100.0,
            min_battery_voltage: u16_at(11) as f64 / 100.0,
            error_db: bytes[13],
            error_0: bytes[14],
            error_1: bytes[15],
            error_2: bytes[16],
            error_3: bytes[17],
            time_bulk_min: u16_at(18),
            time_absorption_min: u16_at(20),
            time_float_min: u16_at(22),
            max_power_w: u32_at(24),
            max_battery_current_a: u16_at(28) as f64 / 10.0,
            max_pv_voltage: u16_at(30) as f64 / 100.0,
            day_sequence: u16_at(32),
        })
    }
}
