use thiserror::Error;

/// Errors that can arise on the VE.Direct protocol layer.
#[derive(Debug, Error)]
pub enum VeDirectError {
    /// Serial open/read/write failure. Fatal to the current run.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// History payload decoded to fewer bytes than the record layout needs.
    #[error("incomplete history record: {got} of {want} bytes")]
    IncompleteRecord { got: usize, want: usize },

    /// Non-hex content inside a response payload window.
    #[error("malformed hex in response: {0}")]
    MalformedHex(String),

    /// A framed hex response whose bytes do not sum to the protocol target.
    #[error("hex response checksum mismatch (byte sum 0x{sum:02X}, want 0x55)")]
    ChecksumMismatch { sum: u8 },

    /// Raised after the bounded retry budget for one history day is spent,
    /// so the fetch loop can skip the day instead of hanging.
    #[error("day {day}: no valid response after {attempts} attempts")]
    PermanentFetchFailure { day: usize, attempts: u32 },
}
