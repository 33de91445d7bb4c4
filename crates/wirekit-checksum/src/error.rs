/// Errors raised when checksum parameters are rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChecksumError {
    /// The CRC width is outside `8..=64` bits.
    #[error("unsupported crc width {0} (expected 8..=64 bits)")]
    InvalidWidth(u8),

    /// A CRC parameter has bits set above the configured width.
    #[error("crc {name} 0x{value:x} does not fit in {width} bits")]
    ValueTooWide {
        name: &'static str,
        value: u64,
        width: u8,
    },
}

pub type Result<T> = std::result::Result<T, ChecksumError>;
