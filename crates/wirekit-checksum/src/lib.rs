//! Checksum algorithms for wire frames.
//!
//! A checksum reduces a byte range to a verification value. Frame layers
//! accept anything implementing [`Checksum`], including plain closures.
//!
//! - [`BasicSum`] / [`BasicXor`]: byte-wise sum or XOR truncated to a width
//! - [`Crc`]: table-driven CRC with configurable [`CrcParams`] and presets

pub mod crc;
pub mod error;
pub mod sum;
mod table;

pub use crc::{Crc, CrcParams};
pub use error::{ChecksumError, Result};
pub use sum::{BasicSum, BasicXor};

/// A function reducing a byte range to a checksum value.
pub trait Checksum {
    fn calc(&self, data: &[u8]) -> u64;

    /// Checksum the next `len` bytes of `buf` and advance past them.
    ///
    /// Stops early when `buf` is shorter than `len`.
    fn calc_from(&self, buf: &mut &[u8], len: usize) -> u64 {
        let len = len.min(buf.len());
        let value = self.calc(&buf[..len]);
        *buf = &buf[len..];
        value
    }
}

impl<F> Checksum for F
where
    F: Fn(&[u8]) -> u64,
{
    fn calc(&self, data: &[u8]) -> u64 {
        self(data)
    }
}
