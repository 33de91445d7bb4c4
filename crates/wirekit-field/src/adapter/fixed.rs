//! Fixed byte-length and fixed bit-length integer encodings.
//!
//! Both truncate the host value to the configured width on write. On read
//! the stored bits are sign-extended back when the host type is signed and
//! the width is narrower than 64 bits.

use bytes::BufMut;

use crate::access::{mask, read_uint, sign_extend, write_uint, Endian};
use crate::status::Result;

/// Number of bytes needed to hold `bits` bits.
pub fn bytes_for_bits(bits: usize) -> usize {
    bits.div_ceil(8)
}

/// Read a value stored in `bits` bits, occupying `bytes_for_bits(bits)` bytes.
pub fn read_bits(buf: &mut &[u8], bits: usize, endian: Endian, signed: bool) -> Result<u64> {
    let raw = read_uint(buf, bytes_for_bits(bits), endian)? & mask(bits);
    Ok(if signed { sign_extend(raw, bits) } else { raw })
}

/// Write the low `bits` bits of `value`.
pub fn write_bits(buf: &mut dyn BufMut, value: u64, bits: usize, endian: Endian) -> Result<()> {
    write_uint(buf, value & mask(bits), bytes_for_bits(bits), endian)
}

/// Whether `value` survives truncation to `bits` bits.
pub fn fits_bits(value: u64, bits: usize, signed: bool) -> bool {
    if bits >= 64 {
        return true;
    }
    if signed {
        sign_extend(value & mask(bits), bits) == value
    } else {
        value <= mask(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_byte_signed_round_trip() {
        let value = (-70_000i64) as u64;
        let mut out = Vec::new();
        write_bits(&mut out, value, 24, Endian::Big).unwrap();
        assert_eq!(out, vec![0xFE, 0xEE, 0x90]);

        let mut buf = &out[..];
        assert_eq!(read_bits(&mut buf, 24, Endian::Big, true).unwrap(), value);
        let mut buf = &out[..];
        assert_eq!(read_bits(&mut buf, 24, Endian::Big, false).unwrap(), 0xFEEE90);
    }

    #[test]
    fn odd_bit_width_masks_and_extends() {
        let mut out = Vec::new();
        write_bits(&mut out, (-3i64) as u64, 5, Endian::Big).unwrap();
        assert_eq!(out, vec![0b1_1101]);

        let mut buf = &out[..];
        assert_eq!(read_bits(&mut buf, 5, Endian::Big, true).unwrap() as i64, -3);
    }

    #[test]
    fn fit_checks() {
        assert!(fits_bits(255, 8, false));
        assert!(!fits_bits(256, 8, false));
        assert!(fits_bits((-128i64) as u64, 8, true));
        assert!(!fits_bits((-129i64) as u64, 8, true));
        assert!(!fits_bits(128, 8, true));
        assert!(fits_bits(u64::MAX, 64, false));
    }
}
