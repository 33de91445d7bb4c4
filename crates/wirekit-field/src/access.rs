//! Byte access primitives: fixed-width integers under a given endianness.

use bytes::{Buf, BufMut};

use crate::status::{CodecError, Result};

/// Byte order of a multi-byte value on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endian {
    #[default]
    Big,
    Little,
}

/// Read an unsigned integer of `nbytes` bytes (at most 8).
pub fn read_uint(buf: &mut &[u8], nbytes: usize, endian: Endian) -> Result<u64> {
    debug_assert!(nbytes <= 8, "integer wider than 8 bytes");
    if buf.remaining() < nbytes {
        return Err(CodecError::NotEnoughData);
    }
    if nbytes == 0 {
        return Ok(0);
    }
    Ok(match endian {
        Endian::Big => buf.get_uint(nbytes),
        Endian::Little => buf.get_uint_le(nbytes),
    })
}

/// Write the low `nbytes` bytes (at most 8) of `value`.
pub fn write_uint(buf: &mut dyn BufMut, value: u64, nbytes: usize, endian: Endian) -> Result<()> {
    debug_assert!(nbytes <= 8, "integer wider than 8 bytes");
    if buf.remaining_mut() < nbytes {
        return Err(CodecError::BufferOverflow);
    }
    if nbytes == 0 {
        return Ok(());
    }
    match endian {
        Endian::Big => buf.put_uint(value, nbytes),
        Endian::Little => buf.put_uint_le(value, nbytes),
    }
    Ok(())
}

/// Mask with the low `bits` bits set.
pub fn mask(bits: usize) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Sign-extend the low `bits` bits of `value` to the full 64 bits.
pub fn sign_extend(value: u64, bits: usize) -> u64 {
    if bits == 0 || bits >= 64 {
        return value;
    }
    let shift = 64 - bits;
    (((value << shift) as i64) >> shift) as u64
}

/// Reverse the order of the low `bits` bits of `value`.
pub fn reverse_bits(value: u64, bits: usize) -> u64 {
    if bits == 0 {
        return 0;
    }
    value.reverse_bits() >> (64 - bits)
}
