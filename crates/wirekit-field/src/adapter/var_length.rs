//! Base-128 variable-length integer codec.
//!
//! Every byte carries 7 value bits and a continuation bit (`0x80`). With
//! [`Endian::Little`] the first byte holds the least significant group
//! (LEB128 order); with [`Endian::Big`] the first byte holds the most
//! significant group.
//!
//! Signed values are sign-extended from the highest bit read. The encoder
//! emits one extra group whenever the top data bit of the last group would
//! otherwise be mistaken for the sign, so that decoding round-trips exactly.

use crate::access::{sign_extend, Endian};
use crate::status::{CodecError, Result};

/// Maximum number of bytes a 64-bit value can occupy.
pub const MAX_VAR_BYTES: usize = 10;

const CONTINUATION: u8 = 0x80;
const DATA_MASK: u8 = 0x7F;
const GROUP_SIGN: u8 = 0x40;

/// An encoded value, stored inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarBytes {
    bytes: [u8; MAX_VAR_BYTES],
    len: usize,
}

impl VarBytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Encode `value`, emitting at least `min_len` bytes.
///
/// `value` is the two's complement bit pattern when `signed` is set.
pub fn encode(value: u64, signed: bool, min_len: usize, endian: Endian) -> VarBytes {
    let min_len = min_len.clamp(1, MAX_VAR_BYTES);
    let mut groups = [0u8; MAX_VAR_BYTES];
    let mut count = 0;

    if signed {
        let mut rest = value as i64;
        loop {
            let group = (rest & i64::from(DATA_MASK)) as u8;
            rest >>= 7;
            groups[count] = group;
            count += 1;

            let positive_done = rest == 0 && group & GROUP_SIGN == 0;
            let negative_done = rest == -1 && group & GROUP_SIGN != 0;
            if ((positive_done || negative_done) && count >= min_len) || count == MAX_VAR_BYTES {
                break;
            }
        }
    } else {
        let mut rest = value;
        loop {
            groups[count] = (rest & u64::from(DATA_MASK)) as u8;
            rest >>= 7;
            count += 1;
            if (rest == 0 && count >= min_len) || count == MAX_VAR_BYTES {
                break;
            }
        }
    }

    let mut bytes = [0u8; MAX_VAR_BYTES];
    for (pos, byte) in bytes.iter_mut().take(count).enumerate() {
        let group = match endian {
            Endian::Little => groups[pos],
            Endian::Big => groups[count - 1 - pos],
        };
        *byte = if pos + 1 < count {
            group | CONTINUATION
        } else {
            group
        };
    }

    VarBytes { bytes, len: count }
}

/// Number of bytes [`encode`] produces for `value`.
pub fn encoded_len(value: u64, signed: bool, min_len: usize) -> usize {
    encode(value, signed, min_len, Endian::Little).len()
}

/// Decode one value, consuming between `min_len` and `max_len` bytes.
///
/// Fails with `ProtocolError` when the terminating byte does not show up
/// within `max_len` bytes or arrives before `min_len` bytes were read.
pub fn decode(
    buf: &mut &[u8],
    signed: bool,
    min_len: usize,
    max_len: usize,
    endian: Endian,
) -> Result<u64> {
    let mut value = 0u64;
    let mut count = 0usize;

    loop {
        let (&byte, rest) = buf.split_first().ok_or(CodecError::NotEnoughData)?;
        *buf = rest;

        let group = u64::from(byte & DATA_MASK);
        match endian {
            Endian::Big => value = (value << 7) | group,
            Endian::Little => {
                let shift = 7 * count;
                if shift < 64 {
                    value |= group << shift;
                }
            }
        }
        count += 1;

        if byte & CONTINUATION == 0 {
            break;
        }
        if count >= max_len {
            return Err(CodecError::ProtocolError);
        }
    }

    if count < min_len {
        return Err(CodecError::ProtocolError);
    }

    if signed {
        value = sign_extend(value, 7 * count);
    }
    Ok(value)
}
