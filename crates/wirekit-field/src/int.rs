use std::fmt;
use std::ops::RangeInclusive;

use bytes::BufMut;

use crate::access::Endian;
use crate::adapter::fixed::{bytes_for_bits, fits_bits, read_bits, write_bits};
use crate::adapter::var_length::{self, MAX_VAR_BYTES};
use crate::adapter::IntRepr;
use crate::field::{ensure_capacity, Field, NumericField};
use crate::status::{CodecError, Result};

/// Host integer types an [`IntValue`] can hold.
pub trait IntType:
    Copy + Default + PartialEq + PartialOrd + fmt::Debug + Send + Sync + 'static
{
    const BYTES: usize;
    const SIGNED: bool;

    /// Two's complement bit pattern, sign-extended to 64 bits.
    fn to_bits(self) -> u64;

    /// Truncating conversion from a bit pattern.
    fn from_bits(bits: u64) -> Self;

    fn to_i128(self) -> i128;
}

macro_rules! impl_int_type {
    ($($ty:ty => $signed:expr),* $(,)?) => {
        $(
            impl IntType for $ty {
                const BYTES: usize = std::mem::size_of::<$ty>();
                const SIGNED: bool = $signed;

                fn to_bits(self) -> u64 {
                    self as i128 as u64
                }

                fn from_bits(bits: u64) -> Self {
                    bits as $ty
                }

                fn to_i128(self) -> i128 {
                    self as i128
                }
            }
        )*
    };
}

impl_int_type!(
    u8 => false,
    u16 => false,
    u32 => false,
    u64 => false,
    i8 => true,
    i16 => true,
    i32 => true,
    i64 => true,
);

/// Integer field with configurable endianness and wire representation.
///
/// ```
/// use wirekit_field::{Field, IntValue};
///
/// let mut len = IntValue::<u32>::new(300).var_length(1, 4);
/// assert_eq!(len.length(), 2);
///
/// let mut buf: &[u8] = &[0x81, 0x00];
/// len.read(&mut buf).unwrap();
/// assert_eq!(len.get(), 128);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct IntValue<T: IntType> {
    value: T,
    endian: Endian,
    repr: IntRepr,
    offset: i64,
    valid: Option<RangeInclusive<T>>,
    invalid_status: Option<CodecError>,
}

impl<T: IntType> Default for IntValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: IntType> IntValue<T> {
    /// Big endian, full host width.
    pub fn new(value: T) -> Self {
        Self {
            value,
            endian: Endian::Big,
            repr: IntRepr::Full,
            offset: 0,
            valid: None,
            invalid_status: None,
        }
    }

    pub fn get(&self) -> T {
        self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
    }

    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn with_value(mut self, value: T) -> Self {
        self.value = value;
        self
    }

    pub fn big_endian(self) -> Self {
        self.endian(Endian::Big)
    }

    pub fn little_endian(self) -> Self {
        self.endian(Endian::Little)
    }

    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Serialize into exactly `bytes` bytes (1..=8).
    pub fn fixed_length(mut self, bytes: usize) -> Self {
        assert!((1..=8).contains(&bytes), "fixed length must be 1..=8 bytes");
        self.repr = IntRepr::Bytes(bytes);
        self
    }

    /// Serialize into exactly `bits` bits (1..=64).
    pub fn fixed_bit_length(mut self, bits: usize) -> Self {
        assert!((1..=64).contains(&bits), "fixed bit length must be 1..=64 bits");
        self.repr = IntRepr::Bits(bits);
        self
    }

    /// Serialize as base-128 groups occupying `min..=max` bytes.
    pub fn var_length(mut self, min: usize, max: usize) -> Self {
        assert!(
            min >= 1 && min <= max && max <= MAX_VAR_BYTES,
            "var length bounds must satisfy 1 <= min <= max <= {MAX_VAR_BYTES}"
        );
        self.repr = IntRepr::Var { min, max };
        self
    }

    /// Store `value + offset` on the wire.
    pub fn ser_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn valid_range(mut self, range: RangeInclusive<T>) -> Self {
        self.valid = Some(range);
        self
    }

    /// Make reads of out-of-range values fail with `status`.
    pub fn fail_on_invalid(mut self, status: CodecError) -> Self {
        self.invalid_status = Some(status);
        self
    }

    pub fn repr(&self) -> IntRepr {
        self.repr
    }

    pub fn byte_order(&self) -> Endian {
        self.endian
    }

    /// Width in bits of a fixed representation.
    pub fn bit_length(&self) -> usize {
        match self.repr {
            IntRepr::Full => T::BYTES * 8,
            IntRepr::Bytes(bytes) => bytes * 8,
            IntRepr::Bits(bits) => bits,
            IntRepr::Var { .. } => self.length() * 8,
        }
    }

    fn value_is_valid(&self, value: T) -> bool {
        self.valid
            .as_ref()
            .is_none_or(|range| range.contains(&value))
    }

    fn to_wire(&self) -> u64 {
        (self.value.to_i128() + i128::from(self.offset)) as u64
    }

    fn from_wire(&self, bits: u64) -> T {
        let raw = if T::SIGNED {
            i128::from(bits as i64)
        } else {
            i128::from(bits)
        };
        T::from_bits((raw - i128::from(self.offset)) as u64)
    }
}

impl<T: IntType> Field for IntValue<T> {
    fn length(&self) -> usize {
        match self.repr {
            IntRepr::Full => T::BYTES,
            IntRepr::Bytes(bytes) => bytes,
            IntRepr::Bits(bits) => bytes_for_bits(bits),
            IntRepr::Var { min, .. } => var_length::encoded_len(self.to_wire(), T::SIGNED, min),
        }
    }

    fn min_length(&self) -> usize {
        match self.repr {
            IntRepr::Var { min, .. } => min,
            _ => self.length(),
        }
    }

    fn max_length(&self) -> usize {
        match self.repr {
            IntRepr::Var { max, .. } => max,
            _ => self.length(),
        }
    }

    fn read(&mut self, buf: &mut &[u8]) -> Result<()> {
        let bits = match self.repr {
            IntRepr::Var { min, max } => var_length::decode(buf, T::SIGNED, min, max, self.endian)?,
            _ => read_bits(buf, self.bit_length(), self.endian, T::SIGNED)?,
        };
        let value = self.from_wire(bits);
        if let Some(status) = self.invalid_status {
            if !self.value_is_valid(value) {
                return Err(status);
            }
        }
        self.value = value;
        Ok(())
    }

    fn write(&self, buf: &mut dyn BufMut) -> Result<()> {
        match self.repr {
            IntRepr::Var { min, max } => {
                let encoded = var_length::encode(self.to_wire(), T::SIGNED, min, self.endian);
                if encoded.len() > max {
                    return Err(CodecError::InvalidMsgData);
                }
                ensure_capacity(buf, encoded.len())?;
                buf.put_slice(encoded.as_slice());
                Ok(())
            }
            _ => write_bits(buf, self.to_wire(), self.bit_length(), self.endian),
        }
    }

    fn valid(&self) -> bool {
        self.value_is_valid(self.value)
    }

    fn can_write(&self) -> bool {
        match self.repr {
            IntRepr::Var { max, .. } => self.length() <= max,
            _ => fits_bits(self.to_wire(), self.bit_length(), T::SIGNED),
        }
    }

    fn length_value(&self) -> Option<usize> {
        usize::try_from(self.value.to_i128()).ok()
    }

    fn set_length_value(&mut self, len: usize) -> bool {
        let value = T::from_bits(len as u64);
        if value.to_i128() != len as i128 {
            return false;
        }
        self.value = value;
        true
    }
}

impl<T: IntType> NumericField for IntValue<T> {
    fn numeric(&self) -> u64 {
        self.value.to_bits()
    }

    fn set_numeric(&mut self, value: u64) {
        self.value = T::from_bits(value);
    }
}
