use bytes::BufMut;

use crate::access::{read_uint, write_uint, Endian};
use crate::field::Field;
use crate::status::Result;

/// IEEE-754 host types a [`FloatValue`] can hold.
pub trait FloatType: Copy + Default + PartialEq + PartialOrd + std::fmt::Debug + 'static {
    const BYTES: usize;

    fn to_wire(self) -> u64;

    fn from_wire(bits: u64) -> Self;
}

impl FloatType for f32 {
    const BYTES: usize = 4;

    fn to_wire(self) -> u64 {
        u64::from(self.to_bits())
    }

    fn from_wire(bits: u64) -> Self {
        f32::from_bits(bits as u32)
    }
}

impl FloatType for f64 {
    const BYTES: usize = 8;

    fn to_wire(self) -> u64 {
        self.to_bits()
    }

    fn from_wire(bits: u64) -> Self {
        f64::from_bits(bits)
    }
}

/// Floating point field encoded through its bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FloatValue<T: FloatType> {
    value: T,
    endian: Endian,
}

impl<T: FloatType> FloatValue<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            endian: Endian::Big,
        }
    }

    pub fn little_endian(mut self) -> Self {
        self.endian = Endian::Little;
        self
    }

    pub fn get(&self) -> T {
        self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
    }
}

impl<T: FloatType> Field for FloatValue<T> {
    fn length(&self) -> usize {
        T::BYTES
    }

    fn min_length(&self) -> usize {
        T::BYTES
    }

    fn max_length(&self) -> usize {
        T::BYTES
    }

    fn read(&mut self, buf: &mut &[u8]) -> Result<()> {
        self.value = T::from_wire(read_uint(buf, T::BYTES, self.endian)?);
        Ok(())
    }

    fn write(&self, buf: &mut dyn BufMut) -> Result<()> {
        write_uint(buf, self.value.to_wire(), T::BYTES, self.endian)
    }
}
