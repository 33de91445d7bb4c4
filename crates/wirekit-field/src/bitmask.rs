use bytes::BufMut;

use crate::field::{Field, NumericField};
use crate::int::{IntType, IntValue};
use crate::status::Result;

/// Unsigned bit set. Bits covered by the reserved mask must stay clear for
/// the value to be valid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BitmaskValue<T: IntType> {
    raw: IntValue<T>,
    reserved: u64,
}

impl<T: IntType> BitmaskValue<T> {
    pub fn new(bits: T) -> Self {
        Self::from_int(IntValue::new(bits))
    }

    pub fn from_int(raw: IntValue<T>) -> Self {
        Self { raw, reserved: 0 }
    }

    pub fn configure(mut self, f: impl FnOnce(IntValue<T>) -> IntValue<T>) -> Self {
        self.raw = f(self.raw);
        self
    }

    pub fn reserved_bits(mut self, mask: u64) -> Self {
        self.reserved = mask;
        self
    }

    pub fn bits(&self) -> u64 {
        self.raw.numeric()
    }

    pub fn set_bits(&mut self, bits: u64) {
        self.raw.set_numeric(bits);
    }

    pub fn get_bit(&self, idx: u32) -> bool {
        idx < 64 && self.bits() & (1u64 << idx) != 0
    }

    pub fn set_bit(&mut self, idx: u32, on: bool) {
        if idx >= 64 {
            return;
        }
        let bit = 1u64 << idx;
        let bits = if on {
            self.bits() | bit
        } else {
            self.bits() & !bit
        };
        self.set_bits(bits);
    }

    pub fn has_all(&self, mask: u64) -> bool {
        self.bits() & mask == mask
    }

    pub fn has_any(&self, mask: u64) -> bool {
        self.bits() & mask != 0
    }

    pub fn int(&self) -> &IntValue<T> {
        &self.raw
    }
}

impl<T: IntType> Field for BitmaskValue<T> {
    fn length(&self) -> usize {
        self.raw.length()
    }

    fn min_length(&self) -> usize {
        self.raw.min_length()
    }

    fn max_length(&self) -> usize {
        self.raw.max_length()
    }

    fn read(&mut self, buf: &mut &[u8]) -> Result<()> {
        self.raw.read(buf)
    }

    fn write(&self, buf: &mut dyn BufMut) -> Result<()> {
        self.raw.write(buf)
    }

    fn valid(&self) -> bool {
        self.bits() & self.reserved == 0
    }

    fn can_write(&self) -> bool {
        self.raw.can_write()
    }
}

impl<T: IntType> NumericField for BitmaskValue<T> {
    fn numeric(&self) -> u64 {
        self.bits()
    }

    fn set_numeric(&mut self, value: u64) {
        self.set_bits(value);
    }
}
