use std::fmt;
use std::marker::PhantomData;

use bytes::BufMut;

use crate::field::{Field, NumericField};
use crate::int::{IntType, IntValue};
use crate::status::{CodecError, Result};

/// An enumeration with a numeric wire representation.
pub trait WireEnum: Copy + PartialEq + fmt::Debug + 'static {
    type Repr: IntType;

    fn to_repr(self) -> Self::Repr;

    fn from_repr(repr: Self::Repr) -> Option<Self>;
}

/// Field holding an enumeration value.
///
/// The raw value is kept as read, so an unknown discriminant survives a
/// read and only makes [`Field::valid`] return `false`, unless
/// [`EnumValue::fail_on_invalid`] is configured.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue<E: WireEnum> {
    raw: IntValue<E::Repr>,
    invalid_status: Option<CodecError>,
    _marker: PhantomData<E>,
}

impl<E: WireEnum> EnumValue<E> {
    pub fn new(value: E) -> Self {
        Self::from_int(IntValue::new(value.to_repr()))
    }

    /// Use an explicitly configured integer representation.
    pub fn from_int(raw: IntValue<E::Repr>) -> Self {
        Self {
            raw,
            invalid_status: None,
            _marker: PhantomData,
        }
    }

    /// Adjust the underlying integer representation.
    pub fn configure(mut self, f: impl FnOnce(IntValue<E::Repr>) -> IntValue<E::Repr>) -> Self {
        self.raw = f(self.raw);
        self
    }

    pub fn fail_on_invalid(mut self, status: CodecError) -> Self {
        self.invalid_status = Some(status);
        self
    }

    /// The decoded value, `None` for an unknown discriminant.
    pub fn get(&self) -> Option<E> {
        E::from_repr(self.raw.get())
    }

    pub fn set(&mut self, value: E) {
        self.raw.set(value.to_repr());
    }

    pub fn raw(&self) -> E::Repr {
        self.raw.get()
    }

    pub fn int(&self) -> &IntValue<E::Repr> {
        &self.raw
    }
}

impl<E: WireEnum> Field for EnumValue<E> {
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
        let mut raw = self.raw.clone();
        raw.read(buf)?;
        if let Some(status) = self.invalid_status {
            if E::from_repr(raw.get()).is_none() {
                return Err(status);
            }
        }
        self.raw = raw;
        Ok(())
    }

    fn write(&self, buf: &mut dyn BufMut) -> Result<()> {
        self.raw.write(buf)
    }

    fn valid(&self) -> bool {
        self.raw.valid() && self.get().is_some()
    }

    fn can_write(&self) -> bool {
        self.raw.can_write()
    }
}

impl<E: WireEnum> NumericField for EnumValue<E> {
    fn numeric(&self) -> u64 {
        self.raw.numeric()
    }

    fn set_numeric(&mut self, value: u64) {
        self.raw.set_numeric(value);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::field::to_vec;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) enum Mode {
        Idle,
        Run,
        Halt,
    }

    impl WireEnum for Mode {
        type Repr = u8;

        fn to_repr(self) -> u8 {
            match self {
                Mode::Idle => 0,
                Mode::Run => 1,
                Mode::Halt => 7,
            }
        }

        fn from_repr(repr: u8) -> Option<Self> {
            match repr {
                0 => Some(Mode::Idle),
                1 => Some(Mode::Run),
                7 => Some(Mode::Halt),
                _ => None,
            }
        }
    }

    #[test]
    fn known_value_round_trip() {
        let field = EnumValue::new(Mode::Halt);
        assert_eq!(to_vec(&field).unwrap(), vec![7]);

        let mut decoded = EnumValue::new(Mode::Idle);
        decoded.read(&mut &[1u8][..]).unwrap();
        assert_eq!(decoded.get(), Some(Mode::Run));
        assert!(decoded.valid());
    }

    #[test]
    fn unknown_value_is_kept_but_invalid() {
        let mut decoded = EnumValue::new(Mode::Idle);
        decoded.read(&mut &[3u8][..]).unwrap();
        assert_eq!(decoded.get(), None);
        assert_eq!(decoded.raw(), 3);
        assert!(!decoded.valid());
    }

    #[test]
    fn unknown_value_rejected_when_strict() {
        let mut decoded = EnumValue::new(Mode::Idle).fail_on_invalid(CodecError::ProtocolError);
        assert_eq!(
            decoded.read(&mut &[3u8][..]),
            Err(CodecError::ProtocolError)
        );
        assert_eq!(decoded.get(), Some(Mode::Idle));
    }

    #[test]
    fn configured_var_length_repr() {
        let field = EnumValue::new(Mode::Halt).configure(|raw| raw.var_length(1, 2));
        assert_eq!(field.length(), 1);
        assert_eq!(field.max_length(), 2);
    }
}
