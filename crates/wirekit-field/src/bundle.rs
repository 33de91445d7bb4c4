//! Ordered heterogeneous composite field.

use bytes::BufMut;
use tracing::trace;

use crate::field::{ensure_available, ensure_capacity, Field};
use crate::status::{CodecError, Result};

/// Index-addressable member storage of a [`Bundle`], implemented for tuples
/// of fields.
pub trait Members {
    const COUNT: usize;

    fn member(&self, idx: usize) -> Option<&dyn Field>;

    fn member_mut(&mut self, idx: usize) -> Option<&mut dyn Field>;
}

macro_rules! impl_members {
    ($count:expr; $($idx:tt : $name:ident),+) => {
        impl<$($name: Field),+> Members for ($($name,)+) {
            const COUNT: usize = $count;

            fn member(&self, idx: usize) -> Option<&dyn Field> {
                match idx {
                    $($idx => Some(&self.$idx as &dyn Field),)+
                    _ => None,
                }
            }

            fn member_mut(&mut self, idx: usize) -> Option<&mut dyn Field> {
                match idx {
                    $($idx => Some(&mut self.$idx as &mut dyn Field),)+
                    _ => None,
                }
            }
        }
    };
}

impl_members!(1; 0: A);
impl_members!(2; 0: A, 1: B);
impl_members!(3; 0: A, 1: B, 2: C);
impl_members!(4; 0: A, 1: B, 2: C, 3: D);
impl_members!(5; 0: A, 1: B, 2: C, 3: D, 4: E);
impl_members!(6; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F);
impl_members!(7; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G);
impl_members!(8; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G, 7: H);
impl_members!(9; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G, 7: H, 8: I);
impl_members!(10; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G, 7: H, 8: I, 9: J);
impl_members!(11; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G, 7: H, 8: I, 9: J, 10: K);
impl_members!(12; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G, 7: H, 8: I, 9: J, 10: K, 11: L);

/// Fields read and written left to right.
///
/// Besides the whole-bundle [`Field`] operations, every operation is also
/// available over a member sub-range `[from, until)`. Layers and length
/// prefixes use those to size "everything after member K".
///
/// A read that fails on member K leaves members before K holding the values
/// they just decoded; the failing member keeps its previous value.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle<M: Members> {
    members: M,
    length_member: Option<usize>,
}

impl<M: Members> Bundle<M> {
    pub fn new(members: M) -> Self {
        Self {
            members,
            length_member: None,
        }
    }

    /// Treat member `idx` as the serialized length of all members after it.
    ///
    /// [`Field::refresh`] recomputes it; [`Field::read`] clips the members
    /// after it to the declared length and skips trailing bytes it does not
    /// understand.
    pub fn with_length_member(mut self, idx: usize) -> Self {
        assert!(idx < M::COUNT, "length member {idx} out of range");
        self.length_member = Some(idx);
        self
    }

    pub fn members(&self) -> &M {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut M {
        &mut self.members
    }

    pub fn into_members(self) -> M {
        self.members
    }

    pub fn member(&self, idx: usize) -> Option<&dyn Field> {
        self.members.member(idx)
    }

    pub fn member_mut(&mut self, idx: usize) -> Option<&mut dyn Field> {
        self.members.member_mut(idx)
    }

    fn range(&self, from: usize, until: usize) -> impl Iterator<Item = &dyn Field> + '_ {
        (from..until.min(M::COUNT)).filter_map(move |idx| self.members.member(idx))
    }

    pub fn length_from_until(&self, from: usize, until: usize) -> usize {
        self.range(from, until).map(Field::length).sum()
    }

    pub fn length_from(&self, from: usize) -> usize {
        self.length_from_until(from, M::COUNT)
    }

    pub fn length_until(&self, until: usize) -> usize {
        self.length_from_until(0, until)
    }

    pub fn min_length_from_until(&self, from: usize, until: usize) -> usize {
        self.range(from, until).map(Field::min_length).sum()
    }

    pub fn max_length_from_until(&self, from: usize, until: usize) -> usize {
        self.range(from, until)
            .map(Field::max_length)
            .fold(0usize, usize::saturating_add)
    }

    /// Read members `[from, until)`, stopping at the first failure.
    pub fn read_from_until(&mut self, buf: &mut &[u8], from: usize, until: usize) -> Result<()> {
        for idx in from..until.min(M::COUNT) {
            if let Some(member) = self.members.member_mut(idx) {
                member.read(buf)?;
            }
        }
        Ok(())
    }

    pub fn read_from(&mut self, buf: &mut &[u8], from: usize) -> Result<()> {
        self.read_from_until(buf, from, M::COUNT)
    }

    pub fn read_until(&mut self, buf: &mut &[u8], until: usize) -> Result<()> {
        self.read_from_until(buf, 0, until)
    }

    /// Write members `[from, until)`, stopping at the first failure.
    pub fn write_from_until(&self, buf: &mut dyn BufMut, from: usize, until: usize) -> Result<()> {
        ensure_capacity(buf, self.length_from_until(from, until))?;
        for member in self.range(from, until) {
            member.write(buf)?;
        }
        Ok(())
    }

    pub fn write_from(&self, buf: &mut dyn BufMut, from: usize) -> Result<()> {
        self.write_from_until(buf, from, M::COUNT)
    }

    pub fn write_until(&self, buf: &mut dyn BufMut, until: usize) -> Result<()> {
        self.write_from_until(buf, 0, until)
    }

    fn read_clipped_tail(&mut self, buf: &mut &[u8], idx: usize) -> Result<()> {
        self.read_until(buf, idx + 1)?;
        let len = self
            .members
            .member(idx)
            .and_then(Field::length_value)
            .ok_or(CodecError::ProtocolError)?;
        ensure_available(buf, len)?;

        let mut window = &buf[..len];
        match self.read_from(&mut window, idx + 1) {
            Ok(()) => {}
            Err(CodecError::NotEnoughData) => return Err(CodecError::ProtocolError),
            Err(err) => return Err(err),
        }
        if !window.is_empty() {
            trace!(skipped = window.len(), "skipping unknown bundle tail");
        }
        *buf = &buf[len..];
        Ok(())
    }
}

impl<M: Members> Field for Bundle<M> {
    fn length(&self) -> usize {
        self.length_from(0)
    }

    fn min_length(&self) -> usize {
        self.min_length_from_until(0, M::COUNT)
    }

    fn max_length(&self) -> usize {
        self.max_length_from_until(0, M::COUNT)
    }

    fn read(&mut self, buf: &mut &[u8]) -> Result<()> {
        match self.length_member {
            Some(idx) => self.read_clipped_tail(buf, idx),
            None => self.read_from(buf, 0),
        }
    }

    fn write(&self, buf: &mut dyn BufMut) -> Result<()> {
        self.write_from(buf, 0)
    }

    fn valid(&self) -> bool {
        self.range(0, M::COUNT).all(Field::valid)
    }

    fn refresh(&mut self) -> bool {
        let mut changed = false;
        for idx in 0..M::COUNT {
            if let Some(member) = self.members.member_mut(idx) {
                changed |= member.refresh();
            }
        }
        if let Some(idx) = self.length_member {
            let tail = self.length_from(idx + 1);
            if let Some(member) = self.members.member_mut(idx) {
                if member.length_value() != Some(tail) && member.set_length_value(tail) {
                    changed = true;
                }
            }
        }
        changed
    }

    fn can_write(&self) -> bool {
        if !self.range(0, M::COUNT).all(Field::can_write) {
            return false;
        }
        match self.length_member {
            Some(idx) => {
                self.members.member(idx).and_then(Field::length_value)
                    == Some(self.length_from(idx + 1))
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::to_vec;
    use crate::int::IntValue;

    type Header = (IntValue<u8>, IntValue<u16>, IntValue<u32>);

    fn header() -> Bundle<Header> {
        Bundle::new((
            IntValue::new(1),
            IntValue::new(0x0203),
            IntValue::new(0x0405_0607).fixed_length(3),
        ))
    }

    #[test]
    fn sequential_round_trip() {
        let bundle = header();
        assert_eq!(bundle.length(), 6);
        let bytes = to_vec(&bundle).unwrap();
        assert_eq!(bytes, vec![1, 2, 3, 5, 6, 7]);

        let mut decoded = Bundle::new((
            IntValue::<u8>::default(),
            IntValue::<u16>::default(),
            IntValue::<u32>::default().fixed_length(3),
        ));
        decoded.read(&mut &bytes[..]).unwrap();
        assert_eq!(decoded.members().2.get(), 0x05_0607);
    }

    #[test]
    fn sub_range_lengths() {
        let bundle = header();
        assert_eq!(bundle.length_from(1), 5);
        assert_eq!(bundle.length_until(2), 3);
        assert_eq!(bundle.length_from_until(1, 2), 2);
        assert_eq!(bundle.length_from_until(3, 9), 0);
    }

    #[test]
    fn sub_range_io() {
        let bundle = header();
        let mut out = Vec::new();
        bundle.write_from(&mut out, 1).unwrap();
        assert_eq!(out, vec![2, 3, 5, 6, 7]);

        let mut decoded = header();
        decoded.read_until(&mut &[9u8, 0, 1][..], 2).unwrap();
        assert_eq!(decoded.members().0.get(), 9);
        assert_eq!(decoded.members().1.get(), 1);
    }

    #[test]
    fn stops_at_first_failure() {
        let mut bundle = header();
        let data = [7u8, 8];
        let mut buf = &data[..];
        assert_eq!(bundle.read(&mut buf), Err(CodecError::NotEnoughData));
        assert_eq!(bundle.members().0.get(), 7);
        assert_eq!(bundle.members().1.get(), 0x0203);
    }

    #[test]
    fn write_does_not_emit_partial_output() {
        let bundle = header();
        let mut storage = [0u8; 4];
        let mut dst = &mut storage[..];
        assert_eq!(bundle.write(&mut dst), Err(CodecError::BufferOverflow));
        assert_eq!(storage, [0u8; 4]);
    }

    type Versioned = (IntValue<u8>, IntValue<u8>, IntValue<u16>, IntValue<u32>);

    fn versioned() -> Bundle<Versioned> {
        Bundle::new((
            IntValue::new(0xA0),
            IntValue::new(0),
            IntValue::new(0x1122),
            IntValue::new(0x3344_5566),
        ))
        .with_length_member(1)
    }

    #[test]
    fn refresh_sets_length_member() {
        let mut bundle = versioned();
        assert!(!bundle.can_write());
        assert!(bundle.refresh());
        assert!(!bundle.refresh());
        assert!(bundle.can_write());
        assert_eq!(
            to_vec(&bundle).unwrap(),
            vec![0xA0, 6, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66]
        );
    }

    #[test]
    fn length_member_skips_unknown_tail() {
        let mut bundle = versioned();
        let data = [0xA1, 8, 0, 1, 0, 0, 0, 2, 0xEE, 0xEE, 0x42];
        let mut buf = &data[..];
        bundle.read(&mut buf).unwrap();
        assert_eq!(bundle.members().2.get(), 1);
        assert_eq!(bundle.members().3.get(), 2);
        assert_eq!(buf, &[0x42]);
    }

    #[test]
    fn length_member_too_short_is_protocol_error() {
        let mut bundle = versioned();
        assert_eq!(
            bundle.read(&mut &[0xA1, 1, 0, 1, 0, 0][..]),
            Err(CodecError::ProtocolError)
        );
    }

    #[test]
    fn length_member_beyond_input_needs_more_data() {
        let mut bundle = versioned();
        assert_eq!(
            bundle.read(&mut &[0xA1, 6, 0, 1][..]),
            Err(CodecError::NotEnoughData)
        );
    }
}
