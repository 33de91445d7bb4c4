//! Bit-packed composite field.
//!
//! A [`Bitfield`] serializes as one unsigned integer whose bits are shared
//! by several fixed-width members. Each member still encodes itself: its
//! bit slice is marshalled into a scratch buffer in the member's own byte
//! order and handed to the member's `read`, and the mirror happens on write.

use bytes::BufMut;

use crate::access::{mask, read_uint, write_uint, Endian};
use crate::bitmask::BitmaskValue;
use crate::enums::{EnumValue, WireEnum};
use crate::field::Field;
use crate::int::{IntType, IntValue};
use crate::status::Result;

/// A fixed-width field that can live inside a [`Bitfield`].
pub trait BitfieldMember: Field {
    fn bit_length(&self) -> usize;

    fn byte_order(&self) -> Endian;
}

impl<T: IntType> BitfieldMember for IntValue<T> {
    fn bit_length(&self) -> usize {
        IntValue::bit_length(self)
    }

    fn byte_order(&self) -> Endian {
        IntValue::byte_order(self)
    }
}

impl<E: WireEnum> BitfieldMember for EnumValue<E> {
    fn bit_length(&self) -> usize {
        self.int().bit_length()
    }

    fn byte_order(&self) -> Endian {
        self.int().byte_order()
    }
}

impl<T: IntType> BitfieldMember for BitmaskValue<T> {
    fn bit_length(&self) -> usize {
        self.int().bit_length()
    }

    fn byte_order(&self) -> Endian {
        self.int().byte_order()
    }
}

/// Which end of the backing integer the first member occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitOrder {
    #[default]
    LsbFirst,
    MsbFirst,
}

/// An ordered set of bitfield members, implemented for tuples.
pub trait BitMembers: Clone {
    const COUNT: usize;

    fn total_bits(&self) -> usize;

    fn unpack(&mut self, backing: u64, total: usize, order: BitOrder) -> Result<()>;

    fn pack(&self, total: usize, order: BitOrder) -> Result<u64>;

    fn valid(&self) -> bool;

    fn refresh(&mut self) -> bool;

    fn can_write(&self) -> bool;
}

fn shift_for(offset: usize, bits: usize, total: usize, order: BitOrder) -> usize {
    match order {
        BitOrder::LsbFirst => offset,
        BitOrder::MsbFirst => total - offset - bits,
    }
}

fn unpack_member<M: BitfieldMember>(member: &mut M, backing: u64, shift: usize) -> Result<()> {
    let value = (backing >> shift) & mask(member.bit_length());
    let len = member.length();
    let mut scratch = [0u8; 8];
    {
        let mut dst = &mut scratch[..len];
        write_uint(&mut dst, value, len, member.byte_order())?;
    }
    let mut src = &scratch[..len];
    member.read(&mut src)
}

fn pack_member<M: BitfieldMember>(member: &M, shift: usize) -> Result<u64> {
    let len = member.length();
    let mut scratch = [0u8; 8];
    {
        let mut dst = &mut scratch[..len];
        member.write(&mut dst)?;
    }
    let mut src = &scratch[..len];
    let value = read_uint(&mut src, len, member.byte_order())? & mask(member.bit_length());
    Ok(value << shift)
}

macro_rules! impl_bit_members {
    ($count:expr; $($idx:tt : $name:ident),+) => {
        impl<$($name: BitfieldMember + Clone),+> BitMembers for ($($name,)+) {
            const COUNT: usize = $count;

            fn total_bits(&self) -> usize {
                0 $(+ self.$idx.bit_length())+
            }

            fn unpack(&mut self, backing: u64, total: usize, order: BitOrder) -> Result<()> {
                let mut offset = 0usize;
                $(
                    let bits = self.$idx.bit_length();
                    unpack_member(&mut self.$idx, backing, shift_for(offset, bits, total, order))?;
                    offset += bits;
                )+
                let _ = offset;
                Ok(())
            }

            fn pack(&self, total: usize, order: BitOrder) -> Result<u64> {
                let mut backing = 0u64;
                let mut offset = 0usize;
                $(
                    let bits = self.$idx.bit_length();
                    backing |= pack_member(&self.$idx, shift_for(offset, bits, total, order))?;
                    offset += bits;
                )+
                let _ = offset;
                Ok(backing)
            }

            fn valid(&self) -> bool {
                true $(&& self.$idx.valid())+
            }

            fn refresh(&mut self) -> bool {
                let mut changed = false;
                $( changed |= self.$idx.refresh(); )+
                changed
            }

            fn can_write(&self) -> bool {
                true $(&& self.$idx.can_write())+
            }
        }
    };
}

impl_bit_members!(1; 0: A);
impl_bit_members!(2; 0: A, 1: B);
impl_bit_members!(3; 0: A, 1: B, 2: C);
impl_bit_members!(4; 0: A, 1: B, 2: C, 3: D);
impl_bit_members!(5; 0: A, 1: B, 2: C, 3: D, 4: E);
impl_bit_members!(6; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F);
impl_bit_members!(7; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G);
impl_bit_members!(8; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G, 7: H);

/// Several fixed-width members packed into one backing integer.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitfield<M: BitMembers> {
    members: M,
    endian: Endian,
    order: BitOrder,
}

impl<M: BitMembers> Bitfield<M> {
    /// Panics unless the members add up to 8, 16, ... 64 bits.
    pub fn new(members: M) -> Self {
        let total = members.total_bits();
        assert!(
            total > 0 && total <= 64 && total % 8 == 0,
            "bitfield members must add up to whole bytes (got {total} bits)"
        );
        Self {
            members,
            endian: Endian::Big,
            order: BitOrder::LsbFirst,
        }
    }

    pub fn little_endian(mut self) -> Self {
        self.endian = Endian::Little;
        self
    }

    pub fn bit_order(mut self, order: BitOrder) -> Self {
        self.order = order;
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

    fn total_bits(&self) -> usize {
        self.members.total_bits()
    }
}

impl<M: BitMembers> Field for Bitfield<M> {
    fn length(&self) -> usize {
        self.total_bits() / 8
    }

    fn min_length(&self) -> usize {
        self.length()
    }

    fn max_length(&self) -> usize {
        self.length()
    }

    fn read(&mut self, buf: &mut &[u8]) -> Result<()> {
        let total = self.total_bits();
        let backing = read_uint(buf, total / 8, self.endian)?;
        let mut members = self.members.clone();
        members.unpack(backing, total, self.order)?;
        self.members = members;
        Ok(())
    }

    fn write(&self, buf: &mut dyn BufMut) -> Result<()> {
        let total = self.total_bits();
        let backing = self.members.pack(total, self.order)?;
        write_uint(buf, backing, total / 8, self.endian)
    }

    fn valid(&self) -> bool {
        self.members.valid()
    }

    fn refresh(&mut self) -> bool {
        self.members.refresh()
    }

    fn can_write(&self) -> bool {
        self.members.can_write()
    }
}
