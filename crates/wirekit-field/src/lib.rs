//! Typed wire fields for binary protocols.
//!
//! Every field knows its exact serialized length and reads or writes itself
//! against a byte cursor, reporting failures through a closed status set:
//! - Scalars: [`IntValue`], [`EnumValue`], [`BitmaskValue`], [`FloatValue`]
//! - Integer length adapters: fixed bytes, fixed bits and base-128 variable length
//! - Composites: [`Bitfield`], [`Bundle`], [`Variant`], [`Optional`]
//! - Sequences: [`Sequence`] with count and element delimiting modes, [`StringField`]
//!
//! Fields allocate only where their value needs it (sequences, strings).

pub mod access;
pub mod adapter;
pub mod bitfield;
pub mod bitmask;
pub mod bundle;
pub mod enums;
pub mod field;
pub mod float;
pub mod int;
pub mod optional;
pub mod sequence;
pub mod status;
pub mod string;
pub mod variant;

pub use access::Endian;
pub use adapter::IntRepr;
pub use bitfield::{BitMembers, BitOrder, Bitfield, BitfieldMember};
pub use bitmask::BitmaskValue;
pub use bundle::{Bundle, Members};
pub use enums::{EnumValue, WireEnum};
pub use field::{to_vec, Field, NumericField};
pub use float::{FloatType, FloatValue};
pub use int::{IntType, IntValue};
pub use optional::{Optional, OptionalMode};
pub use sequence::{ArrayList, CountMode, ElemMode, Elements, FieldList, RawData, Sequence};
pub use status::{CodecError, ErrorStatus, Result};
pub use string::StringField;
pub use variant::{Alternatives, Variant};
