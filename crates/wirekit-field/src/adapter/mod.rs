//! Length adapters layered over integer values.

pub mod fixed;
pub mod var_length;

/// How an integer value is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntRepr {
    /// The full width of the host type.
    Full,
    /// A fixed number of bytes, truncating or sign-extending the host value.
    Bytes(usize),
    /// A fixed number of bits, stored in the minimal number of bytes.
    Bits(usize),
    /// Base-128 groups with a continuation bit, between `min` and `max` bytes.
    Var { min: usize, max: usize },
}
