use bytes::BufMut;

use crate::status::{CodecError, Result};

/// The operation set every wire field implements.
///
/// Reads consume from a byte slice and advance it by exactly the number of
/// bytes used. On failure the slice is left at the offset where decoding
/// stopped. Writes append to any [`BufMut`]; a write never emits a partial
/// value when the destination is too small.
pub trait Field {
    /// Exact serialized length of the current value.
    fn length(&self) -> usize;

    /// Smallest serialized length this field can have.
    fn min_length(&self) -> usize;

    /// Largest serialized length this field can have.
    fn max_length(&self) -> usize;

    fn read(&mut self, buf: &mut &[u8]) -> Result<()>;

    fn write(&self, buf: &mut dyn BufMut) -> Result<()>;

    /// Semantic validity of the current value.
    fn valid(&self) -> bool {
        true
    }

    /// Recompute derived values. Returns `true` when anything changed.
    fn refresh(&mut self) -> bool {
        false
    }

    /// Whether the current value can be serialized without error.
    fn can_write(&self) -> bool {
        true
    }

    /// The value as a byte length, for fields that can carry one.
    fn length_value(&self) -> Option<usize> {
        None
    }

    /// Store a byte length. Returns `false` when the field cannot carry one.
    fn set_length_value(&mut self, _len: usize) -> bool {
        false
    }
}

/// A field whose value converts losslessly to and from a `u64` bit pattern.
///
/// Frame layers use this for ids, sizes, checksums and transport values.
pub trait NumericField: Field + Clone {
    fn numeric(&self) -> u64;

    fn set_numeric(&mut self, value: u64);
}

impl<F: Field + ?Sized> Field for Box<F> {
    fn length(&self) -> usize {
        (**self).length()
    }

    fn min_length(&self) -> usize {
        (**self).min_length()
    }

    fn max_length(&self) -> usize {
        (**self).max_length()
    }

    fn read(&mut self, buf: &mut &[u8]) -> Result<()> {
        (**self).read(buf)
    }

    fn write(&self, buf: &mut dyn BufMut) -> Result<()> {
        (**self).write(buf)
    }

    fn valid(&self) -> bool {
        (**self).valid()
    }

    fn refresh(&mut self) -> bool {
        (**self).refresh()
    }

    fn can_write(&self) -> bool {
        (**self).can_write()
    }

    fn length_value(&self) -> Option<usize> {
        (**self).length_value()
    }

    fn set_length_value(&mut self, len: usize) -> bool {
        (**self).set_length_value(len)
    }
}

/// Fail with `BufferOverflow` unless `buf` can take `len` more bytes.
pub(crate) fn ensure_capacity(buf: &dyn BufMut, len: usize) -> Result<()> {
    if buf.remaining_mut() < len {
        return Err(CodecError::BufferOverflow);
    }
    Ok(())
}

/// Fail with `NotEnoughData` unless `buf` holds at least `len` bytes.
pub(crate) fn ensure_available(buf: &[u8], len: usize) -> Result<()> {
    if buf.len() < len {
        return Err(CodecError::NotEnoughData);
    }
    Ok(())
}

/// Read `field` from exactly `len` bytes of `buf`, skipping whatever the
/// field leaves unconsumed.
///
/// `too_long` is returned when the field needs more than `len` bytes.
pub(crate) fn read_clipped<F: Field + ?Sized>(
    field: &mut F,
    buf: &mut &[u8],
    len: usize,
    too_long: CodecError,
) -> Result<()> {
    ensure_available(buf, len)?;
    let mut window = &buf[..len];
    match field.read(&mut window) {
        Ok(()) => {}
        Err(CodecError::NotEnoughData) => return Err(too_long),
        Err(err) => return Err(err),
    }
    *buf = &buf[len..];
    Ok(())
}

/// Encode `field` into a fresh vector. Mostly useful in tests and tooling.
pub fn to_vec<F: Field + ?Sized>(field: &F) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(field.length());
    field.write(&mut out)?;
    Ok(out)
}
