use tracing::debug;
use wirekit_field::{CodecError, NumericField, Result};

use super::{patch, prefix_len, read_prefix, with_numeric, Layer, WriteStatus};
use crate::cursor::WriteTarget;
use crate::message::Message;

/// Prefixes the byte length of the enclosed frame.
///
/// The wire value is the enclosed length plus `offset`, for protocols whose
/// size field also counts bytes outside this layer (or fewer bytes than it
/// encloses).
#[derive(Debug, Clone)]
pub struct SizeLayer<F, L> {
    field: F,
    offset: i64,
    inner: L,
}

impl<F: NumericField, L: Layer> SizeLayer<F, L> {
    pub fn new(field: F, inner: L) -> Self {
        Self {
            field,
            offset: 0,
            inner,
        }
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    fn wire_value(&self, len: usize) -> Option<u64> {
        let value = i128::try_from(len).ok()? + i128::from(self.offset);
        u64::try_from(value).ok()
    }

    fn enclosed_len(&self, value: u64) -> Option<usize> {
        let len = i128::from(value) - i128::from(self.offset);
        usize::try_from(len).ok()
    }

    fn size_field(&self, len: usize) -> Result<F> {
        let value = self.wire_value(len).ok_or(CodecError::InvalidMsgData)?;
        let field = with_numeric(&self.field, value);
        if field.numeric() != value || !field.can_write() {
            debug!(len, "frame size does not fit the size field");
            return Err(CodecError::InvalidMsgData);
        }
        Ok(field)
    }
}

impl<F: NumericField, L: Layer> Layer for SizeLayer<F, L> {
    fn min_length(&self) -> usize {
        self.field.min_length() + self.inner.min_length()
    }

    fn length(&self, msg: &dyn Message) -> usize {
        let len = self.inner.length(msg);
        let field_len = self
            .wire_value(len)
            .map_or(self.field.length(), |value| with_numeric(&self.field, value).length());
        field_len + len
    }

    fn read(
        &self,
        msg: &mut Option<Box<dyn Message>>,
        buf: &mut &[u8],
        missing: &mut Option<usize>,
    ) -> Result<()> {
        let mut cursor = *buf;
        let field = read_prefix(&self.field, &mut cursor, missing)?;
        let Some(size) = self.enclosed_len(field.numeric()) else {
            debug!(value = field.numeric(), offset = self.offset, "invalid frame size");
            return Err(CodecError::ProtocolError);
        };
        if cursor.len() < size {
            *missing = Some(size - cursor.len());
            return Err(CodecError::NotEnoughData);
        }

        let mut window = &cursor[..size];
        let mut inner_missing = None;
        match self.inner.read(msg, &mut window, &mut inner_missing) {
            Ok(()) => {}
            Err(CodecError::NotEnoughData) => {
                debug!(size, "frame shorter than its payload");
                return Err(CodecError::ProtocolError);
            }
            Err(CodecError::InvalidMsgData) => {
                *buf = &cursor[size..];
                return Err(CodecError::InvalidMsgData);
            }
            Err(err) => return Err(err),
        }
        *buf = &cursor[size..];
        Ok(())
    }

    fn write<T: WriteTarget>(&self, msg: &dyn Message, out: &mut T) -> Result<WriteStatus> {
        let len = self.inner.length(msg);
        let field = self.size_field(len)?;
        if out.remaining_mut() < field.length() + len {
            return Err(CodecError::BufferOverflow);
        }
        field.write(out)?;

        let start = out.position();
        let status = self.inner.write(msg, out)?;
        if let (Some(start), Some(end)) = (start, out.position()) {
            if end - start != len {
                debug!(expected = len, actual = end - start, "message wrote unexpected length");
                return Err(CodecError::InvalidMsgData);
            }
        }
        Ok(status)
    }

    fn update(&self, frame: &mut [u8]) -> Result<()> {
        let (_, len) = prefix_len(&self.field, frame)?;
        let (head, rest) = frame.split_at_mut(len);
        self.inner.update(rest)?;
        patch(&self.size_field(rest.len())?, head)
    }
}
