use tracing::debug;
use wirekit_checksum::Checksum;
use wirekit_field::{CodecError, NumericField, Result};

use super::{advance, patch, read_prefix, with_numeric, Layer, WriteStatus};
use crate::cursor::WriteTarget;
use crate::message::Message;

/// Prefixes a checksum over the enclosed frame.
///
/// The checksum precedes the bytes it covers, so even seekable writes go
/// back and patch it once the enclosed frame is complete.
#[derive(Debug, Clone)]
pub struct ChecksumPrefixLayer<F, C, L> {
    field: F,
    checksum: C,
    verify_before: bool,
    inner: L,
}

impl<F: NumericField, C: Checksum, L: Layer> ChecksumPrefixLayer<F, C, L> {
    pub fn new(field: F, checksum: C, inner: L) -> Self {
        Self {
            field,
            checksum,
            verify_before: false,
            inner,
        }
    }

    /// Verify over the rest of the input before decoding anything. The
    /// input must already be bounded to one frame.
    pub fn verify_before_read(mut self) -> Self {
        self.verify_before = true;
        self
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    fn expected(&self, data: &[u8]) -> F {
        with_numeric(&self.field, self.checksum.calc(data))
    }

    fn check(&self, stored: &F, data: &[u8]) -> Result<()> {
        let expected = self.expected(data).numeric();
        if stored.numeric() != expected {
            debug!(
                expected,
                found = stored.numeric(),
                len = data.len(),
                "checksum mismatch"
            );
            return Err(CodecError::ProtocolError);
        }
        Ok(())
    }
}

impl<F: NumericField, C: Checksum, L: Layer> Layer for ChecksumPrefixLayer<F, C, L> {
    fn min_length(&self) -> usize {
        self.field.length() + self.inner.min_length()
    }

    fn length(&self, msg: &dyn Message) -> usize {
        self.field.length() + self.inner.length(msg)
    }

    fn read(
        &self,
        msg: &mut Option<Box<dyn Message>>,
        buf: &mut &[u8],
        missing: &mut Option<usize>,
    ) -> Result<()> {
        let mut cursor = *buf;
        let stored = read_prefix(&self.field, &mut cursor, missing)?;

        if self.verify_before {
            if let Err(err) = self.check(&stored, cursor) {
                *msg = None;
                return Err(err);
            }
            let mut window = cursor;
            let status = self.inner.read(msg, &mut window, missing);
            return advance(buf, &[], status);
        }

        let data = cursor;
        let status = match self.inner.read(msg, &mut cursor, missing) {
            Err(CodecError::InvalidMsgData) if cursor.len() < data.len() => {
                Err(CodecError::InvalidMsgData)
            }
            Err(err) => return Err(err),
            Ok(()) => Ok(()),
        };
        let consumed = data.len() - cursor.len();
        if let Err(err) = self.check(&stored, &data[..consumed]) {
            *msg = None;
            return Err(err);
        }
        *buf = cursor;
        status
    }

    fn write<T: WriteTarget>(&self, msg: &dyn Message, out: &mut T) -> Result<WriteStatus> {
        if out.remaining_mut() < self.length(msg) {
            return Err(CodecError::BufferOverflow);
        }
        let start = out.position();
        let placeholder = with_numeric(&self.field, 0);
        placeholder.write(out)?;
        let status = self.inner.write(msg, out)?;

        let cs_len = placeholder.length();
        match (status, start, out.written_mut()) {
            (WriteStatus::Complete, Some(start), Some(written)) => {
                let (head, data) = written[start..].split_at_mut(cs_len);
                patch(&self.expected(data), head)?;
                Ok(WriteStatus::Complete)
            }
            _ => Ok(WriteStatus::UpdateRequired),
        }
    }

    fn update(&self, frame: &mut [u8]) -> Result<()> {
        let cs_len = self.field.length();
        if frame.len() < cs_len {
            return Err(CodecError::NotEnoughData);
        }
        let (head, data) = frame.split_at_mut(cs_len);
        self.inner.update(data)?;
        patch(&self.expected(data), head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::ForwardOnly;
    use crate::layer::tests::{ping, ping_with, Ping};
    use crate::layer::{LayerExt, PayloadLayer};
    use wirekit_checksum::BasicXor;
    use wirekit_field::IntValue;

    fn stack() -> ChecksumPrefixLayer<IntValue<u8>, BasicXor, PayloadLayer> {
        PayloadLayer::new().with_checksum_prefix(IntValue::new(0), BasicXor::new(1))
    }

    #[test]
    fn seekable_write_patches_prefix() {
        let mut out = vec![0xEE];
        let status = stack().write(&ping_with(0x0102, 4), &mut out).unwrap();
        assert_eq!(status, WriteStatus::Complete);
        assert_eq!(out, vec![0xEE, 7, 1, 2, 4]);
    }

    #[test]
    fn forward_only_needs_update() {
        let mut out = ForwardOnly::new(Vec::new());
        let status = stack().write(&ping_with(0x0102, 4), &mut out).unwrap();
        assert_eq!(status, WriteStatus::UpdateRequired);
        let mut frame = out.into_inner();
        stack().update(&mut frame).unwrap();
        assert_eq!(frame, vec![7, 1, 2, 4]);
    }

    #[test]
    fn verifies_after_read() {
        let mut slot = Some(ping());
        let mut buf = &[7, 1, 2, 4, 0xAA][..];
        stack().read(&mut slot, &mut buf, &mut None).unwrap();
        assert_eq!(buf, &[0xAA]);
        let msg = slot.unwrap();
        assert_eq!(msg.downcast_ref::<Ping>().unwrap(), &ping_with(0x0102, 4));

        let mut slot = Some(ping());
        let err = stack().read(&mut slot, &mut &[6, 1, 2, 4][..], &mut None);
        assert_eq!(err, Err(CodecError::ProtocolError));
        assert!(slot.is_none());
    }

    #[test]
    fn verify_before_read_uses_whole_input() {
        let layer = stack().verify_before_read();
        let err = layer.read(&mut Some(ping()), &mut &[7, 1, 2, 4, 0xAA][..], &mut None);
        assert_eq!(err, Err(CodecError::ProtocolError));

        let mut buf = &[7, 1, 2, 4][..];
        layer.read(&mut Some(ping()), &mut buf, &mut None).unwrap();
        assert!(buf.is_empty());
    }
}
