use tracing::trace;
use wirekit_field::{CodecError, NumericField, Result};

use super::{advance, prefix_len, read_prefix, Layer, WriteStatus};
use crate::cursor::WriteTarget;
use crate::message::Message;

/// A constant marker at the start of every frame.
#[derive(Debug, Clone)]
pub struct SyncLayer<F, L> {
    field: F,
    inner: L,
}

impl<F: NumericField, L: Layer> SyncLayer<F, L> {
    /// `field` carries the expected marker value.
    pub fn new(field: F, inner: L) -> Self {
        Self { field, inner }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn marker(&self) -> u64 {
        self.field.numeric()
    }
}

impl<F: NumericField, L: Layer> Layer for SyncLayer<F, L> {
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
        let field = read_prefix(&self.field, &mut cursor, missing)?;
        if field.numeric() != self.field.numeric() {
            trace!(
                expected = self.field.numeric(),
                found = field.numeric(),
                "sync marker mismatch"
            );
            return Err(CodecError::ProtocolError);
        }
        let status = self.inner.read(msg, &mut cursor, missing);
        advance(buf, cursor, status)
    }

    fn write<T: WriteTarget>(&self, msg: &dyn Message, out: &mut T) -> Result<WriteStatus> {
        if out.remaining_mut() < self.length(msg) {
            return Err(CodecError::BufferOverflow);
        }
        self.field.write(out)?;
        self.inner.write(msg, out)
    }

    fn update(&self, frame: &mut [u8]) -> Result<()> {
        let (_, len) = prefix_len(&self.field, frame)?;
        self.inner.update(&mut frame[len..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::tests::{ping, ping_with, Ping};
    use crate::layer::{LayerExt, PayloadLayer};
    use wirekit_field::IntValue;

    fn stack() -> SyncLayer<IntValue<u16>, PayloadLayer> {
        PayloadLayer::new().with_sync(IntValue::new(0xABCD))
    }

    #[test]
    fn marker_precedes_payload() {
        let mut out = Vec::new();
        stack().write(&ping_with(0x0102, 3), &mut out).unwrap();
        assert_eq!(out, vec![0xAB, 0xCD, 0x01, 0x02, 0x03]);
        assert_eq!(stack().marker(), 0xABCD);
    }

    #[test]
    fn wrong_marker_is_rejected() {
        let mut slot = Some(ping());
        let mut buf = &[0xAB, 0xCE, 0x01, 0x02, 0x03][..];
        let err = stack().read(&mut slot, &mut buf, &mut None);
        assert_eq!(err, Err(CodecError::ProtocolError));
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn partial_marker_reports_missing() {
        let mut missing = None;
        let err = stack().read(&mut Some(ping()), &mut &[0xAB][..], &mut missing);
        assert_eq!(err, Err(CodecError::NotEnoughData));
        assert_eq!(missing, Some(1));
    }

    #[test]
    fn reads_payload_after_marker() {
        let mut slot = Some(ping());
        let mut buf = &[0xAB, 0xCD, 0x00, 0x09, 0x01][..];
        stack().read(&mut slot, &mut buf, &mut None).unwrap();
        assert!(buf.is_empty());
        let msg = slot.unwrap();
        assert_eq!(
            msg.downcast_ref::<Ping>().unwrap().fields().members().0.get(),
            9
        );
    }
}
