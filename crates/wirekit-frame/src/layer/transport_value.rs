use tracing::trace;
use wirekit_field::{CodecError, NumericField, Result};

use super::{advance, prefix_len, read_prefix, with_numeric, Layer, WriteStatus};
use crate::cursor::WriteTarget;
use crate::message::Message;

/// Carries a value that belongs to the frame but is handed to the message,
/// such as a protocol version.
///
/// On write the value comes from [`Message::transport_value`], falling back
/// to the field's configured value. On read it is stored on the message
/// with [`Message::set_transport_value`] once the enclosed frame decodes.
/// A pseudo layer writes nothing and always reports its configured value.
#[derive(Debug, Clone)]
pub struct TransportValueLayer<F, L> {
    key: &'static str,
    field: F,
    pseudo: bool,
    inner: L,
}

impl<F: NumericField, L: Layer> TransportValueLayer<F, L> {
    pub fn new(key: &'static str, field: F, inner: L) -> Self {
        Self {
            key,
            field,
            pseudo: false,
            inner,
        }
    }

    /// Keep the value off the wire.
    pub fn pseudo(mut self) -> Self {
        self.pseudo = true;
        self
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    fn field_for(&self, msg: &dyn Message) -> F {
        match msg.transport_value(self.key) {
            Some(value) => with_numeric(&self.field, value),
            None => self.field.clone(),
        }
    }

    fn own_length(&self, msg: &dyn Message) -> usize {
        if self.pseudo {
            0
        } else {
            self.field_for(msg).length()
        }
    }
}

impl<F: NumericField, L: Layer> Layer for TransportValueLayer<F, L> {
    fn min_length(&self) -> usize {
        if self.pseudo {
            self.inner.min_length()
        } else {
            self.field.min_length() + self.inner.min_length()
        }
    }

    fn length(&self, msg: &dyn Message) -> usize {
        self.own_length(msg) + self.inner.length(msg)
    }

    fn read(
        &self,
        msg: &mut Option<Box<dyn Message>>,
        buf: &mut &[u8],
        missing: &mut Option<usize>,
    ) -> Result<()> {
        let mut cursor = *buf;
        let value = if self.pseudo {
            self.field.numeric()
        } else {
            read_prefix(&self.field, &mut cursor, missing)?.numeric()
        };
        let status = self.inner.read(msg, &mut cursor, missing);
        if status.is_ok() {
            if let Some(msg) = msg.as_mut() {
                trace!(key = self.key, value, "transport value");
                msg.set_transport_value(self.key, value);
            }
        }
        advance(buf, cursor, status)
    }

    fn write<T: WriteTarget>(&self, msg: &dyn Message, out: &mut T) -> Result<WriteStatus> {
        if !self.pseudo {
            let field = self.field_for(msg);
            if !field.can_write() {
                return Err(CodecError::InvalidMsgData);
            }
            if out.remaining_mut() < self.length(msg) {
                return Err(CodecError::BufferOverflow);
            }
            field.write(out)?;
        }
        self.inner.write(msg, out)
    }

    fn update(&self, frame: &mut [u8]) -> Result<()> {
        if self.pseudo {
            return self.inner.update(frame);
        }
        let (_, len) = prefix_len(&self.field, frame)?;
        self.inner.update(&mut frame[len..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::tests::{ping, ping_with, registry};
    use crate::layer::{LayerExt, PayloadLayer};
    use wirekit_field::IntValue;

    #[test]
    fn value_moves_between_frame_and_message() {
        let layer = PayloadLayer::new()
            .with_id(IntValue::<u8>::new(0), registry())
            .with_transport_value("version", IntValue::<u8>::new(1));

        let mut out = Vec::new();
        let mut msg = ping_with(1, 2);
        layer.write(&msg, &mut out).unwrap();
        assert_eq!(out, vec![1, 1, 0, 1, 2]);

        msg.set_transport_value("version", 3);
        out.clear();
        layer.write(&msg, &mut out).unwrap();
        assert_eq!(out[0], 3);

        let mut slot = None;
        layer.read(&mut slot, &mut &out[..], &mut None).unwrap();
        assert_eq!(slot.unwrap().transport_value("version"), Some(3));
    }

    #[test]
    fn pseudo_value_stays_off_the_wire() {
        let layer = PayloadLayer::new()
            .with_transport_value("version", IntValue::<u8>::new(2))
            .pseudo();
        assert_eq!(layer.min_length(), 0);

        let mut out = Vec::new();
        layer.write(&ping_with(5, 6), &mut out).unwrap();
        assert_eq!(out, vec![0, 5, 6]);

        let mut slot = Some(ping());
        layer.read(&mut slot, &mut &out[..], &mut None).unwrap();
        assert_eq!(slot.unwrap().transport_value("version"), Some(2));
    }
}
