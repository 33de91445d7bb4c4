use tracing::{debug, trace};
use wirekit_field::{CodecError, NumericField, Result};

use super::{advance, prefix_len, read_prefix, with_numeric, Layer, WriteStatus};
use crate::cursor::WriteTarget;
use crate::message::{Message, MsgFactory};

/// Prefixes the message id and creates the message object on read.
///
/// When several message types share an id, each is tried in turn on the
/// same input and the first one that reads cleanly wins.
#[derive(Debug, Clone)]
pub struct IdLayer<F, R, L> {
    field: F,
    factory: R,
    inner: L,
}

impl<F: NumericField, R: MsgFactory, L: Layer> IdLayer<F, R, L> {
    pub fn new(field: F, factory: R, inner: L) -> Self {
        Self {
            field,
            factory,
            inner,
        }
    }

    pub fn factory(&self) -> &R {
        &self.factory
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    fn read_supplied(
        &self,
        id: u64,
        msg: &mut Option<Box<dyn Message>>,
        buf: &mut &[u8],
        missing: &mut Option<usize>,
    ) -> Result<()> {
        let expected = msg.as_ref().map(|m| m.id());
        if expected != Some(id) {
            debug!(id, ?expected, "frame id does not match supplied message");
            return Err(CodecError::ProtocolError);
        }
        self.inner.read(msg, buf, missing)
    }

    fn read_created(
        &self,
        id: u64,
        msg: &mut Option<Box<dyn Message>>,
        buf: &mut &[u8],
        missing: &mut Option<usize>,
    ) -> Result<()> {
        let mut best: Option<(CodecError, Option<usize>, &[u8])> = None;
        let mut idx = 0;
        while let Some(candidate) = self.factory.create(id, idx) {
            let mut slot = Some(candidate);
            let mut attempt = *buf;
            let mut attempt_missing = None;
            match self.inner.read(&mut slot, &mut attempt, &mut attempt_missing) {
                Ok(()) => {
                    *msg = slot;
                    *buf = attempt;
                    return Ok(());
                }
                Err(err) => {
                    trace!(id, idx, %err, "message candidate rejected");
                    best = Some(match best {
                        Some((prev, hint, rest)) if prev.prefer(err) == prev => (prev, hint, rest),
                        _ => (err, attempt_missing, attempt),
                    });
                }
            }
            idx += 1;
        }

        match best {
            Some((err, hint, rest)) => {
                *missing = hint;
                *buf = rest;
                Err(err)
            }
            None => {
                debug!(id, "unknown message id");
                Err(CodecError::ProtocolError)
            }
        }
    }
}

impl<F: NumericField, R: MsgFactory, L: Layer> Layer for IdLayer<F, R, L> {
    fn min_length(&self) -> usize {
        self.field.min_length() + self.inner.min_length()
    }

    fn length(&self, msg: &dyn Message) -> usize {
        with_numeric(&self.field, msg.id()).length() + self.inner.length(msg)
    }

    fn read(
        &self,
        msg: &mut Option<Box<dyn Message>>,
        buf: &mut &[u8],
        missing: &mut Option<usize>,
    ) -> Result<()> {
        let mut cursor = *buf;
        let id = read_prefix(&self.field, &mut cursor, missing)?.numeric();
        let status = if msg.is_some() {
            self.read_supplied(id, msg, &mut cursor, missing)
        } else {
            self.read_created(id, msg, &mut cursor, missing)
        };
        advance(buf, cursor, status)
    }

    fn write<T: WriteTarget>(&self, msg: &dyn Message, out: &mut T) -> Result<WriteStatus> {
        let field = with_numeric(&self.field, msg.id());
        if field.numeric() != msg.id() || !field.can_write() {
            debug!(id = msg.id(), "message id does not fit the id field");
            return Err(CodecError::InvalidMsgData);
        }
        if out.remaining_mut() < self.length(msg) {
            return Err(CodecError::BufferOverflow);
        }
        field.write(out)?;
        self.inner.write(msg, out)
    }

    fn update(&self, frame: &mut [u8]) -> Result<()> {
        let (_, len) = prefix_len(&self.field, frame)?;
        self.inner.update(&mut frame[len..])
    }
}
