use tracing::debug;
use wirekit_checksum::Checksum;
use wirekit_field::{CodecError, NumericField, Result};

use super::{advance, patch, with_numeric, Layer, WriteStatus};
use crate::cursor::WriteTarget;
use crate::message::Message;

/// Appends a checksum over the enclosed frame.
///
/// By default the enclosed frame is read first and the checksum verified
/// afterwards over exactly the bytes it consumed. With
/// [`verify_before_read`](Self::verify_before_read) the whole input slice
/// minus the checksum is treated as the enclosed frame and verified before
/// any field is decoded; this needs an outer size layer to bound the input.
#[derive(Debug, Clone)]
pub struct ChecksumLayer<F, C, L> {
    field: F,
    checksum: C,
    verify_before: bool,
    inner: L,
}

impl<F: NumericField, C: Checksum, L: Layer> ChecksumLayer<F, C, L> {
    pub fn new(field: F, checksum: C, inner: L) -> Self {
        Self {
            field,
            checksum,
            verify_before: false,
            inner,
        }
    }

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

    fn verify(&self, data: &[u8], tail: &[u8]) -> Result<()> {
        let mut stored = self.field.clone();
        stored.read(&mut &tail[..])?;
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

    fn read_verified_first(
        &self,
        msg: &mut Option<Box<dyn Message>>,
        buf: &mut &[u8],
        missing: &mut Option<usize>,
    ) -> Result<()> {
        let input = *buf;
        let cs_len = self.field.length();
        let needed = self.inner.min_length() + cs_len;
        if input.len() < needed {
            *missing = Some(needed - input.len());
            return Err(CodecError::NotEnoughData);
        }
        let (data, tail) = input.split_at(input.len() - cs_len);
        if let Err(err) = self.verify(data, tail) {
            *msg = None;
            return Err(err);
        }
        let mut window = data;
        let status = self.inner.read(msg, &mut window, missing);
        advance(buf, &[], status)
    }

    /// The enclosed frame did not fit in the input minus the checksum.
    /// Probe it against the whole input to learn how far the frame extends.
    fn missing_past_view(
        &self,
        msg: &mut Option<Box<dyn Message>>,
        buf: &[u8],
        created: bool,
    ) -> Option<usize> {
        let cs_len = self.field.length();
        let mut cursor = buf;
        let mut view_missing = None;
        let result = self.inner.read(msg, &mut cursor, &mut view_missing);
        if created {
            *msg = None;
        }
        match result {
            Ok(()) => {
                let end = buf.len() - cursor.len() + cs_len;
                Some(end.saturating_sub(buf.len()).max(1))
            }
            Err(CodecError::NotEnoughData) => view_missing.map(|n| n + cs_len),
            Err(_) => None,
        }
    }

    fn read_verified_after(
        &self,
        msg: &mut Option<Box<dyn Message>>,
        buf: &mut &[u8],
        missing: &mut Option<usize>,
    ) -> Result<()> {
        let input = *buf;
        let cs_len = self.field.length();
        let created = msg.is_none();
        let view = &input[..input.len().saturating_sub(cs_len)];
        let mut window = view;
        let status = match self.inner.read(msg, &mut window, &mut None) {
            Ok(()) => Ok(()),
            Err(CodecError::NotEnoughData) => {
                *missing = self.missing_past_view(msg, input, created);
                return Err(CodecError::NotEnoughData);
            }
            // a skipped frame still has to pass the checksum
            Err(CodecError::InvalidMsgData) if window.len() < view.len() => {
                Err(CodecError::InvalidMsgData)
            }
            Err(err) => return Err(err),
        };

        let consumed = view.len() - window.len();
        let (data, tail) = input.split_at(consumed);
        if tail.len() < cs_len {
            if created {
                *msg = None;
            }
            *missing = Some(cs_len - tail.len());
            return Err(CodecError::NotEnoughData);
        }
        if let Err(err) = self.verify(data, &tail[..cs_len]) {
            *msg = None;
            return Err(err);
        }
        *buf = &tail[cs_len..];
        status
    }
}

impl<F: NumericField, C: Checksum, L: Layer> Layer for ChecksumLayer<F, C, L> {
    fn min_length(&self) -> usize {
        self.inner.min_length() + self.field.length()
    }

    fn length(&self, msg: &dyn Message) -> usize {
        self.inner.length(msg) + self.field.length()
    }

    fn read(
        &self,
        msg: &mut Option<Box<dyn Message>>,
        buf: &mut &[u8],
        missing: &mut Option<usize>,
    ) -> Result<()> {
        if self.verify_before {
            self.read_verified_first(msg, buf, missing)
        } else {
            self.read_verified_after(msg, buf, missing)
        }
    }

    fn write<T: WriteTarget>(&self, msg: &dyn Message, out: &mut T) -> Result<WriteStatus> {
        if out.remaining_mut() < self.length(msg) {
            return Err(CodecError::BufferOverflow);
        }
        let start = out.position();
        let status = self.inner.write(msg, out)?;

        let computed = match (status, start) {
            (WriteStatus::Complete, Some(start)) => out
                .written_mut()
                .map(|written| self.expected(&written[start..])),
            _ => None,
        };
        match computed {
            Some(field) => {
                field.write(out)?;
                Ok(WriteStatus::Complete)
            }
            None => {
                with_numeric(&self.field, 0).write(out)?;
                Ok(WriteStatus::UpdateRequired)
            }
        }
    }

    fn update(&self, frame: &mut [u8]) -> Result<()> {
        let cs_len = self.field.length();
        if frame.len() < cs_len {
            return Err(CodecError::NotEnoughData);
        }
        let (data, tail) = frame.split_at_mut(frame.len() - cs_len);
        self.inner.update(data)?;
        patch(&self.expected(data), tail)
    }
}
