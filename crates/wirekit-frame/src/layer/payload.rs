use tracing::debug;
use wirekit_field::{CodecError, Result};

use super::{Layer, WriteStatus};
use crate::cursor::WriteTarget;
use crate::message::Message;

/// Innermost layer: the message payload itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadLayer;

impl PayloadLayer {
    pub fn new() -> Self {
        Self
    }
}

impl Layer for PayloadLayer {
    fn min_length(&self) -> usize {
        0
    }

    fn length(&self, msg: &dyn Message) -> usize {
        msg.length()
    }

    fn read(
        &self,
        msg: &mut Option<Box<dyn Message>>,
        buf: &mut &[u8],
        _missing: &mut Option<usize>,
    ) -> Result<()> {
        let Some(msg) = msg.as_mut() else {
            debug!("no message object to read payload into");
            return Err(CodecError::ProtocolError);
        };
        msg.read(buf)
    }

    fn write<T: WriteTarget>(&self, msg: &dyn Message, out: &mut T) -> Result<WriteStatus> {
        if out.remaining_mut() < msg.length() {
            return Err(CodecError::BufferOverflow);
        }
        msg.write(out)?;
        Ok(WriteStatus::Complete)
    }

    fn update(&self, _frame: &mut [u8]) -> Result<()> {
        Ok(())
    }
}
