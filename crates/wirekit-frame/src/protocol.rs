use tracing::trace;
use wirekit_field::CodecError;

use crate::cursor::WriteTarget;
use crate::error::{FrameError, Result};
use crate::layer::{Layer, WriteStatus};
use crate::message::Message;

/// Default maximum frame size: 64 KiB.
pub const DEFAULT_MAX_FRAME: usize = 64 * 1024;

/// Configuration for a protocol stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameConfig {
    /// Maximum frame size in bytes, all layers included. Default: 64 KiB.
    pub max_frame_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME,
        }
    }
}

/// A complete layer stack plus its limits.
///
/// This is the entry point applications use: read a message from a buffer,
/// write one into any [`WriteTarget`], and patch frames written to
/// forward-only targets.
#[derive(Debug, Clone)]
pub struct Protocol<L> {
    stack: L,
    config: FrameConfig,
}

impl<L: Layer> Protocol<L> {
    pub fn new(stack: L) -> Self {
        Self::with_config(stack, FrameConfig::default())
    }

    pub fn with_config(stack: L, config: FrameConfig) -> Self {
        Self { stack, config }
    }

    pub fn stack(&self) -> &L {
        &self.stack
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.config.max_frame_size = max_frame_size;
    }

    /// Smallest possible frame.
    pub fn min_length(&self) -> usize {
        self.stack.min_length()
    }

    /// Exact frame length for `msg`.
    pub fn frame_length(&self, msg: &dyn Message) -> usize {
        self.stack.length(msg)
    }

    /// Decode one frame from the front of `buf`, creating the message.
    ///
    /// On success `buf` is advanced past the frame. On failure no message is
    /// returned and `buf` is left untouched, except after `InvalidMsgData`,
    /// which advances it past the rejected frame when the stack could
    /// delimit it.
    pub fn read(&self, buf: &mut &[u8]) -> Result<Box<dyn Message>> {
        let mut slot = None;
        self.read_into(&mut slot, buf)?;
        slot.ok_or(FrameError::ProtocolError)
    }

    /// Decode one frame into the message in `slot`, or into a new message
    /// when `slot` is empty.
    ///
    /// A hard failure empties the slot. `NotEnoughData` leaves a supplied
    /// message in place so the read can be retried with more input.
    /// `InvalidMsgData` still advances `buf` past the rejected frame when the
    /// stack could delimit it.
    ///
    /// A frame that cannot fit in `max_frame_size` is reported as
    /// `FrameTooLarge` as soon as that is known. Without a size hint from the
    /// stack, this is once `buf` holds `max_frame_size` bytes and still does
    /// not complete a frame.
    pub fn read_into(&self, slot: &mut Option<Box<dyn Message>>, buf: &mut &[u8]) -> Result<()> {
        let mut cursor = *buf;
        let mut missing = None;
        match self.stack.read(slot, &mut cursor, &mut missing) {
            Ok(()) => {}
            Err(err) => {
                if !err.is_retryable() {
                    *slot = None;
                }
                if err == CodecError::InvalidMsgData {
                    *buf = cursor;
                }
                let needed = match (err, missing) {
                    (_, Some(needed)) => Some(needed),
                    (CodecError::NotEnoughData, None) => Some(1),
                    _ => None,
                };
                if let Some(needed) = needed {
                    let total = buf.len().saturating_add(needed);
                    if total > self.config.max_frame_size {
                        return Err(FrameError::FrameTooLarge {
                            size: total,
                            max: self.config.max_frame_size,
                        });
                    }
                }
                return Err(FrameError::from_codec(err, missing));
            }
        }

        let used = buf.len() - cursor.len();
        if used > self.config.max_frame_size {
            *slot = None;
            return Err(FrameError::FrameTooLarge {
                size: used,
                max: self.config.max_frame_size,
            });
        }
        if let Some(msg) = slot.as_ref() {
            trace!(id = msg.id(), name = msg.name(), len = used, "frame decoded");
        }
        *buf = cursor;
        Ok(())
    }

    /// Serialize `msg` into `out`.
    ///
    /// On a forward-only target the result may be
    /// [`WriteStatus::UpdateRequired`]; pass the written frame to
    /// [`update`](Self::update) before sending it.
    pub fn write<T: WriteTarget>(&self, msg: &dyn Message, out: &mut T) -> Result<WriteStatus> {
        let len = self.frame_length(msg);
        if len > self.config.max_frame_size {
            return Err(FrameError::FrameTooLarge {
                size: len,
                max: self.config.max_frame_size,
            });
        }
        Ok(self.stack.write(msg, out)?)
    }

    /// Fill in placeholder values of a frame written to a forward-only
    /// target. `frame` must span exactly one frame.
    pub fn update(&self, frame: &mut [u8]) -> Result<()> {
        Ok(self.stack.update(frame)?)
    }

    /// Serialize `msg` into a fresh, complete frame.
    pub fn encode(&self, msg: &dyn Message) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.frame_length(msg));
        if self.write(msg, &mut out)? == WriteStatus::UpdateRequired {
            self.update(&mut out)?;
        }
        Ok(out)
    }
}
