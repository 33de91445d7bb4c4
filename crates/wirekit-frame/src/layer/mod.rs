//! Frame layers.
//!
//! A protocol stack is a chain of layers built inside out: the payload
//! layer is innermost and each wrapper adds one transport field around the
//! frame it encloses.
//!
//! ```
//! use wirekit_checksum::Crc;
//! use wirekit_field::IntValue;
//! use wirekit_frame::{LayerExt, MsgRegistry, PayloadLayer};
//!
//! let stack = PayloadLayer::new()
//!     .with_id(IntValue::<u8>::new(0), MsgRegistry::new())
//!     .with_size(IntValue::<u16>::new(0))
//!     .with_checksum(IntValue::<u16>::new(0), Crc::ccitt())
//!     .with_sync(IntValue::<u16>::new(0xABCD));
//! # let _ = stack;
//! ```

mod checksum;
mod checksum_prefix;
mod id;
mod payload;
mod size;
mod sync;
mod transport_value;

pub use checksum::ChecksumLayer;
pub use checksum_prefix::ChecksumPrefixLayer;
pub use id::IdLayer;
pub use payload::PayloadLayer;
pub use size::SizeLayer;
pub use sync::SyncLayer;
pub use transport_value::TransportValueLayer;

use bytes::BufMut;
use wirekit_checksum::Checksum;
use wirekit_field::{CodecError, ErrorStatus, NumericField, Result};

use crate::cursor::WriteTarget;
use crate::message::{Message, MsgFactory};

/// Outcome of a successful frame write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// Every byte of the frame is final.
    Complete,
    /// Some values were left as placeholders because the target is forward
    /// only. Run [`Layer::update`] over the written frame before sending it.
    UpdateRequired,
}

impl From<WriteStatus> for ErrorStatus {
    fn from(status: WriteStatus) -> Self {
        match status {
            WriteStatus::Complete => ErrorStatus::Success,
            WriteStatus::UpdateRequired => ErrorStatus::UpdateRequired,
        }
    }
}

/// One stage of the frame pipeline.
///
/// `read` and `write` recurse into the wrapped layer. Reads that fail with
/// `NotEnoughData` set `missing` when the number of additional bytes is
/// known. After a failed read the message slot holds no message that was
/// created during the attempt.
pub trait Layer {
    /// Smallest possible frame produced by this layer and everything inside it.
    fn min_length(&self) -> usize;

    /// Exact frame length for `msg`.
    fn length(&self, msg: &dyn Message) -> usize;

    fn read(
        &self,
        msg: &mut Option<Box<dyn Message>>,
        buf: &mut &[u8],
        missing: &mut Option<usize>,
    ) -> Result<()>;

    fn write<T: WriteTarget>(&self, msg: &dyn Message, out: &mut T) -> Result<WriteStatus>;

    /// Recompute placeholder values in a complete frame written by
    /// [`write`](Self::write). `frame` spans exactly this layer's bytes.
    fn update(&self, frame: &mut [u8]) -> Result<()>;
}

/// Builder methods for wrapping a layer in another.
pub trait LayerExt: Layer + Sized {
    /// Prefix a message id and resolve incoming ids through `factory`.
    fn with_id<F: NumericField, R: MsgFactory>(self, field: F, factory: R) -> IdLayer<F, R, Self> {
        IdLayer::new(field, factory, self)
    }

    /// Prefix the byte length of everything inside.
    fn with_size<F: NumericField>(self, field: F) -> SizeLayer<F, Self> {
        SizeLayer::new(field, self)
    }

    /// Append a checksum over everything inside.
    fn with_checksum<F: NumericField, C: Checksum>(
        self,
        field: F,
        checksum: C,
    ) -> ChecksumLayer<F, C, Self> {
        ChecksumLayer::new(field, checksum, self)
    }

    /// Prefix a checksum over everything inside.
    fn with_checksum_prefix<F: NumericField, C: Checksum>(
        self,
        field: F,
        checksum: C,
    ) -> ChecksumPrefixLayer<F, C, Self> {
        ChecksumPrefixLayer::new(field, checksum, self)
    }

    /// Prefix a constant marker. `field` holds the expected value.
    fn with_sync<F: NumericField>(self, field: F) -> SyncLayer<F, Self> {
        SyncLayer::new(field, self)
    }

    /// Carry a message transport value under `key`.
    fn with_transport_value<F: NumericField>(
        self,
        key: &'static str,
        field: F,
    ) -> TransportValueLayer<F, Self> {
        TransportValueLayer::new(key, field, self)
    }
}

impl<L: Layer> LayerExt for L {}

/// Read `field` from the front of `buf`, reporting the bytes it still needs.
pub(crate) fn read_prefix<F: NumericField>(
    template: &F,
    buf: &mut &[u8],
    missing: &mut Option<usize>,
) -> Result<F> {
    let available = buf.len();
    let mut field = template.clone();
    match field.read(buf) {
        Ok(()) => Ok(field),
        Err(CodecError::NotEnoughData) => {
            *missing = Some(field.min_length().saturating_sub(available).max(1));
            Err(CodecError::NotEnoughData)
        }
        Err(err) => Err(err),
    }
}

/// Encoded length of the field at the front of `frame`.
pub(crate) fn prefix_len<F: NumericField>(template: &F, frame: &[u8]) -> Result<(F, usize)> {
    let mut field = template.clone();
    let mut cursor = frame;
    field.read(&mut cursor)?;
    Ok((field, frame.len() - cursor.len()))
}

/// Move `buf` up to `cursor` once the enclosed frame is consumed. That is
/// the case on success and on `InvalidMsgData`, where the frame is dropped
/// whole.
pub(crate) fn advance<'a>(buf: &mut &'a [u8], cursor: &'a [u8], status: Result<()>) -> Result<()> {
    if matches!(status, Ok(()) | Err(CodecError::InvalidMsgData)) {
        *buf = cursor;
    }
    status
}

/// Overwrite `dest` with `field`, which must encode to exactly its length.
pub(crate) fn patch<F: NumericField>(field: &F, dest: &mut [u8]) -> Result<()> {
    if field.length() != dest.len() {
        return Err(CodecError::InvalidMsgData);
    }
    let mut window = dest;
    field.write(&mut window)?;
    debug_assert!(!window.has_remaining_mut());
    Ok(())
}

/// `field` set to `value`, truncated the way the field stores it.
pub(crate) fn with_numeric<F: NumericField>(template: &F, value: u64) -> F {
    let mut field = template.clone();
    field.set_numeric(value);
    field
}
