use wirekit_field::{CodecError, ErrorStatus};

/// Errors surfaced by the protocol object and the stream adapters.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// More input is required. `missing` is the number of additional bytes
    /// needed, when a size-aware layer could tell.
    #[error("not enough data (missing {})", missing.map_or_else(|| "unknown".to_string(), |n| n.to_string()))]
    NotEnoughData { missing: Option<usize> },

    /// The output buffer is too small for the frame.
    #[error("output buffer overflow")]
    BufferOverflow,

    /// The message cannot be legally serialized.
    #[error("invalid message data")]
    InvalidMsgData,

    /// The input is not a valid frame.
    #[error("protocol error")]
    ProtocolError,

    /// The frame exceeds the configured maximum size.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A message type is already registered for this id.
    #[error("message id {0} already registered")]
    DuplicateId(u64),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    pub(crate) fn from_codec(err: CodecError, missing: Option<usize>) -> Self {
        match err {
            CodecError::NotEnoughData => FrameError::NotEnoughData { missing },
            CodecError::BufferOverflow => FrameError::BufferOverflow,
            CodecError::InvalidMsgData => FrameError::InvalidMsgData,
            CodecError::ProtocolError => FrameError::ProtocolError,
        }
    }

    /// The codec status this error corresponds to.
    ///
    /// Errors outside the codec (I/O, registry, size limits) map to
    /// `ProtocolError`, except `ConnectionClosed` which maps to `NotEnoughData`.
    pub fn status(&self) -> ErrorStatus {
        match self {
            FrameError::NotEnoughData { .. } | FrameError::ConnectionClosed => {
                ErrorStatus::NotEnoughData
            }
            FrameError::BufferOverflow => ErrorStatus::BufferOverflow,
            FrameError::InvalidMsgData => ErrorStatus::InvalidMsgData,
            FrameError::ProtocolError
            | FrameError::FrameTooLarge { .. }
            | FrameError::DuplicateId(_)
            | FrameError::Io(_) => ErrorStatus::ProtocolError,
        }
    }
}

impl From<CodecError> for FrameError {
    fn from(err: CodecError) -> Self {
        Self::from_codec(err, None)
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
