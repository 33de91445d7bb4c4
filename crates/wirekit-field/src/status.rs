/// Errors returned by field and layer operations.
///
/// This is the failure subset of [`ErrorStatus`]. Every fallible codec
/// operation returns [`Result`], and nothing here retries internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum CodecError {
    /// More input is required; the caller may retry once more bytes arrive.
    #[error("not enough data")]
    NotEnoughData,

    /// The output buffer is too small for the serialized value.
    #[error("output buffer overflow")]
    BufferOverflow,

    /// The current value cannot be legally serialized.
    #[error("invalid message data")]
    InvalidMsgData,

    /// The input is structurally malformed.
    #[error("protocol error")]
    ProtocolError,
}

impl CodecError {
    /// Whether this failure may go away once more input is available.
    pub fn is_retryable(self) -> bool {
        matches!(self, CodecError::NotEnoughData)
    }

    /// Pick the more useful of two failures.
    ///
    /// `NotEnoughData` wins over any hard failure; otherwise the first one
    /// seen is kept.
    pub fn prefer(self, other: CodecError) -> CodecError {
        if other.is_retryable() && !self.is_retryable() {
            other
        } else {
            self
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// The closed set of outcomes surfaced by the codec.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    Success = 0,
    UpdateRequired = 1,
    NotEnoughData = 2,
    ProtocolError = 3,
    InvalidMsgData = 4,
    BufferOverflow = 5,
}

impl ErrorStatus {
    /// Numeric status code, stable across releases.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether the status denotes a completed (possibly provisional) operation.
    pub fn is_ok(self) -> bool {
        matches!(self, ErrorStatus::Success | ErrorStatus::UpdateRequired)
    }

    /// The failure carried by this status, if any.
    pub fn error(self) -> Option<CodecError> {
        match self {
            ErrorStatus::Success | ErrorStatus::UpdateRequired => None,
            ErrorStatus::NotEnoughData => Some(CodecError::NotEnoughData),
            ErrorStatus::ProtocolError => Some(CodecError::ProtocolError),
            ErrorStatus::InvalidMsgData => Some(CodecError::InvalidMsgData),
            ErrorStatus::BufferOverflow => Some(CodecError::BufferOverflow),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorStatus::Success => "Success",
            ErrorStatus::UpdateRequired => "UpdateRequired",
            ErrorStatus::NotEnoughData => "NotEnoughData",
            ErrorStatus::ProtocolError => "ProtocolError",
            ErrorStatus::InvalidMsgData => "InvalidMsgData",
            ErrorStatus::BufferOverflow => "BufferOverflow",
        }
    }
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl From<CodecError> for ErrorStatus {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::NotEnoughData => ErrorStatus::NotEnoughData,
            CodecError::BufferOverflow => ErrorStatus::BufferOverflow,
            CodecError::InvalidMsgData => ErrorStatus::InvalidMsgData,
            CodecError::ProtocolError => ErrorStatus::ProtocolError,
        }
    }
}

impl From<Result<()>> for ErrorStatus {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => ErrorStatus::Success,
            Err(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_enough_data_is_preferred() {
        assert_eq!(
            CodecError::ProtocolError.prefer(CodecError::NotEnoughData),
            CodecError::NotEnoughData
        );
        assert_eq!(
            CodecError::NotEnoughData.prefer(CodecError::ProtocolError),
            CodecError::NotEnoughData
        );
        assert_eq!(
            CodecError::InvalidMsgData.prefer(CodecError::ProtocolError),
            CodecError::InvalidMsgData
        );
    }

    #[test]
    fn status_codes_are_stable() {
        assert_eq!(ErrorStatus::Success.code(), 0);
        assert_eq!(ErrorStatus::UpdateRequired.code(), 1);
        assert_eq!(ErrorStatus::BufferOverflow.code(), 5);
    }

    #[test]
    fn status_from_result() {
        assert_eq!(ErrorStatus::from(Ok(())), ErrorStatus::Success);
        assert_eq!(
            ErrorStatus::from(Err(CodecError::ProtocolError)),
            ErrorStatus::ProtocolError
        );
        assert!(ErrorStatus::UpdateRequired.is_ok());
        assert_eq!(ErrorStatus::UpdateRequired.error(), None);
        assert_eq!(
            ErrorStatus::NotEnoughData.error(),
            Some(CodecError::NotEnoughData)
        );
    }

    #[test]
    fn display_names() {
        assert_eq!(CodecError::NotEnoughData.to_string(), "not enough data");
        assert_eq!(ErrorStatus::InvalidMsgData.to_string(), "InvalidMsgData");
    }
}
