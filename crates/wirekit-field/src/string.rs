use bytes::BufMut;

use crate::field::Field;
use crate::sequence::RawData;
use crate::status::{CodecError, Result};

/// UTF-8 text stored as a raw byte sequence.
///
/// Framing (prefix, terminator, fixed size) comes from the wrapped
/// [`RawData`]. Invalid UTF-8 is rejected on read with `ProtocolError`.
#[derive(Debug, Clone, PartialEq)]
pub struct StringField {
    raw: RawData,
}

impl Default for StringField {
    fn default() -> Self {
        Self::new()
    }
}

impl StringField {
    pub fn new() -> Self {
        Self {
            raw: RawData::raw(Vec::new()),
        }
    }

    /// Adjust the framing of the underlying byte sequence.
    pub fn configure(mut self, f: impl FnOnce(RawData) -> RawData) -> Self {
        self.raw = f(self.raw);
        self
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.set(value);
        self
    }

    pub fn get(&self) -> &str {
        std::str::from_utf8(self.raw.bytes()).unwrap_or_default()
    }

    pub fn set(&mut self, value: &str) {
        self.raw.set_bytes(value.as_bytes());
    }

    pub fn raw(&self) -> &RawData {
        &self.raw
    }
}

impl Field for StringField {
    fn length(&self) -> usize {
        self.raw.length()
    }

    fn min_length(&self) -> usize {
        self.raw.min_length()
    }

    fn max_length(&self) -> usize {
        self.raw.max_length()
    }

    fn read(&mut self, buf: &mut &[u8]) -> Result<()> {
        let mut raw = self.raw.clone();
        let mut cursor = *buf;
        raw.read(&mut cursor)?;
        if std::str::from_utf8(raw.bytes()).is_err() {
            return Err(CodecError::ProtocolError);
        }
        self.raw = raw;
        *buf = cursor;
        Ok(())
    }

    fn write(&self, buf: &mut dyn BufMut) -> Result<()> {
        self.raw.write(buf)
    }

    fn valid(&self) -> bool {
        self.raw.valid()
    }

    fn refresh(&mut self) -> bool {
        self.raw.refresh()
    }

    fn can_write(&self) -> bool {
        self.raw.can_write()
    }
}
