use bytes::BufMut;

use crate::field::Field;
use crate::status::Result;

/// Presence state of an [`Optional`] field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionalMode {
    /// Always read and written.
    #[default]
    Exists,
    /// Never read or written; the inner field keeps its value.
    Missing,
    /// Read when input remains, otherwise becomes `Missing`. Written like
    /// `Exists`.
    Tentative,
}

/// A field that may be absent from the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Optional<F: Field> {
    field: F,
    mode: OptionalMode,
}

impl<F: Field> Optional<F> {
    pub fn new(field: F, mode: OptionalMode) -> Self {
        Self { field, mode }
    }

    pub fn present(field: F) -> Self {
        Self::new(field, OptionalMode::Exists)
    }

    pub fn missing(field: F) -> Self {
        Self::new(field, OptionalMode::Missing)
    }

    pub fn tentative(field: F) -> Self {
        Self::new(field, OptionalMode::Tentative)
    }

    pub fn mode(&self) -> OptionalMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: OptionalMode) {
        self.mode = mode;
    }

    pub fn field(&self) -> &F {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut F {
        &mut self.field
    }

    /// The inner field when it is on the wire.
    pub fn get(&self) -> Option<&F> {
        self.is_present().then_some(&self.field)
    }

    fn is_present(&self) -> bool {
        self.mode != OptionalMode::Missing
    }
}

impl<F: Field> Field for Optional<F> {
    fn length(&self) -> usize {
        if self.is_present() {
            self.field.length()
        } else {
            0
        }
    }

    fn min_length(&self) -> usize {
        0
    }

    fn max_length(&self) -> usize {
        self.field.max_length()
    }

    fn read(&mut self, buf: &mut &[u8]) -> Result<()> {
        match self.mode {
            OptionalMode::Missing => Ok(()),
            OptionalMode::Exists => self.field.read(buf),
            OptionalMode::Tentative if buf.is_empty() => {
                self.mode = OptionalMode::Missing;
                Ok(())
            }
            OptionalMode::Tentative => {
                self.field.read(buf)?;
                self.mode = OptionalMode::Exists;
                Ok(())
            }
        }
    }

    fn write(&self, buf: &mut dyn BufMut) -> Result<()> {
        if self.is_present() {
            self.field.write(buf)
        } else {
            Ok(())
        }
    }

    fn valid(&self) -> bool {
        !self.is_present() || self.field.valid()
    }

    fn refresh(&mut self) -> bool {
        self.field.refresh()
    }

    fn can_write(&self) -> bool {
        !self.is_present() || self.field.can_write()
    }
}
