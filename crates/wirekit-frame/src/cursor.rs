//! Output targets for frame writes.
//!
//! A frame write appends to a [`WriteTarget`]. Targets that can hand back
//! what was already written let layers patch values that depend on later
//! bytes (checksums) in the same pass. Forward-only targets cannot, so the
//! affected layers emit placeholders and the write reports
//! [`WriteStatus::UpdateRequired`](crate::WriteStatus::UpdateRequired).

use bytes::buf::UninitSlice;
use bytes::{BufMut, BytesMut};

/// A [`BufMut`] that may expose its written bytes for patching.
pub trait WriteTarget: BufMut {
    /// Everything written so far, or `None` for forward-only targets.
    fn written_mut(&mut self) -> Option<&mut [u8]>;

    /// Number of bytes written so far, when the target can tell.
    fn position(&mut self) -> Option<usize> {
        self.written_mut().map(|written| written.len())
    }
}

impl WriteTarget for Vec<u8> {
    fn written_mut(&mut self) -> Option<&mut [u8]> {
        Some(self.as_mut_slice())
    }
}

impl WriteTarget for BytesMut {
    fn written_mut(&mut self) -> Option<&mut [u8]> {
        Some(&mut self[..])
    }
}

/// A fixed-capacity writer over a caller-owned slice.
///
/// Writing past the end of the slice is reported as `BufferOverflow` by the
/// fields; nothing here allocates.
#[derive(Debug)]
pub struct SliceWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    pub fn written(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Give back the written prefix of the slice.
    pub fn into_written(self) -> &'a mut [u8] {
        &mut self.buf[..self.pos]
    }
}

// SAFETY: `chunk_mut` only exposes the unwritten tail of an initialized
// slice, and `advance_mut` never moves past its end.
unsafe impl BufMut for SliceWriter<'_> {
    fn remaining_mut(&self) -> usize {
        self.buf.len() - self.pos
    }

    unsafe fn advance_mut(&mut self, cnt: usize) {
        assert!(
            cnt <= self.remaining_mut(),
            "advance past end of slice writer"
        );
        self.pos += cnt;
    }

    fn chunk_mut(&mut self) -> &mut UninitSlice {
        UninitSlice::new(&mut self.buf[self.pos..])
    }
}

impl WriteTarget for SliceWriter<'_> {
    fn written_mut(&mut self) -> Option<&mut [u8]> {
        Some(&mut self.buf[..self.pos])
    }
}

/// Wraps any [`BufMut`] as a forward-only target, such as a socket staging
/// buffer that is flushed as it fills.
#[derive(Debug)]
pub struct ForwardOnly<B> {
    inner: B,
}

impl<B: BufMut> ForwardOnly<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &B {
        &self.inner
    }

    pub fn into_inner(self) -> B {
        self.inner
    }
}

// SAFETY: every call is forwarded unchanged to the wrapped `BufMut`.
unsafe impl<B: BufMut> BufMut for ForwardOnly<B> {
    fn remaining_mut(&self) -> usize {
        self.inner.remaining_mut()
    }

    unsafe fn advance_mut(&mut self, cnt: usize) {
        self.inner.advance_mut(cnt);
    }

    fn chunk_mut(&mut self) -> &mut UninitSlice {
        self.inner.chunk_mut()
    }
}

impl<B: BufMut> WriteTarget for ForwardOnly<B> {
    fn written_mut(&mut self) -> Option<&mut [u8]> {
        None
    }
}
