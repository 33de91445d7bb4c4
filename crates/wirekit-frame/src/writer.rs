use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::trace;

use crate::cursor::ForwardOnly;
use crate::error::{FrameError, Result};
use crate::layer::{Layer, WriteStatus};
use crate::message::Message;
use crate::protocol::Protocol;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete messages to any `Write` stream.
///
/// Each frame is staged through a forward-only buffer, patched with
/// [`Protocol::update`] when a layer asks for it, and then written out in
/// full.
pub struct FrameWriter<T, L> {
    inner: T,
    buf: BytesMut,
    protocol: Protocol<L>,
}

impl<T: Write, L: Layer> FrameWriter<T, L> {
    pub fn new(inner: T, protocol: Protocol<L>) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            protocol,
        }
    }

    /// Encode and send one message (blocking).
    pub fn send(&mut self, msg: &dyn Message) -> Result<()> {
        self.buf.clear();
        let status = self
            .protocol
            .write(msg, &mut ForwardOnly::new(&mut self.buf))?;
        if status == WriteStatus::UpdateRequired {
            self.protocol.update(&mut self.buf[..])?;
        }
        trace!(id = msg.id(), name = msg.name(), len = self.buf.len(), "sending frame");

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn protocol(&self) -> &Protocol<L> {
        &self.protocol
    }

    /// Update maximum frame size for subsequent writes.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.protocol.set_max_frame_size(max_frame_size);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::layer::tests::{blob_with, ping_with, Blob, Ping};
    use crate::protocol::tests::protocol;
    use crate::reader::FrameReader;

    #[test]
    fn written_frames_match_encode() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()), protocol());
        writer.send(&ping_with(1, 2)).unwrap();
        writer.send(&blob_with(b"two")).unwrap();

        let wire = writer.into_inner().into_inner();
        let mut expected = protocol().encode(&ping_with(1, 2)).unwrap();
        expected.extend(protocol().encode(&blob_with(b"two")).unwrap());
        assert_eq!(wire, expected);
    }

    #[test]
    fn written_bytes_decode() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()), protocol());
        writer.send(&blob_with(b"z")).unwrap();

        let wire = writer.into_inner().into_inner();
        let mut reader = FrameReader::new(Cursor::new(wire), protocol());
        let msg = reader.read_message().unwrap();
        assert_eq!(msg.downcast_ref::<Blob>().unwrap().fields().bytes(), b"z");
    }

    #[test]
    fn frame_too_large_rejected() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()), protocol());
        writer.set_max_frame_size(8);
        let err = writer.send(&blob_with(b"oversized")).unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { max: 8, .. }));
        assert!(writer.get_ref().get_ref().is_empty());
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink, protocol());

        writer.send(&ping_with(0, 0)).unwrap();

        assert!(flag.load(Ordering::SeqCst));
        assert_eq!(writer.get_ref().data.len(), 10);
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()), protocol());
        let _ = writer.get_ref();
        let _ = writer.get_mut();
        let _ = writer.protocol();
        let _inner = writer.into_inner();
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let writer_impl = InterruptedWriteThenFlush {
            wrote_once: false,
            flush_interrupted: false,
            data: Vec::new(),
        };

        let mut writer = FrameWriter::new(writer_impl, protocol());
        writer.send(&blob_with(b"retry")).unwrap();

        let inner = writer.into_inner();
        assert_eq!(inner.data, protocol().encode(&blob_with(b"retry")).unwrap());
    }

    #[test]
    fn handles_would_block_write_and_flush() {
        let writer_impl = WouldBlockWriteThenFlush {
            wrote_once: false,
            flush_would_block: false,
            data: Vec::new(),
        };

        let mut writer = FrameWriter::new(writer_impl, protocol());
        writer.send(&blob_with(b"retry")).unwrap();

        let inner = writer.into_inner();
        assert!(!inner.data.is_empty());
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter, protocol());
        let err = writer.send(&ping_with(1, 1)).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = FrameWriter::new(left, protocol());
        let mut reader = FrameReader::new(right, protocol());

        let reader_thread = std::thread::spawn(move || {
            for expected in 0..32u16 {
                let msg = reader.read_message().unwrap();
                assert_eq!(
                    msg.downcast_ref::<Ping>().unwrap(),
                    &ping_with(expected, (expected % 3) as u8)
                );
            }
        });

        for i in 0..32u16 {
            writer.send(&ping_with(i, (i % 3) as u8)).unwrap();
        }

        reader_thread.join().unwrap();
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct WouldBlockWriteThenFlush {
        wrote_once: bool,
        flush_would_block: bool,
        data: Vec<u8>,
    }

    impl Write for WouldBlockWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_would_block {
                self.flush_would_block = true;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
