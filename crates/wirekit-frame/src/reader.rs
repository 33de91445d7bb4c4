use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use tracing::warn;

use crate::error::{FrameError, Result};
use crate::layer::Layer;
use crate::message::Message;
use crate::protocol::Protocol;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete messages from any `Read` stream.
///
/// Handles partial reads internally: when the protocol reports how many
/// bytes a frame still needs, exactly that many are requested next. Input
/// that fails to decode with `ProtocolError` is skipped one byte at a time
/// until a valid frame lines up, which suits stacks that start with a sync
/// marker. A well-formed frame carrying an invalid message is dropped whole
/// and reported as `InvalidMsgData`; the next call continues after it.
///
/// Buffered input never grows past the protocol's `max_frame_size`, even
/// when the stack cannot tell how long the pending frame is.
pub struct FrameReader<T, L> {
    inner: T,
    buf: BytesMut,
    protocol: Protocol<L>,
}

impl<T: Read, L: Layer> FrameReader<T, L> {
    pub fn new(inner: T, protocol: Protocol<L>) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            protocol,
        }
    }

    /// Read the next complete message (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_message(&mut self) -> Result<Box<dyn Message>> {
        let mut want = self.protocol.min_length().max(1);
        loop {
            if !self.buf.is_empty() {
                let mut cursor = &self.buf[..];
                match self.protocol.read(&mut cursor) {
                    Ok(msg) => {
                        let used = self.buf.len() - cursor.len();
                        self.buf.advance(used);
                        return Ok(msg);
                    }
                    Err(FrameError::NotEnoughData { missing }) => {
                        want = missing.unwrap_or(READ_CHUNK_SIZE);
                    }
                    Err(FrameError::ProtocolError) => {
                        warn!(buffered = self.buf.len(), "discarding byte of invalid input");
                        self.buf.advance(1);
                        continue;
                    }
                    Err(FrameError::InvalidMsgData) => {
                        let used = (self.buf.len() - cursor.len()).max(1);
                        warn!(skipped = used, "discarding frame with invalid message");
                        self.buf.advance(used);
                        return Err(FrameError::InvalidMsgData);
                    }
                    Err(err) => return Err(err),
                }
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let room = self
                .protocol
                .config()
                .max_frame_size
                .saturating_sub(self.buf.len());
            let len = want.min(room).clamp(1, READ_CHUNK_SIZE);
            let read = match self.inner.read(&mut chunk[..len]) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Bytes received but not yet consumed by a frame.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    /// Drop everything buffered, for example after `FrameTooLarge`.
    pub fn clear_buffer(&mut self) {
        self.buf.clear();
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn protocol(&self) -> &Protocol<L> {
        &self.protocol
    }

    /// Update maximum frame size for subsequent reads.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.protocol.set_max_frame_size(max_frame_size);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::layer::tests::{blob_with, ping_with, Blob, Ping};
    use crate::layer::{LayerExt, PayloadLayer};
    use crate::message::FieldsMessage;
    use crate::protocol::tests::protocol;
    use crate::protocol::FrameConfig;
    use crate::registry::MsgRegistry;
    use wirekit_field::{IntValue, RawData};

    fn wire(msgs: &[&dyn Message]) -> Vec<u8> {
        let protocol = protocol();
        let mut out = Vec::new();
        for msg in msgs {
            out.extend(protocol.encode(*msg).unwrap());
        }
        out
    }

    #[test]
    fn read_single_message() {
        let bytes = wire(&[&ping_with(7, 1)]);
        let mut reader = FrameReader::new(Cursor::new(bytes), protocol());
        let msg = reader.read_message().unwrap();
        assert_eq!(msg.downcast_ref::<Ping>().unwrap(), &ping_with(7, 1));
        assert!(reader.buffered().is_empty());
    }

    #[test]
    fn read_multiple_messages() {
        let bytes = wire(&[&ping_with(1, 0), &blob_with(b"two"), &ping_with(3, 0)]);
        let mut reader = FrameReader::new(Cursor::new(bytes), protocol());

        assert_eq!(reader.read_message().unwrap().name(), "Ping");
        let second = reader.read_message().unwrap();
        assert_eq!(second.downcast_ref::<Blob>().unwrap().fields().bytes(), b"two");
        assert_eq!(reader.read_message().unwrap().name(), "Ping");
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire(&[&blob_with(b"slow")]),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader, protocol());
        let msg = reader.read_message().unwrap();
        assert_eq!(msg.downcast_ref::<Blob>().unwrap().fields().bytes(), b"slow");
    }

    #[test]
    fn skips_garbage_before_frame() {
        let mut bytes = vec![0x00, 0xAB, 0x13, 0xFF];
        bytes.extend(wire(&[&ping_with(9, 9)]));
        let mut reader = FrameReader::new(Cursor::new(bytes), protocol());
        let msg = reader.read_message().unwrap();
        assert_eq!(msg.downcast_ref::<Ping>().unwrap(), &ping_with(9, 9));
    }

    #[test]
    fn corrupted_frame_is_skipped() {
        let mut bytes = wire(&[&blob_with(b"bad"), &blob_with(b"good")]);
        bytes[6] ^= 0x40;
        let mut reader = FrameReader::new(Cursor::new(bytes), protocol());
        let msg = reader.read_message().unwrap();
        assert_eq!(msg.downcast_ref::<Blob>().unwrap().fields().bytes(), b"good");
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()), protocol());
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let bytes = wire(&[&blob_with(b"only-part")]);
        let mut reader = FrameReader::new(Cursor::new(bytes[..8].to_vec()), protocol());
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
        assert_eq!(reader.buffered().len(), 8);
    }

    #[test]
    fn oversized_frame_in_stream() {
        let bytes = wire(&[&blob_with(&[0xAB; 64])]);
        let mut reader = FrameReader::new(Cursor::new(bytes), protocol());
        reader.set_max_frame_size(16);
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { max: 16, .. }));

        reader.clear_buffer();
        assert!(reader.buffered().is_empty());
    }

    fn counted_blob() -> Box<dyn Message> {
        let data = RawData::raw(Vec::new()).count_prefix(IntValue::new(0).fixed_length(4));
        Box::new(FieldsMessage::new(2, "Blob", data))
    }

    #[test]
    fn unsized_frame_stops_at_frame_limit() {
        let mut registry = MsgRegistry::new();
        registry.register(counted_blob).unwrap();
        let protocol = Protocol::with_config(
            PayloadLayer::new()
                .with_id(IntValue::<u8>::new(0), registry)
                .with_sync(IntValue::<u16>::new(0x55AA)),
            FrameConfig { max_frame_size: 64 },
        );

        let mut bytes = vec![0x55, 0xAA, 0x02, 0xFF, 0xFF, 0xFF, 0xFF];
        bytes.resize(bytes.len() + 64 * 1024, 0);
        let mut reader = FrameReader::new(Cursor::new(bytes), protocol);

        let err = reader.read_message().unwrap_err();
        assert!(
            matches!(err, FrameError::FrameTooLarge { size: 65, max: 64 }),
            "{err:?}"
        );
        assert_eq!(reader.buffered().len(), 64);
        assert_eq!(reader.get_ref().position(), 64);
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()), protocol());
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        assert_eq!(reader.protocol().config().max_frame_size, 64 * 1024);
        let _inner = reader.into_inner();
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let reader = WouldBlockThenData {
            state: 0,
            bytes: wire(&[&ping_with(1, 1)]),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader, protocol());
        let err = framed.read_message().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            state: 0,
            bytes: wire(&[&ping_with(8, 0)]),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader, protocol());
        let msg = framed.read_message().unwrap();
        assert_eq!(msg.downcast_ref::<Ping>().unwrap(), &ping_with(8, 0));
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct WouldBlockThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for WouldBlockThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
