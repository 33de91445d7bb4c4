//! Frame layer pipeline for binary protocols.
//!
//! A protocol stack wraps the message payload in transport layers, each
//! adding one field around the frame inside it:
//! - [`SyncLayer`]: constant marker
//! - [`SizeLayer`]: byte length of the enclosed frame
//! - [`IdLayer`]: message id, resolved through a [`MsgFactory`] on read
//! - [`ChecksumLayer`] / [`ChecksumPrefixLayer`]: checksum over the enclosed frame
//! - [`TransportValueLayer`]: frame-level value handed to the message
//!
//! [`Protocol`] drives a stack over byte buffers; [`FrameReader`] and
//! [`FrameWriter`] drive it over blocking streams.

pub mod cursor;
pub mod error;
pub mod layer;
pub mod message;
pub mod protocol;
pub mod reader;
pub mod registry;
pub mod writer;

pub use cursor::{ForwardOnly, SliceWriter, WriteTarget};
pub use error::{FrameError, Result};
pub use layer::{
    ChecksumLayer, ChecksumPrefixLayer, IdLayer, Layer, LayerExt, PayloadLayer, SizeLayer,
    SyncLayer, TransportValueLayer, WriteStatus,
};
pub use message::{FieldsMessage, Message, MsgFactory};
pub use protocol::{FrameConfig, Protocol, DEFAULT_MAX_FRAME};
pub use reader::FrameReader;
pub use registry::{MsgCtor, MsgRegistry, RegistryConfig};
pub use writer::FrameWriter;
