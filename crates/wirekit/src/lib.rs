//! Composable binary protocols: typed wire fields, checksums and frame layers.
//!
//! # Crate Structure
//!
//! - [`field`]: Field contract, scalars, length adapters, composites and sequences
//! - [`checksum`]: Sum, XOR and table-driven CRC checksums
//! - [`frame`]: Frame layers, protocol object and blocking stream adapters
//! - [`logging`]: Log output for tools and demos (behind `logging` feature)

/// Re-export field types.
pub mod field {
    pub use wirekit_field::*;
}

/// Re-export checksum types.
pub mod checksum {
    pub use wirekit_checksum::*;
}

/// Re-export frame types.
pub mod frame {
    pub use wirekit_frame::*;
}

#[cfg(feature = "logging")]
pub mod logging;

pub use wirekit_field::{CodecError, ErrorStatus, Field, NumericField};
pub use wirekit_frame::{FrameError, Layer, LayerExt, Message, Protocol, WriteStatus};
