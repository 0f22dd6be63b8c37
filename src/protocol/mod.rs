//! Frame codec core
//!
//! This module provides the frame layout, checksum, streaming parser and
//! trimming framer shared by every channel.

mod checksum;
mod codec;
mod error;
mod framer;
mod header;
mod message;
mod metadata;
pub(crate) mod metrics;
mod parser;
mod types;

pub use checksum::{CRC_INIT, Crc16, FieldDef, checksum, crc_extra, frame_checksum};
pub use codec::{decode, encode, parse_first, trimmed_len};
pub use error::{Error, Result};
pub use framer::{Framer, TxInfo};
pub use header::MessageHeader;
pub use message::Message;
pub use metadata::{MessageInfo, MessageLookup, MessageTable};
pub use metrics::MetricsSnapshot;
pub use parser::{ParseState, ParseStats, Parser};
pub use types::{CompatFlags, IncompatFlags};

/// Start-of-frame marker
pub const MAGIC: u8 = 0xFD;

/// Header size in bytes, magic included
pub const HEADER_LEN: usize = 10;

/// Checksum trailer size in bytes
pub const CHECKSUM_LEN: usize = 2;

/// Signature trailer size in bytes (present when [`IncompatFlags::SIGNED`] is set)
pub const SIGNATURE_LEN: usize = 13;

/// Largest payload a frame can carry
pub const MAX_PAYLOAD_LEN: usize = 255;

/// Bytes in a frame besides the payload, signature excluded
pub const NON_PAYLOAD_LEN: usize = HEADER_LEN + CHECKSUM_LEN;

/// Largest possible frame on the wire
pub const MAX_FRAME_LEN: usize = NON_PAYLOAD_LEN + MAX_PAYLOAD_LEN + SIGNATURE_LEN;

/// Largest message id representable in the 24-bit header field
pub const MAX_MESSAGE_ID: u32 = 0x00FF_FFFF;
