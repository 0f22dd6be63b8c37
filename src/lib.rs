//! mavframe - streaming codec for MAVLink v2 style telemetry frames
//!
//! The crate turns an unreliable byte stream into validated messages and
//! turns outgoing payloads into checksummed, length-trimmed frames. It knows
//! nothing about message contents: per-message metadata (id, checksum seed,
//! maximum length) comes from a [`MessageLookup`] built by a schema compiler.
//!
//! # Quick Start
//!
//! ```rust
//! use mavframe::{ChannelRegistry, MessageInfo, MessageTable};
//!
//! let heartbeat = MessageInfo::new(0, 50, 9);
//! let table = MessageTable::from_entries([heartbeat])?;
//! let mut registry = ChannelRegistry::new(table);
//!
//! // Send on channel 0 into a buffer
//! let mut wire = Vec::new();
//! registry.send_channel(0, 0, &[1, 2, 3, 0, 0], 1, 1, &mut wire)?;
//!
//! // Receive on channel 1, byte by byte
//! let mut received = Vec::new();
//! for &byte in &wire {
//!     if let Some(message) = registry.feed_channel(1, byte)? {
//!         received.push(message);
//!     }
//! }
//! assert_eq!(received[0].payload().as_ref(), &[1, 2, 3]);
//! # Ok::<(), mavframe::Error>(())
//! ```
//!
//! # Features
//!
//! - **Byte-at-a-time parser** - resynchronizes after noise, corruption and
//!   truncated frames without reporting errors
//! - **Trimming framer** - trailing zero payload bytes never hit the wire
//! - **Independent channels** - one parser and sequence counter per link
//! - **`serde`** - serialize metadata tables, flags and statistics
//! - **`debug-tools`** - `.tlog` capture of raw frames

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]

pub mod channel;
pub mod protocol;

pub use channel::{ByteSink, ChannelRegistry, ChannelState, FnSink, RegistryConfig, WriteSink};
pub use protocol::{
    Error, Framer, MAGIC, MAX_FRAME_LEN, MAX_PAYLOAD_LEN, Message, MessageHeader, MessageInfo,
    MessageLookup, MessageTable, MetricsSnapshot, ParseState, Parser, Result, TxInfo,
};

/// Wire protocol revision these frames follow
pub const PROTOCOL_VERSION: u8 = 2;

/// Process-wide codec counters across every channel.
#[must_use]
pub fn metrics_snapshot() -> MetricsSnapshot {
    protocol::metrics::Metrics::totals()
}
