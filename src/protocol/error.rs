//! mavframe error types

use thiserror::Error;

/// Errors surfaced by the codec.
///
/// Transient framing problems seen by the streaming parser are never reported
/// through this type; the parser simply yields no message. Only configuration
/// errors, sink failures, and the whole-buffer [`decode`](super::decode)
/// helper produce an `Error`.
#[derive(Error, Debug)]
pub enum Error {
    /// Channel id is outside the configured registry bound
    #[error("unknown channel {channel} (registry holds {max} channels)")]
    UnknownChannel {
        /// Requested channel
        channel: usize,
        /// Configured channel count
        max: usize,
    },

    /// No metadata registered for the message id
    #[error("no metadata registered for message id {msgid}")]
    UnknownMessage {
        /// Message id
        msgid: u32,
    },

    /// Message id does not fit the 24-bit wire field
    #[error("message id {msgid:#x} does not fit in 24 bits")]
    InvalidMessageId {
        /// Offending id
        msgid: u32,
    },

    /// Incompatibility flag bits this codec does not understand
    #[error("unsupported incompatibility flags: {bits:#04x}")]
    UnsupportedFlags {
        /// Unknown bits
        bits: u8,
    },

    /// Payload longer than the message's declared length
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Payload size
        size: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Default-sink send on a channel that has none
    #[error("channel {channel} has no default byte sink")]
    NoDefaultSink {
        /// Channel id
        channel: usize,
    },

    /// The byte sink refused a chunk; the frame was abandoned
    #[error("byte sink failed: {0}")]
    Sink(#[from] std::io::Error),

    /// Buffer too small
    #[error("buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall {
        /// Needed size
        needed: usize,
        /// Actual size
        got: usize,
    },

    /// First byte is not the frame magic
    #[error("invalid magic byte: expected 0xfd, got {found:#04x}")]
    InvalidMagic {
        /// Found byte
        found: u8,
    },

    /// Checksum mismatch
    #[error("checksum mismatch: expected {expected:#06x}, got {found:#06x}")]
    ChecksumMismatch {
        /// Checksum computed over the frame
        expected: u16,
        /// Checksum carried on the wire
        found: u16,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
