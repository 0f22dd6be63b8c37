//! Transmit-side framing
//!
//! Builds the header, trims trailing zero payload bytes, computes the
//! checksum and hands the frame to a [`ByteSink`] in three chunks (header,
//! payload, checksum) so no contiguous frame buffer is needed.

use tracing::{debug, trace};

use super::checksum::frame_checksum;
use super::codec::trimmed_len;
use super::metrics::Metrics;
use super::{Error, HEADER_LEN, MAX_MESSAGE_ID, MessageHeader, MessageInfo, Result};
use crate::channel::ByteSink;

/// Outcome of a successful send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TxInfo {
    /// Checksum written to the wire
    pub checksum: u16,
    /// Payload length after trimming
    pub trimmed_len: u8,
    /// Sequence number the frame carried
    pub seq: u8,
}

/// Frame pieces ready for the wire.
pub(crate) struct FrameParts<'a> {
    pub(crate) header: [u8; HEADER_LEN],
    pub(crate) payload: &'a [u8],
    pub(crate) checksum: u16,
}

/// Validate inputs, trim, and checksum one frame.
pub(crate) fn assemble<'a>(
    info: &MessageInfo,
    seq: u8,
    sysid: u8,
    compid: u8,
    payload: &'a [u8],
) -> Result<FrameParts<'a>> {
    if info.msgid > MAX_MESSAGE_ID {
        return Err(Error::InvalidMessageId { msgid: info.msgid });
    }
    let declared = usize::from(info.max_len);
    if payload.len() > declared {
        return Err(Error::PayloadTooLarge {
            size: payload.len(),
            max: declared,
        });
    }

    let payload = &payload[..trimmed_len(payload)];
    // payload.len() <= max_len <= 255
    let header = MessageHeader::new(info.msgid, payload.len() as u8, seq, sysid, compid)?;
    let header = header.to_bytes();
    let checksum = frame_checksum(&header[1..], info.crc_extra, payload);

    Ok(FrameParts {
        header,
        payload,
        checksum,
    })
}

/// Per-channel transmit state: the outgoing sequence counter.
#[derive(Debug, Clone, Default)]
pub struct Framer {
    seq: u8,
}

impl Framer {
    /// Framer starting at sequence 0
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Framer starting at an arbitrary sequence number
    #[must_use]
    pub fn with_seq(seq: u8) -> Self {
        Self { seq }
    }

    /// Sequence number the next frame will carry
    #[must_use]
    pub const fn next_seq(&self) -> u8 {
        self.seq
    }

    /// Frame `payload` as message `info` and write it to `sink`.
    ///
    /// `payload` may be shorter than `info.max_len`; missing bytes count as
    /// zeros and are trimmed anyway. The sequence counter advances as soon as
    /// the frame is assembled, so a frame that fails halfway through the sink
    /// still consumes its number. Nothing is retried.
    pub fn send<S: ByteSink + ?Sized>(
        &mut self,
        info: &MessageInfo,
        payload: &[u8],
        sysid: u8,
        compid: u8,
        sink: &mut S,
    ) -> Result<TxInfo> {
        let seq = self.seq;
        let parts = assemble(info, seq, sysid, compid, payload)?;
        self.seq = self.seq.wrapping_add(1);

        let result = write_parts(&parts, sink);
        if let Err(err) = result {
            Metrics::record_sink_error();
            debug!(msgid = info.msgid, seq, error = %err, "byte sink rejected frame");
            return Err(Error::Sink(err));
        }

        let wire_len = HEADER_LEN + parts.payload.len() + super::CHECKSUM_LEN;
        Metrics::record_sent(wire_len);
        trace!(
            msgid = info.msgid,
            seq,
            len = parts.payload.len(),
            declared = info.max_len,
            "frame sent"
        );

        Ok(TxInfo {
            checksum: parts.checksum,
            trimmed_len: parts.payload.len() as u8,
            seq,
        })
    }
}

fn write_parts<S: ByteSink + ?Sized>(parts: &FrameParts<'_>, sink: &mut S) -> std::io::Result<()> {
    sink.write_chunk(&parts.header)?;
    if !parts.payload.is_empty() {
        sink.write_chunk(parts.payload)?;
    }
    sink.write_chunk(&parts.checksum.to_le_bytes())
}
