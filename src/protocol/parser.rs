//! Receive-side framing state machine
//!
//! The parser is fed one byte at a time and keeps every byte of the frame it
//! is currently assembling in a fixed window. When a candidate frame turns out
//! to be bogus (bad checksum, unknown id, impossible length) the bytes after
//! its magic are replayed, so a genuine frame start hidden inside the rejected
//! span is never lost. A candidate is never abandoned while it can still
//! validate, so a frame tunnelled inside another frame's payload is delivered
//! as part of its carrier, not on its own.

use std::fmt;

use bytes::Bytes;
use tracing::{debug, trace};

use super::codec::frame_len;
use super::metrics::Metrics;
use super::{
    CHECKSUM_LEN, Crc16, HEADER_LEN, MAGIC, MAX_FRAME_LEN, Message, MessageHeader, MessageLookup,
    SIGNATURE_LEN,
};

/// Parser state, named after the last element received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParseState {
    /// Channel slot never configured
    #[default]
    Uninit,
    /// Waiting for a magic byte
    Idle,
    /// Magic received
    GotMagic,
    /// Payload length received
    GotLength,
    /// Incompatibility flags received
    GotIncompatFlags,
    /// Compatibility flags received
    GotCompatFlags,
    /// Sequence number received
    GotSeq,
    /// Source system id received
    GotSysId,
    /// Source component id received
    GotCompId,
    /// Message id byte 1 (LSB) received
    GotMsgId1,
    /// Message id byte 2 received
    GotMsgId2,
    /// Message id byte 3 received; header complete
    GotMsgId3,
    /// Accumulating payload, or payload complete
    GotPayload,
    /// Checksum low byte received and matching
    GotCrc1,
    /// Checksum low byte received and not matching
    GotBadCrc1,
    /// Checksum verified, consuming the signature trailer
    SignatureWait,
}

impl fmt::Display for ParseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Receive counters for one parser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseStats {
    /// Messages delivered
    pub messages_received: u64,
    /// Candidates dropped for a checksum mismatch
    pub checksum_errors: u64,
    /// Candidates dropped for an unknown id, impossible length or unknown flags
    pub rejected_frames: u64,
    /// Bytes skipped while hunting for a magic byte
    pub bytes_discarded: u64,
    /// Messages whose first byte was replayed from a rejected candidate
    pub resyncs: u64,
}

#[derive(Debug, Clone, Copy)]
enum Rejection {
    Checksum,
    UnknownMessage(u32),
    Oversized { len: u8, max: u8 },
    UnsupportedFlags(u8),
}

enum Step {
    Pending,
    Complete(Message),
    Rejected(Rejection),
}

/// Byte-at-a-time frame parser for one channel.
#[derive(Clone)]
pub struct Parser {
    state: ParseState,
    window: [u8; MAX_FRAME_LEN],
    filled: usize,
    // current candidate's magic came from replayed bytes
    candidate_replayed: bool,
    crc: Crc16,
    backlog: [u8; MAX_FRAME_LEN],
    backlog_len: usize,
    // leading backlog bytes that are replays
    backlog_replayed: usize,
    stats: ParseStats,
}

impl Parser {
    /// Parser in the `Idle` state
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ParseState::Idle,
            window: [0; MAX_FRAME_LEN],
            filled: 0,
            candidate_replayed: false,
            crc: Crc16::new(),
            backlog: [0; MAX_FRAME_LEN],
            backlog_len: 0,
            backlog_replayed: 0,
            stats: ParseStats::default(),
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> ParseState {
        self.state
    }

    /// Receive counters
    #[must_use]
    pub const fn stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Drop any partial frame and return to `Idle`. Counters are kept.
    pub fn reset(&mut self) {
        self.clear_frame();
        self.backlog_len = 0;
        self.backlog_replayed = 0;
    }

    /// Feed one byte; returns a message when this byte completes a valid frame.
    ///
    /// When one byte completes several frames at once (a rejected candidate
    /// hid more than one), the first is returned and the rest come out of
    /// later calls or [`drain`](Self::drain).
    pub fn feed<L: MessageLookup + ?Sized>(&mut self, lookup: &L, byte: u8) -> Option<Message> {
        self.run(lookup, Some(byte))
    }

    /// Feed a buffer, collecting every message it completes.
    pub fn feed_all<L: MessageLookup + ?Sized>(&mut self, lookup: &L, bytes: &[u8]) -> Vec<Message> {
        let mut messages: Vec<Message> = bytes
            .iter()
            .filter_map(|&byte| self.feed(lookup, byte))
            .collect();
        messages.extend(self.drain(lookup));
        messages
    }

    /// Step bytes held back after an earlier message without waiting for new
    /// input, returning every message they complete.
    pub fn drain<L: MessageLookup + ?Sized>(&mut self, lookup: &L) -> Vec<Message> {
        std::iter::from_fn(|| self.run(lookup, None)).collect()
    }

    fn run<L: MessageLookup + ?Sized>(&mut self, lookup: &L, byte: Option<u8>) -> Option<Message> {
        // Bytes still to be stepped, oldest first. Window plus queue never
        // exceeds one maximum frame: stepping moves a byte from the queue into
        // the window, and a rejection drops the candidate's magic.
        let mut queue = [0u8; MAX_FRAME_LEN];
        let mut len = self.backlog_len;
        queue[..len].copy_from_slice(&self.backlog[..len]);
        if let Some(byte) = byte {
            queue[len] = byte;
            len += 1;
        }
        // queue[..replay_end] are bytes of a rejected candidate
        let mut replay_end = self.backlog_replayed;
        self.backlog_len = 0;
        self.backlog_replayed = 0;

        let mut head = 0;
        while head < len {
            let b = queue[head];
            let replayed = head < replay_end;
            head += 1;
            match self.step(lookup, b) {
                Step::Pending => {
                    if self.filled == 1 {
                        self.candidate_replayed = replayed;
                    }
                }
                Step::Complete(msg) => {
                    self.stash(&queue[head..len], replay_end.saturating_sub(head));
                    return Some(msg);
                }
                Step::Rejected(reason) => {
                    self.record_rejection(reason);
                    let carried = self.filled - 1;
                    let rest = len - head;
                    let mut next = [0u8; MAX_FRAME_LEN];
                    next[..carried].copy_from_slice(&self.window[1..self.filled]);
                    next[carried..carried + rest].copy_from_slice(&queue[head..len]);
                    queue = next;
                    replay_end = carried + replay_end.saturating_sub(head);
                    head = 0;
                    len = carried + rest;
                    self.clear_frame();
                }
            }
        }
        None
    }

    fn stash(&mut self, rest: &[u8], replayed: usize) {
        self.backlog[..rest.len()].copy_from_slice(rest);
        self.backlog_len = rest.len();
        self.backlog_replayed = replayed;
    }

    fn clear_frame(&mut self) {
        self.state = ParseState::Idle;
        self.filled = 0;
        self.candidate_replayed = false;
        self.crc = Crc16::new();
    }

    fn payload_len(&self) -> usize {
        usize::from(self.window[1])
    }

    fn step<L: MessageLookup + ?Sized>(&mut self, lookup: &L, byte: u8) -> Step {
        if matches!(self.state, ParseState::Uninit | ParseState::Idle) {
            if byte == MAGIC {
                self.clear_frame();
                self.window[0] = byte;
                self.filled = 1;
                self.state = ParseState::GotMagic;
            } else {
                self.stats.bytes_discarded += 1;
            }
            return Step::Pending;
        }

        let pos = self.filled;
        self.window[pos] = byte;
        self.filled += 1;

        match self.state {
            ParseState::Uninit | ParseState::Idle => return Step::Pending,
            ParseState::GotMagic => {
                self.crc.push(byte);
                self.state = ParseState::GotLength;
            }
            ParseState::GotLength => {
                self.crc.push(byte);
                let unknown = super::IncompatFlags::from_bits(byte).unknown_bits();
                if unknown != 0 {
                    return Step::Rejected(Rejection::UnsupportedFlags(unknown));
                }
                self.state = ParseState::GotIncompatFlags;
            }
            ParseState::GotIncompatFlags => {
                self.crc.push(byte);
                self.state = ParseState::GotCompatFlags;
            }
            ParseState::GotCompatFlags => {
                self.crc.push(byte);
                self.state = ParseState::GotSeq;
            }
            ParseState::GotSeq => {
                self.crc.push(byte);
                self.state = ParseState::GotSysId;
            }
            ParseState::GotSysId => {
                self.crc.push(byte);
                self.state = ParseState::GotCompId;
            }
            ParseState::GotCompId => {
                self.crc.push(byte);
                self.state = ParseState::GotMsgId1;
            }
            ParseState::GotMsgId1 => {
                self.crc.push(byte);
                self.state = ParseState::GotMsgId2;
            }
            ParseState::GotMsgId2 => {
                self.crc.push(byte);
                let msgid = u32::from_le_bytes([self.window[7], self.window[8], byte, 0]);
                let Some(info) = lookup.lookup(msgid) else {
                    return Step::Rejected(Rejection::UnknownMessage(msgid));
                };
                let len = self.window[1];
                if len > info.max_len {
                    return Step::Rejected(Rejection::Oversized {
                        len,
                        max: info.max_len,
                    });
                }
                self.crc.push(info.crc_extra);
                self.state = if len == 0 {
                    ParseState::GotPayload
                } else {
                    ParseState::GotMsgId3
                };
            }
            ParseState::GotMsgId3 | ParseState::GotPayload => {
                if pos < HEADER_LEN + self.payload_len() {
                    self.crc.push(byte);
                    self.state = ParseState::GotPayload;
                } else if byte == self.crc.value() as u8 {
                    self.state = ParseState::GotCrc1;
                } else {
                    self.state = ParseState::GotBadCrc1;
                }
            }
            ParseState::GotCrc1 => {
                if byte != (self.crc.value() >> 8) as u8 {
                    return Step::Rejected(Rejection::Checksum);
                }
                if self.window[2] & super::IncompatFlags::SIGNED != 0 {
                    self.state = ParseState::SignatureWait;
                } else {
                    return Step::Complete(self.finish());
                }
            }
            ParseState::GotBadCrc1 => return Step::Rejected(Rejection::Checksum),
            ParseState::SignatureWait => {
                if self.filled == frame_len(&self.window) {
                    return Step::Complete(self.finish());
                }
            }
        }
        Step::Pending
    }

    fn finish(&mut self) -> Message {
        let len = self.payload_len();
        let crc_at = HEADER_LEN + len;
        let header = MessageHeader::from_raw(&self.window[1..HEADER_LEN]);
        let payload = Bytes::copy_from_slice(&self.window[HEADER_LEN..crc_at]);
        let checksum = u16::from_le_bytes([self.window[crc_at], self.window[crc_at + 1]]);
        let signature = header.is_signed().then(|| {
            let start = crc_at + CHECKSUM_LEN;
            let mut sig = [0u8; SIGNATURE_LEN];
            sig.copy_from_slice(&self.window[start..start + SIGNATURE_LEN]);
            sig
        });

        let msg = Message::from_parts(header, payload, checksum, signature);
        if self.candidate_replayed {
            self.stats.resyncs += 1;
            debug!(msgid = msg.msgid(), seq = msg.seq(), "frame recovered from rejected candidate");
        }
        self.accept(&msg);
        self.clear_frame();
        msg
    }

    fn accept(&mut self, msg: &Message) {
        self.stats.messages_received += 1;
        Metrics::record_received();
        trace!(
            msgid = msg.msgid(),
            seq = msg.seq(),
            sysid = msg.sysid(),
            compid = msg.compid(),
            len = msg.payload().len(),
            "frame received"
        );
    }

    fn record_rejection(&mut self, reason: Rejection) {
        let buffered = self.filled;
        match reason {
            Rejection::Checksum => {
                self.stats.checksum_errors += 1;
                Metrics::record_checksum_error();
                debug!(buffered, "checksum mismatch, resyncing");
                return;
            }
            Rejection::UnknownMessage(msgid) => {
                debug!(msgid, buffered, "no metadata for message id, resyncing");
            }
            Rejection::Oversized { len, max } => {
                debug!(len, max, buffered, "payload longer than registered maximum, resyncing");
            }
            Rejection::UnsupportedFlags(bits) => {
                debug!(bits, buffered, "unsupported incompatibility flags, resyncing");
            }
        }
        self.stats.rejected_frames += 1;
        Metrics::record_rejected();
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("state", &self.state)
            .field("buffered", &self.filled)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
