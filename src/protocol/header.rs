//! Frame header
//!
//! The header is 10 bytes, magic included, every field a single byte except
//! the 24-bit little-endian message id.

use super::{CompatFlags, Error, HEADER_LEN, IncompatFlags, MAGIC, MAX_MESSAGE_ID, Result};

/// Decoded frame header (everything before the payload)
///
/// # Wire Format
///
/// ```text
///  0       1       2        3       4     5       6        7   8   9
/// +-------+-------+--------+-------+-----+-------+--------+-----------+
/// | magic |  len  | incompat| compat| seq | sysid | compid |  msgid LE |
/// +-------+-------+--------+-------+-----+-------+--------+-----------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageHeader {
    len: u8,
    incompat_flags: IncompatFlags,
    compat_flags: CompatFlags,
    seq: u8,
    sysid: u8,
    compid: u8,
    msgid: u32,
}

impl MessageHeader {
    /// Create a header with empty flags
    pub fn new(msgid: u32, len: u8, seq: u8, sysid: u8, compid: u8) -> Result<Self> {
        if msgid > MAX_MESSAGE_ID {
            return Err(Error::InvalidMessageId { msgid });
        }
        Ok(Self {
            len,
            incompat_flags: IncompatFlags::new(),
            compat_flags: CompatFlags::new(),
            seq,
            sysid,
            compid,
            msgid,
        })
    }

    /// Payload length on the wire
    #[must_use]
    pub const fn payload_len(&self) -> u8 {
        self.len
    }

    /// Incompatibility flags
    #[must_use]
    pub const fn incompat_flags(&self) -> IncompatFlags {
        self.incompat_flags
    }

    /// Compatibility flags
    #[must_use]
    pub const fn compat_flags(&self) -> CompatFlags {
        self.compat_flags
    }

    /// Replace the incompatibility flags
    pub fn set_incompat_flags(&mut self, flags: IncompatFlags) {
        self.incompat_flags = flags;
    }

    /// Replace the compatibility flags
    pub fn set_compat_flags(&mut self, flags: CompatFlags) {
        self.compat_flags = flags;
    }

    /// Sequence number
    #[must_use]
    pub const fn seq(&self) -> u8 {
        self.seq
    }

    /// Source system id
    #[must_use]
    pub const fn sysid(&self) -> u8 {
        self.sysid
    }

    /// Source component id
    #[must_use]
    pub const fn compid(&self) -> u8 {
        self.compid
    }

    /// 24-bit message id
    #[must_use]
    pub const fn msgid(&self) -> u32 {
        self.msgid
    }

    /// Whether a signature trailer follows the checksum
    #[must_use]
    pub const fn is_signed(&self) -> bool {
        self.incompat_flags.is_signed()
    }

    /// Encode to wire bytes, magic included
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let id = self.msgid.to_le_bytes();
        [
            MAGIC,
            self.len,
            self.incompat_flags.bits(),
            self.compat_flags.bits(),
            self.seq,
            self.sysid,
            self.compid,
            id[0],
            id[1],
            id[2],
        ]
    }

    /// Parse from wire bytes; the slice must start at the magic byte
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::BufferTooSmall {
                needed: HEADER_LEN,
                got: bytes.len(),
            });
        }
        if bytes[0] != MAGIC {
            return Err(Error::InvalidMagic { found: bytes[0] });
        }
        Ok(Self::from_raw(&bytes[1..HEADER_LEN]))
    }

    /// Build from the nine header bytes following the magic.
    pub(crate) fn from_raw(raw: &[u8]) -> Self {
        Self {
            len: raw[0],
            incompat_flags: IncompatFlags::from_bits(raw[1]),
            compat_flags: CompatFlags::from_bits(raw[2]),
            seq: raw[3],
            sysid: raw[4],
            compid: raw[5],
            msgid: u32::from_le_bytes([raw[6], raw[7], raw[8], 0]),
        }
    }
}
