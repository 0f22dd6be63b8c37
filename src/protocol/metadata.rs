//! Per-message metadata produced by the schema compiler
//!
//! The codec only needs three facts about a message type: its id, the
//! checksum seed, and the maximum (untrimmed) payload length. Tables are
//! built once at startup and only read afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Error, MAX_MESSAGE_ID, Result};

/// Static description of one message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageInfo {
    /// 24-bit message id
    pub msgid: u32,
    /// Checksum seed folded in after the header
    pub crc_extra: u8,
    /// Maximum encoded payload length
    pub max_len: u8,
}

impl MessageInfo {
    /// Create a new metadata entry
    #[must_use]
    pub const fn new(msgid: u32, crc_extra: u8, max_len: u8) -> Self {
        Self {
            msgid,
            crc_extra,
            max_len,
        }
    }
}

/// Read-only lookup of message metadata by id.
pub trait MessageLookup {
    /// Metadata for `msgid`, if registered.
    fn lookup(&self, msgid: u32) -> Option<MessageInfo>;
}

impl<T: MessageLookup + ?Sized> MessageLookup for &T {
    fn lookup(&self, msgid: u32) -> Option<MessageInfo> {
        (**self).lookup(msgid)
    }
}

impl<T: MessageLookup + ?Sized> MessageLookup for Arc<T> {
    fn lookup(&self, msgid: u32) -> Option<MessageInfo> {
        (**self).lookup(msgid)
    }
}

/// Generated code usually emits a sorted static slice.
impl MessageLookup for [MessageInfo] {
    fn lookup(&self, msgid: u32) -> Option<MessageInfo> {
        self.iter().find(|info| info.msgid == msgid).copied()
    }
}

/// Hash-indexed metadata table.
#[derive(Debug, Clone, Default)]
pub struct MessageTable {
    entries: HashMap<u32, MessageInfo>,
}

impl MessageTable {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one entry, replacing any previous entry for the same id
    pub fn insert(&mut self, info: MessageInfo) -> Result<Option<MessageInfo>> {
        if info.msgid > MAX_MESSAGE_ID {
            return Err(Error::InvalidMessageId { msgid: info.msgid });
        }
        Ok(self.entries.insert(info.msgid, info))
    }

    /// Build a table from entries
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = MessageInfo>,
    {
        let mut table = Self::new();
        for info in entries {
            table.insert(info)?;
        }
        Ok(table)
    }

    /// Metadata for `msgid`, or [`Error::UnknownMessage`]
    pub fn require(&self, msgid: u32) -> Result<MessageInfo> {
        self.lookup(msgid).ok_or(Error::UnknownMessage { msgid })
    }

    /// Number of registered message types
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over registered entries in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = &MessageInfo> {
        self.entries.values()
    }
}

impl MessageLookup for MessageTable {
    fn lookup(&self, msgid: u32) -> Option<MessageInfo> {
        self.entries.get(&msgid).copied()
    }
}
