//! Parsed message

use bytes::{BufMut, Bytes, BytesMut};

use super::{CHECKSUM_LEN, HEADER_LEN, MAGIC, MessageHeader, SIGNATURE_LEN};

/// A complete, checksum-valid frame as delivered by the parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    header: MessageHeader,
    payload: Bytes,
    checksum: u16,
    signature: Option<[u8; SIGNATURE_LEN]>,
}

impl Message {
    pub(crate) fn from_parts(
        header: MessageHeader,
        payload: Bytes,
        checksum: u16,
        signature: Option<[u8; SIGNATURE_LEN]>,
    ) -> Self {
        Self {
            header,
            payload,
            checksum,
            signature,
        }
    }

    /// Start-of-frame byte the message arrived with
    #[must_use]
    pub const fn magic(&self) -> u8 {
        MAGIC
    }

    /// Get header
    #[must_use]
    pub const fn header(&self) -> &MessageHeader {
        &self.header
    }

    /// 24-bit message id
    #[must_use]
    pub const fn msgid(&self) -> u32 {
        self.header.msgid()
    }

    /// Sequence number
    #[must_use]
    pub const fn seq(&self) -> u8 {
        self.header.seq()
    }

    /// Source system id
    #[must_use]
    pub const fn sysid(&self) -> u8 {
        self.header.sysid()
    }

    /// Source component id
    #[must_use]
    pub const fn compid(&self) -> u8 {
        self.header.compid()
    }

    /// Payload exactly as received (possibly trimmed)
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Checksum carried by the frame
    #[must_use]
    pub const fn checksum(&self) -> u16 {
        self.checksum
    }

    /// Opaque signature trailer, present on signed frames
    #[must_use]
    pub fn signature(&self) -> Option<&[u8; SIGNATURE_LEN]> {
        self.signature.as_ref()
    }

    /// Payload zero-filled up to `max_len`.
    ///
    /// Senders drop trailing zero bytes; this restores them. A payload already
    /// longer than `max_len` is returned unchanged.
    #[must_use]
    pub fn padded_payload(&self, max_len: usize) -> Bytes {
        if self.payload.len() >= max_len {
            return self.payload.clone();
        }
        let mut padded = BytesMut::with_capacity(max_len);
        padded.put_slice(&self.payload);
        padded.put_bytes(0, max_len - self.payload.len());
        padded.freeze()
    }

    /// Total size of the frame on the wire
    #[must_use]
    pub fn wire_len(&self) -> usize {
        let signature = if self.signature.is_some() {
            SIGNATURE_LEN
        } else {
            0
        };
        HEADER_LEN + self.payload.len() + CHECKSUM_LEN + signature
    }

    /// Re-serialize the frame byte-for-byte, e.g. for forwarding
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.wire_len());
        out.put_slice(&self.header.to_bytes());
        out.put_slice(&self.payload);
        out.put_u16_le(self.checksum);
        if let Some(signature) = &self.signature {
            out.put_slice(signature);
        }
        out.freeze()
    }

    /// Consume the message and return the payload
    #[must_use]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}
