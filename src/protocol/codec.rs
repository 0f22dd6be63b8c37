//! Whole-buffer encode/decode helpers
//!
//! The streaming [`Parser`] and the chunked [`Framer`] are the primary
//! interfaces. The functions here work on complete buffers and are handy for
//! tests, tooling and packet-oriented transports (one frame per datagram).

use bytes::Bytes;

use super::checksum::frame_checksum;
use super::framer::assemble;
use super::{
    CHECKSUM_LEN, Error, HEADER_LEN, MAGIC, Message, MessageHeader, MessageInfo, MessageLookup,
    Parser, Result, SIGNATURE_LEN,
};

/// Payload length after dropping trailing zero bytes.
///
/// Trimming may go all the way to zero; receivers zero-fill up to the
/// message's maximum length.
#[must_use]
pub fn trimmed_len(payload: &[u8]) -> usize {
    payload.iter().rposition(|&b| b != 0).map_or(0, |last| last + 1)
}

/// Total frame size implied by a header (slice must hold at least the header)
pub(crate) fn frame_len(header: &[u8]) -> usize {
    let signature = if header[2] & super::IncompatFlags::SIGNED != 0 {
        SIGNATURE_LEN
    } else {
        0
    };
    HEADER_LEN + usize::from(header[1]) + CHECKSUM_LEN + signature
}

/// Encode one frame into a fresh buffer
///
/// # Format
///
/// ```text
/// [HEADER (10 bytes)] [TRIMMED PAYLOAD (0-255)] [CHECKSUM (2 bytes LE)]
/// ```
pub fn encode(
    info: &MessageInfo,
    seq: u8,
    sysid: u8,
    compid: u8,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let parts = assemble(info, seq, sysid, compid, payload)?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + parts.payload.len() + CHECKSUM_LEN);
    bytes.extend_from_slice(&parts.header);
    bytes.extend_from_slice(parts.payload);
    bytes.extend_from_slice(&parts.checksum.to_le_bytes());
    Ok(bytes)
}

/// Decode exactly one frame from the start of `bytes`
///
/// Trailing bytes after the frame are ignored.
///
/// # Errors
///
/// Returns an error if:
/// - Buffer is shorter than the frame it announces
/// - First byte is not the magic
/// - Message id is not registered
/// - Payload length exceeds the registered maximum
/// - Unknown incompatibility flags are set
/// - Checksum doesn't match
pub fn decode<L: MessageLookup + ?Sized>(lookup: &L, bytes: &[u8]) -> Result<Message> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::BufferTooSmall {
            needed: HEADER_LEN,
            got: bytes.len(),
        });
    }
    if bytes[0] != MAGIC {
        return Err(Error::InvalidMagic { found: bytes[0] });
    }
    let total = frame_len(bytes);
    if bytes.len() < total {
        return Err(Error::BufferTooSmall {
            needed: total,
            got: bytes.len(),
        });
    }
    verify_frame(lookup, &bytes[..total])
}

/// Validate a frame slice of exactly the announced length.
pub(crate) fn verify_frame<L: MessageLookup + ?Sized>(lookup: &L, frame: &[u8]) -> Result<Message> {
    let header = MessageHeader::from_bytes(frame)?;
    let unknown = header.incompat_flags().unknown_bits();
    if unknown != 0 {
        return Err(Error::UnsupportedFlags { bits: unknown });
    }

    let info = lookup.lookup(header.msgid()).ok_or(Error::UnknownMessage {
        msgid: header.msgid(),
    })?;
    let len = usize::from(header.payload_len());
    if len > usize::from(info.max_len) {
        return Err(Error::PayloadTooLarge {
            size: len,
            max: usize::from(info.max_len),
        });
    }

    let payload = &frame[HEADER_LEN..HEADER_LEN + len];
    let crc_at = HEADER_LEN + len;
    let found = u16::from_le_bytes([frame[crc_at], frame[crc_at + 1]]);
    let expected = frame_checksum(&frame[1..HEADER_LEN], info.crc_extra, payload);
    if found != expected {
        return Err(Error::ChecksumMismatch { expected, found });
    }

    let signature = if header.is_signed() {
        let mut sig = [0u8; SIGNATURE_LEN];
        let start = crc_at + CHECKSUM_LEN;
        sig.copy_from_slice(&frame[start..start + SIGNATURE_LEN]);
        Some(sig)
    } else {
        None
    };

    Ok(Message::from_parts(
        header,
        Bytes::copy_from_slice(payload),
        found,
        signature,
    ))
}

/// Scan an arbitrary buffer and return the first valid message together with
/// the number of bytes consumed up to and including its last byte.
#[must_use]
pub fn parse_first<L: MessageLookup + ?Sized>(lookup: &L, buf: &[u8]) -> Option<(Message, usize)> {
    let mut parser = Parser::new();
    buf.iter()
        .enumerate()
        .find_map(|(idx, &byte)| parser.feed(lookup, byte).map(|msg| (msg, idx + 1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{IncompatFlags, MessageTable};

    fn table() -> MessageTable {
        MessageTable::from_entries([MessageInfo::new(0, 50, 6), MessageInfo::new(42, 7, 4)]).unwrap()
    }

    #[test]
    fn test_trimmed_len() {
        assert_eq!(trimmed_len(&[5, 0, 0, 0]), 1);
        assert_eq!(trimmed_len(&[0, 0, 0]), 0);
        assert_eq!(trimmed_len(&[]), 0);
        assert_eq!(trimmed_len(&[0, 0, 3]), 3);
    }

    #[test]
    fn test_encode_reference_frame() {
        let info = MessageInfo::new(0, 50, 6);
        let bytes = encode(&info, 0, 1, 1, &[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(
            bytes,
            vec![MAGIC, 6, 0, 0, 0, 1, 1, 0, 0, 0, 1, 2, 3, 4, 5, 6, 0xB1, 0x12]
        );
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let table = table();
        let info = table.require(42).unwrap();
        let encoded = encode(&info, 9, 3, 4, &[5, 0, 0, 0]).unwrap();
        assert_eq!(encoded.len(), HEADER_LEN + 1 + CHECKSUM_LEN);

        let decoded = decode(&table, &encoded).unwrap();
        assert_eq!(decoded.msgid(), 42);
        assert_eq!(decoded.seq(), 9);
        assert_eq!(decoded.sysid(), 3);
        assert_eq!(decoded.compid(), 4);
        assert_eq!(decoded.payload().as_ref(), &[5]);
        assert_eq!(decoded.padded_payload(4).as_ref(), &[5, 0, 0, 0]);
        assert_eq!(decoded.to_bytes().as_ref(), encoded.as_slice());
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        let table = table();
        let mut encoded = encode(&table.require(0).unwrap(), 0, 1, 1, b"abc").unwrap();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;
        assert!(matches!(
            decode(&table, &encoded),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_unknown_message() {
        let info = MessageInfo::new(77, 1, 8);
        let encoded = encode(&info, 0, 1, 1, b"hi").unwrap();
        assert!(matches!(
            decode(&table(), &encoded),
            Err(Error::UnknownMessage { msgid: 77 })
        ));
    }

    #[test]
    fn test_decode_oversized_payload() {
        // Sender believes message 42 is longer than the receiver does.
        let wide = MessageInfo::new(42, 7, 8);
        let encoded = encode(&wide, 0, 1, 1, &[1; 8]).unwrap();
        assert!(matches!(
            decode(&table(), &encoded),
            Err(Error::PayloadTooLarge { size: 8, max: 4 })
        ));
    }

    #[test]
    fn test_decode_buffer_too_small() {
        let table = table();
        assert!(matches!(
            decode(&table, &[MAGIC, 0, 0]),
            Err(Error::BufferTooSmall { .. })
        ));
        let encoded = encode(&table.require(0).unwrap(), 0, 1, 1, b"abc").unwrap();
        assert!(matches!(
            decode(&table, &encoded[..encoded.len() - 1]),
            Err(Error::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn test_decode_signed_frame() {
        let table = table();
        let mut frame = encode(&table.require(0).unwrap(), 0, 1, 1, b"abc").unwrap();
        frame[2] = IncompatFlags::SIGNED;
        let crc = frame_checksum(&frame[1..HEADER_LEN], 50, b"abc");
        let crc_at = frame.len() - CHECKSUM_LEN;
        frame[crc_at..].copy_from_slice(&crc.to_le_bytes());
        frame.extend_from_slice(&[0xAA; SIGNATURE_LEN]);

        let msg = decode(&table, &frame).unwrap();
        assert_eq!(msg.signature(), Some(&[0xAA; SIGNATURE_LEN]));
        assert_eq!(msg.to_bytes().as_ref(), frame.as_slice());
    }

    #[test]
    fn test_decode_rejects_unknown_incompat_bits() {
        let table = table();
        let mut frame = encode(&table.require(0).unwrap(), 0, 1, 1, b"abc").unwrap();
        frame[2] = 0x04;
        assert!(matches!(
            decode(&table, &frame),
            Err(Error::UnsupportedFlags { bits: 0x04 })
        ));
    }

    #[test]
    fn test_parse_first_skips_noise() {
        let table = table();
        let frame = encode(&table.require(0).unwrap(), 5, 1, 1, b"xyz").unwrap();
        let mut buf = vec![0x00, 0x13, MAGIC, 0x37];
        let noise = buf.len();
        buf.extend_from_slice(&frame);
        buf.extend_from_slice(&frame);

        let (msg, consumed) = parse_first(&table, &buf).unwrap();
        assert_eq!(msg.seq(), 5);
        assert_eq!(consumed, noise + frame.len());
        assert!(parse_first(&table, &buf[..noise]).is_none());
    }

    mod proptests {
        use super::*;
        use crate::protocol::MAX_MESSAGE_ID;
        use proptest::prelude::*;

        fn info_strategy() -> impl Strategy<Value = MessageInfo> {
            (0u32..=MAX_MESSAGE_ID, any::<u8>(), any::<u8>())
                .prop_map(|(msgid, crc_extra, max_len)| MessageInfo::new(msgid, crc_extra, max_len))
        }

        fn frame_strategy() -> impl Strategy<Value = (MessageInfo, Vec<u8>)> {
            info_strategy().prop_flat_map(|info| {
                let payload = prop::collection::vec(any::<u8>(), 0..=usize::from(info.max_len));
                (Just(info), payload)
            })
        }

        proptest! {
            /// Decoding an encoded frame gives back the payload zero-padded
            #[test]
            fn prop_roundtrip_restores_padded_payload(
                (info, payload) in frame_strategy(),
                seq in any::<u8>(),
                sysid in any::<u8>(),
                compid in any::<u8>(),
            ) {
                let encoded = encode(&info, seq, sysid, compid, &payload).unwrap();
                let decoded = decode(&[info][..], &encoded).unwrap();

                let mut expected = payload.clone();
                expected.resize(usize::from(info.max_len), 0);
                let got = decoded.padded_payload(usize::from(info.max_len));
                prop_assert_eq!(got.as_ref(), expected.as_slice());
                prop_assert_eq!(decoded.msgid(), info.msgid);
                prop_assert_eq!(decoded.seq(), seq);
                prop_assert_eq!(decoded.sysid(), sysid);
                prop_assert_eq!(decoded.compid(), compid);
            }

            /// The wire never carries a trailing zero payload byte
            #[test]
            fn prop_trailing_zeros_trimmed((info, payload) in frame_strategy()) {
                let encoded = encode(&info, 0, 1, 1, &payload).unwrap();
                let len = usize::from(encoded[1]);
                prop_assert_eq!(len, trimmed_len(&payload));
                prop_assert_eq!(encoded.len(), HEADER_LEN + len + CHECKSUM_LEN);
                if len > 0 {
                    prop_assert_ne!(encoded[HEADER_LEN + len - 1], 0);
                }
            }

            /// Any single flipped bit after the length byte is caught
            #[test]
            fn prop_single_bit_flip_detected(
                (info, payload) in frame_strategy(),
                offset in any::<prop::sample::Index>(),
                bit in 0u8..8,
            ) {
                let mut encoded = encode(&info, 0, 1, 1, &payload).unwrap();
                let at = 2 + offset.index(encoded.len() - 2);
                encoded[at] ^= 1 << bit;
                prop_assert!(decode(&[info][..], &encoded).is_err());
            }
        }
    }
}
