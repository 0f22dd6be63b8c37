//! CRC-16/MCRF4XX accumulator shared by the parser and the framer.
//!
//! Polynomial 0x8408 (reflected 0x1021), initial value 0xFFFF, LSB-first,
//! no final XOR. The same accumulator also derives per-message checksum
//! seeds from message definitions, see [`crc_extra`].

/// Initial accumulator value.
pub const CRC_INIT: u16 = 0xFFFF;

/// Incremental CRC-16/MCRF4XX accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc16(u16);

impl Crc16 {
    /// Fresh accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self(CRC_INIT)
    }

    /// Fold one byte into the accumulator.
    #[inline]
    #[must_use]
    pub const fn accumulate(self, byte: u8) -> Self {
        let mut tmp = byte ^ (self.0 as u8);
        tmp ^= tmp << 4;
        let tmp = tmp as u16;
        Self((self.0 >> 8) ^ (tmp << 8) ^ (tmp << 3) ^ (tmp >> 4))
    }

    /// Fold one byte in place.
    #[inline]
    pub fn push(&mut self, byte: u8) {
        *self = self.accumulate(byte);
    }

    /// Fold a slice in place.
    pub fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.push(byte);
        }
    }

    /// Final 16-bit checksum value.
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot checksum over a byte slice.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u16 {
    let mut crc = Crc16::new();
    crc.update(bytes);
    crc.value()
}

/// Checksum of a frame body: header bytes after the magic, then the seed,
/// then the (trimmed) payload.
#[must_use]
pub fn frame_checksum(header_tail: &[u8], crc_extra: u8, payload: &[u8]) -> u16 {
    let mut crc = Crc16::new();
    crc.update(header_tail);
    crc.push(crc_extra);
    crc.update(payload);
    crc.value()
}

/// One field of a message definition, as seen by the seed derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef<'a> {
    /// Base type name, e.g. `uint8_t` (no array suffix).
    pub type_name: &'a str,
    /// Field name.
    pub name: &'a str,
    /// Element count for array fields.
    pub array_len: Option<u8>,
}

impl<'a> FieldDef<'a> {
    /// Scalar field.
    #[must_use]
    pub const fn scalar(type_name: &'a str, name: &'a str) -> Self {
        Self {
            type_name,
            name,
            array_len: None,
        }
    }

    /// Array field.
    #[must_use]
    pub const fn array(type_name: &'a str, name: &'a str, len: u8) -> Self {
        Self {
            type_name,
            name,
            array_len: Some(len),
        }
    }
}

/// Derive the checksum seed ("crc_extra") for a message definition.
///
/// `fields` must be the non-extension fields in wire order (sorted by
/// descending base type size). Extension fields never contribute.
#[must_use]
pub fn crc_extra(message_name: &str, fields: &[FieldDef<'_>]) -> u8 {
    let mut crc = Crc16::new();
    crc.update(message_name.as_bytes());
    crc.push(b' ');
    for field in fields {
        crc.update(field.type_name.as_bytes());
        crc.push(b' ');
        crc.update(field.name.as_bytes());
        crc.push(b' ');
        if let Some(len) = field.array_len {
            crc.push(len);
        }
    }
    let value = crc.value();
    (value & 0xFF) as u8 ^ (value >> 8) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        assert_eq!(checksum(b"123456789"), 0x6F91);
    }

    #[test]
    fn test_empty_input_is_init() {
        assert_eq!(checksum(&[]), CRC_INIT);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let data = b"mavframe incremental checksum";
        let mut crc = Crc16::new();
        for &b in data.iter() {
            crc = crc.accumulate(b);
        }
        assert_eq!(crc.value(), checksum(data));
    }

    #[test]
    fn test_frame_checksum_orders_seed_before_payload() {
        let header = [6, 0, 0, 0, 1, 1, 0, 0, 0];
        let payload = [1, 2, 3, 4, 5, 6];
        assert_eq!(frame_checksum(&header, 50, &payload), 0x12B1);

        let mut all = header.to_vec();
        all.push(50);
        all.extend_from_slice(&payload);
        assert_eq!(checksum(&all), 0x12B1);
    }

    #[test]
    fn test_crc_extra_known_messages() {
        let heartbeat = [
            FieldDef::scalar("uint32_t", "custom_mode"),
            FieldDef::scalar("uint8_t", "type"),
            FieldDef::scalar("uint8_t", "autopilot"),
            FieldDef::scalar("uint8_t", "base_mode"),
            FieldDef::scalar("uint8_t", "system_status"),
            FieldDef::scalar("uint8_t", "mavlink_version"),
        ];
        assert_eq!(crc_extra("HEARTBEAT", &heartbeat), 50);

        let system_time = [
            FieldDef::scalar("uint64_t", "time_unix_usec"),
            FieldDef::scalar("uint32_t", "time_boot_ms"),
        ];
        assert_eq!(crc_extra("SYSTEM_TIME", &system_time), 137);

        let statustext = [
            FieldDef::scalar("uint8_t", "severity"),
            FieldDef::array("char", "text", 50),
        ];
        assert_eq!(crc_extra("STATUSTEXT", &statustext), 83);
    }
}
