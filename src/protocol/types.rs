//! Header flag bytes

use std::fmt;

/// Incompatibility flags (header byte 2).
///
/// A receiver that does not understand a set bit must drop the frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IncompatFlags(u8);

impl IncompatFlags {
    /// Frame carries a signature trailer
    pub const SIGNED: u8 = 1 << 0;

    /// Create empty flags
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Create from raw byte
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Convert to byte
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Set a flag
    #[must_use]
    pub const fn with(mut self, flag: u8) -> Self {
        self.0 |= flag;
        self
    }

    /// Check if flag is set
    #[must_use]
    pub const fn has(self, flag: u8) -> bool {
        (self.0 & flag) != 0
    }

    /// Check if the frame is signed
    #[must_use]
    pub const fn is_signed(self) -> bool {
        self.has(Self::SIGNED)
    }

    /// Bits this codec does not understand
    #[must_use]
    pub const fn unknown_bits(self) -> u8 {
        self.0 & !Self::SIGNED
    }
}

impl fmt::Display for IncompatFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return write!(f, "NONE");
        }
        let mut parts = Vec::new();
        if self.is_signed() {
            parts.push("SIGNED".to_string());
        }
        let unknown = self.unknown_bits();
        if unknown != 0 {
            parts.push(format!("{unknown:#04x}"));
        }
        write!(f, "{}", parts.join(" | "))
    }
}

/// Compatibility flags (header byte 3).
///
/// No bits are defined; receivers ignore whatever they do not understand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompatFlags(u8);

impl CompatFlags {
    /// Create empty flags
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Create from raw byte
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Convert to byte
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl fmt::Display for CompatFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incompat_flags() {
        let flags = IncompatFlags::new().with(IncompatFlags::SIGNED);
        assert!(flags.is_signed());
        assert_eq!(flags.bits(), 0x01);
        assert_eq!(flags.unknown_bits(), 0);
        assert_eq!(flags.to_string(), "SIGNED");
    }

    #[test]
    fn test_unknown_incompat_bits() {
        let flags = IncompatFlags::from_bits(0x81);
        assert!(flags.is_signed());
        assert_eq!(flags.unknown_bits(), 0x80);
        assert_eq!(flags.to_string(), "SIGNED | 0x80");
        assert_eq!(IncompatFlags::new().to_string(), "NONE");
    }
}
