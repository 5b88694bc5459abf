//! Status word definitions for APDU responses
//!
//! Covers the ISO/IEC 7816-4 interindustry values plus the `9C xx` range the
//! CoolKey applet uses for its own errors.

use std::fmt;

use tracing::Level;

/// Status Word (SW1-SW2) from an APDU response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord {
    /// First status byte (SW1)
    pub sw1: u8,
    /// Second status byte (SW2)
    pub sw2: u8,
}

impl StatusWord {
    /// Create a new status word
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// Create from a u16 value (SW1 | SW2)
    pub const fn from_u16(status: u16) -> Self {
        Self {
            sw1: (status >> 8) as u8,
            sw2: status as u8,
        }
    }

    /// Convert to a u16 value (SW1 | SW2)
    pub const fn to_u16(&self) -> u16 {
        ((self.sw1 as u16) << 8) | (self.sw2 as u16)
    }

    /// Check if this status word indicates success (90 00)
    pub const fn is_success(&self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }

    /// Check if this status word indicates more data is available (61 XX)
    pub const fn is_more_data_available(&self) -> bool {
        self.sw1 == 0x61
    }

    /// Get the number of remaining bytes when SW1 = 61
    pub const fn remaining_bytes(&self) -> Option<u8> {
        if self.sw1 == 0x61 {
            Some(self.sw2)
        } else {
            None
        }
    }

    /// Check if this status word comes from the applet's own error range (9C XX)
    pub const fn is_applet_error(&self) -> bool {
        self.sw1 == 0x9C
    }

    /// Get the appropriate tracing level for this status word
    pub const fn tracing_level(&self) -> Level {
        if self.is_success() || self.is_more_data_available() {
            Level::DEBUG
        } else if self.sw1 == 0x62 || self.sw1 == 0x63 {
            // Warnings
            Level::INFO
        } else {
            Level::WARN
        }
    }

    /// Get a description of this status word
    pub const fn description(&self) -> &'static str {
        match (self.sw1, self.sw2) {
            (0x90, 0x00) => "Success",
            (0x61, _) => "More data available",
            (0x62, _) => "Warning, non-volatile memory unchanged",
            (0x63, n) if (n & 0xF0) == 0xC0 => "Verification failed, counter value",
            (0x67, 0x00) => "Wrong length",
            (0x69, 0x82) => "Security status not satisfied",
            (0x69, 0x86) => "Command not allowed",
            (0x6A, 0x82) => "File or application not found",
            (0x6A, 0x86) => "Incorrect parameters P1-P2",
            (0x6C, _) => "Wrong Le field",
            (0x6D, 0x00) => "Instruction code not supported or invalid",
            (0x6E, 0x00) => "Class not supported",
            (0x9C, 0x01) => "Out of memory on card",
            (0x9C, 0x02) => "Authentication failed",
            (0x9C, 0x03) => "Operation not allowed",
            (0x9C, 0x05) => "Unsupported feature",
            (0x9C, 0x06) => "Unauthorized",
            (0x9C, 0x07) => "Object not found",
            (0x9C, 0x08) => "Object already exists",
            (0x9C, 0x09) => "Incorrect algorithm",
            (0x9C, 0x0B) => "Signature invalid",
            (0x9C, 0x0C) => "Identity blocked",
            (0x9C, 0x0F) => "Invalid parameter",
            (0x9C, 0x10) => "Incorrect P1",
            (0x9C, 0x11) => "Incorrect P2",
            (0x9C, 0x12) => "Sequence end",
            (0x9C, 0xFF) => "Internal applet error",
            _ => "Unknown status word",
        }
    }
}

impl From<(u8, u8)> for StatusWord {
    fn from(tuple: (u8, u8)) -> Self {
        Self::new(tuple.0, tuple.1)
    }
}

impl From<u16> for StatusWord {
    fn from(status: u16) -> Self {
        Self::from_u16(status)
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X} {:02X}", self.sw1, self.sw2)
    }
}

/// Status words returned by the CoolKey applet
pub mod applet {
    use super::StatusWord;

    /// Card memory exhausted (9C 01)
    pub const NO_MEMORY_LEFT: StatusWord = StatusWord::new(0x9C, 0x01);
    /// PIN or key authentication failed (9C 02)
    pub const AUTH_FAILED: StatusWord = StatusWord::new(0x9C, 0x02);
    /// Operation not allowed in the current state (9C 03)
    pub const OPERATION_NOT_ALLOWED: StatusWord = StatusWord::new(0x9C, 0x03);
    /// Referenced object does not exist (9C 07)
    pub const OBJECT_NOT_FOUND: StatusWord = StatusWord::new(0x9C, 0x07);
    /// Identity locked after too many failures (9C 0C)
    pub const IDENTITY_BLOCKED: StatusWord = StatusWord::new(0x9C, 0x0C);
    /// Enumeration has no further entries (9C 12)
    pub const SEQUENCE_END: StatusWord = StatusWord::new(0x9C, 0x12);
}
