//! Status word definitions for APDU responses

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

    /// The two trailer bytes
    pub const fn to_bytes(&self) -> [u8; 2] {
        [self.sw1, self.sw2]
    }

    /// `61 XX` announcing `remaining` bytes still to be fetched.
    ///
    /// Counts that do not fit in one byte (256 and above) are announced with
    /// the `61 00` sentinel.
    pub const fn more_data(remaining: usize) -> Self {
        if remaining > 0xFF {
            Self::new(0x61, 0x00)
        } else {
            Self::new(0x61, remaining as u8)
        }
    }

    /// Check if this status word indicates success (90 00)
    pub const fn is_success(&self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }

    /// Check if this status word indicates more data is available (61 XX)
    pub const fn is_more_data_available(&self) -> bool {
        self.sw1 == 0x61
    }

    /// Get the number of remaining bytes when SW1 = 61 (0 meaning 256 or more)
    pub const fn remaining_bytes(&self) -> Option<u8> {
        if self.sw1 == 0x61 {
            Some(self.sw2)
        } else {
            None
        }
    }

    /// Get the appropriate tracing level for this status word
    pub const fn tracing_level(&self) -> Level {
        match (self.sw1, self.sw2) {
            (0x90, 0x00) | (0x61, _) => Level::DEBUG,
            // Expected outcomes a reader retries on
            (0x63, 0x00) | (0x69, 0x83) => Level::INFO,
            _ => Level::WARN,
        }
    }

    /// Get a description of this status word
    pub const fn description(&self) -> &'static str {
        match (self.sw1, self.sw2) {
            (0x90, 0x00) => "Success",
            (0x61, 0x00) => "More data available (256 bytes or more)",
            (0x61, _) => "More data available",
            (0x00, 0x00) => "Unknown command",
            (0x63, 0x00) => "Biometric confirmation required",
            (0x67, 0x00) => "Generic error",
            (0x69, 0x83) => "Unauthorized",
            (0x6A, 0x82) => "File not found",
            (0x6F, 0x00) => "Processing error",
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

impl From<StatusWord> for u16 {
    fn from(status: StatusWord) -> Self {
        status.to_u16()
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X} {:02X}", self.sw1, self.sw2)
    }
}

/// Status words of the nfcauth protocol
pub mod common {
    use super::StatusWord;

    /// Success (90 00)
    pub const SUCCESS: StatusWord = StatusWord::new(0x90, 0x00);

    /// Unknown or semantically invalid command (00 00)
    pub const UNKNOWN_COMMAND: StatusWord = StatusWord::new(0x00, 0x00);

    /// Internal fault while processing (6F 00)
    pub const PROCESSING_ERROR: StatusWord = StatusWord::new(0x6F, 0x00);

    /// Generic error, e.g. nothing to complete (67 00)
    pub const GENERIC_ERROR: StatusWord = StatusWord::new(0x67, 0x00);

    /// A local biometric confirmation must happen before retrying (63 00)
    pub const BIOMETRIC_REQUIRED: StatusWord = StatusWord::new(0x63, 0x00);

    /// The reader is not registered with this card (69 83)
    pub const UNAUTHORIZED: StatusWord = StatusWord::new(0x69, 0x83);

    /// Application identifier not found (6A 82)
    pub const FILE_NOT_FOUND: StatusWord = StatusWord::new(0x6A, 0x82);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_word_from_to_u16() {
        let sw = StatusWord::from_u16(0x6983);
        assert_eq!(sw, common::UNAUTHORIZED);
        assert_eq!(sw.to_u16(), 0x6983);
        assert_eq!(sw.to_bytes(), [0x69, 0x83]);
    }

    #[test]
    fn test_more_data() {
        assert_eq!(StatusWord::more_data(1), StatusWord::new(0x61, 0x01));
        assert_eq!(StatusWord::more_data(255), StatusWord::new(0x61, 0xFF));
        assert_eq!(StatusWord::more_data(256), StatusWord::new(0x61, 0x00));
        assert_eq!(StatusWord::more_data(600), StatusWord::new(0x61, 0x00));
        assert_eq!(StatusWord::more_data(42).remaining_bytes(), Some(42));
        assert_eq!(common::SUCCESS.remaining_bytes(), None);
    }

    #[test]
    fn test_status_word_display() {
        assert_eq!(common::FILE_NOT_FOUND.to_string(), "6A 82");
        assert_eq!(common::UNKNOWN_COMMAND.description(), "Unknown command");
        assert_eq!(common::PROCESSING_ERROR.tracing_level(), Level::WARN);
        assert_eq!(common::SUCCESS.tracing_level(), Level::DEBUG);
    }
}
