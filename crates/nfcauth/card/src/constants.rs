use std::time::Duration;

/// Application identifier answered by SELECT
pub const NFCAUTH_AID: &[u8] = b"\xF0\x64\x65\x2E\x69\x6E\x66\x6F\x72\x6E\x61\x75\x74\x69\x6B";

/// The only protocol version understood in REGISTER and AUTHENTICATE bodies
pub const PROTOCOL_VERSION: i64 = 1;

/// How long a local biometric confirmation stays valid
pub const AUTH_TTL: Duration = Duration::from_secs(5 * 60);

/// Command headers (CLA INS P1 P2)
pub mod headers {
    /// SELECT by AID
    pub const SELECT: [u8; 4] = [0x00, 0xA4, 0x04, 0x00];
    /// Start or poll a registration
    pub const REGISTER: [u8; 4] = [0xD0, 0x01, 0x00, 0x00];
    /// Commit a delivered registration
    pub const REGISTER_COMPLETE: [u8; 4] = [0xD0, 0x01, 0x00, 0x01];
    /// Sign an authentication challenge
    pub const AUTHENTICATE: [u8; 4] = [0xD0, 0x02, 0x00, 0x00];
    /// Fetch the next chunk of a staged response
    pub const GET_RESPONSE: [u8; 4] = [0x00, 0xC0, 0x00, 0x00];
    /// Tell the user the reader does not know them
    pub const NOT_REGISTERED: [u8; 4] = [0xD0, 0x03, 0x00, 0x00];
}
