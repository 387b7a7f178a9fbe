//! APDU command definitions
//!
//! This module provides the generic short-APDU command used on both sides of
//! the nfcauth protocol.

use bytes::{BufMut, Bytes, BytesMut};

use crate::Error;

/// Length of the CLA/INS/P1/P2 header
pub const HEADER_LEN: usize = 4;

/// Maximum data length of a short APDU
pub const MAX_SHORT_DATA: usize = 255;

/// Generic APDU command structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data (optional)
    pub data: Option<Bytes>,
    /// Expected length (optional, 0 meaning 256)
    pub le: Option<u8>,
}

impl Command {
    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Create a new command from a 4-byte header
    pub const fn from_header(header: [u8; HEADER_LEN]) -> Self {
        Self::new(header[0], header[1], header[2], header[3])
    }

    /// Create a new command with expected response length (Le)
    pub const fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: Some(le),
        }
    }

    /// Create a new command with data payload
    ///
    /// Fails when the payload does not fit in a short APDU.
    pub fn new_with_data<T: Into<Bytes>>(
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: T,
    ) -> Result<Self, Error> {
        Self::new(cla, ins, p1, p2).with_data(data)
    }

    /// Set the data field
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Result<Self, Error> {
        let data = data.into();
        if data.len() > MAX_SHORT_DATA {
            return Err(Error::DataTooLong(data.len()));
        }
        self.data = Some(data);
        Ok(self)
    }

    /// Set the expected length field
    pub const fn with_le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    /// Command class (CLA)
    pub const fn class(&self) -> u8 {
        self.cla
    }

    /// Instruction code (INS)
    pub const fn instruction(&self) -> u8 {
        self.ins
    }

    /// First parameter (P1)
    pub const fn p1(&self) -> u8 {
        self.p1
    }

    /// Second parameter (P2)
    pub const fn p2(&self) -> u8 {
        self.p2
    }

    /// The CLA/INS/P1/P2 header
    pub const fn header(&self) -> [u8; HEADER_LEN] {
        [self.cla, self.ins, self.p1, self.p2]
    }

    /// Command payload data (optional)
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Calculate length of serialized command
    pub fn command_length(&self) -> usize {
        HEADER_LEN + self.data().map_or(0, |d| 1 + d.len()) + usize::from(self.le.is_some())
    }

    /// Convert to raw APDU bytes
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(self.command_length());

        buffer.put_slice(&self.header());

        // Lc is guaranteed to fit by `with_data`
        if let Some(data) = self.data() {
            buffer.put_u8(data.len() as u8);
            buffer.put_slice(data);
        }

        if let Some(le) = self.le {
            buffer.put_u8(le);
        }

        buffer.freeze()
    }

    /// Parse a command from raw bytes
    ///
    /// A single byte after the header is read as Le. Otherwise it is read as
    /// Lc, followed by exactly Lc data bytes and an optional Le.
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() < HEADER_LEN {
            return Err(Error::InvalidCommandLength(data.len()));
        }

        let mut command = Self::new(data[0], data[1], data[2], data[3]);

        match data.len() {
            HEADER_LEN => {}
            5 => command.le = Some(data[4]),
            len => {
                let lc = data[4] as usize;
                let end = 5 + lc;
                if len < end || len > end + 1 {
                    return Err(Error::InvalidCommandLength(len));
                }
                if lc > 0 {
                    command.data = Some(Bytes::copy_from_slice(&data[5..end]));
                }
                if len == end + 1 {
                    command.le = Some(data[end]);
                }
            }
        }

        Ok(command)
    }
}

impl From<Command> for Bytes {
    fn from(command: Command) -> Self {
        command.to_bytes()
    }
}
