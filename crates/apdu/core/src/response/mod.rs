//! APDU response definitions
//!
//! This module provides the response type exchanged between card and reader:
//! an optional payload followed by a two byte status word.

pub mod status;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::Error;
use status::StatusWord;

/// Basic APDU response structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response payload data
    payload: Option<Bytes>,
    /// Status word
    status: StatusWord,
}

impl Response {
    /// Create a new response with payload and status
    pub fn new(payload: Option<Bytes>, status: impl Into<StatusWord>) -> Self {
        Self {
            payload: payload.filter(|p| !p.is_empty()),
            status: status.into(),
        }
    }

    /// Create a success response
    pub fn success(payload: Option<Bytes>) -> Self {
        Self::new(payload, status::common::SUCCESS)
    }

    /// Create a payload-less response carrying only a status word
    pub fn status_only(status: impl Into<StatusWord>) -> Self {
        Self {
            payload: None,
            status: status.into(),
        }
    }

    /// Parse response from raw bytes (including status word)
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        let len = data.len();
        if len < 2 {
            return Err(Error::IncompleteResponse(len));
        }

        let status = StatusWord::new(data[len - 2], data[len - 1]);
        let payload = (len > 2).then(|| Bytes::copy_from_slice(&data[..len - 2]));

        trace!(
            sw1 = format_args!("{:#04x}", status.sw1),
            sw2 = format_args!("{:#04x}", status.sw2),
            payload_len = payload.as_ref().map_or(0, |p| p.len()),
            "Parsed APDU response"
        );

        Ok(Self { payload, status })
    }

    /// Get the response payload data
    pub const fn payload(&self) -> &Option<Bytes> {
        &self.payload
    }

    /// Payload length, zero when absent
    pub fn payload_len(&self) -> usize {
        self.payload.as_ref().map_or(0, Bytes::len)
    }

    /// Get the status word
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Check if the response indicates success
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Check if the card announced more data (61 XX)
    pub const fn more_data_available(&self) -> bool {
        self.status.is_more_data_available()
    }

    /// Number of bytes announced by a 61 XX status (0 meaning 256 or more)
    pub const fn bytes_available(&self) -> Option<u8> {
        self.status.remaining_bytes()
    }

    /// Append a chunk fetched by a follow-up command and adopt its status
    pub(crate) fn append(&mut self, next: Self) {
        if let Some(next_data) = next.payload {
            let mut buffer = BytesMut::with_capacity(self.payload_len() + next_data.len());
            if let Some(existing) = self.payload.take() {
                buffer.extend_from_slice(&existing);
            }
            buffer.extend_from_slice(&next_data);
            self.payload = Some(buffer.freeze());
        }
        self.status = next.status;
    }

    /// Serialize to raw bytes (payload followed by SW1 SW2)
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.payload_len() + 2);
        if let Some(payload) = &self.payload {
            buf.put_slice(payload);
        }
        buf.put_u8(self.status.sw1);
        buf.put_u8(self.status.sw2);
        buf.freeze()
    }
}

impl TryFrom<&[u8]> for Response {
    type Error = Error;

    fn try_from(data: &[u8]) -> Result<Self, Error> {
        Self::from_bytes(data)
    }
}

impl From<Response> for Bytes {
    fn from(response: Response) -> Self {
        response.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use status::common;

    #[test]
    fn test_response_from_bytes() {
        let resp = Response::from_bytes(&[0x01, 0x02, 0x03, 0x90, 0x00]).unwrap();
        assert_eq!(resp.payload().as_deref(), Some(&[0x01, 0x02, 0x03][..]));
        assert!(resp.is_success());

        let resp = Response::from_bytes(&[0x61, 0x10]).unwrap();
        assert!(resp.payload().is_none());
        assert_eq!(resp.bytes_available(), Some(0x10));

        assert!(matches!(
            Response::from_bytes(&[0x01]),
            Err(Error::IncompleteResponse(1))
        ));
    }

    #[test]
    fn test_response_to_bytes() {
        let resp = Response::new(Some(Bytes::from_static(b"ok")), common::SUCCESS);
        assert_eq!(resp.to_bytes().as_ref(), b"ok\x90\x00");

        let resp = Response::status_only(common::UNAUTHORIZED);
        assert_eq!(Bytes::from(resp).as_ref(), &[0x69, 0x83]);

        // An empty payload is the same as no payload on the wire
        let resp = Response::success(Some(Bytes::new()));
        assert!(resp.payload().is_none());
    }

    #[test]
    fn test_append_chunks() {
        let mut resp = Response::new(Some(Bytes::from_static(b"ab")), StatusWord::more_data(2));
        resp.append(Response::success(Some(Bytes::from_static(b"cd"))));
        assert_eq!(resp.payload().as_deref(), Some(&b"abcd"[..]));
        assert!(resp.is_success());
    }
}
