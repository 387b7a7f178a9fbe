//! Staging of response payloads too large for a single exchange.
//!
//! A producing command loads its payload and answers `61 XX`; the reader then
//! drains it with GET RESPONSE. Only one payload is staged at a time.

use bytes::Bytes;
use nfcauth_apdu_core::{Response, StatusWord, status};
use tracing::trace;

/// GET RESPONSE length byte `00` asks for this many bytes
const MAX_CHUNK: usize = 256;

/// Single-slot response staging with a read cursor
#[derive(Debug, Default)]
pub struct ResponseChunker {
    pending: Option<Staged>,
}

#[derive(Debug)]
struct Staged {
    bytes: Bytes,
    offset: usize,
}

impl Staged {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }
}

impl ResponseChunker {
    /// Create an empty chunker
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `bytes`, discarding whatever was staged before
    ///
    /// Returns the status the producing command answers with: `90 00` for an
    /// empty payload, otherwise `61 XX` announcing its length.
    pub fn load(&mut self, bytes: impl Into<Bytes>) -> StatusWord {
        let bytes = bytes.into();
        let len = bytes.len();
        if self.pending.is_some() {
            trace!("Discarding previously staged response");
        }
        self.pending = Some(Staged { bytes, offset: 0 });
        trace!(len, "Staged response");

        if len == 0 {
            status::SUCCESS
        } else {
            StatusWord::more_data(len)
        }
    }

    /// Serve the next chunk of the staged payload
    ///
    /// `requested` is the GET RESPONSE length byte, `0` meaning 256. Returns
    /// `None` when nothing has been staged since the last [`clear`](Self::clear).
    pub fn retrieve(&mut self, requested: u8) -> Option<Response> {
        let staged = self.pending.as_mut()?;
        let requested = if requested == 0 {
            MAX_CHUNK
        } else {
            requested as usize
        };

        let actual = requested.min(staged.remaining());
        let chunk = staged.bytes.slice(staged.offset..staged.offset + actual);
        staged.offset += actual;

        let remaining = staged.remaining();
        let status = if remaining == 0 {
            status::SUCCESS
        } else {
            StatusWord::more_data(remaining)
        };
        trace!(served = actual, remaining, "Served response chunk");

        Some(Response::new(Some(chunk), status))
    }

    /// Whether a payload is staged, drained or not
    pub fn is_loaded(&self) -> bool {
        self.pending.is_some()
    }

    /// Bytes not yet served
    pub fn remaining(&self) -> usize {
        self.pending.as_ref().map_or(0, Staged::remaining)
    }

    /// Drop the staged payload and cursor
    pub fn clear(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(n: usize) -> Vec<u8> {
        (0..n).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_load_status() {
        let mut chunker = ResponseChunker::new();
        assert_eq!(chunker.load(Bytes::new()), status::SUCCESS);
        assert_eq!(chunker.load(payload(1)), StatusWord::new(0x61, 0x01));
        assert_eq!(chunker.load(payload(255)), StatusWord::new(0x61, 0xFF));
        assert_eq!(chunker.load(payload(256)), StatusWord::new(0x61, 0x00));
        assert_eq!(chunker.load(payload(600)), StatusWord::new(0x61, 0x00));
    }

    #[test]
    fn test_retrieve_without_load() {
        let mut chunker = ResponseChunker::new();
        assert!(chunker.retrieve(0).is_none());
    }

    #[test]
    fn test_zero_requests_256() {
        let mut chunker = ResponseChunker::new();
        chunker.load(payload(600));

        let first = chunker.retrieve(0).unwrap();
        assert_eq!(first.payload_len(), 256);
        // 344 remaining does not fit a byte
        assert_eq!(first.status(), StatusWord::new(0x61, 0x00));

        let second = chunker.retrieve(0).unwrap();
        assert_eq!(second.payload_len(), 256);
        assert_eq!(second.status(), StatusWord::new(0x61, 88));

        let last = chunker.retrieve(88).unwrap();
        assert_eq!(last.payload_len(), 88);
        assert_eq!(last.status(), status::SUCCESS);
    }

    #[test]
    fn test_exactly_256_remaining_uses_sentinel() {
        let mut chunker = ResponseChunker::new();
        chunker.load(payload(257));
        let first = chunker.retrieve(1).unwrap();
        assert_eq!(first.status(), StatusWord::new(0x61, 0x00));
        assert_eq!(chunker.remaining(), 256);
    }

    #[test]
    fn test_request_beyond_remaining() {
        let mut chunker = ResponseChunker::new();
        chunker.load(payload(10));
        let resp = chunker.retrieve(200).unwrap();
        assert_eq!(resp.payload().as_deref(), Some(&payload(10)[..]));
        assert_eq!(resp.status(), status::SUCCESS);

        // Drained: empty data and success
        let again = chunker.retrieve(5).unwrap();
        assert_eq!(again.payload_len(), 0);
        assert_eq!(again.status(), status::SUCCESS);
    }

    #[test]
    fn test_load_replaces_and_clear_empties() {
        let mut chunker = ResponseChunker::new();
        chunker.load(payload(300));
        chunker.retrieve(10).unwrap();

        chunker.load(vec![0xAA, 0xBB]);
        let resp = chunker.retrieve(0).unwrap();
        assert_eq!(resp.payload().as_deref(), Some(&[0xAA, 0xBB][..]));

        chunker.clear();
        assert!(!chunker.is_loaded());
        assert!(chunker.retrieve(0).is_none());
    }
}
