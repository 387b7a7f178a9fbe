//! Core types for APDU (Application Protocol Data Unit) exchanges
//!
//! This crate provides the wire-level building blocks shared by the emulated
//! nfcauth card and the readers that interrogate it:
//!
//! - Creating, serializing and parsing APDU commands
//! - Parsing and building APDU responses with their status words
//! - The status word vocabulary of the nfcauth protocol
//! - A transport abstraction and an executor that follows `61 XX` chains
//!   with GET RESPONSE commands
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

pub mod command;
pub mod executor;
pub mod response;
pub mod transport;

mod error;
pub use error::{Error, Result, ResultExt};

pub use command::Command;
pub use executor::{CardExecutor, Executor};
pub use response::Response;
pub use response::status::{StatusWord, common as status};
pub use transport::{CardTransport, TransportError};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        Bytes, BytesMut, CardExecutor, CardTransport, Command, Error, Executor, Response, Result,
        StatusWord, TransportError, status,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports() {
        let cmd = Command::new(0xD0, 0x01, 0x00, 0x01);
        assert_eq!(cmd.class(), 0xD0);
        assert_eq!(cmd.instruction(), 0x01);
        assert_eq!(cmd.p1(), 0x00);
        assert_eq!(cmd.p2(), 0x01);

        let resp = Response::success(Some(Bytes::from_static(&[0x01, 0x02, 0x03])));
        assert!(resp.is_success());
        assert_eq!(resp.payload().as_deref(), Some(&[0x01, 0x02, 0x03][..]));
        assert_eq!(resp.status(), status::SUCCESS);
    }
}
