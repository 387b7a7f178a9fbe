//! Host-emulated nfcauth card
//!
//! The card answers a small custom APDU command set through which a reader
//! registers the user once and later authenticates them by challenge and
//! signature:
//!
//! - [`ApduProtocolEngine`]: maps command APDUs to response APDUs
//! - [`AuthGate`]: time-limited record of a local biometric confirmation
//! - [`PendingRegistrationStore`]: hand-off slot between the user's
//!   registration consent and the reader collecting it
//! - [`ResponseChunker`]: serves large responses through GET RESPONSE
//! - [`SigningService`], [`Registry`] and [`UiNotifier`]: collaborators the
//!   engine is built over
//! - [`RegistrationConfirmation`] and [`BiometricConfirmation`]: the
//!   user-facing side of the handshakes
//! - [`VirtualCard`]: an in-process transport to the engine
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod auth_gate;
pub mod chunker;
pub mod clock;
pub mod config;
pub mod confirmation;
pub mod constants;
pub mod engine;
pub mod messages;
pub mod pending;
pub mod registry;
pub mod signer;
pub mod ui;
pub mod virtual_card;

mod error;
pub use error::{Error, Result};

pub use auth_gate::{AuthGate, AuthState};
pub use chunker::ResponseChunker;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CardConfig, ConfirmationConfig};
pub use confirmation::{BiometricConfirmation, ConfirmationOutcome, RegistrationConfirmation};
pub use engine::ApduProtocolEngine;
pub use messages::{AuthMode, AuthenticationRequest, AuthenticationResponse, RegistrationRequest};
pub use pending::{
    FilePendingStore, MemoryPendingStore, PendingRegistration, PendingRegistrationStore,
};
pub use registry::{JsonFileRegistry, MemoryRegistry, Reader, Registry};
pub use signer::{SigningService, SoftwareSigner};
pub use ui::{ChannelNotifier, NoopNotifier, UiEvent, UiNotifier};
pub use virtual_card::VirtualCard;
