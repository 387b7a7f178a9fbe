//! Reader-side client for nfcauth cards
//!
//! A reader registers a user once, receiving the card's public key for that
//! user, and later authenticates them by sending a fresh challenge and
//! verifying the returned signature.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod config;
pub mod enrollments;
pub mod verification;

mod error;
pub use error::{Error, Result};

pub use client::{AuthOutcome, ReaderClient};
pub use config::ReaderConfig;
pub use enrollments::{Enrollment, Enrollments};
