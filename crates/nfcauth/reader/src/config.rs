//! Configuration options for a reader

use figment::{Figment, providers::Serialized};
use nfcauth_card::{AuthMode, constants::PROTOCOL_VERSION};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Configuration options for a reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Identifier the reader registers under
    pub reader_id: String,
    /// Display name shown to the user
    pub reader_name: String,
    /// Protocol version sent in requests
    pub protocol_version: i64,
    /// Authentication mode requested by default
    pub auth: AuthMode,
    /// Random bytes in each challenge nonce
    pub nonce_length: usize,
    /// Bound on GET RESPONSE round trips per command
    pub max_chain: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            reader_id: "reader-1".to_string(),
            reader_name: "nfcauth reader".to_string(),
            protocol_version: PROTOCOL_VERSION,
            auth: AuthMode::Background,
            nonce_length: 16,
            max_chain: 32,
        }
    }
}

impl ReaderConfig {
    /// Table holding these options in a configuration file
    pub const KEY: &'static str = "reader";

    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract the `[reader]` table from `figment`, over the defaults
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        Ok(Figment::from(Serialized::default(Self::KEY, Self::default()))
            .merge(figment.clone())
            .extract_inner(Self::KEY)?)
    }

    /// Set the reader identity
    pub fn with_reader(mut self, reader_id: impl Into<String>, reader_name: impl Into<String>) -> Self {
        self.reader_id = reader_id.into();
        self.reader_name = reader_name.into();
        self
    }

    /// Set the default authentication mode
    pub const fn with_auth(mut self, auth: AuthMode) -> Self {
        self.auth = auth;
        self
    }

    /// Set the nonce length in bytes
    pub const fn with_nonce_length(mut self, nonce_length: usize) -> Self {
        self.nonce_length = nonce_length;
        self
    }

    /// Set the GET RESPONSE chain bound
    pub const fn with_max_chain(mut self, max_chain: usize) -> Self {
        self.max_chain = max_chain;
        self
    }
}

#[cfg(test)]
mod tests {
    use figment::{
        Jail,
        providers::{Env, Format, Toml},
    };

    use super::*;

    #[test]
    fn test_layers() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "nfcauth.toml",
                r#"
                [reader]
                reader_id = "gate-3"
                auth = "biometric"
                "#,
            )?;
            jail.set_env("NFCAUTH_READER__NONCE_LENGTH", "32");

            let figment = Figment::new()
                .merge(Toml::file("nfcauth.toml"))
                .merge(Env::prefixed("NFCAUTH_").split("__"));
            let config = ReaderConfig::from_figment(&figment).unwrap();

            assert_eq!(config.reader_id, "gate-3");
            assert_eq!(config.reader_name, "nfcauth reader");
            assert_eq!(config.auth, AuthMode::Biometric);
            assert_eq!(config.nonce_length, 32);
            assert_eq!(config.max_chain, 32);
            assert_eq!(config.protocol_version, 1);
            Ok(())
        });
    }
}
