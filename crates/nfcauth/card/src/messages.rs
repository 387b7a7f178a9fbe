//! JSON bodies exchanged in REGISTER and AUTHENTICATE.
//!
//! Request fields are optional at the serde level so that a missing field is
//! a validation failure rather than a parse failure. Scalar fields are read
//! leniently: a number where a string is expected is taken as its text, and a
//! version that is not an integer reads as absent. Only a body that is not a
//! JSON object fails to parse.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::constants::PROTOCOL_VERSION;

/// Authentication mode requested by the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Sign without asking the user
    Background,
    /// Sign only after a recent local confirmation
    Biometric,
}

impl AuthMode {
    /// Parse the wire name
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "background" => Some(Self::Background),
            "biometric" => Some(Self::Biometric),
            _ => None,
        }
    }

    /// Wire name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Biometric => "biometric",
        }
    }
}

/// REGISTER body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Reader asking to register
    #[serde(default, deserialize_with = "lenient_string")]
    pub reader_id: Option<String>,
    /// Its display name
    #[serde(default, deserialize_with = "lenient_string")]
    pub reader_name: Option<String>,
    /// Protocol version
    #[serde(default, deserialize_with = "lenient_version")]
    pub version: Option<i64>,
}

impl RegistrationRequest {
    /// Request for the supported protocol version
    pub fn new(reader_id: impl Into<String>, reader_name: impl Into<String>) -> Self {
        Self {
            reader_id: Some(reader_id.into()),
            reader_name: Some(reader_name.into()),
            version: Some(PROTOCOL_VERSION),
        }
    }

    /// `(reader_id, reader_name)` when both are present and non-blank and
    /// the version is supported
    pub fn validated(&self) -> Option<(&str, &str)> {
        supported(self.version)?;
        Some((non_blank(&self.reader_id)?, non_blank(&self.reader_name)?))
    }
}

/// AUTHENTICATE body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationRequest {
    /// Reader asking for a signature
    #[serde(default, deserialize_with = "lenient_string")]
    pub reader_id: Option<String>,
    /// Reader-chosen challenge
    #[serde(default, deserialize_with = "lenient_string")]
    pub nonce: Option<String>,
    /// `background` or `biometric`
    #[serde(default, deserialize_with = "lenient_string")]
    pub auth: Option<String>,
    /// Protocol version
    #[serde(default, deserialize_with = "lenient_version")]
    pub version: Option<i64>,
}

/// An [`AuthenticationRequest`] that passed field validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidAuthentication<'a> {
    /// Reader asking for a signature
    pub reader_id: &'a str,
    /// Reader-chosen challenge
    pub nonce: &'a str,
    /// Raw `auth` value, not yet checked against [`AuthMode`]
    pub auth: &'a str,
}

impl AuthenticationRequest {
    /// Request for the supported protocol version
    pub fn new(reader_id: impl Into<String>, nonce: impl Into<String>, auth: AuthMode) -> Self {
        Self {
            reader_id: Some(reader_id.into()),
            nonce: Some(nonce.into()),
            auth: Some(auth.as_str().to_string()),
            version: Some(PROTOCOL_VERSION),
        }
    }

    /// The fields when all are present and non-blank and the version is
    /// supported
    ///
    /// The auth mode itself is checked later, after the reader lookup.
    pub fn validated(&self) -> Option<ValidAuthentication<'_>> {
        supported(self.version)?;
        Some(ValidAuthentication {
            reader_id: non_blank(&self.reader_id)?,
            nonce: non_blank(&self.nonce)?,
            auth: non_blank(&self.auth)?,
        })
    }
}

/// AUTHENTICATE answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationResponse {
    /// Identity the card presents to this reader
    pub user_id: String,
    /// Base64 DER signature over the request body followed by `user_id`
    pub signature: String,
}

/// Any non-null JSON value as text; strings are taken verbatim
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(value) => Some(value),
        other => Some(other.to_string()),
    })
}

/// Integer versions only; `"1"`, `1.5` or `[1]` read as absent
fn lenient_version<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_i64())
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.trim().is_empty())
}

fn supported(version: Option<i64>) -> Option<()> {
    (version == Some(PROTOCOL_VERSION)).then_some(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_validation() {
        let ok: RegistrationRequest =
            serde_json::from_str(r#"{"reader_id":"r1","reader_name":"Door","version":1}"#).unwrap();
        assert_eq!(ok.validated(), Some(("r1", "Door")));

        for body in [
            r#"{"reader_id":"r1","reader_name":"Door"}"#,
            r#"{"reader_id":"r1","reader_name":"Door","version":2}"#,
            r#"{"reader_id":" ","reader_name":"Door","version":1}"#,
            r#"{"reader_name":"Door","version":1}"#,
        ] {
            let req: RegistrationRequest = serde_json::from_str(body).unwrap();
            assert_eq!(req.validated(), None, "{body}");
        }
    }

    #[test]
    fn test_authentication_validation() {
        let req: AuthenticationRequest = serde_json::from_str(
            r#"{"reader_id":"r1","nonce":"abc","auth":"background","version":1}"#,
        )
        .unwrap();
        let valid = req.validated().unwrap();
        assert_eq!(valid.reader_id, "r1");
        assert_eq!(AuthMode::from_wire(valid.auth), Some(AuthMode::Background));

        let blank_nonce: AuthenticationRequest = serde_json::from_str(
            r#"{"reader_id":"r1","nonce":"","auth":"background","version":1}"#,
        )
        .unwrap();
        assert!(blank_nonce.validated().is_none());

        // Unknown modes pass field validation and are rejected later
        let odd: AuthenticationRequest = serde_json::from_str(
            r#"{"reader_id":"r1","nonce":"n","auth":"pin","version":1}"#,
        )
        .unwrap();
        assert_eq!(AuthMode::from_wire(odd.validated().unwrap().auth), None);
    }

    #[test]
    fn test_mistyped_fields_parse_and_fail_validation() {
        for body in [
            r#"{"reader_id":"r1","reader_name":"Door","version":"x"}"#,
            r#"{"reader_id":"r1","reader_name":"Door","version":"1"}"#,
            r#"{"reader_id":"r1","reader_name":"Door","version":2.5}"#,
            r#"{"reader_id":"r1","reader_name":"Door","version":[1]}"#,
            r#"{"reader_id":"r1","reader_name":null,"version":1}"#,
        ] {
            let req: RegistrationRequest = serde_json::from_str(body).unwrap();
            assert_eq!(req.validated(), None, "{body}");
        }

        // Scalars are taken as their text
        let numeric: AuthenticationRequest = serde_json::from_str(
            r#"{"reader_id":5,"nonce":42,"auth":"background","version":1}"#,
        )
        .unwrap();
        let valid = numeric.validated().unwrap();
        assert_eq!(valid.reader_id, "5");
        assert_eq!(valid.nonce, "42");

        // Not an object at all
        assert!(serde_json::from_str::<RegistrationRequest>(r#""r1""#).is_err());
    }

    #[test]
    fn test_constructors_emit_wire_names() {
        let json = serde_json::to_value(AuthenticationRequest::new("r1", "n", AuthMode::Biometric))
            .unwrap();
        assert_eq!(json["auth"], "biometric");
        assert_eq!(json["version"], 1);
    }
}
