//! Users this reader has registered.

use std::{
    collections::BTreeMap,
    fs, io,
    path::Path,
};

use nfcauth_card::PendingRegistration;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result, verification::decode_public_key};

/// A user enrolled through a delivered registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    /// Identity the card presents to this reader
    pub user_id: String,
    /// Display name chosen on the card
    pub user_name: String,
    /// Base64 DER public key of the card
    pub public_key: String,
}

/// Enrolled users keyed by user id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Enrollments {
    users: BTreeMap<String, Enrollment>,
}

impl Enrollments {
    /// No enrolled users
    pub fn new() -> Self {
        Self::default()
    }

    /// Enroll the user of a delivered registration
    ///
    /// The public key must decode; an existing enrollment for the same user
    /// is replaced.
    pub fn enroll(&mut self, registration: &PendingRegistration) -> Result<Enrollment> {
        if !registration.is_complete() {
            return Err(Error::IncompleteRegistration(registration.reader_id.clone()));
        }
        decode_public_key(&registration.public_key)?;

        let enrollment = Enrollment {
            user_id: registration.user_id.clone(),
            user_name: registration.user_name.clone(),
            public_key: registration.public_key.clone(),
        };
        self.users
            .insert(enrollment.user_id.clone(), enrollment.clone());
        debug!(user_id = %enrollment.user_id, "Enrolled user");
        Ok(enrollment)
    }

    /// Look up a user
    pub fn get(&self, user_id: &str) -> Option<&Enrollment> {
        self.users.get(user_id)
    }

    /// Forget a user
    pub fn remove(&mut self, user_id: &str) -> Option<Enrollment> {
        self.users.remove(user_id)
    }

    /// Enrolled users, ordered by id
    pub fn iter(&self) -> impl Iterator<Item = &Enrollment> {
        self.users.values()
    }

    /// Number of enrolled users
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether nobody is enrolled
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Read enrollments from a JSON file, empty if it does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        match fs::read(path.as_ref()) {
            Ok(contents) => Ok(serde_json::from_slice(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write enrollments to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path.as_ref(), serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}
