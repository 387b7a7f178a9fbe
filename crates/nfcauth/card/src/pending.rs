//! Single-slot hand-off of an in-flight registration.
//!
//! The registration confirmation flow writes the record once the user has
//! chosen a display name; the protocol engine serves it to the reader and
//! deletes it when the reader completes the registration.

use std::{
    fmt, fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Result;

/// Registration record delivered to the reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRegistration {
    /// Reader being registered
    pub reader_id: String,
    /// Reader display name
    pub reader_name: String,
    /// Identifier generated for the user on this reader
    pub user_id: String,
    /// Display name chosen by the user
    pub user_name: String,
    /// Card public key the reader will verify signatures with
    pub public_key: String,
}

impl PendingRegistration {
    /// Whether every identity field is non-blank
    pub fn is_complete(&self) -> bool {
        [
            &self.reader_id,
            &self.reader_name,
            &self.user_id,
            &self.user_name,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }
}

/// Durable single slot holding at most one [`PendingRegistration`]
pub trait PendingRegistrationStore: Send + Sync + fmt::Debug {
    /// The staged record, if any
    fn get(&self) -> Result<Option<PendingRegistration>>;

    /// Replace the slot content; `None` empties it
    fn set(&self, record: Option<PendingRegistration>) -> Result<()>;

    /// Whether a record is staged
    fn exists(&self) -> Result<bool> {
        Ok(self.get()?.is_some())
    }

    /// Empty the slot
    fn clear(&self) -> Result<()> {
        self.set(None)
    }
}

/// In-memory slot
#[derive(Debug, Default)]
pub struct MemoryPendingStore {
    slot: RwLock<Option<PendingRegistration>>,
}

impl MemoryPendingStore {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }
}

impl PendingRegistrationStore for MemoryPendingStore {
    fn get(&self) -> Result<Option<PendingRegistration>> {
        Ok(self.slot.read().clone())
    }

    fn set(&self, record: Option<PendingRegistration>) -> Result<()> {
        *self.slot.write() = record;
        Ok(())
    }

    fn exists(&self) -> Result<bool> {
        Ok(self.slot.read().is_some())
    }
}

/// Slot persisted as a JSON file; an absent file is an empty slot
///
/// Survives restarts of the process hosting the card, like the confirmation
/// screen it is shared with.
#[derive(Debug)]
pub struct FilePendingStore {
    path: PathBuf,
    // Serializes writers within this process
    lock: Mutex<()>,
}

impl FilePendingStore {
    /// Default file name inside a data directory
    pub const FILE_NAME: &'static str = "pending_registration.json";

    /// Store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store backed by the default file inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(Self::FILE_NAME))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PendingRegistrationStore for FilePendingStore {
    fn get(&self) -> Result<Option<PendingRegistration>> {
        let _guard = self.lock.lock();
        let contents = match fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&contents) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                // A torn or foreign file cannot be delivered; treat as absent
                warn!(path = %self.path.display(), error = %e, "Discarding unreadable pending registration");
                Ok(None)
            }
        }
    }

    fn set(&self, record: Option<PendingRegistration>) -> Result<()> {
        let _guard = self.lock.lock();
        match record {
            None => match fs::remove_file(&self.path) {
                Ok(()) => {
                    debug!(path = %self.path.display(), "Deleted pending registration");
                    Ok(())
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            },
            Some(record) => {
                let contents = serde_json::to_vec(&record)?;
                // Write-then-rename so readers never observe a partial record
                let tmp = self.path.with_extension("json.tmp");
                let mut file = fs::File::create(&tmp)?;
                file.write_all(&contents)?;
                file.sync_all()?;
                fs::rename(&tmp, &self.path)?;
                debug!(path = %self.path.display(), reader_id = %record.reader_id, "Saved pending registration");
                Ok(())
            }
        }
    }

    fn exists(&self) -> Result<bool> {
        let _guard = self.lock.lock();
        Ok(self.path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(reader_id: &str) -> PendingRegistration {
        PendingRegistration {
            reader_id: reader_id.to_string(),
            reader_name: "Front Door".to_string(),
            user_id: "5f0c7a9e-8d1b-4a43-9b55-0c1d2e3f4a5b".to_string(),
            user_name: "Alex".to_string(),
            public_key: "MFYwEAYHKoZIzj0CAQYFK4EEAAoDQgAE".to_string(),
        }
    }

    fn exercise(store: &dyn PendingRegistrationStore) {
        assert!(!store.exists().unwrap());
        assert_eq!(store.get().unwrap(), None);

        store.set(Some(record("r1"))).unwrap();
        assert!(store.exists().unwrap());
        assert_eq!(store.get().unwrap(), Some(record("r1")));

        // Single slot: a second record replaces the first
        store.set(Some(record("r2"))).unwrap();
        assert_eq!(store.get().unwrap().unwrap().reader_id, "r2");

        store.clear().unwrap();
        assert!(!store.exists().unwrap());
        // Clearing an empty slot is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryPendingStore::new());
    }

    #[test]
    fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePendingStore::in_dir(dir.path());
        exercise(&store);

        // An unreadable file is treated as an empty slot
        fs::write(store.path(), b"not json").unwrap();
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_is_complete() {
        let mut r = record("r1");
        assert!(r.is_complete());
        r.user_name = "  ".to_string();
        assert!(!r.is_complete());
    }
}
