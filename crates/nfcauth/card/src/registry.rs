//! Readers this card has completed a registration with.

use std::{
    collections::BTreeMap,
    fmt, fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Result;

/// A registered reader and the identity the card presents to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reader {
    /// Unique reader identifier
    pub reader_id: String,
    /// Reader display name
    pub reader_name: String,
    /// User identifier presented to this reader
    pub user_id: String,
    /// User display name presented to this reader
    pub user_name: String,
}

/// Keyed store of [`Reader`] records
pub trait Registry: Send + Sync + fmt::Debug {
    /// Look up a reader
    fn get(&self, reader_id: &str) -> Result<Option<Reader>>;

    /// Insert a reader, replacing any record with the same id
    fn put(&self, reader: Reader) -> Result<()>;

    /// Remove a reader, reporting whether it existed
    fn delete(&self, reader_id: &str) -> Result<bool>;

    /// All readers, ordered by id
    fn list(&self) -> Result<Vec<Reader>>;
}

/// In-memory registry
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    readers: RwLock<BTreeMap<String, Reader>>,
}

impl MemoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }
}

impl Registry for MemoryRegistry {
    fn get(&self, reader_id: &str) -> Result<Option<Reader>> {
        Ok(self.readers.read().get(reader_id).cloned())
    }

    fn put(&self, reader: Reader) -> Result<()> {
        self.readers
            .write()
            .insert(reader.reader_id.clone(), reader);
        Ok(())
    }

    fn delete(&self, reader_id: &str) -> Result<bool> {
        Ok(self.readers.write().remove(reader_id).is_some())
    }

    fn list(&self) -> Result<Vec<Reader>> {
        Ok(self.readers.read().values().cloned().collect())
    }
}

/// Registry kept as one JSON document on disk
///
/// The document is loaded once and rewritten in full after every mutation.
#[derive(Debug)]
pub struct JsonFileRegistry {
    path: PathBuf,
    readers: RwLock<BTreeMap<String, Reader>>,
}

impl JsonFileRegistry {
    /// Default file name inside a data directory
    pub const FILE_NAME: &'static str = "readers.json";

    /// Open the registry at `path`, starting empty if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let readers = match fs::read(&path) {
            Ok(contents) => {
                let list: Vec<Reader> = serde_json::from_slice(&contents)?;
                list.into_iter()
                    .map(|reader| (reader.reader_id.clone(), reader))
                    .collect()
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), count = readers.len(), "Opened reader registry");
        Ok(Self {
            path,
            readers: RwLock::new(readers),
        })
    }

    /// Open the default registry file inside `dir`
    pub fn open_in_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(dir.as_ref().join(Self::FILE_NAME))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, readers: &BTreeMap<String, Reader>) -> Result<()> {
        let list: Vec<&Reader> = readers.values().collect();
        let contents = serde_json::to_vec_pretty(&list)?;
        let tmp = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&contents)?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Registry for JsonFileRegistry {
    fn get(&self, reader_id: &str) -> Result<Option<Reader>> {
        Ok(self.readers.read().get(reader_id).cloned())
    }

    fn put(&self, reader: Reader) -> Result<()> {
        let mut readers = self.readers.write();
        let reader_id = reader.reader_id.clone();
        let previous = readers.insert(reader_id.clone(), reader);
        if let Err(e) = self.persist(&readers) {
            // Keep memory and disk in agreement
            match previous {
                Some(previous) => readers.insert(reader_id, previous),
                None => readers.remove(&reader_id),
            };
            return Err(e);
        }
        info!(reader_id = %reader_id, "Reader registered");
        Ok(())
    }

    fn delete(&self, reader_id: &str) -> Result<bool> {
        let mut readers = self.readers.write();
        let Some(previous) = readers.remove(reader_id) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&readers) {
            readers.insert(reader_id.to_string(), previous);
            return Err(e);
        }
        info!(reader_id, "Reader deleted");
        Ok(true)
    }

    fn list(&self) -> Result<Vec<Reader>> {
        Ok(self.readers.read().values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(id: &str, user: &str) -> Reader {
        Reader {
            reader_id: id.to_string(),
            reader_name: format!("Reader {id}"),
            user_id: format!("uid-{user}"),
            user_name: user.to_string(),
        }
    }

    fn exercise(registry: &dyn Registry) {
        assert!(registry.list().unwrap().is_empty());
        assert_eq!(registry.get("r1").unwrap(), None);

        registry.put(reader("r2", "bob")).unwrap();
        registry.put(reader("r1", "alice")).unwrap();
        assert_eq!(registry.get("r1").unwrap(), Some(reader("r1", "alice")));

        // Re-registration replaces the record
        registry.put(reader("r1", "carol")).unwrap();
        let list = registry.list().unwrap();
        assert_eq!(list, vec![reader("r1", "carol"), reader("r2", "bob")]);

        assert!(registry.delete("r1").unwrap());
        assert!(!registry.delete("r1").unwrap());
        assert_eq!(registry.list().unwrap(), vec![reader("r2", "bob")]);
    }

    #[test]
    fn test_memory_registry() {
        exercise(&MemoryRegistry::new());
    }

    #[test]
    fn test_json_file_registry() {
        let dir = tempfile::tempdir().unwrap();

        let registry = JsonFileRegistry::open_in_dir(dir.path()).unwrap();
        exercise(&registry);
        drop(registry);

        // Mutations survive a reopen
        let reopened = JsonFileRegistry::open_in_dir(dir.path()).unwrap();
        assert_eq!(reopened.list().unwrap(), vec![reader("r2", "bob")]);
    }
}
