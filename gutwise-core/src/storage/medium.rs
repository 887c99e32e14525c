//! Raw text media backing the persistent store.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use super::StorageError;

/// File extension for stored values.
const VALUE_EXTENSION: &str = "json";

/// A synchronous key/value medium holding text.
///
/// Implementations report absence as `Ok(None)` and reserve `Err` for real
/// failures of the medium.
pub trait StorageMedium: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes a key. Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Lists every key currently held by the medium.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Medium storing each key as a file in a data directory.
///
/// Keys are percent-encoded into file names, so any string is a valid key.
#[derive(Clone, Debug)]
pub struct FileMedium {
    data_dir: PathBuf,
}

impl FileMedium {
    /// Creates a medium rooted at `data_dir`. The directory is created on
    /// first write.
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Returns the file path holding `key`.
    pub fn path(&self, key: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", urlencoding::encode(key), VALUE_EXTENSION))
    }
}

impl StorageMedium for FileMedium {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path(key);

        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(path, e)),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StorageError::Io(self.data_dir.clone(), e))?;

        // Write next to the target and rename so readers never see a torn value.
        let path = self.path(key);
        let tmp_path = path.with_extension(format!("{}.tmp", VALUE_EXTENSION));

        fs::write(&tmp_path, value).map_err(|e| StorageError::Io(tmp_path.clone(), e))?;
        fs::rename(&tmp_path, &path).map_err(|e| StorageError::Io(path, e))?;

        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path(key);

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(path, e)),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let entries = match fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(self.data_dir.clone(), e)),
        };

        let suffix = format!(".{}", VALUE_EXTENSION);
        let mut keys = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| StorageError::Io(self.data_dir.clone(), e))?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(encoded) = name.strip_suffix(&suffix) else {
                continue;
            };
            if let Ok(key) = urlencoding::decode(encoded) {
                keys.push(key.into_owned());
            }
        }

        keys.sort();
        Ok(keys)
    }
}

/// In-process medium backed by an ordered map.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StorageError> {
        self.items
            .lock()
            .map_err(|_| StorageError::Unavailable("memory medium lock poisoned".to_string()))
    }
}

impl StorageMedium for MemoryMedium {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.items()?.keys().cloned().collect())
    }
}
