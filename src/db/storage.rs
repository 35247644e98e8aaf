use std::{collections::HashMap, env, fs, io::ErrorKind, path::PathBuf};

use crate::{IntoDatabaseError, Result};

/// The default directory the file store keeps its keys in.
pub const DEFAULT_DATA_DIR: &str = "./data";

const DATA_DIR_VAR: &str = "AGRIGENCE_DATA_DIR";

/// Represents a place keyed string values can be kept durably,
/// standing in for the browser's local storage.
pub trait Storage: Send {
    fn read(&mut self, key: &str) -> Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Keeps every key as a file in a single directory
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| e.any())?;

        Ok(Self { dir })
    }

    /// Opens the directory named by AGRIGENCE_DATA_DIR, or the default
    pub fn from_env() -> Result<Self> {
        let dir = env::var(DATA_DIR_VAR).unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());

        Self::new(dir)
    }

    fn path_of(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl Storage for FileStorage {
    fn read(&mut self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_of(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.any()),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        fs::write(self.path_of(key), value).map_err(|e| e.any())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_of(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.any()),
        }
    }
}

/// Keeps keys in memory only, for tests and throwaway demos
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl Storage for MemoryStorage {
    fn read(&mut self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
