//! Directory-backed profile storage for headless runs.
use cashloop_game::KeyValueStore;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One `<key>.json` file per stored blob.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) the directory at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, FileStoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| FileStoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    type Error = FileStoreError;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(FileStoreError::Io { path, source }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        let path = self.path_for(key);
        fs::write(&path, value).map_err(|source| FileStoreError::Io { path, source })
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Err(err) if err.kind() != ErrorKind::NotFound => {
                Err(FileStoreError::Io { path, source: err })
            }
            _ => Ok(()),
        }
    }
}
