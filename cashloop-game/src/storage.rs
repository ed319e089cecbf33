//! Persistence seam.
//!
//! The engine sees a flat string key-value store (browser local storage, a
//! directory of files, or memory) and keeps JSON blobs in it: one for the
//! profile and one per completed chapter.
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::rc::Rc;
use thiserror::Error;

use crate::constants::{CHAPTER_KEY_PREFIX, PROFILE_KEY};
use crate::ledger::PersistedProfile;
use crate::progression::{ChapterId, ChapterProgress, ProgressBook};

/// Host-provided string storage.
pub trait KeyValueStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), Self::Error>;
}

#[derive(Debug, Error)]
pub enum StorageError<E>
where
    E: std::error::Error + 'static,
{
    #[error("storage backend failed")]
    Backend(#[source] E),
    #[error("stored value under {key} is not valid JSON")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Shared in-memory store. Clones see the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    type Error = Infallible;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Typed profile and chapter access on top of a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct ProfileStore<S> {
    backend: S,
}

impl<S: KeyValueStore> ProfileStore<S> {
    pub const fn new(backend: S) -> Self {
        Self { backend }
    }

    pub const fn backend(&self) -> &S {
        &self.backend
    }

    #[must_use]
    pub fn chapter_key(chapter: ChapterId) -> String {
        format!("{CHAPTER_KEY_PREFIX}{}", chapter.key())
    }

    /// # Errors
    ///
    /// Returns an error if the backend fails or the blob is corrupt.
    pub fn load_profile(&self) -> Result<Option<PersistedProfile>, StorageError<S::Error>> {
        self.read_json(PROFILE_KEY)
    }

    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub fn save_profile(&self, profile: &PersistedProfile) -> Result<(), StorageError<S::Error>> {
        self.write_json(PROFILE_KEY, profile)
    }

    /// # Errors
    ///
    /// Returns an error if the backend fails or the blob is corrupt.
    pub fn load_chapter(
        &self,
        chapter: ChapterId,
    ) -> Result<Option<ChapterProgress>, StorageError<S::Error>> {
        self.read_json(&Self::chapter_key(chapter))
    }

    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub fn save_chapter(
        &self,
        chapter: ChapterId,
        progress: &ChapterProgress,
    ) -> Result<(), StorageError<S::Error>> {
        self.write_json(&Self::chapter_key(chapter), progress)
    }

    /// Gather every stored chapter blob.
    ///
    /// # Errors
    ///
    /// Returns the first backend or decoding failure.
    pub fn load_progress(&self) -> Result<ProgressBook, StorageError<S::Error>> {
        let mut book = ProgressBook::new();
        for chapter in ChapterId::ALL {
            if let Some(progress) = self.load_chapter(chapter)? {
                book.record(chapter, progress);
            }
        }
        Ok(book)
    }

    /// # Errors
    ///
    /// Returns the first backend failure.
    pub fn save_progress(&self, book: &ProgressBook) -> Result<(), StorageError<S::Error>> {
        for (chapter, progress) in book.iter() {
            self.save_chapter(*chapter, progress)?;
        }
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, StorageError<S::Error>> {
        let Some(raw) = self.backend.get(key).map_err(StorageError::Backend)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                key: key.to_string(),
                source,
            })
    }

    fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError<S::Error>> {
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        self.backend.set(key, &raw).map_err(StorageError::Backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::{BuildingId, PlotId};
    use crate::ledger::Ledger;
    use chrono::{TimeZone, Utc};

    #[test]
    fn profile_round_trips_through_json() {
        let store = ProfileStore::new(MemoryStore::new());
        assert_eq!(store.load_profile().unwrap(), None);

        let mut ledger = Ledger::new();
        ledger.start_round(300);
        ledger.deposit(60).unwrap();
        ledger.take_loan(100, 120).unwrap();
        ledger.claim_reward(700, 60);
        let bakery = BuildingId::new("bakery");
        ledger.unlock_building(&bakery, 250).unwrap();
        ledger.place_building(PlotId(3), &bakery, 40).unwrap();

        store.save_profile(&ledger.to_profile()).unwrap();
        let loaded = store.load_profile().unwrap().unwrap();
        assert_eq!(loaded, ledger.to_profile());
        assert_eq!(loaded.wealth, 490);
        assert_eq!(loaded.stats.loans_history.len(), 1);
    }

    #[test]
    fn chapters_use_prefixed_keys() {
        let backend = MemoryStore::new();
        let store = ProfileStore::new(backend.clone());
        let progress = ChapterProgress {
            stars: 2,
            completed_at: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap(),
        };
        store.save_chapter(ChapterId::Loans, &progress).unwrap();
        assert!(backend.get("cashloop.chapter.loans").unwrap().is_some());
        let book = store.load_progress().unwrap();
        assert_eq!(book.get(ChapterId::Loans), Some(&progress));
        assert_eq!(book.get(ChapterId::Bank), None);
    }

    #[test]
    fn corrupt_blob_is_reported() {
        let backend = MemoryStore::new();
        backend.set("cashloop.profile", "{not json").unwrap();
        let store = ProfileStore::new(backend);
        assert!(matches!(
            store.load_profile(),
            Err(StorageError::Corrupt { .. })
        ));
    }
}
