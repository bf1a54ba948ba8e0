use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::FeedbackStoreError;
use crate::paths::FEEDBACK_COLLECTION;
use crate::schema::{validate_rfc3339, FeedbackCollection, FeedbackRecord, FEEDBACK_SCHEMA_VERSION};

/// Durable home of the feedback collection.
///
/// `load` must treat a missing collection as empty. `store` replaces the whole
/// collection with `records`.
pub trait FeedbackBackend: Send {
    fn load(&self) -> Result<Vec<FeedbackRecord>, FeedbackStoreError>;

    fn store(&mut self, records: &[FeedbackRecord]) -> Result<(), FeedbackStoreError>;

    /// Short description used in log lines.
    fn describe(&self) -> String;
}

/// Stores the collection as one JSON document, replaced atomically on write.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }
}

impl FeedbackBackend for JsonFileBackend {
    fn load(&self) -> Result<Vec<FeedbackRecord>, FeedbackStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(FeedbackStoreError::io(
                    "reading feedback collection",
                    &self.path,
                    source,
                ))
            }
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let collection: FeedbackCollection =
            serde_json::from_str(&raw).map_err(|source| FeedbackStoreError::JsonParse {
                path: self.path.clone(),
                source,
            })?;

        if collection.version != FEEDBACK_SCHEMA_VERSION {
            return Err(FeedbackStoreError::UnsupportedVersion {
                path: self.path.clone(),
                found: collection.version,
            });
        }
        if collection.collection != FEEDBACK_COLLECTION {
            return Err(FeedbackStoreError::WrongCollection {
                path: self.path.clone(),
                found: collection.collection,
                expected: FEEDBACK_COLLECTION,
            });
        }
        for (index, record) in collection.records.iter().enumerate() {
            validate_rfc3339(index, &record.submitted_at)?;
        }

        Ok(collection.records)
    }

    fn store(&mut self, records: &[FeedbackRecord]) -> Result<(), FeedbackStoreError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| {
                FeedbackStoreError::io("creating feedback directory", parent, source)
            })?;
        }

        let document = serde_json::to_string_pretty(&FeedbackCollection::v1(records.to_vec()))
            .map_err(|source| FeedbackStoreError::JsonSerialize {
                path: self.path.clone(),
                source,
            })?;

        let staging = self.staging_path();
        fs::write(&staging, document)
            .map_err(|source| FeedbackStoreError::io("writing staged feedback", &staging, source))?;
        fs::rename(&staging, &self.path).map_err(|source| {
            FeedbackStoreError::io("replacing feedback collection", &self.path, source)
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory backend. Clones share state, so a test can keep a handle to
/// inspect writes or toggle failures after handing the backend to a store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    records: Arc<Mutex<Vec<FeedbackRecord>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_records(records: Vec<FeedbackRecord>) -> Self {
        let backend = Self::default();
        *lock_unpoisoned(&backend.records) = records;
        backend
    }

    /// Makes every subsequent `store` fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<FeedbackRecord> {
        lock_unpoisoned(&self.records).clone()
    }
}

impl FeedbackBackend for MemoryBackend {
    fn load(&self) -> Result<Vec<FeedbackRecord>, FeedbackStoreError> {
        Ok(self.snapshot())
    }

    fn store(&mut self, records: &[FeedbackRecord]) -> Result<(), FeedbackStoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(FeedbackStoreError::Unavailable {
                reason: "memory backend write failure".to_string(),
            });
        }

        *lock_unpoisoned(&self.records) = records.to_vec();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
