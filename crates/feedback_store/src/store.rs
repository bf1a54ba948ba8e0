use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::backend::{FeedbackBackend, JsonFileBackend};
use crate::error::FeedbackStoreError;
use crate::export::{export_records, FeedbackExport};
use crate::paths::export_file_name;
use crate::schema::{validate_rfc3339, FeedbackRecord};

/// Append-only feedback log with a durable backend.
///
/// Records are kept in memory first. Records past `persisted` have not reached
/// the backend yet and survive a failed write until persisted or discarded.
pub struct FeedbackStore {
    backend: Box<dyn FeedbackBackend>,
    records: Vec<FeedbackRecord>,
    persisted: usize,
}

impl FeedbackStore {
    pub fn open(backend: impl FeedbackBackend + 'static) -> Result<Self, FeedbackStoreError> {
        let records = backend.load()?;
        debug!(
            backend = %backend.describe(),
            records = records.len(),
            "opened feedback store"
        );
        let persisted = records.len();

        Ok(Self {
            backend: Box::new(backend),
            records,
            persisted,
        })
    }

    pub fn open_json(path: &Path) -> Result<Self, FeedbackStoreError> {
        Self::open(JsonFileBackend::new(path))
    }

    /// Appends a record and persists it.
    ///
    /// On storage failure the record stays in memory as pending and
    /// `PersistFailed` is returned.
    pub fn append(&mut self, record: FeedbackRecord) -> Result<(), FeedbackStoreError> {
        validate_rfc3339(self.records.len(), &record.submitted_at)?;

        self.records.push(record);
        self.persist_pending().map(|_| ())
    }

    /// Writes pending records with a read-modify-write of the durable collection.
    ///
    /// Returns how many records were persisted.
    pub fn persist_pending(&mut self) -> Result<usize, FeedbackStoreError> {
        let pending = self.pending_count();
        if pending == 0 {
            return Ok(0);
        }

        let mut durable = self
            .backend
            .load()
            .map_err(|source| self.persist_failure(pending, source))?;
        durable.extend_from_slice(&self.records[self.persisted..]);
        self.backend
            .store(&durable)
            .map_err(|source| self.persist_failure(pending, source))?;

        self.persisted = self.records.len();
        debug!(persisted = pending, total = durable.len(), "persisted feedback");
        Ok(pending)
    }

    /// Drops records that never reached the backend and returns them.
    pub fn discard_pending(&mut self) -> Vec<FeedbackRecord> {
        self.records.split_off(self.persisted)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.records.len() - self.persisted
    }

    #[must_use]
    pub fn records(&self) -> &[FeedbackRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records_for<'a>(
        &'a self,
        snippet_id: &'a str,
        style: &'a str,
        model: &'a str,
    ) -> impl Iterator<Item = &'a FeedbackRecord> + 'a {
        self.records
            .iter()
            .filter(move |record| record.matches(snippet_id, style, model))
    }

    /// Exports every record held in memory, pending ones included.
    #[must_use]
    pub fn export_all(&self) -> FeedbackExport {
        export_records(&self.records)
    }

    /// Writes the export into `dir` under a timestamped name.
    ///
    /// Returns `None` when there is nothing to export.
    pub fn export_to_dir(
        &self,
        dir: &Path,
        created_at: &str,
    ) -> Result<Option<PathBuf>, FeedbackStoreError> {
        let FeedbackExport::Csv(table) = self.export_all() else {
            return Ok(None);
        };

        fs::create_dir_all(dir)
            .map_err(|source| FeedbackStoreError::io("creating export directory", dir, source))?;
        let path = dir.join(export_file_name(created_at));
        fs::write(&path, table)
            .map_err(|source| FeedbackStoreError::io("writing feedback export", &path, source))?;
        Ok(Some(path))
    }

    fn persist_failure(&self, pending: usize, source: FeedbackStoreError) -> FeedbackStoreError {
        warn!(
            backend = %self.backend.describe(),
            pending,
            error = %source,
            "feedback persist failed; records kept in memory"
        );
        FeedbackStoreError::persist_failed(pending, source)
    }
}
