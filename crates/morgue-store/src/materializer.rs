//! Record Materializer: one JSON file per canonical key

use crate::config::StoreConfig;
use crate::dedup::PersistenceProbe;
use crate::error::StoreError;
use morgue_domain::{CanonicalKey, ExtractedRecord};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Writes records under `<root>/<category>/<date>/<hash>/<file_name>`
#[derive(Debug, Clone)]
pub struct JsonRecordStore {
    root: PathBuf,
    config: StoreConfig,
}

impl JsonRecordStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>, config: StoreConfig) -> Result<Self, StoreError> {
        config.validate().map_err(StoreError::Config)?;
        Ok(Self {
            root: root.into(),
            config,
        })
    }

    /// Destination root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the store configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Create the destination root if absent
    pub fn ensure_root(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|e| StoreError::io(&self.root, e))
    }

    /// Directory holding the record for `key`
    pub fn target_dir(&self, key: &CanonicalKey) -> PathBuf {
        key.path_segments()
            .iter()
            .fold(self.root.clone(), |dir, segment| dir.join(segment))
    }

    /// Full output path for `key`
    pub fn target_path(&self, key: &CanonicalKey) -> PathBuf {
        self.target_dir(key).join(&self.config.file_name)
    }

    /// Write `record` for `key`
    ///
    /// The record id is replaced by the canonical URL. The file appears
    /// complete or not at all, and an existing file is never replaced.
    pub fn materialize(
        &self,
        key: &CanonicalKey,
        record: &ExtractedRecord,
    ) -> Result<PathBuf, StoreError> {
        let mut record = record.clone();
        record.id = key.canonical_url();
        let json = record.to_pretty_json()?;

        let dir = self.target_dir(key);
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let target = dir.join(&self.config.file_name);
        let mut staged = NamedTempFile::new_in(&dir).map_err(|e| StoreError::io(&dir, e))?;
        staged
            .write_all(json.as_bytes())
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|e| StoreError::io(staged.path(), e))?;

        staged.persist_noclobber(&target).map_err(|e| {
            if e.error.kind() == ErrorKind::AlreadyExists {
                StoreError::AlreadyExists(target.clone())
            } else {
                StoreError::io(&target, e.error)
            }
        })?;

        debug!("Wrote {} ({} bytes)", target.display(), json.len());
        Ok(target)
    }
}

impl PersistenceProbe for JsonRecordStore {
    fn has_persisted(&self, key: &CanonicalKey) -> bool {
        self.target_path(key).is_file()
    }
}
