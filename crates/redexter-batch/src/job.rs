use std::path::{Path, PathBuf};

use redexter_core::{RedexterError, RedexterResult};
use redexter_crypto::DataKey;

/// An ordered list of files to decrypt under one data key.
///
/// The key is zeroized when the job is dropped.
#[derive(Debug)]
pub struct DecryptionJob {
    files: Vec<PathBuf>,
    key: DataKey,
    dest_dir: Option<PathBuf>,
}

impl DecryptionJob {
    pub fn new(
        files: Vec<PathBuf>,
        key: DataKey,
        dest_dir: Option<PathBuf>,
    ) -> RedexterResult<Self> {
        if files.is_empty() {
            return Err(RedexterError::EmptyBatch);
        }
        Ok(Self {
            files,
            key,
            dest_dir,
        })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn key(&self) -> &DataKey {
        &self.key
    }

    pub fn dest_dir(&self) -> Option<&Path> {
        self.dest_dir.as_deref()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
