use std::path::PathBuf;

use thiserror::Error;

pub type RedexterResult<T> = Result<T, RedexterError>;

#[derive(Debug, Error)]
pub enum RedexterError {
    #[error("password must be at least {min} characters long (got {actual})")]
    WeakPassword { min: usize, actual: usize },

    #[error("malformed obscured value: {0}")]
    MalformedObscured(String),

    #[error("invalid file header in {}", .path.display())]
    BadMagic { path: PathBuf },

    #[error("failed to read nonce from {}", .path.display())]
    TruncatedHeader { path: PathBuf },

    #[error("corrupted block {block} in {} ({len} bytes, too short for a MAC)", .path.display())]
    CorruptBlock {
        path: PathBuf,
        block: u64,
        len: usize,
    },

    #[error("decryption failed for block {block} of {}: wrong key or corrupted data", .path.display())]
    DecryptionFailed { path: PathBuf, block: u64 },

    #[error("no files to decrypt")]
    EmptyBatch,

    #[error("config error: {0}")]
    Config(String),

    #[error("secrets error: {0}")]
    Secrets(String),

    /// The config tool ran but refused the config, usually a missing or wrong password
    #[error("config rejected: {0}")]
    ConfigRejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RedexterError {
    /// True for the errors that describe a single crypt file being unreadable.
    pub fn is_file_format(&self) -> bool {
        matches!(
            self,
            Self::BadMagic { .. }
                | Self::TruncatedHeader { .. }
                | Self::CorruptBlock { .. }
                | Self::DecryptionFailed { .. }
        )
    }
}
