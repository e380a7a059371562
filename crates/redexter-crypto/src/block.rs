//! Per-block XSalsa20-Poly1305 (NaCl secretbox) decryption
//!
//! Block format (binary):
//! ```text
//! [16 bytes: Poly1305 tag][N bytes: ciphertext], N ≤ 65536
//! ```
//!
//! Every block of a file shares one nonce sequence: the header nonce for
//! block 0, then +1 (little-endian, 192-bit, wrapping) per block.

use crypto_secretbox::{
    aead::{Aead, KeyInit},
    Nonce, XSalsa20Poly1305,
};
use thiserror::Error;

use crate::kdf::DataKey;
use crate::{NONCE_SIZE, TAG_SIZE};

/// Why a single block could not be opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BlockError {
    #[error("block too short: {len} bytes (minimum {})", TAG_SIZE + 1)]
    TooShort { len: usize },

    #[error("block authentication failed")]
    Authentication,
}

/// The running 24-byte nonce of a file.
#[derive(Clone, PartialEq, Eq)]
pub struct FileNonce {
    bytes: [u8; NONCE_SIZE],
}

impl FileNonce {
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.bytes
    }

    /// Add one, treating the nonce as a little-endian integer. Wraps to zero.
    pub fn increment(&mut self) {
        for byte in self.bytes.iter_mut() {
            let (next, carry) = byte.overflowing_add(1);
            *byte = next;
            if !carry {
                break;
            }
        }
    }
}

impl std::fmt::Debug for FileNonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FileNonce({})", hex::encode(self.bytes))
    }
}

/// Opens the blocks of one file under one key.
pub struct BlockDecryptor {
    cipher: XSalsa20Poly1305,
}

impl BlockDecryptor {
    pub fn new(key: &DataKey) -> Self {
        Self {
            cipher: XSalsa20Poly1305::new(key.as_bytes().into()),
        }
    }

    /// Authenticate and decrypt one block.
    ///
    /// Blocks of `TAG_SIZE` bytes or less cannot hold a tag plus data and are
    /// rejected before any crypto runs.
    pub fn open(&self, nonce: &FileNonce, block: &[u8]) -> Result<Vec<u8>, BlockError> {
        if block.len() <= TAG_SIZE {
            return Err(BlockError::TooShort { len: block.len() });
        }
        self.cipher
            .decrypt(Nonce::from_slice(nonce.as_bytes()), block)
            .map_err(|_| BlockError::Authentication)
    }
}

/// Decrypt a single block. Prefer [`BlockDecryptor`] for a whole file.
pub fn decrypt_block(
    key: &DataKey,
    nonce: &FileNonce,
    block: &[u8],
) -> Result<Vec<u8>, BlockError> {
    BlockDecryptor::new(key).open(nonce, block)
}
