//! redexter-crypto: the crypt remote format, read side
//!
//! Key derivation:
//! ```text
//! password ──┐
//!            ├── scrypt (N=2^14, r=8, p=1) ──> 32-byte data key
//! salt ──────┘   (salt canonicalized to 32 bytes; default salt when absent)
//! ```
//!
//! Encrypted file layout:
//! ```text
//! [8 bytes: "RCLONE\0\0"][24 bytes: initial nonce][block 0][block 1]...
//! block = XSalsa20-Poly1305 secretbox: [16-byte tag][≤ 64 KiB ciphertext]
//! ```
//! Block `i` is sealed under `initial nonce + i` (little-endian increment).
//!
//! Obscured config credentials are AES-256-CTR under a fixed public key and
//! carry no secrecy; [`reveal`] undoes them.

pub mod block;
pub mod file;
pub mod kdf;
pub mod obscure;
pub mod salt;

pub use block::{decrypt_block, BlockDecryptor, BlockError, FileNonce};
pub use file::{decrypt_file, decrypt_stream, output_path, DecryptSummary, StreamStats};
pub use kdf::{derive_data_key, DataKey};
pub use obscure::reveal;
pub use salt::{canonicalize_salt, SaltInput, DEFAULT_SALT};

/// Size of a data key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an XSalsa20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Plaintext bytes carried by every block except possibly the last
pub const BLOCK_DATA_SIZE: usize = 64 * 1024;

/// Largest on-disk block: tag + full plaintext
pub const BLOCK_SIZE: usize = TAG_SIZE + BLOCK_DATA_SIZE;

/// Magic bytes opening every encrypted file
pub const FILE_MAGIC: &[u8; 8] = b"RCLONE\0\0";

pub const FILE_MAGIC_SIZE: usize = FILE_MAGIC.len();
