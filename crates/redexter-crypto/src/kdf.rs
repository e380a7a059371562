//! Key derivation: scrypt password → data key

use redexter_core::{RedexterError, RedexterResult};
use scrypt::Params;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use crate::salt::{canonicalize_salt, SaltInput, DEFAULT_SALT};
use crate::KEY_SIZE;

/// scrypt cost: log2(N). These are libsodium's "interactive" limits
/// (opslimit 524288, memlimit 16 MiB) resolved to scrypt parameters.
pub const SCRYPT_LOG_N: u8 = 14;
pub const SCRYPT_R: u32 = 8;
pub const SCRYPT_P: u32 = 1;

/// Default minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A 256-bit data key derived from the crypt password.
///
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct DataKey {
    bytes: [u8; KEY_SIZE],
}

impl DataKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for DataKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive the 256-bit data key from a password and optional salt.
///
/// Passwords shorter than `min_length` characters are rejected, never padded.
/// Without a salt the well-known default salt is used. The salt is
/// canonicalized to 32 bytes before hashing.
pub fn derive_data_key(
    password: &SecretString,
    salt: Option<&SaltInput>,
    min_length: usize,
) -> RedexterResult<DataKey> {
    let actual = password.expose_secret().chars().count();
    if actual < min_length {
        return Err(RedexterError::WeakPassword {
            min: min_length,
            actual,
        });
    }

    tracing::debug!(default_salt = salt.is_none(), "deriving data key");
    let salt = match salt {
        Some(input) => canonicalize_salt(input),
        None => canonicalize_salt(&SaltInput::Bytes(DEFAULT_SALT.to_vec())),
    };

    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_SIZE)
        .map_err(|e| anyhow::anyhow!("invalid scrypt params: {e}"))?;

    let mut key = [0u8; KEY_SIZE];
    scrypt::scrypt(
        password.expose_secret().as_bytes(),
        &salt,
        &params,
        &mut key,
    )
    .map_err(|e| anyhow::anyhow!("scrypt KDF failed: {e}"))?;

    Ok(DataKey::from_bytes(key))
}
