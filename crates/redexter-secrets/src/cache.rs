//! Remembered credentials between runs.
//!
//! - config passwords: platform keychain via the `keyring` crate, keyed by
//!   config file path (macOS Keychain, Secret Service, Windows Credential Manager)
//! - last used config path: a small JSON file in the home directory

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use redexter_core::{RedexterError, RedexterResult};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Default keychain service name
pub const DEFAULT_SERVICE: &str = "ReDexter_rclone_config";

/// Password storage keyed by config path.
pub trait CredentialCache: Send + Sync {
    fn get(&self, config_path: &Path) -> RedexterResult<Option<SecretString>>;
    fn set(&self, config_path: &Path, password: &SecretString) -> RedexterResult<()>;
    /// Removing an absent entry is not an error.
    fn remove(&self, config_path: &Path) -> RedexterResult<()>;
}

impl<T: CredentialCache + ?Sized> CredentialCache for std::sync::Arc<T> {
    fn get(&self, config_path: &Path) -> RedexterResult<Option<SecretString>> {
        (**self).get(config_path)
    }

    fn set(&self, config_path: &Path, password: &SecretString) -> RedexterResult<()> {
        (**self).set(config_path, password)
    }

    fn remove(&self, config_path: &Path) -> RedexterResult<()> {
        (**self).remove(config_path)
    }
}

/// Platform keychain cache.
#[derive(Debug, Clone)]
pub struct KeyringCache {
    pub service: String,
}

impl KeyringCache {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, config_path: &Path) -> RedexterResult<keyring::Entry> {
        keyring::Entry::new(&self.service, &config_path.to_string_lossy())
            .map_err(|e| RedexterError::Secrets(format!("keychain entry creation: {e}")))
    }
}

impl Default for KeyringCache {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

impl CredentialCache for KeyringCache {
    fn get(&self, config_path: &Path) -> RedexterResult<Option<SecretString>> {
        match self.entry(config_path)?.get_password() {
            Ok(mut password) => {
                let secret = SecretString::from(password.clone());
                password.zeroize();
                Ok(Some(secret))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(RedexterError::Secrets(format!(
                "keychain get for '{}': {e}",
                config_path.display()
            ))),
        }
    }

    fn set(&self, config_path: &Path, password: &SecretString) -> RedexterResult<()> {
        self.entry(config_path)?
            .set_password(password.expose_secret())
            .map_err(|e| {
                RedexterError::Secrets(format!(
                    "keychain store for '{}': {e}",
                    config_path.display()
                ))
            })?;
        tracing::debug!(config = %config_path.display(), "stored config password in keychain");
        Ok(())
    }

    fn remove(&self, config_path: &Path) -> RedexterResult<()> {
        match self.entry(config_path)?.delete_credential() {
            Ok(()) => {
                tracing::debug!(config = %config_path.display(), "deleted config password from keychain");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()), // already deleted
            Err(e) => Err(RedexterError::Secrets(format!(
                "keychain delete for '{}': {e}",
                config_path.display()
            ))),
        }
    }
}

/// In-process cache, used when the keychain is disabled.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<PathBuf, SecretString>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> RedexterResult<std::sync::MutexGuard<'_, HashMap<PathBuf, SecretString>>> {
        self.entries
            .lock()
            .map_err(|_| RedexterError::Secrets("memory cache lock poisoned".into()))
    }
}

impl CredentialCache for MemoryCache {
    fn get(&self, config_path: &Path) -> RedexterResult<Option<SecretString>> {
        Ok(self.lock()?.get(config_path).cloned())
    }

    fn set(&self, config_path: &Path, password: &SecretString) -> RedexterResult<()> {
        self.lock()?
            .insert(config_path.to_path_buf(), password.clone());
        Ok(())
    }

    fn remove(&self, config_path: &Path) -> RedexterResult<()> {
        self.lock()?.remove(config_path);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LastConfig {
    config_path: Option<PathBuf>,
}

/// The last config path that loaded successfully, persisted as
/// `{"config_path": "..."}`.
#[derive(Debug, Clone)]
pub struct LastConfigStore {
    pub file: PathBuf,
}

impl LastConfigStore {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }

    /// The remembered path. A missing, unreadable or corrupt file gives `None`.
    pub fn load(&self) -> Option<PathBuf> {
        let content = std::fs::read_to_string(&self.file).ok()?;
        match serde_json::from_str::<LastConfig>(&content) {
            Ok(last) => last.config_path,
            Err(e) => {
                tracing::debug!(file = %self.file.display(), "ignoring unreadable last-config file: {e}");
                None
            }
        }
    }

    pub fn save(&self, config_path: &Path) -> RedexterResult<()> {
        if let Some(parent) = self.file.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(&LastConfig {
            config_path: Some(config_path.to_path_buf()),
        })
        .map_err(|e| anyhow::anyhow!("serializing last config: {e}"))?;
        std::fs::write(&self.file, json)?;
        Ok(())
    }

    pub fn clear(&self) -> RedexterResult<()> {
        match std::fs::remove_file(&self.file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
