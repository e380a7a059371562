//! redexter-secrets: credentials for crypt remotes
//!
//! Resolution chain for `CredentialResolver::resolve`:
//!   1. config path: explicit argument, else the remembered last path
//!   2. config password: explicit argument, else the credential cache
//!   3. config text from the provider (`rclone config show`), parsed as INI
//!   4. `type = crypt` sections with their password/salt revealed
//!
//! On success the path is remembered and a non-empty password cached.

pub mod cache;
pub mod ini;
pub mod provider;
pub mod remotes;

pub use cache::{CredentialCache, KeyringCache, LastConfigStore, MemoryCache};
pub use ini::parse_config;
pub use provider::{ConfigProvider, RcloneCli, StaticConfig};
pub use remotes::{crypt_remotes, CryptRemote};

use std::path::{Path, PathBuf};

use redexter_core::{RedexterError, RedexterResult};
use secrecy::{ExposeSecret, SecretString};

/// Outcome of a successful resolution
#[derive(Debug, Clone)]
pub struct ResolvedRemotes {
    pub config_path: PathBuf,
    pub remotes: Vec<CryptRemote>,
}

impl ResolvedRemotes {
    pub fn find(&self, name: &str) -> Option<&CryptRemote> {
        self.remotes.iter().find(|r| r.name == name)
    }
}

/// Loads crypt remotes, remembering the config path and password.
pub struct CredentialResolver<P> {
    provider: P,
    cache: Option<Box<dyn CredentialCache>>,
    last_config: Option<LastConfigStore>,
}

impl<P: ConfigProvider> CredentialResolver<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            cache: None,
            last_config: None,
        }
    }

    pub fn with_cache(mut self, cache: impl CredentialCache + 'static) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    pub fn with_last_config(mut self, store: LastConfigStore) -> Self {
        self.last_config = Some(store);
        self
    }

    /// The config path `resolve` would use without an explicit one
    pub fn remembered_path(&self) -> Option<PathBuf> {
        self.last_config.as_ref().and_then(LastConfigStore::load)
    }

    pub async fn resolve(
        &self,
        config_path: Option<&Path>,
        password: Option<SecretString>,
    ) -> RedexterResult<ResolvedRemotes> {
        let config_path = match config_path {
            Some(p) => p.to_path_buf(),
            None => self.remembered_path().ok_or_else(|| {
                RedexterError::Config("no rclone config given and none remembered".into())
            })?,
        };

        let password = match password {
            Some(pw) => Some(pw),
            None => self.cached_password(&config_path),
        };

        let sections = self.provider.load(&config_path, password.as_ref()).await?;
        let remotes = crypt_remotes(&sections);
        tracing::info!(
            config = %config_path.display(),
            remotes = remotes.len(),
            "loaded rclone config"
        );

        if let Some(store) = &self.last_config {
            if let Err(e) = store.save(&config_path) {
                tracing::warn!(file = %store.file.display(), "cannot remember config path: {e}");
            }
        }
        if let (Some(cache), Some(pw)) = (&self.cache, &password) {
            if !pw.expose_secret().is_empty() {
                if let Err(e) = cache.set(&config_path, pw) {
                    tracing::warn!("cannot cache config password: {e}");
                }
            }
        }

        Ok(ResolvedRemotes {
            config_path,
            remotes,
        })
    }

    /// Drop the remembered config path and its cached password.
    pub fn forget(&self) -> RedexterResult<()> {
        let remembered = self.remembered_path();
        if let (Some(cache), Some(path)) = (&self.cache, &remembered) {
            if let Err(e) = cache.remove(path) {
                tracing::warn!(config = %path.display(), "cannot delete cached password: {e}");
            }
        }
        if let Some(store) = &self.last_config {
            store.clear()?;
        }
        tracing::info!(had_path = remembered.is_some(), "forgot saved rclone config");
        Ok(())
    }

    fn cached_password(&self, config_path: &Path) -> Option<SecretString> {
        let cache = self.cache.as_ref()?;
        match cache.get(config_path) {
            Ok(pw) => pw,
            Err(e) => {
                tracing::warn!("credential cache unavailable: {e}");
                None
            }
        }
    }
}
