use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RedexterError, RedexterResult};

/// Top-level configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RedexterConfig {
    pub log: LogConfig,
    pub crypto: CryptoConfig,
    pub rclone: RcloneConfig,
    pub cache: CacheConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Minimum password length accepted for key derivation (default: 8)
    pub min_password_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RcloneConfig {
    /// Configuration tool binary (default: "rclone", resolved via PATH)
    pub binary: PathBuf,
    /// Config file to read crypt remotes from; falls back to the remembered path
    pub config_path: Option<PathBuf>,
}

/// Credential cache: remembered config path + keyring-held config password
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Remember the last config path and its password (default: true)
    pub enabled: bool,
    /// JSON file holding the last used config path
    pub state_file: PathBuf,
    /// Keyring service name the config password is stored under
    pub keyring_service: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default destination directory; decrypted files land next to their input if unset
    pub dest_dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            min_password_length: 8,
        }
    }
}

impl Default for RcloneConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("rclone"),
            config_path: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            state_file: PathBuf::from("~/.redexter_config.json"),
            keyring_service: "ReDexter_rclone_config".into(),
        }
    }
}

impl RedexterConfig {
    /// Load from a TOML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> RedexterResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| RedexterError::Config(format!("parsing {}: {e}", path.display())))
    }
}

/// Expand `~` in path to the user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(home).join(rest)
    } else {
        path.to_path_buf()
    }
}
