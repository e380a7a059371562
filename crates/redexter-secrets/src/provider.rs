//! Config providers: where the INI text listing remotes comes from.

use std::future::Future;
use std::path::{Path, PathBuf};

use redexter_core::{ConfigSection, RedexterError, RedexterResult};
use secrecy::{ExposeSecret, SecretString};

use crate::ini::parse_config;

/// Source of a decrypted remote configuration.
pub trait ConfigProvider: Send + Sync {
    /// Load and parse the configuration at `config_path`. `password` unlocks
    /// an encrypted config; `None` or empty means the config is plain.
    fn load(
        &self,
        config_path: &Path,
        password: Option<&SecretString>,
    ) -> impl Future<Output = RedexterResult<Vec<ConfigSection>>> + Send;
}

/// Runs `rclone config show` and parses its stdout.
#[derive(Debug, Clone)]
pub struct RcloneCli {
    pub binary: PathBuf,
}

impl RcloneCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for RcloneCli {
    fn default() -> Self {
        Self::new("rclone")
    }
}

impl ConfigProvider for RcloneCli {
    async fn load(
        &self,
        config_path: &Path,
        password: Option<&SecretString>,
    ) -> RedexterResult<Vec<ConfigSection>> {
        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.arg("config")
            .arg("show")
            .arg("--config")
            .arg(config_path)
            .kill_on_drop(true);
        if let Some(pw) = password.filter(|p| !p.expose_secret().is_empty()) {
            cmd.env("RCLONE_CONFIG_PASS", pw.expose_secret());
        }

        tracing::debug!(
            binary = %self.binary.display(),
            config = %config_path.display(),
            "running config show"
        );
        let output = cmd.output().await.map_err(|e| {
            RedexterError::Secrets(format!(
                "failed to run {}: {e}",
                self.binary.display()
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RedexterError::ConfigRejected(format!(
                "config show failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| RedexterError::Secrets("config show output is not UTF-8".into()))?;
        parse_config(&stdout)
    }
}

/// Provider over fixed INI text, for tests and pre-decrypted configs.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig {
    pub text: String,
    /// Password the config expects; `None` accepts any
    pub expected_password: Option<String>,
}

impl StaticConfig {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            expected_password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.expected_password = Some(password.into());
        self
    }
}

impl ConfigProvider for StaticConfig {
    async fn load(
        &self,
        _config_path: &Path,
        password: Option<&SecretString>,
    ) -> RedexterResult<Vec<ConfigSection>> {
        if let Some(expected) = &self.expected_password {
            let given = password.map(|p| p.expose_secret()).unwrap_or_default();
            if given != expected.as_str() {
                return Err(RedexterError::ConfigRejected("wrong config password".into()));
            }
        }
        parse_config(&self.text)
    }
}
