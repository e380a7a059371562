use serde::{Deserialize, Serialize};

/// One named section of the configuration tool's INI output, e.g. `[secret]`.
///
/// Entries keep the order they appeared in; keys are stored lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSection {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

impl ConfigSection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Look up a key (case-insensitive). Later duplicates win, as in the tool.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into().to_ascii_lowercase(), value.into()));
    }

    /// The remote type (`type = crypt`), trimmed and lowercased
    pub fn remote_type(&self) -> Option<String> {
        self.get("type").map(|t| t.trim().to_ascii_lowercase())
    }
}

/// Lifecycle of a batch decryption run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchState {
    /// Job built, worker not started
    Idle,
    /// Files are being decrypted in order
    Running,
    /// Every file decrypted
    Completed,
    /// Stopped at a file boundary on request
    Cancelled,
    /// A file failed; remaining files were not attempted
    Failed,
}

impl BatchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}
