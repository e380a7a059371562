//! Crypt remote discovery: pick `type = crypt` sections out of a parsed
//! config and reveal their obscured password and salt.

use redexter_core::ConfigSection;
use redexter_crypto::{reveal, SaltInput};
use secrecy::{ExposeSecret, SecretString};

/// Credentials of one crypt remote, revealed.
#[derive(Clone)]
pub struct CryptRemote {
    pub name: String,
    pub password: SecretString,
    /// The `password2` setting; `None` means the default salt
    pub salt: Option<SecretString>,
}

impl CryptRemote {
    /// Salt in the form key derivation expects
    pub fn salt_input(&self) -> Option<SaltInput> {
        self.salt
            .as_ref()
            .map(|s| SaltInput::Text(s.expose_secret().to_string()))
    }
}

impl std::fmt::Debug for CryptRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptRemote")
            .field("name", &self.name)
            .field("password", &"[REDACTED]")
            .field("salt", &self.salt.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// All crypt remotes with a non-empty `password`, in config order.
///
/// A value that fails to reveal is logged and treated as empty; it never
/// aborts the scan.
pub fn crypt_remotes(sections: &[ConfigSection]) -> Vec<CryptRemote> {
    let mut remotes = Vec::new();

    for section in sections {
        if section.remote_type().as_deref() != Some("crypt") {
            continue;
        }
        let obscured = section.get("password").map(str::trim).unwrap_or_default();
        if obscured.is_empty() {
            tracing::debug!(remote = %section.name, "crypt remote has no password, skipping");
            continue;
        }

        let password = reveal_or_empty(&section.name, "password", obscured);
        let salt = section
            .get("password2")
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| reveal_or_empty(&section.name, "password2", v))
            .filter(|v| !v.is_empty());

        remotes.push(CryptRemote {
            name: section.name.clone(),
            password: SecretString::from(password),
            salt: salt.map(SecretString::from),
        });
    }

    tracing::debug!(count = remotes.len(), "found crypt remotes");
    remotes
}

fn reveal_or_empty(remote: &str, field: &str, obscured: &str) -> String {
    match reveal(obscured) {
        Ok(plain) => plain,
        Err(e) => {
            tracing::warn!(remote, field, "cannot reveal value: {e}");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // obscured "potato" and ""
    const POTATO: &str = "YWJjZGVmZ2hpamtsbW5vcN95MBYPtw";
    const EMPTY: &str = "YWJjZGVmZ2hpamtsbW5vcA";

    fn section(name: &str, pairs: &[(&str, &str)]) -> ConfigSection {
        let mut s = ConfigSection::new(name);
        for (k, v) in pairs {
            s.insert(*k, *v);
        }
        s
    }

    #[test]
    fn test_only_crypt_with_password() {
        let sections = vec![
            section("drive", &[("type", "drive"), ("password", POTATO)]),
            section("nopw", &[("type", "crypt")]),
            section("blank", &[("type", "crypt"), ("password", "  ")]),
            section("secret", &[("type", " CRYPT "), ("password", POTATO)]),
        ];

        let remotes = crypt_remotes(&sections);
        assert_eq!(remotes.len(), 1);
        assert_eq!(remotes[0].name, "secret");
        assert_eq!(remotes[0].password.expose_secret(), "potato");
        assert!(remotes[0].salt.is_none());
    }

    #[test]
    fn test_password2_becomes_salt() {
        let sections = vec![section(
            "secret",
            &[("type", "crypt"), ("password", POTATO), ("password2", POTATO)],
        )];

        let remotes = crypt_remotes(&sections);
        let salt = remotes[0].salt.as_ref().unwrap();
        assert_eq!(salt.expose_secret(), "potato");
        assert_eq!(remotes[0].salt_input(), Some(SaltInput::from("potato")));
    }

    #[test]
    fn test_empty_revealed_salt_is_none() {
        let sections = vec![section(
            "secret",
            &[("type", "crypt"), ("password", POTATO), ("password2", EMPTY)],
        )];
        assert!(crypt_remotes(&sections)[0].salt.is_none());
    }

    #[test]
    fn test_malformed_value_does_not_abort() {
        let sections = vec![
            section("broken", &[("type", "crypt"), ("password", "!!!")]),
            section("good", &[("type", "crypt"), ("password", POTATO), ("password2", "%%")]),
        ];

        let remotes = crypt_remotes(&sections);
        assert_eq!(remotes.len(), 2);
        assert_eq!(remotes[0].password.expose_secret(), "");
        assert_eq!(remotes[1].password.expose_secret(), "potato");
        assert!(remotes[1].salt.is_none());
    }

    #[test]
    fn test_debug_redacts() {
        let sections = vec![section("secret", &[("type", "crypt"), ("password", POTATO)])];
        let dbg = format!("{:?}", crypt_remotes(&sections)[0]);
        assert!(!dbg.contains("potato"));
    }
}
