//! Parser for the INI text printed by `rclone config show`.
//!
//! ```text
//! [remote]            ; section header
//! type = crypt        # `key = value` or `key: value`
//! password = ...
//! ```
//! Keys are lowercased and values trimmed. Comment lines start with `#` or `;`.

use redexter_core::{ConfigSection, RedexterError, RedexterResult};

/// Parse config text into sections, in file order.
///
/// A key outside any section, a line that is neither header nor key/value, or
/// a repeated section name is an error.
pub fn parse_config(text: &str) -> RedexterResult<Vec<ConfigSection>> {
    let mut sections: Vec<ConfigSection> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(rest) = line.strip_prefix('[') {
            let name = rest
                .strip_suffix(']')
                .ok_or_else(|| {
                    RedexterError::Config(format!("line {lineno}: unterminated section header"))
                })?
                .trim();
            if sections.iter().any(|s| s.name == name) {
                return Err(RedexterError::Config(format!(
                    "line {lineno}: duplicate section [{name}]"
                )));
            }
            sections.push(ConfigSection::new(name));
            continue;
        }

        let split = line.find(['=', ':']).ok_or_else(|| {
            RedexterError::Config(format!("line {lineno}: expected `key = value`"))
        })?;
        let (key, value) = (line[..split].trim(), line[split + 1..].trim());
        if key.is_empty() {
            return Err(RedexterError::Config(format!("line {lineno}: empty key")));
        }

        let section = sections.last_mut().ok_or_else(|| {
            RedexterError::Config(format!("line {lineno}: `{key}` appears before any section"))
        })?;
        section.insert(key, value);
    }

    tracing::debug!(sections = sections.len(), "parsed config text");
    Ok(sections)
}
