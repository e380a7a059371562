//! Salt canonicalization: any salt representation → 32 bytes
//!
//! Decoded length 32 is used as-is, 16 is doubled, anything else is hashed
//! with SHA-256.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use sha2::{Digest, Sha256};

/// Canonical salt length fed to scrypt
pub const SALT_SIZE: usize = 32;

/// Salt used when none is configured (the crypt remote default)
pub const DEFAULT_SALT: [u8; 16] = [
    0xA8, 0x0D, 0xF4, 0x3A, 0x8F, 0xBD, 0x03, 0x08, 0xA7, 0xCA, 0xB8, 0x3E, 0x58, 0x1F, 0x86, 0xB1,
];

/// Padded standard base64 that tolerates non-zero trailing bits.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

fn is_base64_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')
}

/// A salt as the user or config supplied it.
#[derive(Clone, PartialEq, Eq)]
pub enum SaltInput {
    /// Raw bytes, used verbatim
    Bytes(Vec<u8>),
    /// Text: hex, then base64, then its UTF-8 bytes
    Text(String),
}

impl SaltInput {
    /// Decode to bytes. Text is tried as hex first, then base64, then taken
    /// as raw UTF-8; the first interpretation that parses wins.
    ///
    /// Hex ignores whitespace. Base64 ignores every character outside its
    /// alphabet but still requires canonical padding.
    pub fn decode(&self) -> Vec<u8> {
        match self {
            Self::Bytes(bytes) => bytes.clone(),
            Self::Text(text) => {
                let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
                if let Ok(bytes) = hex::decode(&compact) {
                    return bytes;
                }
                let b64: String = text.chars().filter(|c| is_base64_char(*c)).collect();
                if let Ok(bytes) = LENIENT_BASE64.decode(&b64) {
                    return bytes;
                }
                text.as_bytes().to_vec()
            }
        }
    }
}

impl std::fmt::Debug for SaltInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Bytes(_) => "Bytes",
            Self::Text(_) => "Text",
        };
        f.debug_tuple(kind).field(&"[REDACTED]").finish()
    }
}

impl From<&str> for SaltInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for SaltInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<u8>> for SaltInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for SaltInput {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

/// Canonicalize a salt to exactly [`SALT_SIZE`] bytes.
pub fn canonicalize_salt(input: &SaltInput) -> [u8; SALT_SIZE] {
    let bytes = input.decode();
    let mut salt = [0u8; SALT_SIZE];
    match bytes.len() {
        SALT_SIZE => salt.copy_from_slice(&bytes),
        n if n == SALT_SIZE / 2 => {
            salt[..n].copy_from_slice(&bytes);
            salt[n..].copy_from_slice(&bytes);
        }
        _ => salt.copy_from_slice(&Sha256::digest(&bytes)),
    }
    salt
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_16_bytes_doubled() {
        let canonical = canonicalize_salt(&SaltInput::from(&DEFAULT_SALT[..]));
        assert_eq!(&canonical[..16], &DEFAULT_SALT);
        assert_eq!(&canonical[16..], &DEFAULT_SALT);
    }

    #[test]
    fn test_32_bytes_unchanged() {
        let raw: Vec<u8> = (0u8..32).collect();
        let canonical = canonicalize_salt(&SaltInput::Bytes(raw.clone()));
        assert_eq!(canonical.to_vec(), raw);
    }

    #[test]
    fn test_text_hex_preferred() {
        // "deadbeef" is valid base64 too; hex must win
        let canonical = canonicalize_salt(&SaltInput::from("deadbeef"));
        let expected: [u8; 32] = Sha256::digest([0xde, 0xad, 0xbe, 0xef]).into();
        assert_eq!(canonical, expected);
    }

    #[test]
    fn test_text_hex_16_bytes_doubled() {
        let hex_salt = hex::encode(DEFAULT_SALT);
        let canonical = canonicalize_salt(&SaltInput::from(hex_salt.as_str()));
        assert_eq!(&canonical[..16], &DEFAULT_SALT);
        assert_eq!(&canonical[16..], &DEFAULT_SALT);
    }

    #[test]
    fn test_text_hex_with_whitespace() {
        let spaced = "a8 0d f4 3a 8f bd 03 08 a7 ca b8 3e 58 1f 86 b1";
        assert_eq!(
            canonicalize_salt(&SaltInput::from(spaced)),
            canonicalize_salt(&SaltInput::from(&DEFAULT_SALT[..]))
        );
    }

    #[test]
    fn test_text_base64_32_bytes() {
        let raw = [0x5Au8; 32];
        let b64 = base64::engine::general_purpose::STANDARD.encode(raw);
        assert_eq!(canonicalize_salt(&SaltInput::from(b64)), raw);
    }

    #[test]
    fn test_text_falls_back_to_utf8() {
        let canonical = canonicalize_salt(&SaltInput::from("my salt"));
        assert_eq!(
            hex::encode(canonical),
            "fc3c0962b327db0ee1b7e53f4b3d2073269fb9675fad6ce731625130b79000ae"
        );
    }

    #[test]
    fn test_text_base64_skips_foreign_characters() {
        // read as base64 "mysecretsalt", 9 bytes
        let canonical = canonicalize_salt(&SaltInput::from("my-secret-salt"));
        assert_eq!(
            hex::encode(canonical),
            "5d1dc61e6b8d9ee9e470f7d08dfbcfca1386ba3f36e2175c4b4cbebe307fafeb"
        );
        assert_eq!(
            SaltInput::from("pass-word").decode(),
            hex::decode("a5ab2cc28add").unwrap()
        );
    }

    #[test]
    fn test_text_base64_requires_padding() {
        // "YQ" is unpadded base64 for "a"; it stays text
        assert_eq!(SaltInput::from("YQ").decode(), b"YQ".to_vec());
        assert_eq!(SaltInput::from("YQ==").decode(), b"a".to_vec());
    }

    #[test]
    fn test_debug_redacts_salt() {
        let dbg = format!("{:?}", SaltInput::from("hunter2-salt"));
        assert!(!dbg.contains("hunter2"));
    }

    proptest! {
        #[test]
        fn prop_other_lengths_hash(bytes in proptest::collection::vec(any::<u8>(), 0..80)) {
            prop_assume!(bytes.len() != 16 && bytes.len() != 32);
            let expected: [u8; 32] = Sha256::digest(&bytes).into();
            prop_assert_eq!(canonicalize_salt(&SaltInput::Bytes(bytes)), expected);
        }

        #[test]
        fn prop_16_bytes_doubled(bytes in proptest::array::uniform16(any::<u8>())) {
            let canonical = canonicalize_salt(&SaltInput::Bytes(bytes.to_vec()));
            prop_assert_eq!(&canonical[..16], &bytes[..]);
            prop_assert_eq!(&canonical[16..], &bytes[..]);
        }
    }
}
