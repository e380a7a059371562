//! Reveal obscured config credentials
//!
//! The config tool stores crypt passwords "obscured": URL-safe unpadded
//! base64 of `[16-byte IV][AES-256-CTR ciphertext]` under a fixed key that
//! ships with the tool. It is an obfuscation, not a secret.

use aes::Aes256;
use base64::{
    alphabet,
    engine::{GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use ctr::cipher::{KeyIvInit, StreamCipher};
use redexter_core::{RedexterError, RedexterResult};

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Fixed obscure key published by the config tool
pub const OBSCURE_KEY: [u8; 32] = [
    0x9c, 0x93, 0x5b, 0x48, 0x73, 0x0a, 0x55, 0x4d, 0x6b, 0xfd, 0x7c, 0x63, 0xc8, 0x86, 0xa9, 0x2b,
    0xd3, 0x90, 0x19, 0x8e, 0xb8, 0x12, 0x8a, 0xfb, 0xf4, 0xde, 0x16, 0x2b, 0x8b, 0x95, 0xf6, 0x38,
];

const IV_SIZE: usize = 16;

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Reveal an obscured value.
///
/// The IV is the initial 128-bit big-endian counter. Returns the plaintext
/// if it is valid UTF-8, otherwise its lowercase hex encoding.
pub fn reveal(obscured: &str) -> RedexterResult<String> {
    // values pasted from other tools sometimes use the standard alphabet
    let mut padded: String = obscured
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }

    let mut data = URL_SAFE_LENIENT
        .decode(padded.as_bytes())
        .map_err(|e| RedexterError::MalformedObscured(format!("base64 decode error: {e}")))?;

    if data.len() < IV_SIZE {
        return Err(RedexterError::MalformedObscured(format!(
            "input too short ({} bytes, need at least {IV_SIZE})",
            data.len()
        )));
    }

    let (iv, ciphertext) = data.split_at_mut(IV_SIZE);
    let mut cipher = Aes256Ctr::new_from_slices(&OBSCURE_KEY, iv)
        .map_err(|e| RedexterError::MalformedObscured(format!("cipher init: {e}")))?;
    cipher.apply_keystream(ciphertext);
    let plain = ciphertext.to_vec();

    match String::from_utf8(plain) {
        Ok(text) => Ok(text),
        Err(e) => Ok(hex::encode(e.into_bytes())),
    }
}
