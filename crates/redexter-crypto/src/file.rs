//! Whole-file decryption of the crypt format
//!
//! ```text
//! [8 bytes: magic "RCLONE\0\0"][24 bytes: nonce][block]*
//! ```
//!
//! Blocks are read at a fixed size of [`BLOCK_SIZE`]; only the last may be
//! shorter. Output is streamed block by block, so a failure part-way leaves
//! the already-decrypted prefix on disk.

use std::fs::{self, File};
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use redexter_core::{RedexterError, RedexterResult};
use tracing::{debug, info};

use crate::block::{BlockDecryptor, BlockError, FileNonce};
use crate::kdf::DataKey;
use crate::{BLOCK_SIZE, FILE_MAGIC, FILE_MAGIC_SIZE, NONCE_SIZE};

/// Result of decrypting one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub blocks: u64,
    pub bytes: u64,
}

/// Counters from [`decrypt_stream`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub blocks: u64,
    pub bytes: u64,
}

/// Where the plaintext of `input` is written: its file name minus the final
/// extension, inside `dest_dir` or next to the input.
pub fn output_path(input: &Path, dest_dir: Option<&Path>) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    match dest_dir {
        Some(dir) => dir.join(stem),
        None => input.with_file_name(stem),
    }
}

/// Decrypt one crypt file.
///
/// `dest_dir` is created if missing. The output file is created (or
/// truncated) before the header is validated.
pub fn decrypt_file(
    input: &Path,
    key: &DataKey,
    dest_dir: Option<&Path>,
) -> RedexterResult<DecryptSummary> {
    if let Some(dir) = dest_dir {
        fs::create_dir_all(dir)?;
    }
    let output = output_path(input, dest_dir);
    if same_file(input, &output) {
        return Err(RedexterError::Io(io::Error::new(
            ErrorKind::InvalidInput,
            format!(
                "{} has no extension to strip; output would overwrite the input",
                input.display()
            ),
        )));
    }

    let reader = File::open(input)?;
    let mut writer = BufWriter::new(File::create(&output)?);
    let stats = decrypt_stream(reader, &mut writer, key, input)?;
    writer.flush()?;

    info!(
        input = %input.display(),
        output = %output.display(),
        blocks = stats.blocks,
        bytes = stats.bytes,
        "decrypted file"
    );

    Ok(DecryptSummary {
        input: input.to_path_buf(),
        output,
        blocks: stats.blocks,
        bytes: stats.bytes,
    })
}

/// Decrypt a crypt stream from `reader` into `writer`.
///
/// `path` only labels errors.
pub fn decrypt_stream<R: Read, W: Write>(
    mut reader: R,
    mut writer: W,
    key: &DataKey,
    path: &Path,
) -> RedexterResult<StreamStats> {
    let mut magic = [0u8; FILE_MAGIC_SIZE];
    let n = read_full(&mut reader, &mut magic)?;
    if n != FILE_MAGIC_SIZE || &magic != FILE_MAGIC {
        return Err(RedexterError::BadMagic {
            path: path.to_path_buf(),
        });
    }

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    if read_full(&mut reader, &mut nonce_bytes)? != NONCE_SIZE {
        return Err(RedexterError::TruncatedHeader {
            path: path.to_path_buf(),
        });
    }
    let mut nonce = FileNonce::from_bytes(nonce_bytes);
    debug!(path = %path.display(), nonce = %hex::encode(nonce_bytes), "read file header");

    let decryptor = BlockDecryptor::new(key);
    let mut buf = vec![0u8; BLOCK_SIZE];
    let mut stats = StreamStats::default();

    loop {
        let n = read_full(&mut reader, &mut buf)?;
        if n == 0 {
            break;
        }

        let plain = decryptor
            .open(&nonce, &buf[..n])
            .map_err(|e| match e {
                BlockError::TooShort { len } => RedexterError::CorruptBlock {
                    path: path.to_path_buf(),
                    block: stats.blocks,
                    len,
                },
                BlockError::Authentication => RedexterError::DecryptionFailed {
                    path: path.to_path_buf(),
                    block: stats.blocks,
                },
            })?;

        writer.write_all(&plain)?;
        debug!(block = stats.blocks, len = plain.len(), "decrypted block");
        stats.bytes += plain.len() as u64;
        stats.blocks += 1;
        nonce.increment();
    }

    debug!(path = %path.display(), blocks = stats.blocks, "reached end of stream");
    Ok(stats)
}

/// Fill `buf` as far as the reader allows. Returns bytes read; less than
/// `buf.len()` only at end of stream.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
